//! Colour extraction from artwork.
//!
//! The background colour is the dominant cluster of the outer band of the
//! image, the primary colour is the most common cluster of the whole image
//! that is visibly different from the background.

use std::cmp::Reverse;

use image::RgbaImage;

use crate::models::{Palette, Rgb};

const MAX_SAMPLES: usize = 6_000;
const CLUSTERS: usize = 3;
const MAX_ITERATIONS: usize = 10;
const DISTINCT_THRESHOLD: f32 = 900.0;
const MIN_ALPHA: u8 = 16;
const CONTRAST_THRESHOLD: f64 = 0.3;

/// How the primary foreground colour is chosen.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ForegroundPolicy {
    /// Always the extracted primary colour, whatever the background.
    Extracted,
    /// The primary colour when it stands out from the background, otherwise
    /// black on light and white on dark backgrounds.
    #[default]
    Contrast,
}

#[derive(Debug, Clone, Copy)]
struct Cluster {
    centroid: [f32; 3],
    count: usize,
}

/// Representative colours of an image, before any lightness decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractedColors {
    pub background: Rgb,
    pub primary: Rgb,
}

pub fn extract_palette(image: &RgbaImage, policy: ForegroundPolicy) -> Option<Palette> {
    extract_colors(image).map(|colors| derive_palette(colors, policy))
}

pub fn derive_palette(colors: ExtractedColors, policy: ForegroundPolicy) -> Palette {
    let background = colors.background;
    let is_light = background.is_light();

    let secondary_foreground = if is_light { Rgb::GRAY } else { Rgb::WHITE };

    let foreground = match policy {
        ForegroundPolicy::Extracted => colors.primary,
        ForegroundPolicy::Contrast => {
            if (colors.primary.luma() - background.luma()).abs() >= CONTRAST_THRESHOLD {
                colors.primary
            } else if is_light {
                Rgb::BLACK
            } else {
                Rgb::WHITE
            }
        }
    };

    Palette {
        background,
        foreground,
        secondary_foreground,
    }
}

pub fn extract_colors(image: &RgbaImage) -> Option<ExtractedColors> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let band = (width.min(height) / 10).max(1);
    let edge_samples = sample_pixels(image, MAX_SAMPLES, |x, y| {
        x < band || y < band || x >= width - band || y >= height - band
    });
    let all_samples = sample_pixels(image, MAX_SAMPLES, |_, _| true);

    if all_samples.is_empty() {
        return None;
    }

    let mut overall = kmeans_clusters(&all_samples, CLUSTERS.min(all_samples.len()));
    overall.sort_by_key(|cluster| Reverse(cluster.count));
    let dominant = color_from_centroid(overall.first()?.centroid);

    let background = if edge_samples.is_empty() {
        dominant
    } else {
        let mut edge = kmeans_clusters(&edge_samples, CLUSTERS.min(edge_samples.len()));
        edge.sort_by_key(|cluster| Reverse(cluster.count));
        edge.first()
            .map(|cluster| color_from_centroid(cluster.centroid))
            .unwrap_or(dominant)
    };

    let primary = overall
        .iter()
        .filter(|cluster| cluster.count > 0)
        .map(|cluster| color_from_centroid(cluster.centroid))
        .find(|&color| color_distance_sq(color, background) > DISTINCT_THRESHOLD)
        .unwrap_or(dominant);

    Some(ExtractedColors {
        background,
        primary,
    })
}

fn sample_pixels(
    image: &RgbaImage,
    max_samples: usize,
    include: impl Fn(u32, u32) -> bool,
) -> Vec<[f32; 3]> {
    let total = (image.width() * image.height()) as usize;
    let step = (total / max_samples.max(1)).max(1);

    image
        .enumerate_pixels()
        .step_by(step)
        .filter(|(x, y, pixel)| pixel[3] >= MIN_ALPHA && include(*x, *y))
        .map(|(_, _, pixel)| [pixel[0] as f32, pixel[1] as f32, pixel[2] as f32])
        .take(max_samples)
        .collect()
}

fn squared_distance(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    dr * dr + dg * dg + db * db
}

fn kmeans_clusters(samples: &[[f32; 3]], k: usize) -> Vec<Cluster> {
    if samples.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut centroids: Vec<[f32; 3]> = (0..k)
        .map(|i| samples[((i * samples.len()) / k).min(samples.len() - 1)])
        .collect();
    let mut assignments = vec![0usize; samples.len()];

    for iteration in 0..MAX_ITERATIONS {
        let mut sums = vec![[0f32; 3]; k];
        let mut counts = vec![0usize; k];

        for (sample_index, sample) in samples.iter().enumerate() {
            let mut best = 0;
            let mut best_distance = f32::MAX;
            for (centroid_index, centroid) in centroids.iter().enumerate() {
                let distance = squared_distance(sample, centroid);
                if distance < best_distance {
                    best_distance = distance;
                    best = centroid_index;
                }
            }

            assignments[sample_index] = best;
            for channel in 0..3 {
                sums[best][channel] += sample[channel];
            }
            counts[best] += 1;
        }

        let mut changed = false;
        for i in 0..k {
            if counts[i] == 0 {
                centroids[i] = samples[(i + iteration) % samples.len()];
                continue;
            }

            let count = counts[i] as f32;
            let centroid = [sums[i][0] / count, sums[i][1] / count, sums[i][2] / count];
            if squared_distance(&centroids[i], &centroid) > 1e-2 {
                changed = true;
            }
            centroids[i] = centroid;
        }

        if !changed {
            break;
        }
    }

    let mut counts = vec![0usize; k];
    for &assignment in &assignments {
        counts[assignment] += 1;
    }

    centroids
        .into_iter()
        .zip(counts)
        .map(|(centroid, count)| Cluster { centroid, count })
        .collect()
}

fn color_from_centroid(centroid: [f32; 3]) -> Rgb {
    Rgb::new(
        centroid[0].clamp(0.0, 255.0).round() as u8,
        centroid[1].clamp(0.0, 255.0).round() as u8,
        centroid[2].clamp(0.0, 255.0).round() as u8,
    )
}

fn color_distance_sq(a: Rgb, b: Rgb) -> f32 {
    let dr = a.r as f32 - b.r as f32;
    let dg = a.g as f32 - b.g as f32;
    let db = a.b as f32 - b.b as f32;
    dr * dr + dg * dg + db * db
}
