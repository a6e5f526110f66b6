use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use clap::{Parser, ValueEnum};
use nowplaying_controls::{
    AuthorizationGate, GateConfig, GateOutcome, PlaybackPresenter, PresenterConfig,
    controls::Controls, demo::DemoPlayer, notification::NotificationBroadcast,
    palette::ForegroundPolicy, service::PlayerService,
};
use nowplaying_tui::Theme;
use snafu::prelude::*;
use tracing::{error, info};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(long, env = "NOWPLAYING_PLAYER")]
    /// Follow the first player whose MPRIS name starts with this, e.g. "spotify".
    player: Option<String>,

    #[clap(long, env = "NOWPLAYING_DEMO", default_value_t = false)]
    /// Play a built-in queue instead of following a system player.
    demo: bool,

    #[clap(long, env = "NOWPLAYING_TICK_MS", default_value_t = 100)]
    /// How often the elapsed time is refreshed, in milliseconds.
    tick_ms: u64,

    #[clap(long, env = "NOWPLAYING_ARTWORK_SIZE", default_value_t = 256)]
    /// Width and height artwork is fetched at, in pixels.
    artwork_size: u32,

    #[clap(long, env = "NOWPLAYING_REVEAL_DELAY_MS", default_value_t = 1000)]
    /// How long "Authorized!" stays on screen before the player shows up.
    reveal_delay_ms: u64,

    #[clap(long, env = "NOWPLAYING_FOREGROUND", value_enum, default_value_t = Foreground::Contrast)]
    /// How the title color is picked from the artwork.
    foreground: Foreground,

    #[clap(short, long, env = "NOWPLAYING_VERBOSITY")]
    /// Log level
    verbosity: Option<tracing::Level>,

    #[clap(long, env = "NOWPLAYING_LOG_FILE")]
    /// Write logs to this file instead of stderr.
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Foreground {
    /// Extracted color, replaced by black or white when it would not be readable.
    Contrast,
    /// Extracted color as is.
    Extracted,
}

impl From<Foreground> for ForegroundPolicy {
    fn from(value: Foreground) -> Self {
        match value {
            Foreground::Contrast => ForegroundPolicy::Contrast,
            Foreground::Extracted => ForegroundPolicy::Extracted,
        }
    }
}

impl Cli {
    fn presenter_config(&self) -> PresenterConfig {
        PresenterConfig {
            tick_interval: Duration::from_millis(self.tick_ms.max(1)),
            artwork_size: self.artwork_size.max(1),
            foreground_policy: self.foreground.into(),
        }
    }

    fn gate_config(&self) -> GateConfig {
        GateConfig {
            reveal_delay: Duration::from_millis(self.reveal_delay_ms),
        }
    }
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{error}"))]
    PlayerError { error: String },
    #[snafu(display("Unable to open log file {}: {error}", path.display()))]
    LogFileError { path: PathBuf, error: String },
    #[cfg(not(target_os = "linux"))]
    #[snafu(display(
        "Following a system player needs MPRIS, which is only available on Linux. Try --demo."
    ))]
    UnsupportedError,
}

impl From<nowplaying_controls::error::Error> for Error {
    fn from(error: nowplaying_controls::error::Error) -> Self {
        Error::PlayerError {
            error: error.to_string(),
        }
    }
}

pub async fn run() -> Result<(), Error> {
    let cli = Cli::parse();

    init_logging(cli.verbosity, cli.log_file.as_deref())?;

    let broadcast = Arc::new(NotificationBroadcast::new());
    let service = player_service(&cli, broadcast.clone())?;
    let (controls, commands) = Controls::new();

    let gate = AuthorizationGate::new(service.clone(), cli.gate_config());
    let presenter = PlaybackPresenter::new(service, cli.presenter_config(), broadcast.clone());

    let gate_receiver = gate.subscribe();
    let playback_receiver = presenter.subscribe();

    let session = tokio::spawn(async move {
        match gate.run().await {
            GateOutcome::Revealed => {
                if let Err(err) = presenter.run(commands).await {
                    error!(%err, "Presenter stopped");
                }
            }
            GateOutcome::Blocked(status) => info!(?status, "Player stays hidden"),
        }
    });

    let result = nowplaying_tui::init(
        gate_receiver,
        playback_receiver,
        controls,
        broadcast,
        Theme::default(),
    )
    .await;

    session.abort();
    result?;

    Ok(())
}

fn player_service(
    cli: &Cli,
    broadcast: Arc<NotificationBroadcast>,
) -> Result<Arc<dyn PlayerService>, Error> {
    if cli.demo {
        return Ok(Arc::new(DemoPlayer::new()));
    }

    #[cfg(target_os = "linux")]
    {
        Ok(Arc::new(nowplaying_mpris::MprisPlayer::new(
            cli.player.clone(),
            broadcast,
        )))
    }

    #[cfg(not(target_os = "linux"))]
    {
        _ = broadcast;
        UnsupportedSnafu.fail()
    }
}

fn init_logging(verbosity: Option<tracing::Level>, log_file: Option<&Path>) -> Result<(), Error> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(verbosity)
        .with_target(false)
        .compact();

    match log_file {
        Some(path) => {
            let file = File::create(path).map_err(|error| Error::LogFileError {
                path: path.to_path_buf(),
                error: error.to_string(),
            })?;

            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}
