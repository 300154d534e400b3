//! notify-speaker-rs: reads desktop notifications aloud.

mod config;
mod console;
mod controller;
mod journal;
mod sanitize;
mod source;
mod speaker;
mod toggles;
mod voice;
mod watcher;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "notify-speaker-rs", about = "Reads new desktop notifications aloud")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start muted (log only, no speech)
    #[arg(long)]
    mute: bool,

    /// Ignore notifications from this app (repeatable)
    #[arg(long = "ignore", value_name = "APP")]
    ignore: Vec<String>,

    /// Seconds between notification polls (overrides config)
    #[arg(long, value_name = "SECS")]
    poll_interval: Option<f64>,

    /// Wait for a `start` command instead of starting automatically
    #[arg(long)]
    no_autostart: bool,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Diagnostics go to stderr so stdout carries only the notification trail
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("notify-speaker-rs starting");

    let mut config = config::Config::load(args.config.as_deref());
    if let Some(secs) = args.poll_interval {
        config.watch.poll_interval = secs;
    }
    config.toggles.mute |= args.mute;
    config.toggles.ignored_apps.extend(args.ignore);
    info!("Config loaded: {:?}", config.watch);

    let toggles = Arc::new(toggles::RuntimeToggles::from_config(&config.toggles));
    let listener = Arc::new(source::command::CommandListener::new(&config.source)?);
    let engine: Arc<dyn voice::VoiceEngine> = voice::from_config(&config.speech).into();
    let speaker = speaker::Speaker::new(
        toggles.clone(),
        engine,
        speaker::VoiceSettings::from(&config.speech),
    );

    let log = journal::console();
    let controller = controller::WatchController::new(
        listener,
        speaker,
        toggles,
        log.clone(),
        config.watch.timings(),
        config::seconds(config.watch.restart_delay),
    );

    let autostart =
        (!args.no_autostart).then(|| config::seconds(config.watch.autostart_delay));
    console::run(controller, log, autostart).await;

    info!("notify-speaker-rs stopped");
    Ok(())
}
