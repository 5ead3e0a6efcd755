//! tomato - terminal pomodoro clock
//!
//! `tomato timer 50` runs a single timer, `tomato pomodoro 4` runs four
//! work intervals with breaks in between. Finished intervals are appended to
//! the configured log file.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use tomato_clock::cli::{Cli, Commands, ConfigArgs, Display, SessionArgs};
use tomato_clock::config::{ConfigError, ConfigStore, Profile, APP_DIR};
use tomato_clock::coordinator::{Collaborators, MainCoordinator, RunOutcome, RunSettings};
use tomato_clock::keys::KeyReader;
use tomato_clock::notification::{Notifier, NotifySend};
use tomato_clock::render::{TerminalSession, TerminalTarget};
use tomato_clock::sound::{RodioSoundPlayer, SoundPlayer};
use tomato_clock::EventBroker;

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let _guard = init_tracing(cli.debug);

    if let Err(e) = execute(cli).await {
        let suggestion = e.downcast_ref::<ConfigError>().map(ConfigError::suggestion);
        Display::show_error(&format!("{e:#}"), suggestion);
        std::process::exit(1);
    }
}

/// Initializes file logging under the cache directory.
///
/// The terminal is in raw mode during a run, so nothing is logged to it.
fn init_tracing(debug: bool) -> Option<WorkerGuard> {
    use tracing_subscriber::{fmt, EnvFilter};

    let log_dir = dirs::cache_dir()?.join(APP_DIR);
    if std::fs::create_dir_all(&log_dir).is_err() {
        return None;
    }
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&log_dir, "tomato.log"));

    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .init();
    Some(guard)
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let profile = cli.profile();

    match cli.command {
        Some(Commands::Timer(args)) => {
            let config = ConfigStore::from_env()?.load(profile)?;
            let settings = RunSettings::timer(
                &config,
                args.minutes,
                args.session.tag.clone(),
                args.session.purpose.clone(),
            );
            run_session(settings, &args.session).await?;
        }
        Some(Commands::Pomodoro(args)) => {
            let config = ConfigStore::from_env()?.load(profile)?;
            let settings = RunSettings::pomodoro(
                &config,
                args.count,
                args.session.tag.clone(),
                args.session.purpose.clone(),
            );
            run_session(settings, &args.session).await?;
        }
        Some(Commands::Config(args)) => configure(profile, &args)?,
        Some(Commands::Completions { shell }) => generate_completions(shell),
        None => Cli::command().print_help()?,
    }

    Ok(())
}

/// Runs one session in the terminal and reports how it ended.
async fn run_session(settings: RunSettings, session: &SessionArgs) -> Result<()> {
    let (broker_task, broker) = EventBroker::spawn();

    let sound: Arc<dyn SoundPlayer> = Arc::new(RodioSoundPlayer::new(session.no_sound));
    let notifier: Arc<dyn Notifier> = Arc::new(NotifySend);
    let (keys_tx, keys_rx) = crossbeam_channel::unbounded();
    let (interrupt_tx, mut interrupt_rx) = mpsc::unbounded_channel();

    let terminal = TerminalSession::enter().context("failed to prepare the terminal")?;
    let reader =
        KeyReader::spawn(keys_tx, interrupt_tx).context("failed to start the key reader")?;

    let coordinator = MainCoordinator::new(
        broker.clone(),
        settings,
        Collaborators {
            sound,
            notifier,
            target: TerminalTarget::new(),
            keys: keys_rx,
        },
    )?;

    let interrupt = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            Some(()) = interrupt_rx.recv() => {}
        }
    };
    let result = coordinator.run(interrupt).await;

    reader.stop();
    drop(terminal);
    if let Err(e) = broker.shutdown() {
        warn!(error = %e, "broker already closed");
    }
    if let Err(e) = broker_task.await {
        warn!(error = %e, "broker task failed");
    }

    let outcome: RunOutcome = result?;
    info!(?outcome, "session ended");
    Display::show_outcome(&outcome);
    Ok(())
}

/// Applies `tomato config` options to the selected profile.
fn configure(profile: Profile, args: &ConfigArgs) -> Result<()> {
    let store = ConfigStore::from_env()?;
    let update = args.to_update();

    if update.is_empty() {
        let file = store.load_file()?;
        Display::show_config(store.path(), profile, file.profile(profile));
        return Ok(());
    }

    let stored = store.update(profile, update)?;
    if args.show {
        Display::show_config(store.path(), profile, &stored);
    } else {
        println!("Saved profile {} to {}", profile.as_str(), store.path().display());
    }
    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
