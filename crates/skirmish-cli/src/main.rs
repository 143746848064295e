mod logging;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use skirmish_core::config::SessionConfig;
use skirmish_core::error::ConfigLoadError;
use skirmish_core::listeners::LoggingListener;
use skirmish_core::{Registry, Session};
use skirmish_events::EventListener;
use tracing::info;

#[derive(Parser)]
#[command(version = env!("VERSION_STRING"), about, long_about = None)]
pub struct Cli {
    /// Session file to run
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enables debug mode. Repeat for full error traces.
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    /// Override the session's tick rate
    #[arg(short, long)]
    ticks: Option<u32>,

    /// Stop after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Also write logs to the data directory
    #[arg(long)]
    log_file: bool,

    /// List the registered modules and exit
    #[arg(long)]
    list_modules: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init_logging(cli.debug, cli.log_file)?;

    let registry = Rc::new(Registry::with_builtins());
    if cli.list_modules {
        for name in registry.modules().names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let path = match cli.config {
        Some(path) => path,
        None => logging::default_config_path()?,
    };
    let mut config = match SessionConfig::load(&path) {
        Ok(config) => config,
        Err(ConfigLoadError::NotFound(path)) => {
            info!("No session file found, creating example config");
            SessionConfig::write_example(&path)?;
            eprintln!("Session file created at: {}", path.display());
            eprintln!("Edit it to configure modules and stages, then run skirmish again.");
            return Ok(());
        }
        Err(err) => return Err(err).context(format!("loading {}", path.display())),
    };
    if let Some(ticks) = cli.ticks {
        config.ticks_per_second = ticks.max(1);
    }
    config.debug_level = config.debug_level.max(cli.debug.saturating_sub(1));

    let mut session = Session::from_config(&config, registry);
    let listener: Rc<RefCell<dyn EventListener>> = Rc::new(RefCell::new(LoggingListener::new()));
    session.manager_mut().add_session_listener(listener);

    info!("Starting session {} at {} tps", session.name(), config.ticks_per_second);
    session.start();

    let period = Duration::from_secs_f64(1.0 / f64::from(config.ticks_per_second));
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if !session.tick() {
                    break;
                }
                if cli.max_ticks.is_some_and(|max| session.played_ticks() >= max) {
                    info!("Reached {} ticks", session.played_ticks());
                    session.stop();
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                session.stop();
                break;
            }
        }
    }

    info!("Session {} finished after {} ticks", session.name(), session.played_ticks());
    Ok(())
}
