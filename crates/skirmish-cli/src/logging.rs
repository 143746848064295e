use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const MAX_LOG_SIZE: u64 = 1024 * 1024; // 1MB

pub fn project_dirs() -> io::Result<ProjectDirs> {
    ProjectDirs::from("", "", "skirmish")
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Failed to find home directory"))
}

fn env_filter(debug: u8) -> EnvFilter {
    let default = if debug > 0 { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber. With `to_file`, logs also go to `logs/skirmish.log` in the
/// data directory. The returned guard must be held until exit.
pub fn init_logging(debug: u8, to_file: bool) -> io::Result<Option<WorkerGuard>> {
    if !to_file {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter(debug))
            .init();
        return Ok(None);
    }

    let log_dir = project_dirs()?.data_dir().join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("skirmish.log");
    truncate_if_needed(&log_path)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    let (non_blocking_file, guard) = tracing_appender::non_blocking(BufWriter::new(file));

    tracing_subscriber::registry()
        .with(env_filter(debug))
        .with(fmt::layer().with_writer(io::stdout).with_ansi(true))
        .with(
            fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::info!("Logging to file: {}", log_path.display());
    Ok(Some(guard))
}

pub fn default_config_path() -> io::Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("session.toml"))
}

fn truncate_if_needed(log_path: &Path) -> io::Result<()> {
    if log_path.exists() && fs::metadata(log_path)?.len() > MAX_LOG_SIZE {
        File::create(log_path)?.set_len(0)?;
    }
    Ok(())
}
