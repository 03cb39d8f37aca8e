use directories::ProjectDirs;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, Registry};

pub fn log_dir() -> Option<PathBuf> {
    ProjectDirs::from("uz", "legalai", "legalai").map(|dirs| dirs.data_dir().join("logs"))
}

/// Logs go to a file; the terminal belongs to the TUI.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let Some(dir) = log_dir() else {
        return Ok(());
    };

    std::fs::create_dir_all(&dir)?;
    let file = File::create(dir.join("legalai.log"))?;

    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let file_layer = fmt::layer()
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .with_filter(level);

    Registry::default().with(file_layer).try_init()?;

    Ok(())
}
