use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{self, LogSettings};

/// Pick the log filter: `RUST_LOG` wins over the configured level.
fn env_filter(settings: &LogSettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn log_path(settings: &LogSettings) -> Option<PathBuf> {
    settings.file.clone().or_else(config::default_log_path)
}

/// Install the global subscriber writing to the log file.
///
/// The terminal belongs to the TUI, so nothing is written to stdout. When the
/// file cannot be opened logging stays disabled.
pub fn init_logging(settings: &LogSettings) -> Option<PathBuf> {
    let Some(path) = log_path(settings) else {
        eprintln!("encore: no log location available; logging disabled");
        return None;
    };

    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("encore: cannot create {}: {e}; logging disabled", dir.display());
            return None;
        }
    }

    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("encore: cannot open {}: {e}; logging disabled", path.display());
            return None;
        }
    };

    let installed = tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_env_filter(env_filter(settings))
        .with_ansi(false)
        .try_init();
    if installed.is_err() {
        return None;
    }

    info!(path = %path.display(), "encore starting");
    Some(path)
}
