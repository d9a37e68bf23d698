use tracing::warn;

use crate::config;

/// Load settings, falling back to defaults on any problem.
///
/// Runs before logging is up, so problems are echoed to stderr too.
pub fn load_settings() -> (config::Settings, Option<String>) {
    match config::Settings::load() {
        Ok(s) => {
            if let Err(msg) = s.validate() {
                let notice = format!("invalid config, using defaults: {msg}");
                eprintln!("encore: {notice}");
                (config::Settings::default(), Some(notice))
            } else {
                (s, None)
            }
        }
        Err(e) => {
            // Config is optional; failures should not prevent the app from starting.
            let notice = format!("failed to load config, using defaults: {e}");
            eprintln!("encore: {notice}");
            (config::Settings::default(), Some(notice))
        }
    }
}

/// Record a deferred settings notice once logging is available.
pub fn log_notice(notice: Option<&str>) {
    if let Some(notice) = notice {
        warn!("{notice}");
    }
}
