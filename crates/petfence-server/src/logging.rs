//! Tracing setup.
//!
//! On the receiver (`PETFENCE_PRODUCTION=true`) events go as JSON to a daily
//! rolling file and as plain lines to stdout, which systemd hands to the
//! journal. During development only colored stdout is used.

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::settings::ServerSettings;

/// Flushes the file writer when the process exits.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Daily files are named `petfence.log.YYYY-MM-DD`.
const LOG_FILE_PREFIX: &str = "petfence.log";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over [`ServerSettings::log_level`]. A production log
/// directory that cannot be created is reported once and logging continues
/// on stdout alone; the collar monitor must not stop over it.
///
/// # Errors
///
/// Returns an error if the filter does not parse or a subscriber is already set.
pub fn init(settings: &ServerSettings) -> anyhow::Result<()> {
    let directive = filter_directive(std::env::var("RUST_LOG").ok(), &settings.log_level);
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log filter '{directive}'"))?;

    if !settings.production {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false))
            .try_init()?;
        return Ok(());
    }

    let stdout = fmt::layer().with_ansi(false);
    let log_dir = settings.log_dir.clone().unwrap_or_else(default_log_dir);

    match std::fs::create_dir_all(&log_dir) {
        Ok(()) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = fmt::layer()
                .json()
                .with_writer(writer)
                .with_file(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(stdout)
                .with(file)
                .try_init()?;
            let _ = FILE_GUARD.set(guard);
            tracing::debug!(dir = %log_dir.display(), "Writing logs to file");
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout)
                .try_init()?;
            tracing::warn!(dir = %log_dir.display(), error = %e, "Cannot create log directory, logging to stdout only");
        }
    }

    Ok(())
}

/// A non-blank `RUST_LOG`, else the configured level.
fn filter_directive(rust_log: Option<String>, level: &str) -> String {
    rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| level.to_string())
}

fn default_log_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        return PathBuf::from("/var/log/petfence");
    }
    directories::ProjectDirs::from("", "", "petfence")
        .map_or_else(|| PathBuf::from("logs"), |dirs| dirs.data_local_dir().join("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_wins_over_level() {
        assert_eq!(
            filter_directive(Some("petfence_core=trace".into()), "info"),
            "petfence_core=trace"
        );
    }

    #[test]
    fn test_blank_rust_log_is_ignored() {
        assert_eq!(filter_directive(Some("  ".into()), "warn"), "warn");
        assert_eq!(filter_directive(None, "debug"), "debug");
    }

    #[test]
    fn test_directives_parse() {
        for directive in ["info", "petfence_core=debug,tower_http=warn"] {
            assert!(EnvFilter::try_new(directive).is_ok());
        }
    }

    #[test]
    fn test_default_log_dir_is_named_after_the_service() {
        let dir = default_log_dir();
        assert!(dir.to_string_lossy().contains("petfence") || dir.ends_with("logs"));
    }
}
