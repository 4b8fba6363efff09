//! Tracing subscriber setup
//!
//! Every line goes to the `log.info_path` targets (stdout when unset).
//! Error-level lines are also copied to the `log.error_path` targets.
//! A target is a file path opened for append, or `stdout`/`stderr`.

use anyhow::{Context, Result, bail};
use ddns_core::DdnsConfig;
use ddns_core::config::LogConfig;
use std::fs::{File, OpenOptions};
use std::sync::Mutex;
use tracing::{Level, Span, Subscriber};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

/// Install the global subscriber
pub fn init(config: &DdnsConfig, debug: bool) -> Result<()> {
    tracing::subscriber::set_global_default(subscriber(&config.log, debug)?)?;
    Ok(())
}

/// Root span carrying the service name as `node`
pub fn node_span(config: &DdnsConfig) -> Span {
    tracing::info_span!("ddnsd", node = %config.service.name)
}

fn subscriber(log: &LogConfig, debug: bool) -> Result<Box<dyn Subscriber + Send + Sync>> {
    let level = log_level(log.level.as_deref(), debug)?;
    let to_terminal = log.info_path.is_none() && log.error_path.is_none();
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(to_terminal)
        .with_writer(writer(log)?);

    Ok(match log.encoding.as_deref().unwrap_or("console") {
        "console" => Box::new(builder.finish()),
        "json" => Box::new(builder.json().finish()),
        other => bail!("log encoding '{}' is not valid. Valid: console, json", other),
    })
}

/// Map a configured level name onto a tracing level
fn log_level(name: Option<&str>, debug: bool) -> Result<Level> {
    if debug {
        return Ok(Level::DEBUG);
    }
    match name.map(str::to_ascii_lowercase).as_deref() {
        None | Some("") | Some("info") => Ok(Level::INFO),
        Some("trace") => Ok(Level::TRACE),
        Some("debug") => Ok(Level::DEBUG),
        Some("warn") => Ok(Level::WARN),
        Some("error") => Ok(Level::ERROR),
        Some(other) => bail!(
            "log level '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            other
        ),
    }
}

fn writer(log: &LogConfig) -> Result<BoxMakeWriter> {
    let info = match log.info_path.as_deref() {
        Some(paths) => tee(paths)?.unwrap_or_else(|| BoxMakeWriter::new(std::io::sink)),
        None => BoxMakeWriter::new(std::io::stdout),
    };
    let errors = match log.error_path.as_deref() {
        Some(paths) => tee(paths)?,
        None => None,
    };

    Ok(match errors {
        Some(errors) => BoxMakeWriter::new(info.and(errors.with_max_level(Level::ERROR))),
        None => info,
    })
}

/// Fan out to every target, `None` for an empty list
fn tee(paths: &[String]) -> Result<Option<BoxMakeWriter>> {
    let mut combined: Option<BoxMakeWriter> = None;
    for path in paths {
        let next = target(path)?;
        combined = Some(match combined {
            Some(writer) => BoxMakeWriter::new(writer.and(next)),
            None => next,
        });
    }
    Ok(combined)
}

fn target(path: &str) -> Result<BoxMakeWriter> {
    Ok(match path {
        "stdout" => BoxMakeWriter::new(std::io::stdout),
        "stderr" => BoxMakeWriter::new(std::io::stderr),
        path => BoxMakeWriter::new(Mutex::new(open_append(path)?)),
    })
}

fn open_append(path: &str) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddns_core::config::ServiceConfig;
    use tracing::{error, info};

    fn log_config(info: Vec<String>, errors: Option<Vec<String>>) -> LogConfig {
        LogConfig {
            info_path: Some(info),
            error_path: errors,
            ..Default::default()
        }
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(None, false).unwrap(), Level::INFO);
        assert_eq!(log_level(Some("WARN"), false).unwrap(), Level::WARN);
        assert_eq!(log_level(Some("error"), true).unwrap(), Level::DEBUG);
        assert!(log_level(Some("loud"), false).is_err());
    }

    #[test]
    fn test_error_lines_are_split_out() {
        let dir = tempfile::tempdir().unwrap();
        let info_log = dir.path().join("info.log");
        let error_log = dir.path().join("error.log");
        let log = log_config(
            vec![info_log.display().to_string()],
            Some(vec![error_log.display().to_string()]),
        );

        tracing::subscriber::with_default(subscriber(&log, false).unwrap(), || {
            info!("pass finished");
            error!("publish failed");
        });

        let all = std::fs::read_to_string(&info_log).unwrap();
        assert!(all.contains("pass finished"));
        assert!(all.contains("publish failed"));

        let errors = std::fs::read_to_string(&error_log).unwrap();
        assert!(errors.contains("publish failed"));
        assert!(!errors.contains("pass finished"));
    }

    #[test]
    fn test_lines_carry_node() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ddnsd.log");
        let mut log = log_config(vec![path.display().to_string()], None);
        log.encoding = Some("json".to_string());

        let config = DdnsConfig {
            service: ServiceConfig {
                name: "home".to_string(),
                ..Default::default()
            },
            log: log.clone(),
            ..Default::default()
        };

        tracing::subscriber::with_default(subscriber(&log, false).unwrap(), || {
            let _entered = node_span(&config).entered();
            info!("resolved");
        });

        let line = std::fs::read_to_string(&path).unwrap();
        let event: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(event["span"]["node"], "home");
        assert_eq!(event["fields"]["message"], "resolved");
    }

    #[test]
    fn test_file_appended_not_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ddnsd.log");
        std::fs::write(&path, "earlier run\n").unwrap();
        let log = log_config(vec![path.display().to_string()], None);

        tracing::subscriber::with_default(subscriber(&log, false).unwrap(), || {
            info!("later run");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("earlier run\n"));
        assert!(contents.contains("later run"));
    }

    #[test]
    fn test_bad_targets_rejected() {
        let log = log_config(vec!["/nonexistent/dir/ddnsd.log".to_string()], None);
        assert!(subscriber(&log, false).is_err());

        let log = LogConfig {
            encoding: Some("xml".to_string()),
            ..Default::default()
        };
        assert!(subscriber(&log, false).is_err());
    }
}
