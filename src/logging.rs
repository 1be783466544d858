use crate::config::{ensure_logs_dir, get_logs_dir};
use crate::error::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::{LazyLock, Mutex};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{
    fmt::{self},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Rotate a component log once it grows past this size
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Numbered backups kept per component log
const MAX_LOG_BACKUPS: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub component: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

static LOGGER_INITIALIZED: std::sync::Once = std::sync::Once::new();

// Keep the guard alive for the lifetime of the program
static FILE_APPENDER_GUARD: LazyLock<Mutex<Option<tracing_appender::non_blocking::WorkerGuard>>> =
    LazyLock::new(|| Mutex::new(None));

pub fn init_logging() -> Result<()> {
    ensure_logs_dir()?;
    let logs_dir = get_logs_dir()?;

    LOGGER_INITIALIZED.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let console_layer = fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter.clone());

        let file_appender = tracing_appender::rolling::never(&logs_dir, "dumphub.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if let Ok(mut guard_mutex) = FILE_APPENDER_GUARD.lock() {
            *guard_mutex = Some(guard);
        }

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_filter(env_filter);

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .init();
    });

    Ok(())
}

pub fn log_component_event(
    component: &str,
    level: &str,
    message: &str,
    details: Option<serde_json::Value>,
) -> Result<()> {
    match level {
        "ERROR" => error!(component = component, "{}", message),
        "WARN" => warn!(component = component, "{}", message),
        "DEBUG" => debug!(component = component, "{}", message),
        _ => info!(component = component, "{}", message),
    }

    ensure_logs_dir()?;
    let log_entry = LogEntry {
        timestamp: Utc::now().to_rfc3339(),
        level: level.to_string(),
        component: component.to_string(),
        message: message.to_string(),
        details,
    };
    let log_file_path = get_logs_dir()?.join(format!("{}.log", component));
    append_log_entry(&log_file_path, &log_entry)
}

fn append_log_entry(log_file_path: &Path, entry: &LogEntry) -> Result<()> {
    if should_rotate_log(log_file_path)? {
        rotate_log_file(log_file_path)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    writeln!(file, "{}", serde_json::to_string(entry)?)?;
    file.flush()?;

    Ok(())
}

fn should_rotate_log(log_file_path: &Path) -> Result<bool> {
    if !log_file_path.exists() {
        return Ok(false);
    }

    Ok(std::fs::metadata(log_file_path)?.len() > MAX_LOG_SIZE)
}

fn rotate_log_file(log_file_path: &Path) -> Result<()> {
    // Shift backups up by one (4 -> 5, 3 -> 4, ...), the oldest is overwritten
    for i in (1..MAX_LOG_BACKUPS).rev() {
        let current_backup = log_file_path.with_extension(format!("log.{}", i));
        if current_backup.exists() {
            let next_backup = log_file_path.with_extension(format!("log.{}", i + 1));
            std::fs::rename(&current_backup, &next_backup)?;
        }
    }

    if log_file_path.exists() {
        std::fs::rename(log_file_path, log_file_path.with_extension("log.1"))?;
    }

    Ok(())
}

/// Read a component log, newest entries first
pub fn read_component_logs(component: &str, max_lines: Option<usize>) -> Result<Vec<LogEntry>> {
    read_log_file(&get_logs_dir()?.join(format!("{}.log", component)), max_lines)
}

fn read_log_file(log_file_path: &Path, max_lines: Option<usize>) -> Result<Vec<LogEntry>> {
    if !log_file_path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(log_file_path)?);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        // Lines written by other tools are skipped
        if let Ok(entry) = serde_json::from_str::<LogEntry>(&line) {
            entries.push(entry);
        }
    }

    entries.reverse();
    if let Some(max) = max_lines {
        entries.truncate(max);
    }

    Ok(entries)
}

// Convenience functions for different log levels
pub fn log_debug(component: &str, message: &str) -> Result<()> {
    log_component_event(component, "DEBUG", message, None)
}

pub fn log_info(component: &str, message: &str) -> Result<()> {
    log_component_event(component, "INFO", message, None)
}

pub fn log_warn(component: &str, message: &str) -> Result<()> {
    log_component_event(component, "WARN", message, None)
}

pub fn log_error(component: &str, message: &str) -> Result<()> {
    log_component_event(component, "ERROR", message, None)
}

pub fn log_with_details(
    component: &str,
    level: &str,
    message: &str,
    details: serde_json::Value,
) -> Result<()> {
    log_component_event(component, level, message, Some(details))
}
