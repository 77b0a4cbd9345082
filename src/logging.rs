use anyhow::{Context, Result};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Logger that writes to a rotating file and echoes important records to stderr
struct ParkrLogger {
    file_writer: Arc<Mutex<RollingFileAppender>>,
    file_level: LevelFilter,
    console_level: LevelFilter,
}

impl Log for ParkrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.file_level || metadata.level() <= self.console_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = record.level();

        if level <= self.file_level
            && let Ok(mut writer) = self.file_writer.lock()
        {
            let _ = writeln!(writer, "{}", format_line(level, &record.args().to_string()));
        }

        if level <= self.console_level {
            let _ = writeln!(io::stderr(), "{}: {}", console_tag(level), record.args());
        }
    }

    fn flush(&self) {
        if let Ok(mut writer) = self.file_writer.lock() {
            let _ = writer.flush();
        }
    }
}

/// Timestamped line written to the log file
fn format_line(level: Level, message: &str) -> String {
    format!(
        "{} [{}] {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        level,
        message
    )
}

fn console_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "error",
        Level::Warn => "warning",
        Level::Info => "info",
        Level::Debug => "debug",
        Level::Trace => "trace",
    }
}

/// Parse log level string to LevelFilter
pub fn parse_level(level_str: &str) -> LevelFilter {
    match level_str.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Initialize the global logger
/// Files rotate daily and the three most recent are kept
pub fn init_logger(log_file_path: PathBuf, file_level: &str, console_level: &str) -> Result<()> {
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent).context("Failed to create log directory")?;
    }

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(3)
        .filename_prefix(
            log_file_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("parkr"),
        )
        .filename_suffix(
            log_file_path
                .extension()
                .and_then(|s| s.to_str())
                .unwrap_or("log"),
        )
        .build(
            log_file_path
                .parent()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path"))?,
        )
        .context("Failed to create rotating file appender")?;

    let file_level = parse_level(file_level);
    let console_level = parse_level(console_level);

    let logger = ParkrLogger {
        file_writer: Arc::new(Mutex::new(file_appender)),
        file_level,
        console_level,
    };

    log::set_boxed_logger(Box::new(logger)).context("Failed to set global logger")?;
    log::set_max_level(file_level.max(console_level));

    Ok(())
}
