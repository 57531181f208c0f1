//! Logging Infrastructure
//!
//! Structured logging setup. `RUST_LOG` wins when set; otherwise the
//! configured level applies to the whole server. Production runs add a
//! daily-rolling file appender and can switch to JSON lines.

use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Initialize the logger
pub fn init_logger() {
    init_logger_with_file(None, None, None);
}

/// Initialize the logger with optional JSON formatting and file output
pub fn init_logger_with_file(log_level: Option<&str>, json: Option<bool>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    let writer = match log_dir.map(Path::new) {
        Some(dir) if dir.exists() => {
            let appender = tracing_appender::rolling::daily(dir, "fulfill-server");
            BoxMakeWriter::new(appender)
        }
        _ => BoxMakeWriter::new(std::io::stdout),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if json.unwrap_or(false) {
        builder.json().init();
    } else {
        builder.init();
    }
}
