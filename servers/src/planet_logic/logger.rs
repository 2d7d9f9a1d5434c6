use anyhow::Result;
use std::fs;
use std::path::Path;

const LOG_PREFIX: &str = "server_planetwatch_";
const LIB_TARGET: &str = "lib_planetwatch::";

/// Previous runs' log files kept next to the new one.
const KEEP_PREVIOUS_LOGS: usize = 3;

pub fn setup_logging(log_dir: &Path, log_level: &str) -> Result<()> {
    fs::create_dir_all(log_dir)?;
    cleanup_old_logs(log_dir, KEEP_PREVIOUS_LOGS)?;

    let log_path = log_dir.join(format!("{}{}.log", LOG_PREFIX, chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")));

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d %H:%M:%S%.3f]"),
                component(record.target()),
                record.level(),
                message
            ))
        })
        .level(parse_level(log_level))
        // Transport crates only matter when they fail
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("tungstenite", log::LevelFilter::Warn)
        .level_for("tokio_tungstenite", log::LevelFilter::Warn)
        .chain(std::io::stdout())
        .chain(fern::log_file(log_path)?)
        .apply()?;

    Ok(())
}

/// Short component tag for a log target, e.g. `ingestors::planet_tcp`.
fn component(target: &str) -> &str {
    target.strip_prefix(LIB_TARGET).unwrap_or(target)
}

fn parse_level(log_level: &str) -> log::LevelFilter {
    match log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        "off" => log::LevelFilter::Off,
        _ => log::LevelFilter::Info,
    }
}

/// Deletes this server's log files beyond the `keep` most recent. Other
/// files in the directory are left alone.
fn cleanup_old_logs(log_dir: &Path, keep: usize) -> Result<()> {
    let mut logs: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|res| res.ok())
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.starts_with(LOG_PREFIX) && name.ends_with(".log")
        })
        .collect();

    // Timestamped names sort chronologically
    logs.sort_by_key(|e| std::cmp::Reverse(e.file_name()));

    for entry in logs.iter().skip(keep) {
        if let Err(e) = fs::remove_file(entry.path()) {
            eprintln!("Failed to delete old log file {:?}: {}", entry.path(), e);
        }
    }

    Ok(())
}
