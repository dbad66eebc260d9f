//! Logger setup.
//!
//! Log lines go to stderr as `[HH:MM:SS LEVEL target] message`.

use log::LevelFilter;

/// Picks the level from `RUST_LOG` when it names a level, else `configured`.
pub fn level_from_env(configured: LevelFilter, rust_log: Option<&str>) -> LevelFilter {
    rust_log
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(configured)
}

pub fn init(configured: LevelFilter) -> Result<(), log::SetLoggerError> {
    let level = level_from_env(configured, std::env::var("RUST_LOG").ok().as_deref());
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
}
