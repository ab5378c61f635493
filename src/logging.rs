use log::LevelFilter;
use std::io::Write;

/// Map a level name to a filter, defaulting to info for unknown names.
pub fn parse_level(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::Info)
}

/// Install the process logger. `RUST_LOG`, when set, overrides `level`.
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(level: &str) {
    let mut builder = env_logger::Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, parse_level(level));
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    let _ = builder.try_init();
}
