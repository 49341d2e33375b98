use chrono::Local;
use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;

/// Log to stderr as `<timestamp> [LEVEL] - message`, at `Info` unless `RUST_LOG` says
/// otherwise.
pub fn init_logging() {
    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info)
        .parse_env("RUST_LOG");
    // Only the first logger installed in a process takes effect.
    let _ = builder.try_init();
}
