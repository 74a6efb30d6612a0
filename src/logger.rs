use env_logger::{Builder, Env};
use log::{info, LevelFilter};
use std::io::Write;

// Colored single-line records. `RUST_LOG` still wins over the configured level.
pub fn setup_logger(level: LevelFilter) {
    let mut builder = Builder::new();
    builder.filter_level(level);
    builder.parse_env(Env::default());

    builder
        .format(|buf, record| {
            let level_color = match record.level() {
                log::Level::Error => "\x1B[1;31m", // Bold Red
                log::Level::Warn => "\x1B[1;33m",  // Bold Yellow
                log::Level::Info => "\x1B[1;32m",  // Bold Green
                log::Level::Debug => "\x1B[1;36m", // Bold Cyan
                log::Level::Trace => "\x1B[1;35m", // Bold Magenta
            };

            writeln!(
                buf,
                "[{}] {}{:<5}\x1B[0m {} [{}:{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                level_color,
                record.level(),
                record.target(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .try_init()
        .ok();

    info!("Logger initialized at {} level", level);
}
