use env_logger::{Builder, Env};

/// Installs the global logger. `RUST_LOG` overrides the default `info` level.
/// Calling this twice is harmless.
pub fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_target(false)
        .try_init();
}
