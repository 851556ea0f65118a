/// Intercept messages using the `log` crate and print them to STDERR. The level defaults to
/// `info`, and `RUST_LOG` overrides it.
pub fn setup() {
    use env_logger::{Builder, Env};
    // Tests and tools that call this twice shouldn't crash
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init();
}
