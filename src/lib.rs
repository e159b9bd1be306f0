pub mod api;
pub mod core;

pub fn init_logging() {
    // Idempotent so library consumers and tests can both call it.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
