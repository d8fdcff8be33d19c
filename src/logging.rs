//! Logger setup for binaries and tests embedding the crate.
//!
//! The library itself only talks to the `log` facade; this helper installs
//! `env_logger` when the `debug` feature is on. Safe to call repeatedly.

#[cfg(feature = "debug")]
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("offmap=info"))
        .try_init();
}

#[cfg(not(feature = "debug"))]
pub fn init() {}
