//! Structured logging bootstrap (SPEC_FULL.md §11), grounded on
//! `tasker-orchestration/src/bin/server.rs`'s call to
//! `tasker_shared::logging::init_tracing()` as the first statement in `main`.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global `tracing` subscriber from `RUST_LOG` or
/// `SCHEDULERGODX_LOG`, falling back to `info`. Idempotent: a second call
/// is a no-op rather than a panic, so tests that both call `main`-style
/// setup and run under a test harness don't crash.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("SCHEDULERGODX_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt().with_env_filter(filter).try_init();
}
