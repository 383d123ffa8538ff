//! `schedulergodx-service`: the `ServiceCore` binary entrypoint.
//!
//! Two invocation modes:
//! - normal: starts the broker consume loop and blocks until shutdown
//!   (spec.md §4.8).
//! - `--run-handler <id>`: the hard-mode subprocess child re-exec target
//!   (SPEC_FULL.md §4.6) — reads `{args, kwargs}` JSON from stdin, invokes
//!   the named handler, writes its result JSON to stdout, and exits.
//!
//! Tracing is initialized first, exactly where
//! `tasker-orchestration/src/bin/server.rs` calls
//! `tasker_shared::logging::init_tracing()`.

use scheduler_shared::config::SchedulerConfig;

fn main() -> std::process::ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if let Some(position) = args.iter().position(|a| a == "--run-handler") {
        return run_handler_subprocess(args.get(position + 1).map(String::as_str));
    }

    scheduler_shared::logging::init_tracing();
    dotenvy::dotenv().ok();

    let config = match SchedulerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to start tokio runtime: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    match runtime.block_on(schedulergodx::service_core::run(config)) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "service exited with an error");
            std::process::ExitCode::FAILURE
        }
    }
}

fn run_handler_subprocess(handler_id: Option<&str>) -> std::process::ExitCode {
    let Some(handler_id) = handler_id else {
        eprintln!("--run-handler requires a handler id");
        return std::process::ExitCode::FAILURE;
    };
    let registry = schedulergodx::handlers::default_registry();
    let code = scheduler_runtime::run_handler_subprocess_entrypoint(
        &registry,
        handler_id,
        std::io::stdin(),
        std::io::stdout(),
    );
    std::process::ExitCode::from(code as u8)
}
