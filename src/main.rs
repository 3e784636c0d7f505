//! CentralGauge — thin binary entry point.
//!
//! CLI argument parsing and colored terminal output are collaborators
//! excluded from this crate's core (see spec §1); this binary only
//! wires up tracing and dispatches to the library crates that hold the
//! actual engineering: agent execution, sandboxing, verification, and
//! failure analysis.

use anyhow::{Context, Result};

mod main_helpers;

use main_helpers::init_tracing;

fn main() -> std::process::ExitCode {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to build Tokio runtime: {err}");
            return std::process::ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run()) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    init_tracing().context("failed to initialize tracing")?;

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None | Some("help") | Some("--help") | Some("-h") => {
            print_usage();
            Ok(())
        }
        Some("version") | Some("--version") | Some("-V") => {
            println!("centralgauge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(other) => {
            anyhow::bail!(
                "unknown subcommand `{other}`; this binary only exposes the library crates' \
                 wiring, see --help. Full CLI argument parsing is a collaborator outside this \
                 crate's scope."
            )
        }
    }
}

fn print_usage() {
    println!(
        "centralgauge {version}\n\n\
         Benchmark harness for LLM/agent-generated AL source.\n\n\
         This binary is a thin entry point over the library crates:\n\
         centralgauge-agent, centralgauge-sandbox, centralgauge-verify,\n\
         centralgauge-analysis, centralgauge-fix. A full CLI surface is\n\
         intentionally out of scope for this crate; embed these crates\n\
         in a driver that owns argument parsing and report rendering.\n\n\
         USAGE:\n    centralgauge [help|version]",
        version = env!("CARGO_PKG_VERSION"),
    );
}
