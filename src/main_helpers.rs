//! Tracing setup for the root binary, mirroring the teacher's
//! `main_helpers::initialize_tracing` shape but collapsed to the single
//! path this crate needs: respect `RUST_LOG` if set, otherwise default
//! to `info` for the `centralgauge*` crates and `warn` elsewhere.

use anyhow::Result;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub(crate) fn init_tracing() -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new("warn,centralgauge=info")
    };

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init();

    if let Err(err) = result {
        tracing::warn!(error = %err, "tracing already initialized; skipping setup");
    }

    Ok(())
}
