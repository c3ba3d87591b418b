//! Tracing subscriber setup.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the binary. `RUST_LOG` takes precedence over the default directive.

use anyhow::Context;
use tracing_subscriber::filter::{Directive, EnvFilter};

/// Install a global `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (for example `"info"` or `"yerb_ecs=debug"`).
///
/// Fails if the directive does not parse, if `RUST_LOG` is malformed, or if a
/// global subscriber is already installed.
pub fn init(default_directive: &str) -> anyhow::Result<()> {
    let directive: Directive = default_directive
        .parse()
        .with_context(|| format!("invalid log directive '{default_directive}'"))?;
    let filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env()
        .context("invalid RUST_LOG")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    tracing::debug!(default_directive, "logging initialized");
    Ok(())
}
