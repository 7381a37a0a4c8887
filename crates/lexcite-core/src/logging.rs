use anyhow::Result;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "lexcite_core=info,lexcite_client=info";

/// Install the global `tracing` subscriber. `RUST_LOG` overrides [`DEFAULT_FILTER`].
///
/// Fails if a global subscriber is already set.
pub fn init(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
