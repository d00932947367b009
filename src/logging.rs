use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

/// Crate-specific filter variable; `RUST_LOG` is used when it is unset.
pub const LOG_ENV: &str = "OPAC_HARVESTER_LOG";

// html5ever and selectors log every recoverable markup error at debug.
const DEFAULT_FILTER: &str = "info,html5ever=warn,selectors=warn";

pub fn init() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
