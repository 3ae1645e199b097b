use tracing::info;
use tsdns_proxy_domain::{CliOverrides, Config};

pub fn load_config(
    config_path: Option<&str>,
    cli_overrides: CliOverrides,
) -> anyhow::Result<Config> {
    let config = Config::load(config_path, cli_overrides)?;
    config.validate()?;
    Ok(config)
}

/// Logged once the subscriber is installed.
pub fn log_config(config_path: Option<&str>, config: &Config) {
    info!(
        config_file = config_path.or_else(|| Config::get_config_path()).unwrap_or("default"),
        listen = %config.proxy.listen_addr,
        upstreams = ?config.proxy.upstreams,
        proxy_zones = ?config.proxy.proxy_zones,
        "Configuration loaded"
    );
}
