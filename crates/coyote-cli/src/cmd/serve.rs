use anyhow::Context;
use coyote_core::loopback::{loopback_link, LoopbackDevice};
use coyote_core::{Config, ShockService};
use std::path::Path;
use std::sync::Arc;

/// Target id the loopback device reports when it binds.
const LOOPBACK_TARGET: &str = "loopback";

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct ServeOverrides {
    pub port: Option<u16>,
    pub owner_max: Option<u32>,
    pub binding_timeout: Option<u64>,
}

impl ServeOverrides {
    fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.api.port = port;
        }
        if let Some(owner_max) = self.owner_max {
            config.owner_max_power = owner_max;
        }
        if let Some(secs) = self.binding_timeout {
            config.binding_timeout_secs = Some(secs);
        }
    }
}

pub fn run(path: Option<&Path>, overrides: ServeOverrides) -> anyhow::Result<()> {
    let mut config = Config::load(path).context("failed to load config")?;
    overrides.apply(&mut config);
    config.ensure_valid().context("invalid configuration")?;

    for warning in config.validate() {
        tracing::warn!("{}", warning.message);
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(serve(config))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.api.host, config.api.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let (link, mut controller) = loopback_link(LoopbackDevice::new(), LOOPBACK_TARGET);
    let service = Arc::new(ShockService::start(config, link));

    // No pairing step on the loopback device.
    if !controller.bind() {
        anyhow::bail!("loopback device refused to bind");
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
        }
        tracing::info!("shutting down");
    };
    let result = coyote_server::serve_on(service.clone(), listener, shutdown).await;

    service.shutdown().await;
    drop(controller);
    result
}
