// # ddnsd - DDNS Daemon
//
// Thin integration layer around ddns-core. The daemon is responsible for:
// 1. Loading the config file and initializing logging
// 2. Registering sources, transformers and providers
// 3. Running resolution passes and publishing the results
//
// ## Usage
//
// ```bash
// ddnsd -c /etc/ddnsd/config.toml
// ddnsd -c config.yaml --debug
// ```
//
// With `service.refresh_rate` unset or zero a single pass runs and the
// daemon exits. Otherwise passes run at that rate until SIGINT or SIGTERM,
// which also cancels any pass in flight.

mod logging;
mod pidfile;
mod settings;

use anyhow::Result;
use clap::Parser;
use ddns_core::{DdnsConfig, Publisher, Registry, Resolver};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Instrument, debug, error, info, warn};

use crate::pidfile::PidFile;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Resolve named addresses and keep DNS records pointing at them
#[derive(Debug, Parser)]
#[command(name = "ddnsd", version)]
struct Cli {
    /// Path to the config file (.toml, .yaml, .yml or .json)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Log at debug level regardless of the configured level
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match settings::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = logging::init(&config, cli.debug) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let node = logging::node_span(&config);
    let _entered = node.enter();
    info!(config = %cli.config.display(), "starting ddnsd");
    info!(
        "configuration loaded: {} address(es), {} domain(s)",
        config.address.len(),
        config.domain.len()
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let _pid_file = match config.service.pid_file.as_deref() {
            Some(path) if !path.is_empty() => match PidFile::create(path) {
                Ok(pid) => {
                    info!(path = %pid.path().display(), "wrote pid file");
                    Some(pid)
                }
                Err(e) => {
                    error!("{:#}", e);
                    return DdnsExitCode::ConfigError;
                }
            },
            _ => None,
        };

        let daemon = match Daemon::start(&config).await {
            Ok(daemon) => daemon,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return DdnsExitCode::ConfigError;
            }
        };

        match daemon.run(config.service.interval()).await {
            Ok(()) => DdnsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DdnsExitCode::RuntimeError
            }
        }
    }
    .instrument(node.clone()))
    .into()
}

/// Registry holding the built-ins plus every plugin compiled in
fn build_registry() -> Registry {
    let mut registry = Registry::with_builtins();

    #[cfg(feature = "cloudflare")]
    {
        debug!("registering Cloudflare provider");
        ddns_provider_cloudflare::register(&mut registry);
    }

    #[cfg(feature = "netlink")]
    {
        debug!("registering interface source");
        ddns_ip_netlink::register(&mut registry);
    }

    #[cfg(feature = "http")]
    {
        debug!("registering HTTP sources");
        ddns_ip_http::register(&mut registry);
    }

    registry
}

/// A started daemon: one resolver and one publisher
struct Daemon {
    resolver: Resolver,
    publisher: Publisher,
}

impl Daemon {
    async fn start(config: &DdnsConfig) -> Result<Self> {
        let registry = build_registry();
        debug!(
            sources = ?registry.list_sources(),
            transformers = ?registry.list_transformers(),
            providers = ?registry.list_providers(),
            "registry ready"
        );

        let resolver = Resolver::new(&config.address, &registry)?;
        let provider = registry.create_provider(&config.provider)?;
        let service = Some(config.service.name.as_str()).filter(|s| !s.is_empty());
        let publisher =
            Publisher::with_mark_prefix(provider, &config.domain, config.service.mark_prefix(), service)
                .await?;

        for record in publisher.records() {
            debug!(domain = %record.domain, r#type = %record.record_type, mark = %record.mark, "managing record");
        }
        info!(provider = config.provider.type_name(), "daemon initialized");
        Ok(Self {
            resolver,
            publisher,
        })
    }

    /// One resolution pass followed by publishing its result
    async fn pass(&mut self) -> Result<()> {
        let resolution = self.resolver.resolve().await?;
        for (name, address) in &resolution {
            debug!(name = %name, address = %address, "resolved");
        }

        let summary = self.publisher.publish(&resolution).await;
        if summary.is_complete() {
            info!(%summary, "publish finished");
        } else {
            warn!(%summary, "publish incomplete");
        }
        Ok(())
    }

    async fn run(mut self, interval: Option<Duration>) -> Result<()> {
        let shutdown = wait_for_shutdown();
        tokio::pin!(shutdown);

        let Some(period) = interval else {
            info!("running a single pass");
            return tokio::select! {
                result = self.pass() => result,
                signal = &mut shutdown => {
                    info!("Received shutdown signal: {}, pass cancelled", signal?);
                    Ok(())
                }
            };
        };

        info!(interval = ?period, "running periodically");
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                signal = &mut shutdown => {
                    info!("Received shutdown signal: {}", signal?);
                    break;
                }
            }

            tokio::select! {
                result = self.pass() => {
                    if let Err(e) = result {
                        error!(error = %e, "resolution pass failed, skipping publish");
                    }
                }
                signal = &mut shutdown => {
                    info!("Received shutdown signal: {}, pass cancelled", signal?);
                    break;
                }
            }
        }

        info!("Shutting down daemon");
        Ok(())
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    tokio::select! {
        _ = sigterm.recv() => Ok("SIGTERM"),
        _ = sigint.recv() => Ok("SIGINT"),
    }
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
