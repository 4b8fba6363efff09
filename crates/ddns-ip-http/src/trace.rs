//! Cloudflare trace source (`cf_trace`)

use crate::{build_client, fetch_capped};
use ddns_core::common::{Family, deserialize_opt_duration, detect_normalize_addr, parse_address};
use ddns_core::config::{SourceConfig, decode_options};
use ddns_core::resolver::ResolveContext;
use ddns_core::traits::{Source, SourceFactory};
use ddns_core::{Error, Result};
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};

const SOURCE_TYPE: &str = "cf-trace";

/// Bytes of the trace response that are looked at
const MAX_READ: usize = 1024;

/// Host asked for the trace when the configured source is an IP literal
const DEFAULT_HOST: &str = "www.cloudflare.com";

/// Settings decoded from the source record's `config` map
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TraceOptions {
    /// Restrict the result (and the connection) to one family
    #[serde(rename = "type")]
    pub family: Option<Family>,
    /// Request timeout
    #[serde(deserialize_with = "deserialize_opt_duration")]
    pub timeout: Option<Duration>,
    /// Connect to this address regardless of what the host resolves to
    pub force_address: Option<IpAddr>,
    /// Use an IP literal source as the HTTP host instead of forcing it
    pub ip_host: bool,
}

/// Address source reading the `ip=` line of a Cloudflare trace
pub struct TraceSource {
    url: String,
    family: Option<Family>,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl TraceSource {
    /// Create a trace source for `source` (host name or IP literal)
    pub fn new(source: &str, options: TraceOptions) -> Result<Self> {
        let (mut host, is_ip) = detect_normalize_addr(source.trim());
        let mut force_address = options.force_address;

        if is_ip && !options.ip_host {
            let literal: IpAddr = host
                .parse()
                .map_err(|e| Error::config(format!("bad trace host {}: {}", host, e)))?;
            force_address = Some(literal);
            host = DEFAULT_HOST.to_string();
        }

        let client = build_client(
            options.family,
            force_address.map(|addr| (host.as_str(), addr)),
        )?;

        if host.contains(':') {
            host = format!("[{}]", host);
        }

        debug!(host = %host, force_address = ?force_address, "created trace source");

        Ok(Self {
            url: format!("https://{}/cdn-cgi/trace", host),
            family: options.family,
            timeout: options.timeout,
            client,
        })
    }

    /// The trace URL requested on each lookup
    pub fn url(&self) -> &str {
        &self.url
    }

    #[cfg(test)]
    pub(crate) fn with_url(mut self, url: String) -> Self {
        self.url = url;
        self
    }
}

/// Extract the address from a trace body
fn parse_trace(body: &[u8], family: Option<Family>) -> Result<IpAddr> {
    let text = String::from_utf8_lossy(body);

    let value = text
        .lines()
        .find_map(|line| line.strip_prefix("ip="))
        .ok_or_else(|| {
            warn!(body = %text, "no IP found in response");
            Error::lookup(SOURCE_TYPE, "no IP found in response")
        })?;

    parse_address(value, family, SOURCE_TYPE)
}

#[async_trait::async_trait]
impl Source for TraceSource {
    async fn lookup(&self, _ctx: &mut ResolveContext<'_>) -> Result<IpAddr> {
        let body = fetch_capped(&self.client, &self.url, self.timeout, MAX_READ, SOURCE_TYPE).await?;
        let ip = parse_trace(&body, self.family)?;
        debug!(url = %self.url, ip = %ip, "got ip");
        Ok(ip)
    }

    fn type_name(&self) -> &'static str {
        SOURCE_TYPE
    }
}

/// Factory for the `cf_trace` source type
pub struct TraceFactory;

impl SourceFactory for TraceFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn Source>> {
        if config.source.trim().is_empty() {
            return Err(Error::config("cf_trace source needs a host"));
        }
        let options: TraceOptions = decode_options("cf_trace", &config.config)?;
        Ok(Box::new(TraceSource::new(&config.source, options)?))
    }
}
