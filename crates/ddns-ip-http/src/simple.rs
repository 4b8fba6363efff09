//! Generic HTTP source (`simple`)
//!
//! Fetches an arbitrary URL and takes the first address literal of the
//! configured family found in the body.

use crate::{build_client, fetch_capped};
use ddns_core::common::{Family, deserialize_opt_duration, parse_address};
use ddns_core::config::{SourceConfig, decode_options};
use ddns_core::resolver::ResolveContext;
use ddns_core::traits::{Source, SourceFactory};
use ddns_core::{Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;
use tracing::{debug, warn};

const SOURCE_TYPE: &str = "simple";

/// Bytes of the response body that are searched
const MAX_READ: usize = 4 * 1024;

const IPV4_RE: &str = r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b";

// Group 1 is a run of hex digits, colons and dots that contains a colon and
// does not continue a word (`IPv6:`, `v6` must not lend it a digit). Group 2
// is a trailing zone, captured so zoned addresses are rejected instead of
// truncated. Runs are validated by parsing in `v6_candidate`.
const IPV6_RE: &str = r"(?:^|[^0-9A-Za-z_.])([0-9A-Fa-f.]*:[0-9A-Fa-f:.]*)(%[0-9A-Za-z_.\-]+)?";

/// Settings decoded from the source record's `config` map
#[derive(Debug, Clone, Deserialize)]
pub struct SimpleOptions {
    /// Family to look for, required
    #[serde(rename = "type")]
    pub family: Family,
    /// Request timeout
    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub timeout: Option<Duration>,
}

/// Address source scanning an HTTP response body
pub struct SimpleSource {
    url: String,
    family: Family,
    timeout: Option<Duration>,
    pattern: Regex,
    client: reqwest::Client,
}

impl SimpleSource {
    /// Create a source fetching `url`
    pub fn new(url: impl Into<String>, options: SimpleOptions) -> Result<Self> {
        let pattern = match options.family {
            Family::V4 => IPV4_RE,
            Family::V6 => IPV6_RE,
        };
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::internal(format!("bad address pattern: {}", e)))?;

        Ok(Self {
            url: url.into(),
            family: options.family,
            timeout: options.timeout,
            pattern,
            client: build_client(Some(options.family), None)?,
        })
    }

    /// Find the first address of the configured family in `body`
    fn extract(&self, body: &[u8]) -> Result<IpAddr> {
        let text = String::from_utf8_lossy(body);

        let found = match self.family {
            Family::V4 => self
                .pattern
                .find_iter(&text)
                .map(|m| m.as_str())
                .find(|candidate| candidate.parse::<IpAddr>().is_ok())
                .map(str::to_string),
            Family::V6 => self.pattern.captures_iter(&text).find_map(|caps| v6_candidate(&caps)),
        };

        match found {
            Some(candidate) => parse_address(&candidate, Some(self.family), SOURCE_TYPE),
            None => {
                warn!(url = %self.url, body = %text, "no IP found in response");
                Err(Error::lookup(SOURCE_TYPE, "no IP found in response"))
            }
        }
    }
}

/// The address text of one IPv6 match, if the run holds an address
///
/// Separator colons or dots after the address (`2001:db8::1: ok`) are
/// dropped. A zone is kept only when it directly follows a valid address.
fn v6_candidate(caps: &regex::Captures<'_>) -> Option<String> {
    let run = caps.get(1)?.as_str();

    if run.parse::<Ipv6Addr>().is_ok() {
        let zone = caps.get(2).map_or("", |m| m.as_str());
        return Some(format!("{}{}", run, zone));
    }

    let trimmed = run.trim_end_matches([':', '.']);
    trimmed.parse::<Ipv6Addr>().is_ok().then(|| trimmed.to_string())
}

#[async_trait::async_trait]
impl Source for SimpleSource {
    async fn lookup(&self, _ctx: &mut ResolveContext<'_>) -> Result<IpAddr> {
        let body = fetch_capped(&self.client, &self.url, self.timeout, MAX_READ, SOURCE_TYPE).await?;
        let ip = self.extract(&body)?;
        debug!(url = %self.url, family = %self.family, ip = %ip, "got ip");
        Ok(ip)
    }

    fn type_name(&self) -> &'static str {
        SOURCE_TYPE
    }
}

/// Factory for the `simple` source type
pub struct SimpleFactory;

impl SourceFactory for SimpleFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn Source>> {
        let url = config.source.trim();
        if url.is_empty() {
            return Err(Error::config("simple source needs a URL"));
        }
        let options: SimpleOptions = decode_options(SOURCE_TYPE, &config.config)?;
        Ok(Box::new(SimpleSource::new(url, options)?))
    }
}
