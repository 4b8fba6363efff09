// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare DNS provider implementation for the DDNS system.
//
// ## Behavior
//
// - Zone IDs are looked up once, on first use, from the configured zone names
// - Records are found by type, name and ownership mark (stored as the record
//   comment), so records created by hand are never touched
// - A record with a handle is updated in place (PUT), one without is created (POST)
// - One HTTP request per call, no retries: the next scheduled pass retries
// - Dry-run mode performs lookups but only logs intended writes
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Provider MUST fail fast if token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=...&name=...&comment=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use ddns_core::config::ProviderConfig;
use ddns_core::traits::{DnsProvider, DnsProviderFactory, Record, RecordHandle};
use ddns_core::{Error, Registry, Result};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle ID echoed for records that a dry run would have created
const DRY_RUN_RECORD_ID: &str = "dry-run";

/// A zone this provider may write to
#[derive(Debug, Clone, PartialEq, Eq)]
struct Zone {
    name: String,
    id: String,
}

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record lookup)
/// - Log the intended POST/PUT payload
/// - **NOT** actually modify DNS records
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Names of the zones records may live in
    zone_names: Vec<String>,

    /// Zone IDs, resolved on first use
    zones: OnceCell<Vec<Zone>>,

    /// TTL for written records (1 = automatic)
    ttl: u32,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone_names", &self.zone_names)
            .field("ttl", &self.ttl)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_names`: Zones that published records belong to
    /// - `ttl`: TTL for written records (1 = automatic)
    /// - `dry_run`: If true, perform GET requests but skip writes
    pub fn new(
        api_token: impl Into<String>,
        zone_names: Vec<String>,
        ttl: u32,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            zone_names,
            zones: OnceCell::new(),
            ttl,
            client,
            dry_run,
        })
    }

    /// Resolve every configured zone name to its ID, once
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn zones(&self) -> Result<&[Zone]> {
        let zones = self
            .zones
            .get_or_try_init(|| async {
                let mut zones = Vec::with_capacity(self.zone_names.len());

                for name in &self.zone_names {
                    tracing::debug!("Looking up zone ID for zone: {}", name);

                    let url = format!("{}/zones", CLOUDFLARE_API_BASE);
                    let request = self.client.get(&url).query(&[("name", name.as_str())]);
                    let json = self.send(request, "Zone lookup").await?;

                    let id = json["result"]
                        .as_array()
                        .and_then(|zones| zones.first())
                        .and_then(|zone| zone["id"].as_str())
                        .ok_or_else(|| Error::not_found(format!("Zone not found: {}", name)))?;

                    tracing::debug!("Found zone ID for {}: {}", name, id);
                    zones.push(Zone {
                        name: name.clone(),
                        id: id.to_string(),
                    });
                }

                Ok::<_, Error>(zones)
            })
            .await?;

        Ok(zones.as_slice())
    }

    /// Send an authenticated request and return the decoded JSON body
    async fn send(&self, request: reqwest::RequestBuilder, action: &str) -> Result<Value> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(map_status(status.as_u16(), action, &error_text));
        }

        response
            .json()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("Failed to parse response: {}", e)))
    }

    /// Log the request a live run would send and echo the record back
    fn dry_run_write(&self, record: &Record, zone_id: &str, method: &str) -> Record {
        tracing::info!(
            "[DRY-RUN] Would send {} for {} {} with payload: {}",
            method,
            record.record_type,
            record.domain,
            record_payload(record, self.ttl)
        );

        let mut echoed = record.clone();
        if echoed.handle.is_none() {
            echoed.handle = Some(RecordHandle::Cloudflare {
                id: DRY_RUN_RECORD_ID.to_string(),
                zone_id: zone_id.to_string(),
            });
        }
        echoed
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// Find owned records
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A&name=home.example.com&comment=ddns-home
    /// ```
    async fn find_records(&self, query: &Record) -> Result<Vec<Record>> {
        let zone = zone_for(self.zones().await?, &query.domain)?;

        tracing::debug!(
            "Looking up records: {} (type: {}, mark: {})",
            query.domain,
            query.record_type,
            query.mark
        );

        let url = format!("{}/zones/{}/dns_records", CLOUDFLARE_API_BASE, zone.id);
        let request = self.client.get(&url).query(&[
            ("type", query.record_type.as_str()),
            ("name", query.domain.as_str()),
            ("comment", query.mark.as_str()),
        ]);
        let json = self.send(request, "Record lookup").await?;

        if json["result_info"]["total_pages"].as_u64().unwrap_or(1) > 1 {
            tracing::warn!(
                "Record lookup for {} returned more than one page, only the first is used",
                query.domain
            );
        }

        parse_records(&json, &zone.id)
    }

    /// Create or update a record
    ///
    /// # API Calls
    ///
    /// ```http
    /// # Update (record has a handle)
    /// PUT /zones/:zone_id/dns_records/:record_id
    ///
    /// # Create
    /// POST /zones/:zone_id/dns_records
    /// {
    ///   "type": "A",
    ///   "name": "home.example.com",
    ///   "content": "1.2.3.4",
    ///   "ttl": 1,
    ///   "proxied": false,
    ///   "comment": "ddns-home"
    /// }
    /// ```
    async fn write_record(&self, record: &Record) -> Result<Record> {
        let payload = record_payload(record, self.ttl);

        let (request, zone_id, method) = match &record.handle {
            Some(RecordHandle::Cloudflare { id, zone_id }) => {
                let url = format!("{}/zones/{}/dns_records/{}", CLOUDFLARE_API_BASE, zone_id, id);
                (self.client.put(&url), zone_id.clone(), "PUT")
            }
            None => {
                let zone = zone_for(self.zones().await?, &record.domain)?;
                let url = format!("{}/zones/{}/dns_records", CLOUDFLARE_API_BASE, zone.id);
                (self.client.post(&url), zone.id.clone(), "POST")
            }
        };

        if self.dry_run {
            return Ok(self.dry_run_write(record, &zone_id, method));
        }

        tracing::info!(
            "{} DNS record: {} {} -> {}",
            if method == "PUT" { "Updating" } else { "Creating" },
            record.record_type,
            record.domain,
            record.content
        );

        let json = self.send(request.json(&payload), "Record write").await?;
        parse_record(&json["result"], &zone_id)
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Map a failed HTTP status to an error
fn map_status(status: u16, action: &str, error_text: &str) -> Error {
    match status {
        401 | 403 => Error::provider(
            "cloudflare",
            format!(
                "Authentication failed: Invalid API token or insufficient permissions. Status: {}",
                status
            ),
        ),
        404 => Error::not_found(format!("{} failed: not found - {}", action, error_text)),
        409 => Error::provider(
            "cloudflare",
            format!(
                "Conflict: Record is being updated by another process. Status: {}",
                status
            ),
        ),
        429 => Error::provider(
            "cloudflare",
            format!("Rate limit exceeded. Please retry later. Status: {}", status),
        ),
        500..=599 => Error::provider(
            "cloudflare",
            format!("Cloudflare server error (transient): {} - {}", status, error_text),
        ),
        _ => Error::provider(
            "cloudflare",
            format!("{} failed: {} - {}", action, status, error_text),
        ),
    }
}

/// Pick the zone a domain belongs to: the first zone whose name is a suffix
fn zone_for<'z>(zones: &'z [Zone], domain: &str) -> Result<&'z Zone> {
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();

    zones
        .iter()
        .find(|zone| {
            let name = zone.name.trim_end_matches('.').to_ascii_lowercase();
            domain == name || domain.ends_with(&format!(".{}", name))
        })
        .ok_or_else(|| Error::config(format!("No configured zone contains {}", domain)))
}

/// JSON body for creating or updating a record
fn record_payload(record: &Record, ttl: u32) -> Value {
    serde_json::json!({
        "type": record.record_type,
        "name": record.domain,
        "content": record.content,
        "ttl": ttl,
        "proxied": false,
        "comment": record.mark,
    })
}

/// Parse the `result` array of a record listing
fn parse_records(json: &Value, zone_id: &str) -> Result<Vec<Record>> {
    json["result"]
        .as_array()
        .ok_or_else(|| {
            Error::provider(
                "cloudflare",
                "Invalid response format: result is not an array",
            )
        })?
        .iter()
        .map(|record| parse_record(record, zone_id))
        .collect()
}

/// Parse one record object
fn parse_record(record: &Value, zone_id: &str) -> Result<Record> {
    let field = |name: &str| -> Result<String> {
        record[name].as_str().map(str::to_string).ok_or_else(|| {
            Error::provider(
                "cloudflare",
                format!("Invalid response format: record.{} is not a string", name),
            )
        })
    };

    Ok(Record {
        handle: Some(RecordHandle::Cloudflare {
            id: field("id")?,
            zone_id: zone_id.to_string(),
        }),
        domain: field("name")?,
        record_type: field("type")?,
        content: field("content")?,
        mark: record["comment"].as_str().unwrap_or_default().to_string(),
    })
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                zone_names,
                ttl,
                dry_run,
            } => {
                if zone_names.is_empty() {
                    return Err(Error::config("Cloudflare zone_names cannot be empty"));
                }

                if *dry_run {
                    tracing::warn!(
                        "Cloudflare provider running in DRY-RUN mode - no changes will be made"
                    );
                }

                Ok(Box::new(CloudflareProvider::new(
                    api_token.clone(),
                    zone_names.clone(),
                    *ttl,
                    *dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use ddns_core::Registry;
///
/// let mut registry = Registry::new();
/// ddns_provider_cloudflare::register(&mut registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &mut Registry) {
    registry.register_provider("cloudflare", Box::new(CloudflareFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(api_token: &str, zone_names: &[&str]) -> ProviderConfig {
        ProviderConfig::Cloudflare {
            api_token: api_token.to_string(),
            zone_names: zone_names.iter().map(|z| z.to_string()).collect(),
            ttl: 1,
            dry_run: false,
        }
    }

    fn zones() -> Vec<Zone> {
        vec![
            Zone {
                name: "example.com".to_string(),
                id: "zone-a".to_string(),
            },
            Zone {
                name: "example.net".to_string(),
                id: "zone-b".to_string(),
            },
        ]
    }

    #[test]
    fn test_factory_creation() {
        let provider = CloudflareFactory.create(&config("test_token", &["example.com"]));
        assert!(provider.is_ok());
    }

    #[test]
    fn test_factory_missing_token() {
        assert!(matches!(
            CloudflareFactory.create(&config("", &["example.com"])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            CloudflareFactory.create(&config("token", &[])),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let provider =
            CloudflareProvider::new("secret_token_12345", vec!["example.com".into()], 1, false)
                .unwrap();

        let debug_str = format!("{:?}", provider);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("CloudflareProvider"));
        assert!(debug_str.contains("example.com"));
    }

    #[test]
    fn test_zone_for_matches_suffix() {
        let zones = zones();

        assert_eq!(zone_for(&zones, "home.example.com").unwrap().id, "zone-a");
        assert_eq!(zone_for(&zones, "example.net").unwrap().id, "zone-b");
        assert_eq!(zone_for(&zones, "A.Deep.Example.NET.").unwrap().id, "zone-b");
        assert!(zone_for(&zones, "badexample.com").is_err());
        assert!(zone_for(&zones, "example.org").is_err());
    }

    #[test]
    fn test_parse_records() {
        let body = json!({
            "success": true,
            "result": [{
                "id": "rec-1",
                "name": "home.example.com",
                "type": "A",
                "content": "203.0.113.7",
                "comment": "ddns-home",
                "ttl": 1,
                "proxied": false
            }],
            "result_info": { "page": 1, "total_pages": 1 }
        });

        let records = parse_records(&body, "zone-a").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].handle,
            Some(RecordHandle::Cloudflare {
                id: "rec-1".to_string(),
                zone_id: "zone-a".to_string()
            })
        );
        assert_eq!(records[0].content, "203.0.113.7");
        assert_eq!(records[0].mark, "ddns-home");

        assert!(parse_records(&json!({ "result": [] }), "zone-a").unwrap().is_empty());
        assert!(parse_records(&json!({ "result": null }), "zone-a").is_err());
        assert!(parse_records(&json!({ "result": [{ "id": 5 }] }), "zone-a").is_err());
    }

    #[test]
    fn test_record_payload() {
        let mut record = Record::new("home.example.com", "AAAA", "ddns-home");
        record.content = "2001:db8::7".to_string();

        assert_eq!(
            record_payload(&record, 300),
            json!({
                "type": "AAAA",
                "name": "home.example.com",
                "content": "2001:db8::7",
                "ttl": 300,
                "proxied": false,
                "comment": "ddns-home"
            })
        );
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(map_status(403, "Record lookup", ""), Error::Provider { .. }));
        assert!(matches!(map_status(404, "Zone lookup", ""), Error::NotFound(_)));
        assert!(map_status(409, "Record write", "").to_string().contains("Conflict"));
        assert!(map_status(429, "Record write", "").to_string().contains("Rate limit"));
        assert!(map_status(502, "Record write", "bad gateway").to_string().contains("transient"));
    }

    #[tokio::test]
    async fn test_dry_run_update_skips_request() {
        let provider =
            CloudflareProvider::new("token", vec!["example.com".into()], 1, true).unwrap();

        let mut record = Record::new("home.example.com", "A", "ddns");
        record.handle = Some(RecordHandle::Cloudflare {
            id: "rec-1".to_string(),
            zone_id: "zone-a".to_string(),
        });
        record.content = "203.0.113.8".to_string();

        // A handle means no zone lookup is needed, so no request is made at all
        let written = provider.write_record(&record).await.unwrap();
        assert_eq!(written, record);
    }

    #[test]
    fn test_dry_run_create_echoes_handle() {
        let provider =
            CloudflareProvider::new("token", vec!["example.com".into()], 1, true).unwrap();

        let record = Record::new("home.example.com", "A", "ddns");
        let echoed = provider.dry_run_write(&record, "zone-a", "POST");
        assert_eq!(
            echoed.handle,
            Some(RecordHandle::Cloudflare {
                id: DRY_RUN_RECORD_ID.to_string(),
                zone_id: "zone-a".to_string()
            })
        );
    }
}
