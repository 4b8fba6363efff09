// # HTTP IP Sources
//
// This crate provides the HTTP-based address sources for the DDNS system.
//
// - `cf_trace`: Cloudflare's `/cdn-cgi/trace` endpoint, reading its `ip=` line
// - `simple`: any page whose body contains the address somewhere
//
// ## Architecture
//
// Each source owns a `reqwest::Client` built once at construction. When a
// family is configured the client binds to that family's unspecified
// address, so the request (and thus the address the far end sees) uses it.
// Optional per-source timeouts apply to the single request; a timeout is an
// ordinary lookup failure and the pipeline moves on to the next source.
//
// Response bodies are read only up to a small cap.

mod simple;
mod trace;

pub use simple::{SimpleFactory, SimpleOptions, SimpleSource};
pub use trace::{TraceFactory, TraceOptions, TraceSource};

use ddns_core::common::Family;
use ddns_core::{Error, Registry, Result};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tracing::{debug, warn};

/// Register the HTTP sources with a registry
pub fn register(registry: &mut Registry) {
    registry.register_source("cf_trace", Box::new(TraceFactory));
    registry.register_source("simple", Box::new(SimpleFactory));
}

/// Build the client used by one source
///
/// - `family`: pin outgoing connections to this family
/// - `force`: connect to this address whenever `host` is requested
fn build_client(family: Option<Family>, force: Option<(&str, IpAddr)>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();

    // test responders listen on loopback, keep them away from any proxy
    #[cfg(test)]
    {
        builder = builder.no_proxy();
    }

    if let Some(family) = family {
        let local: IpAddr = match family {
            Family::V4 => Ipv4Addr::UNSPECIFIED.into(),
            Family::V6 => Ipv6Addr::UNSPECIFIED.into(),
        };
        builder = builder.local_address(local);
    }

    if let Some((host, addr)) = force {
        // The port is ignored by reqwest; the URL's scheme decides it
        builder = builder.resolve(host, SocketAddr::new(addr, 443));
    }

    builder
        .build()
        .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))
}

/// Fetch `url` and return at most `cap` bytes of the body
async fn fetch_capped(
    client: &reqwest::Client,
    url: &str,
    timeout: Option<Duration>,
    cap: usize,
    source_type: &'static str,
) -> Result<Vec<u8>> {
    let mut request = client.get(url);
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }

    let mut response = request.send().await.map_err(|e| {
        warn!(url, error = %e, "connection failed");
        Error::lookup(source_type, format!("connection failed: {}", e))
    })?;

    if !response.status().is_success() {
        warn!(url, status = %response.status(), "unexpected HTTP status");
        return Err(Error::lookup(
            source_type,
            format!("HTTP error: {}", response.status()),
        ));
    }

    let mut body = Vec::with_capacity(cap.min(1024));
    while body.len() < cap {
        let chunk = response.chunk().await.map_err(|e| {
            warn!(url, error = %e, "receiving response failed");
            Error::lookup(source_type, format!("failed receiving response: {}", e))
        })?;

        match chunk {
            Some(chunk) => {
                let take = chunk.len().min(cap - body.len());
                body.extend_from_slice(&chunk[..take]);
            }
            None => break,
        }
    }

    debug!(url, bytes = body.len(), "received response");
    Ok(body)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Throw-away HTTP/1.1 responder for source tests

    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `body` with `status` to every connection; returns the bound address
    pub async fn serve(status: &'static str, body: String) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let body = body.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let _ = stream.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        addr
    }

    /// Accept connections but never answer
    pub async fn serve_silence() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        addr
    }
}
