use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tokio_rustls::TlsConnector;

use crate::dns::{build_query, parse_response};
use crate::error::QueryError;
use crate::transport::{Protocol, QueryOutcome, Resolver};

const UDP_PORT: u16 = 53;
const DOT_PORT: u16 = 853;

/// Performs one resolution attempt against one resolver.
///
/// Implementations measure the attempt themselves and never retry:
/// one call is one observed attempt.
pub trait Executor: Send + Sync + 'static {
	fn execute(
		&self,
		resolver: &Resolver,
		domain: &str,
	) -> impl Future<Output = QueryOutcome> + Send;
}

/// Executor that talks to real resolvers over UDP, DoT, and DoH.
pub struct NetworkExecutor {
	timeout: Duration,
	tls: TlsConnector,
	http: reqwest::Client,
}

impl NetworkExecutor {
	pub fn new(timeout: Duration) -> Result<Self> {
		let roots = rustls::RootCertStore {
			roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
		};
		let provider = Arc::new(rustls::crypto::ring::default_provider());
		let tls_config = rustls::ClientConfig::builder_with_provider(provider)
			.with_safe_default_protocol_versions()
			.map_err(|e| anyhow!("failed to configure TLS: {}", e))?
			.with_root_certificates(roots)
			.with_no_client_auth();

		let http = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| anyhow!("failed to build HTTP client: {}", e))?;

		Ok(NetworkExecutor {
			timeout,
			tls: TlsConnector::from(Arc::new(tls_config)),
			http,
		})
	}

	async fn attempt(&self, resolver: &Resolver, domain: &str) -> Result<(), QueryError> {
		match &resolver.protocol {
			Protocol::Udp => self.query_udp(&resolver.address, domain).await,
			Protocol::Dot => self.query_dot(&resolver.address, domain).await,
			Protocol::Doh => self.query_doh(&resolver.address, domain).await,
			Protocol::Unsupported(tag) => Err(QueryError::UnsupportedProtocol(tag.clone())),
		}
	}

	/// Send an A query over a dedicated UDP socket.
	///
	/// Each attempt binds its own socket so concurrent attempts against the
	/// same resolver cannot steal each other's responses.
	async fn query_udp(&self, address: &str, domain: &str) -> Result<(), QueryError> {
		let target = resolve_endpoint(address, UDP_PORT).await?;
		let bind_addr = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
		let socket = UdpSocket::bind(bind_addr).await
			.map_err(|e| QueryError::Connect(e.to_string()))?;
		socket.connect(target).await
			.map_err(|e| QueryError::Connect(e.to_string()))?;

		let txid: u16 = rand::random();
		let query_bytes = build_query(domain, txid)?;
		socket.send(&query_bytes).await
			.map_err(|e| QueryError::Connect(e.to_string()))?;

		// Use 4096-byte buffer to handle EDNS-extended responses
		let mut buf = vec![0u8; 4096];
		loop {
			let len = socket.recv(&mut buf).await
				.map_err(|e| QueryError::Connect(e.to_string()))?;
			match parse_response(&buf[..len], txid) {
				Ok(response) => return response.check(),
				// Stray or garbled datagram, keep listening until the deadline
				Err(_) => continue,
			}
		}
	}

	/// Send an A query over a fresh TLS connection (RFC 7858 framing).
	async fn query_dot(&self, address: &str, domain: &str) -> Result<(), QueryError> {
		let target = resolve_endpoint(address, DOT_PORT).await?;
		let server_name = ServerName::try_from(tls_host(address).to_string())
			.map_err(|e| QueryError::Handshake(format!("invalid server name '{}': {}", address, e)))?;

		let tcp = TcpStream::connect(target).await
			.map_err(|e| QueryError::Connect(e.to_string()))?;
		let mut stream = self.tls.connect(server_name, tcp).await
			.map_err(|e| QueryError::Handshake(e.to_string()))?;

		let txid: u16 = rand::random();
		let query_bytes = build_query(domain, txid)?;
		let len = u16::try_from(query_bytes.len())
			.map_err(|_| QueryError::Malformed("query too large".to_string()))?;

		let mut framed = Vec::with_capacity(query_bytes.len() + 2);
		framed.extend_from_slice(&len.to_be_bytes());
		framed.extend_from_slice(&query_bytes);
		stream.write_all(&framed).await
			.map_err(|e| QueryError::Connect(e.to_string()))?;
		stream.flush().await
			.map_err(|e| QueryError::Connect(e.to_string()))?;

		let response_len = stream.read_u16().await
			.map_err(|e| QueryError::Connect(e.to_string()))?;
		let mut buf = vec![0u8; response_len as usize];
		stream.read_exact(&mut buf).await
			.map_err(|e| QueryError::Connect(e.to_string()))?;

		parse_response(&buf, txid)?.check()
	}

	/// Issue a JSON-format DoH GET; only the status code is judged.
	async fn query_doh(&self, url: &str, domain: &str) -> Result<(), QueryError> {
		let response = self.http.get(url)
			.query(&[("name", domain), ("type", "A")])
			.header(ACCEPT, "application/dns-json")
			.send()
			.await
			.map_err(|e| {
				if e.is_timeout() {
					QueryError::Timeout
				} else if e.is_connect() {
					QueryError::Connect(e.to_string())
				} else {
					QueryError::Http(e.to_string())
				}
			})?;

		let status = response.status();
		if status != StatusCode::OK {
			return Err(QueryError::HttpStatus(status.as_u16()));
		}
		Ok(())
	}
}

impl Executor for NetworkExecutor {
	fn execute(
		&self,
		resolver: &Resolver,
		domain: &str,
	) -> impl Future<Output = QueryOutcome> + Send {
		async move {
			// Timer covers connection setup as well as the lookup itself
			let start = Instant::now();
			let result = match tokio::time::timeout(self.timeout, self.attempt(resolver, domain)).await {
				Ok(result) => result,
				Err(_) => Err(QueryError::Timeout),
			};
			let duration = start.elapsed();

			if let Err(e) = &result {
				tracing::debug!(resolver = %resolver.name, domain, error = %e, "query failed");
			}
			QueryOutcome::new(resolver, domain, duration, result.err())
		}
	}
}

/// Resolve a resolver address into a socket address.
///
/// Accepts "1.1.1.1", "1.1.1.1:5353", "2606:4700::1111",
/// "[2606:4700::1111]:53" and host names such as "dns.google".
async fn resolve_endpoint(address: &str, default_port: u16) -> Result<SocketAddr, QueryError> {
	let trimmed = address.trim();
	if let Ok(addr) = trimmed.parse::<SocketAddr>() {
		return Ok(addr);
	}
	let host = trimmed.trim_start_matches('[').trim_end_matches(']');
	let mut addrs = lookup_host((host, default_port)).await
		.map_err(|e| QueryError::Connect(format!("cannot resolve '{}': {}", host, e)))?;
	addrs.next()
		.ok_or_else(|| QueryError::Connect(format!("no address for '{}'", host)))
}

/// Host part of a DoT address, used as the TLS server name.
fn tls_host(address: &str) -> &str {
	let trimmed = address.trim();
	if let Ok(addr) = trimmed.parse::<SocketAddr>() {
		// Strip the port but keep the literal IP for certificate matching
		let end = if addr.is_ipv6() {
			trimmed.rfind(']').unwrap_or(trimmed.len())
		} else {
			trimmed.rfind(':').unwrap_or(trimmed.len())
		};
		return trimmed[..end].trim_start_matches('[');
	}
	trimmed.trim_start_matches('[').trim_end_matches(']')
}
