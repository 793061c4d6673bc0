use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::QueryError;

/// Default per-attempt timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Transport used to reach a resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protocol {
	/// Plain DNS over UDP, port 53
	Udp,
	/// DNS-over-TLS, port 853
	Dot,
	/// DNS-over-HTTPS with a JSON response
	Doh,
	/// A tag read from configuration that no executor understands
	Unsupported(String),
}

impl FromStr for Protocol {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let tag = s.trim();
		Ok(match tag.to_ascii_lowercase().as_str() {
			"udp" => Protocol::Udp,
			"dot" => Protocol::Dot,
			"doh" => Protocol::Doh,
			_ => Protocol::Unsupported(tag.to_string()),
		})
	}
}

impl fmt::Display for Protocol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Protocol::Udp => f.write_str("UDP"),
			Protocol::Dot => f.write_str("DoT"),
			Protocol::Doh => f.write_str("DoH"),
			Protocol::Unsupported(tag) => write!(f, "{} (unsupported)", tag),
		}
	}
}

/// A resolver entry in the benchmark catalog.
///
/// `name` identifies the resolver during aggregation, so it must be
/// unique within a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolver {
	pub name: String,
	/// IP or host name for UDP/DoT (optionally with a port), URL for DoH
	pub address: String,
	pub protocol: Protocol,
}

impl Resolver {
	pub fn new(name: &str, address: &str, protocol: Protocol) -> Self {
		Resolver {
			name: name.to_string(),
			address: address.to_string(),
			protocol,
		}
	}
}

/// Result of a single resolution attempt
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct QueryOutcome {
	pub resolver: String,
	pub address: String,
	pub domain: String,
	pub duration: Duration,
	pub error: Option<QueryError>,
}

impl QueryOutcome {
	pub fn new(
		resolver: &Resolver,
		domain: &str,
		duration: Duration,
		error: Option<QueryError>,
	) -> Self {
		QueryOutcome {
			resolver: resolver.name.clone(),
			address: resolver.address.clone(),
			domain: domain.to_string(),
			duration,
			error,
		}
	}

	pub fn is_success(&self) -> bool {
		self.error.is_none()
	}
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
	/// Attempts per (resolver, domain) pair
	pub repeats: u32,
	pub timeout: Duration,
	/// Upper bound on attempts in flight at once, at least 1
	pub max_inflight: usize,
}

impl Default for BenchmarkConfig {
	fn default() -> Self {
		BenchmarkConfig {
			repeats: 3,
			timeout: DEFAULT_TIMEOUT,
			max_inflight: 64,
		}
	}
}
