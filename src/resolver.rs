use std::collections::HashSet;

use anyhow::{anyhow, bail, Result};

use crate::transport::{Protocol, Resolver};

/// Parse one catalog line of the form `name,protocol,address`.
///
/// Examples:
///   "Google 1 (UDP),udp,8.8.8.8"
///   "Quad9 (DoT),dot,dns.quad9.net"
///   "Google (DoH),doh,https://dns.google/resolve"
pub fn parse_resolver(input: &str) -> Result<Resolver> {
	let mut parts = input.splitn(3, ',').map(str::trim);
	let (name, protocol, address) = match (parts.next(), parts.next(), parts.next()) {
		(Some(n), Some(p), Some(a)) => (n, p, a),
		_ => bail!("expected 'name,protocol,address', got '{}'", input.trim()),
	};
	if name.is_empty() {
		bail!("empty resolver name in '{}'", input.trim());
	}
	if address.is_empty() {
		bail!("empty resolver address in '{}'", input.trim());
	}
	// Unknown tags become Protocol::Unsupported
	let protocol = protocol.parse::<Protocol>().unwrap_or_else(|never| match never {});

	Ok(Resolver::new(name, address, protocol))
}

/// Read a resolver catalog from a file, one entry per line.
///
/// Blank lines and lines starting with '#' are skipped.
pub fn read_resolver_file(path: &str) -> Result<Vec<Resolver>> {
	let content = std::fs::read_to_string(path)
		.map_err(|e| anyhow!("failed to read resolver file '{}': {}", path, e))?;
	let mut resolvers = Vec::new();
	for (lineno, line) in content.lines().enumerate() {
		let trimmed = line.trim();
		if trimmed.is_empty() || trimmed.starts_with('#') {
			continue;
		}
		let resolver = parse_resolver(trimmed)
			.map_err(|e| anyhow!("{}:{}: {}", path, lineno + 1, e))?;
		resolvers.push(resolver);
	}
	Ok(resolvers)
}

/// Check a catalog before benchmarking.
///
/// Duplicate names would merge statistics of different resolvers, so they
/// are rejected. Unsupported protocols are only warned about; their
/// attempts fail individually.
pub fn validate_catalog(resolvers: &[Resolver]) -> Result<()> {
	if resolvers.is_empty() {
		bail!("resolver catalog is empty");
	}
	let mut seen = HashSet::new();
	for r in resolvers {
		if !seen.insert(r.name.as_str()) {
			bail!("duplicate resolver name '{}'", r.name);
		}
		if let Protocol::Unsupported(tag) = &r.protocol {
			tracing::warn!(resolver = %r.name, protocol = %tag, "unsupported protocol, all attempts will fail");
		}
	}
	Ok(())
}

/// Return the built-in resolver catalog.
pub fn default_resolvers() -> Vec<Resolver> {
	let udp = [
		("AliDNS 1 (UDP)", "223.5.5.5"),
		("AliDNS 2 (UDP)", "223.6.6.6"),
		("BaiduDNS (UDP)", "180.76.76.76"),
		("DNSPod 1 (UDP)", "119.28.28.28"),
		("DNSPod 2 (UDP)", "119.29.29.29"),
		("114DNS 1 (UDP)", "114.114.114.114"),
		("114DNS 2 (UDP)", "114.114.115.115"),
		("114DNS Safe 1 (UDP)", "114.114.114.119"),
		("114DNS Safe 2 (UDP)", "114.114.115.119"),
		("114DNS Family 1 (UDP)", "114.114.114.110"),
		("114DNS Family 2 (UDP)", "114.114.115.110"),
		("Bytedance 1 (UDP)", "180.184.1.1"),
		("Bytedance 2 (UDP)", "180.184.2.2"),
		("Google 1 (UDP)", "8.8.8.8"),
		("Google 2 (UDP)", "8.8.4.4"),
		("Cloudflare 1 (UDP)", "1.1.1.1"),
		("Cloudflare 2 (UDP)", "1.0.0.1"),
		("Freenom 1 (UDP)", "80.80.80.80"),
		("Freenom 2 (UDP)", "80.80.81.81"),
	];
	let dot = [
		("AliDNS (DoT)", "dns.alidns.com"),
		("DNSPod (DoT)", "dot.pub"),
		("Google (DoT)", "dns.google"),
		("Cloudflare 1 (DoT)", "1.1.1.1"),
		("Cloudflare 2 (DoT)", "one.one.one.one"),
	];
	let doh = [
		("AliDNS 1 (DoH)", "https://dns.alidns.com/dns-query"),
		("AliDNS 2 (DoH)", "https://223.5.5.5/dns-query"),
		("AliDNS 3 (DoH)", "https://223.6.6.6/dns-query"),
		("DNSPod (DoH)", "https://doh.pub/dns-query"),
		("Cloudflare 1 (DoH)", "https://cloudflare-dns.com/dns-query"),
		("Cloudflare 2 (DoH)", "https://1.1.1.1/dns-query"),
		("Cloudflare 3 (DoH)", "https://1.0.0.1/dns-query"),
		("Google (DoH)", "https://dns.google/resolve"),
	];

	udp.iter().map(|(n, a)| Resolver::new(n, a, Protocol::Udp))
		.chain(dot.iter().map(|(n, a)| Resolver::new(n, a, Protocol::Dot)))
		.chain(doh.iter().map(|(n, a)| Resolver::new(n, a, Protocol::Doh)))
		.collect()
}
