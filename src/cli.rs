use clap::Parser;

/// DNS resolver optimizer
#[derive(Parser, Debug)]
#[command(name = "dns-optimizer")]
#[command(about = "Benchmark DNS resolvers over UDP, DoT, and DoH and recommend the best ones")]
pub struct Cli {
	/// Comma-separated list of domains to query (default: built-in list)
	#[arg(short = 'd', long = "domains")]
	pub domains: Option<String>,

	/// File containing domains to query (one per line)
	#[arg(long = "domain-file", conflicts_with = "domains")]
	pub domain_file: Option<String>,

	/// Number of queries per domain and resolver
	#[arg(short = 'q', long = "queries", default_value = "3")]
	pub queries: u32,

	/// File with resolvers, one 'name,protocol,address' per line (replaces the built-in list)
	#[arg(short = 'f', long = "resolver-file")]
	pub resolver_file: Option<String>,

	/// Query timeout in milliseconds
	#[arg(short = 't', long = "timeout", default_value = "2000")]
	pub timeout: u64,

	/// Maximum concurrent in-flight queries
	#[arg(
		short = 'c',
		long = "concurrency",
		default_value = "64",
		value_parser = clap::value_parser!(u32).range(1..),
	)]
	pub concurrency: u32,

	/// Output CSV file path
	#[arg(short = 'o', long = "output")]
	pub output: Option<String>,

	/// Enable debug logging (RUST_LOG takes precedence)
	#[arg(short = 'v', long = "verbose")]
	pub verbose: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let cli = Cli::try_parse_from(["dns-optimizer"]).unwrap();
		assert_eq!(cli.queries, 3);
		assert_eq!(cli.timeout, 2000);
		assert_eq!(cli.concurrency, 64);
		assert!(cli.domains.is_none());
		assert!(!cli.verbose);
	}

	#[test]
	fn test_overrides() {
		let cli = Cli::try_parse_from([
			"dns-optimizer", "-d", "a.com,b.com", "-q", "5", "-c", "8", "-o", "out.csv",
		]).unwrap();
		assert_eq!(cli.domains.as_deref(), Some("a.com,b.com"));
		assert_eq!(cli.queries, 5);
		assert_eq!(cli.concurrency, 8);
		assert_eq!(cli.output.as_deref(), Some("out.csv"));
	}

	#[test]
	fn test_rejects_bad_input() {
		assert!(Cli::try_parse_from(["dns-optimizer", "-q", "many"]).is_err());
		assert!(Cli::try_parse_from(["dns-optimizer", "-c", "0"]).is_err());
		assert!(Cli::try_parse_from(["dns-optimizer", "-d", "a.com", "--domain-file", "x"]).is_err());
	}
}
