mod bench;
mod cli;
mod dns;
mod domains;
mod error;
mod logging;
mod output;
mod query;
mod resolver;
mod stats;
mod transport;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;

use crate::bench::Progress;
use crate::cli::Cli;
use crate::transport::BenchmarkConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let resolvers = match &cli.resolver_file {
		Some(path) => resolver::read_resolver_file(path)?,
		None => resolver::default_resolvers(),
	};
	resolver::validate_catalog(&resolvers)?;

	let domains = if let Some(path) = &cli.domain_file {
		domains::read_domain_file(path)?
	} else if let Some(list) = &cli.domains {
		domains::parse_domain_list(list)
	} else {
		domains::default_domains()
	};
	if domains.is_empty() {
		bail!("no test domains given");
	}

	let config = BenchmarkConfig {
		repeats: cli.queries,
		timeout: Duration::from_millis(cli.timeout),
		max_inflight: cli.concurrency as usize,
	};

	output::print_config_summary(&resolvers, &domains, &config);

	// Progress line is cosmetic, the benchmark does not depend on it
	let progress = Arc::new(Progress::default());
	let ticker = {
		let progress = progress.clone();
		tokio::spawn(async move {
			let mut interval = tokio::time::interval(Duration::from_millis(200));
			loop {
				interval.tick().await;
				print!("\rRunning queries: {}/{}", progress.completed(), progress.total());
				let _ = std::io::stdout().flush();
			}
		})
	};

	let results = bench::benchmark(&resolvers, &domains, &config, progress.clone()).await;
	ticker.abort();
	println!("\rRunning queries: {}/{}", progress.completed(), progress.total());
	let results = results?;

	output::print_results_table(&results);
	output::print_recommendations(&results);

	if let Some(path) = &cli.output {
		output::write_csv(path, &results)?;
	}

	Ok(())
}
