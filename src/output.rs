use std::time::Duration;

use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use anyhow::Result;

use crate::stats::{recommend, RankedResult};
use crate::transport::{BenchmarkConfig, Resolver};

/// Print a summary of the benchmark configuration before running.
pub fn print_config_summary(resolvers: &[Resolver], domains: &[String], config: &BenchmarkConfig) {
	let total = resolvers.len() * domains.len() * config.repeats as usize;
	println!("DNS Optimizer Configuration");
	println!("===========================");
	println!("Resolvers:      {}", resolvers.len());
	for r in resolvers {
		println!("  - {} [{}] {}", r.name, r.protocol, r.address);
	}
	println!("Domains ({}):   {}", domains.len(), domains.join(", "));
	println!("Queries/domain: {}", config.repeats);
	println!("Total queries:  {}", total);
	println!("Timeout:        {} ms", config.timeout.as_millis());
	println!("Concurrency:    {}", config.max_inflight);
	println!();
}

/// Format a latency in milliseconds, or "-" when nothing succeeded.
pub fn format_latency(latency: Option<Duration>) -> String {
	match latency {
		Some(d) => format!("{:.3} ms", d.as_secs_f64() * 1000.0),
		None => "-".to_string(),
	}
}

/// Format a success rate as "97.5% (39/40)".
pub fn format_success(r: &RankedResult) -> String {
	format!("{:.1}% ({}/{})", r.success_rate * 100.0, r.successes, r.total)
}

/// Print the benchmark results as a formatted table.
pub fn print_results_table(results: &[RankedResult]) {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(vec![
		"Rank", "Resolver", "Address", "Avg Latency", "Success", "Score",
	]);

	for r in results {
		let rate_color = if r.success_rate < 1.0 { Color::Red } else { Color::Green };
		table.add_row(vec![
			Cell::new(r.rank),
			Cell::new(&r.name),
			Cell::new(&r.address),
			Cell::new(format_latency(r.avg_latency)),
			Cell::new(format_success(r)).fg(rate_color),
			Cell::new(format!("{:.2}", r.score)),
		]);
	}

	println!("\nBenchmark Results");
	println!("=================\n");
	println!("{table}");
}

/// Print the top recommendations, or a warning when none qualify.
pub fn print_recommendations(results: &[RankedResult]) {
	println!("\nRecommended Resolvers (Top 3)");
	println!("=============================\n");

	let picks = recommend(results);
	if picks.is_empty() {
		println!("No sufficiently reliable resolver found, check your network connection.");
		return;
	}
	for r in picks {
		println!("#{}: {} ({})", r.rank, r.name, r.address);
		println!(
			"    score: {:.2}, avg latency: {}, success rate: {:.1}%",
			r.score, format_latency(r.avg_latency), r.success_rate * 100.0,
		);
	}
}

/// Write benchmark results to a CSV file.
pub fn write_csv(path: &str, results: &[RankedResult]) -> Result<()> {
	let mut writer = csv::Writer::from_path(path)?;
	write_records(&mut writer, results)?;
	writer.flush()?;
	println!("\nResults written to: {}", path);
	Ok(())
}

fn write_records<W: std::io::Write>(writer: &mut csv::Writer<W>, results: &[RankedResult]) -> Result<()> {
	writer.write_record([
		"rank", "resolver", "address", "avg_latency_ms",
		"successes", "total", "success_rate", "score",
	])?;

	for r in results {
		let avg = r.avg_latency
			.map(|d| format!("{:.3}", d.as_secs_f64() * 1000.0))
			.unwrap_or_default();
		writer.write_record([
			r.rank.to_string(),
			r.name.clone(),
			r.address.clone(),
			avg,
			r.successes.to_string(),
			r.total.to_string(),
			format!("{:.4}", r.success_rate),
			format!("{:.2}", r.score),
		])?;
	}
	Ok(())
}
