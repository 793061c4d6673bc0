use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

/// Success rate a resolver must exceed to be recommended
pub const RECOMMEND_MIN_SUCCESS_RATE: f64 = 0.98;

/// Maximum number of recommended resolvers
pub const RECOMMEND_LIMIT: usize = 3;

/// Running totals for one resolver
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverStats {
	pub address: String,
	pub total: usize,
	pub successes: usize,
	/// Sum of the durations of successful attempts only
	pub total_latency: Duration,
}

/// Scored and ranked resolver
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
	/// 1-based position in the ranking
	pub rank: usize,
	pub name: String,
	pub address: String,
	/// Mean latency of successful attempts, None when nothing succeeded
	pub avg_latency: Option<Duration>,
	/// Fraction of attempts that succeeded, between 0.0 and 1.0
	pub success_rate: f64,
	pub score: f64,
	pub successes: usize,
	pub total: usize,
}

/// Combine mean latency and success rate into a single score.
///
/// Formula: (1 / avg_seconds) * success_rate^2
///
/// Squaring the success rate punishes flaky resolvers harder than slow
/// ones: a resolver answering half the time scores a quarter of what its
/// latency alone would earn. Higher is better.
pub fn score(avg_latency: Duration, success_rate: f64) -> f64 {
	// Clamp so a zero-length measurement cannot produce an infinite score
	let secs = avg_latency.as_secs_f64().max(1e-6);
	(1.0 / secs) * success_rate * success_rate
}

/// Derive the averages and score for a single resolver.
///
/// The returned entry has rank 0 until `rank_resolvers` orders it.
pub fn score_resolver(name: &str, stats: &ResolverStats) -> RankedResult {
	let mut result = RankedResult {
		rank: 0,
		name: name.to_string(),
		address: stats.address.clone(),
		avg_latency: None,
		success_rate: 0.0,
		score: 0.0,
		successes: stats.successes,
		total: stats.total,
	};

	if stats.successes > 0 && stats.total > 0 {
		let avg = match u32::try_from(stats.successes) {
			Ok(n) => stats.total_latency / n,
			Err(_) => stats.total_latency.div_f64(stats.successes as f64),
		};
		let rate = stats.successes as f64 / stats.total as f64;
		result.avg_latency = Some(avg);
		result.success_rate = rate;
		result.score = score(avg, rate);
	}
	result
}

/// Score every resolver and sort by score, descending.
///
/// Equal scores are ordered by resolver name so repeated runs with the
/// same numbers print the same table.
pub fn rank_resolvers(stats: HashMap<String, ResolverStats>) -> Vec<RankedResult> {
	let mut ranked: Vec<RankedResult> = stats.iter()
		.map(|(name, s)| score_resolver(name, s))
		.collect();

	ranked.sort_by(|a, b| {
		b.score.partial_cmp(&a.score)
			.unwrap_or(Ordering::Equal)
			.then_with(|| a.name.cmp(&b.name))
	});

	for (i, r) in ranked.iter_mut().enumerate() {
		r.rank = i + 1;
	}
	ranked
}

/// Pick up to three resolvers with a success rate above 98%, best first.
pub fn recommend(ranked: &[RankedResult]) -> Vec<&RankedResult> {
	ranked.iter()
		.filter(|r| r.success_rate > RECOMMEND_MIN_SUCCESS_RATE)
		.take(RECOMMEND_LIMIT)
		.collect()
}
