use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{Id, JoinError, JoinSet};

use crate::error::QueryError;
use crate::query::{Executor, NetworkExecutor};
use crate::stats::{rank_resolvers, RankedResult, ResolverStats};
use crate::transport::{BenchmarkConfig, QueryOutcome, Resolver};

/// Completed/total counter shared with whoever wants to display progress.
///
/// Purely informational, the benchmark never reads it.
#[derive(Debug, Default)]
pub struct Progress {
	completed: AtomicUsize,
	total: AtomicUsize,
}

impl Progress {
	pub fn completed(&self) -> usize {
		self.completed.load(Ordering::Relaxed)
	}

	pub fn total(&self) -> usize {
		self.total.load(Ordering::Relaxed)
	}
}

/// Reduces attempt outcomes into per-resolver statistics keyed by name.
#[derive(Debug, Default)]
pub struct Aggregator {
	stats: HashMap<String, ResolverStats>,
}

impl Aggregator {
	/// Seed an empty record for every resolver so each one shows up in the
	/// ranking even if it never produced an outcome.
	pub fn with_resolvers(resolvers: &[Resolver]) -> Self {
		let stats = resolvers.iter()
			.map(|r| (r.name.clone(), ResolverStats {
				address: r.address.clone(),
				..Default::default()
			}))
			.collect();
		Aggregator { stats }
	}

	pub fn record(&mut self, outcome: &QueryOutcome) {
		let entry = self.stats
			.entry(outcome.resolver.clone())
			.or_insert_with(|| ResolverStats {
				address: outcome.address.clone(),
				..Default::default()
			});
		entry.total += 1;
		if outcome.is_success() {
			entry.successes += 1;
			entry.total_latency += outcome.duration;
		}
	}

	/// Drain the channel until every sender is gone.
	pub async fn consume(mut self, mut rx: mpsc::Receiver<QueryOutcome>) -> HashMap<String, ResolverStats> {
		while let Some(outcome) = rx.recv().await {
			self.record(&outcome);
		}
		self.stats
	}
}

/// Launch one attempt per (resolver, domain, repeat) triple.
///
/// At most `config.max_inflight` attempts run at once. The returned channel
/// yields exactly `resolvers × domains × repeats` outcomes and closes only
/// after every attempt has finished.
pub fn dispatch<E: Executor>(
	executor: Arc<E>,
	resolvers: &[Resolver],
	domains: &[String],
	config: &BenchmarkConfig,
	progress: Arc<Progress>,
) -> mpsc::Receiver<QueryOutcome> {
	let total = resolvers.len() * domains.len() * config.repeats as usize;
	progress.total.store(total, Ordering::Relaxed);
	progress.completed.store(0, Ordering::Relaxed);

	let max_inflight = config.max_inflight.max(1);
	let (tx, rx) = mpsc::channel(max_inflight);
	let semaphore = Arc::new(Semaphore::new(max_inflight));
	let resolvers = resolvers.to_vec();
	let domains: Vec<Arc<str>> = domains.iter().map(|d| Arc::from(d.as_str())).collect();
	let repeats = config.repeats;

	tokio::spawn(async move {
		let mut units = JoinSet::new();
		let mut pending: HashMap<Id, (Arc<Resolver>, Arc<str>)> = HashMap::new();
		for resolver in resolvers {
			let resolver = Arc::new(resolver);
			for domain in &domains {
				for _ in 0..repeats {
					// Semaphore is never closed, so the permit is always granted
					let permit = semaphore.clone().acquire_owned().await.ok();
					let executor = executor.clone();
					let unit_resolver = resolver.clone();
					let unit_domain = domain.clone();
					let unit_tx = tx.clone();
					let unit_progress = progress.clone();

					let handle = units.spawn(async move {
						let outcome = executor.execute(&unit_resolver, &unit_domain).await;
						drop(permit);
						if unit_tx.send(outcome).await.is_err() {
							tracing::warn!(resolver = %unit_resolver.name, "outcome receiver dropped");
						}
						unit_progress.completed.fetch_add(1, Ordering::Relaxed);
					});
					pending.insert(handle.id(), (resolver.clone(), domain.clone()));

					// Reap finished units so the set only holds live ones
					while let Some(joined) = units.try_join_next_with_id() {
						settle(joined, &mut pending, &tx, &progress).await;
					}
				}
			}
		}

		// Join every unit before the last sender goes away
		while let Some(joined) = units.join_next_with_id().await {
			settle(joined, &mut pending, &tx, &progress).await;
		}
		drop(tx);
	});

	rx
}

/// Account for a joined unit.
///
/// A unit that panicked never posted its outcome, so a failed outcome is
/// sent in its place to keep the per-resolver totals complete.
async fn settle(
	joined: Result<(Id, ()), JoinError>,
	pending: &mut HashMap<Id, (Arc<Resolver>, Arc<str>)>,
	tx: &mpsc::Sender<QueryOutcome>,
	progress: &Progress,
) {
	let (id, failure) = match joined {
		Ok((id, ())) => (id, None),
		Err(e) => (e.id(), Some(e)),
	};
	let unit = pending.remove(&id);
	let (Some(e), Some((resolver, domain))) = (failure, unit) else {
		return;
	};

	tracing::warn!(resolver = %resolver.name, domain = %domain, error = %e, "query task failed, recorded as a failed attempt");
	let outcome = QueryOutcome::new(
		&resolver, &domain, Duration::ZERO, Some(QueryError::TaskFailed(e.to_string())),
	);
	if tx.send(outcome).await.is_err() {
		tracing::warn!(resolver = %resolver.name, "outcome receiver dropped");
	}
	progress.completed.fetch_add(1, Ordering::Relaxed);
}

/// Run the whole benchmark with a caller-supplied executor.
///
/// Returns one ranked entry per resolver, best first.
pub async fn run_benchmark<E: Executor>(
	executor: Arc<E>,
	resolvers: &[Resolver],
	domains: &[String],
	config: &BenchmarkConfig,
	progress: Arc<Progress>,
) -> Vec<RankedResult> {
	tracing::info!(
		resolvers = resolvers.len(),
		domains = domains.len(),
		repeats = config.repeats,
		"starting benchmark",
	);

	let rx = dispatch(executor, resolvers, domains, config, progress);
	let stats = Aggregator::with_resolvers(resolvers).consume(rx).await;
	let ranked = rank_resolvers(stats);

	tracing::info!(ranked = ranked.len(), "benchmark finished");
	ranked
}

/// Benchmark `resolvers` over the network.
pub async fn benchmark(
	resolvers: &[Resolver],
	domains: &[String],
	config: &BenchmarkConfig,
	progress: Arc<Progress>,
) -> Result<Vec<RankedResult>> {
	let executor = Arc::new(NetworkExecutor::new(config.timeout)?);
	Ok(run_benchmark(executor, resolvers, domains, config, progress).await)
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;
	use std::future::Future;
	use std::sync::Mutex;

	use super::*;
	use crate::stats::recommend;
	use crate::transport::Protocol;

	/// Executor that answers from a fixed per-resolver script instead of the
	/// network. Successive calls for the same resolver walk its latency list.
	#[derive(Default)]
	struct ScriptedExecutor {
		latencies: HashMap<String, Vec<Duration>>,
		calls: Mutex<HashMap<String, usize>>,
		seen: Mutex<Vec<(String, String)>>,
		panics: HashSet<String>,
	}

	impl ScriptedExecutor {
		fn succeed(mut self, name: &str, latencies_ms: &[u64]) -> Self {
			let lats = latencies_ms.iter().map(|&ms| Duration::from_millis(ms)).collect();
			self.latencies.insert(name.to_string(), lats);
			self
		}

		fn panic_on(mut self, name: &str) -> Self {
			self.panics.insert(name.to_string());
			self
		}
	}

	impl Executor for ScriptedExecutor {
		fn execute(
			&self,
			resolver: &Resolver,
			domain: &str,
		) -> impl Future<Output = QueryOutcome> + Send {
			let call = {
				let mut calls = self.calls.lock().unwrap();
				let n = calls.entry(resolver.name.clone()).or_default();
				*n += 1;
				*n - 1
			};
			self.seen.lock().unwrap().push((resolver.name.clone(), domain.to_string()));

			let outcome = if let Protocol::Unsupported(tag) = &resolver.protocol {
				QueryOutcome::new(resolver, domain, Duration::ZERO,
					Some(QueryError::UnsupportedProtocol(tag.clone())))
			} else {
				match self.latencies.get(&resolver.name) {
					Some(lats) if !lats.is_empty() => {
						let latency = lats[call % lats.len()];
						QueryOutcome::new(resolver, domain, latency, None)
					}
					_ => QueryOutcome::new(resolver, domain, Duration::from_secs(2),
						Some(QueryError::Timeout)),
				}
			};
			let panics = self.panics.contains(&resolver.name);
			async move {
				tokio::task::yield_now().await;
				if panics {
					panic!("scripted failure for {}", outcome.resolver);
				}
				outcome
			}
		}
	}

	/// Executor that tracks how many attempts are running at the same time.
	#[derive(Default)]
	struct CountingExecutor {
		running: AtomicUsize,
		peak: AtomicUsize,
	}

	impl Executor for CountingExecutor {
		fn execute(
			&self,
			resolver: &Resolver,
			domain: &str,
		) -> impl Future<Output = QueryOutcome> + Send {
			async move {
				let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
				self.peak.fetch_max(now, Ordering::SeqCst);
				tokio::time::sleep(Duration::from_millis(5)).await;
				self.running.fetch_sub(1, Ordering::SeqCst);
				QueryOutcome::new(resolver, domain, Duration::from_millis(5), None)
			}
		}
	}

	fn is_done(progress: &Progress) -> bool {
		progress.completed() >= progress.total()
	}

	fn udp(name: &str) -> Resolver {
		Resolver::new(name, "192.0.2.1", Protocol::Udp)
	}

	fn domains(names: &[&str]) -> Vec<String> {
		names.iter().map(|s| s.to_string()).collect()
	}

	fn config(repeats: u32, max_inflight: usize) -> BenchmarkConfig {
		BenchmarkConfig {
			repeats,
			max_inflight,
			..Default::default()
		}
	}

	#[tokio::test]
	async fn test_dispatch_respects_inflight_cap() {
		let resolvers: Vec<Resolver> = ["A", "B", "C", "D", "E"].iter().map(|n| udp(n)).collect();
		let doms = domains(&["a.com", "b.com", "c.com", "d.com"]);
		let executor = Arc::new(CountingExecutor::default());

		let ranked = run_benchmark(
			executor.clone(), &resolvers, &doms, &config(3, 3),
			Arc::new(Progress::default()),
		).await;

		let peak = executor.peak.load(Ordering::SeqCst);
		assert!(peak >= 1 && peak <= 3, "peak in-flight was {}", peak);
		assert_eq!(executor.running.load(Ordering::SeqCst), 0);
		assert!(ranked.iter().all(|r| r.total == 12 && r.successes == 12));
	}

	#[tokio::test]
	async fn test_panicking_attempts_still_counted() {
		let resolvers = vec![udp("A"), udp("P")];
		let executor = Arc::new(ScriptedExecutor::default().succeed("A", &[4]).panic_on("P"));
		let progress = Arc::new(Progress::default());

		let ranked = run_benchmark(
			executor, &resolvers, &domains(&["a.com", "b.com"]), &config(2, 2), progress.clone(),
		).await;

		let p = ranked.iter().find(|r| r.name == "P").unwrap();
		assert_eq!((p.successes, p.total), (0, 4));
		assert_eq!(p.score, 0.0);
		let a = ranked.iter().find(|r| r.name == "A").unwrap();
		assert_eq!((a.successes, a.total), (4, 4));
		assert_eq!(progress.completed(), 8);
	}

	#[tokio::test]
	async fn test_failed_task_becomes_failed_outcome() {
		let resolvers = vec![udp("P")];
		let executor = Arc::new(ScriptedExecutor::default().panic_on("P"));

		let mut rx = dispatch(
			executor, &resolvers, &domains(&["a.com"]), &config(1, 1),
			Arc::new(Progress::default()),
		);
		let outcome = rx.recv().await.unwrap();
		assert_eq!(outcome.resolver, "P");
		assert_eq!(outcome.domain, "a.com");
		assert!(matches!(outcome.error, Some(QueryError::TaskFailed(_))));
		assert!(rx.recv().await.is_none());
	}

	#[test]
	fn test_aggregator_counts() {
		let a = udp("A");
		let mut agg = Aggregator::with_resolvers(&[a.clone()]);
		agg.record(&QueryOutcome::new(&a, "x.com", Duration::from_millis(10), None));
		agg.record(&QueryOutcome::new(&a, "x.com", Duration::from_millis(30), None));
		agg.record(&QueryOutcome::new(&a, "x.com", Duration::from_secs(2), Some(QueryError::Timeout)));

		let stats = agg.stats;
		let s = &stats["A"];
		assert_eq!(s.total, 3);
		assert_eq!(s.successes, 2);
		// Failed attempts contribute nothing to latency
		assert_eq!(s.total_latency, Duration::from_millis(40));
		assert_eq!(s.address, "192.0.2.1");
	}

	#[test]
	fn test_aggregator_creates_unknown_resolver_lazily() {
		let mut agg = Aggregator::default();
		let b = udp("B");
		agg.record(&QueryOutcome::new(&b, "x.com", Duration::from_millis(5), None));
		let stats = agg.stats;
		assert_eq!(stats["B"].total, 1);
	}

	#[tokio::test]
	async fn test_dispatch_every_triple_exactly_once() {
		let resolvers = vec![udp("A"), udp("B"), udp("C")];
		let doms = domains(&["a.com", "b.com"]);
		let executor = Arc::new(ScriptedExecutor::default().succeed("A", &[1]));
		let progress = Arc::new(Progress::default());

		let mut rx = dispatch(executor.clone(), &resolvers, &doms, &config(4, 3), progress.clone());
		let mut count = 0;
		let mut pairs = HashMap::new();
		while let Some(outcome) = rx.recv().await {
			count += 1;
			*pairs.entry((outcome.resolver, outcome.domain)).or_insert(0) += 1;
		}

		assert_eq!(count, 3 * 2 * 4);
		assert_eq!(pairs.len(), 6);
		assert!(pairs.values().all(|&n| n == 4));
		assert_eq!(executor.seen.lock().unwrap().len(), 24);
		assert_eq!(progress.total(), 24);
		assert!(is_done(&progress));
	}

	#[tokio::test]
	async fn test_dispatch_single_slot() {
		let resolvers = vec![udp("A"), udp("B")];
		let doms = domains(&["a.com", "b.com", "c.com"]);
		let executor = Arc::new(ScriptedExecutor::default());
		let progress = Arc::new(Progress::default());

		let rx = dispatch(executor, &resolvers, &doms, &config(2, 1), progress);
		let stats = Aggregator::default().consume(rx).await;
		assert_eq!(stats["A"].total, 6);
		assert_eq!(stats["B"].total, 6);
	}

	#[tokio::test]
	async fn test_zero_inflight_is_clamped() {
		let resolvers = vec![udp("A")];
		let executor = Arc::new(ScriptedExecutor::default().succeed("A", &[3]));
		let ranked = run_benchmark(
			executor, &resolvers, &domains(&["a.com"]), &config(2, 0),
			Arc::new(Progress::default()),
		).await;
		assert_eq!(ranked[0].total, 2);
	}

	#[tokio::test]
	async fn test_two_resolver_scenario() {
		let resolvers = vec![udp("B"), udp("A")];
		let executor = Arc::new(ScriptedExecutor::default().succeed("A", &[10, 20]));

		let ranked = run_benchmark(
			executor, &resolvers, &domains(&["example.com"]), &config(2, 8),
			Arc::new(Progress::default()),
		).await;

		assert_eq!(ranked.len(), 2);
		let a = &ranked[0];
		assert_eq!(a.name, "A");
		assert_eq!((a.successes, a.total), (2, 2));
		assert_eq!(a.avg_latency, Some(Duration::from_millis(15)));
		assert!((a.score - 66.666).abs() < 0.01);

		let b = &ranked[1];
		assert_eq!(b.name, "B");
		assert_eq!((b.successes, b.total), (0, 2));
		assert_eq!(b.avg_latency, None);
		assert_eq!(b.score, 0.0);
	}

	#[tokio::test]
	async fn test_unsupported_protocol_never_recommended() {
		let resolvers = vec![
			udp("A"),
			Resolver::new("E", "10.0.0.5", Protocol::Unsupported("doq".to_string())),
		];
		let executor = Arc::new(ScriptedExecutor::default().succeed("A", &[5]).succeed("E", &[1]));

		let ranked = run_benchmark(
			executor, &resolvers, &domains(&["a.com", "b.com"]), &config(3, 4),
			Arc::new(Progress::default()),
		).await;

		let e = ranked.iter().find(|r| r.name == "E").unwrap();
		assert_eq!((e.successes, e.total), (0, 6));
		assert_eq!(e.score, 0.0);
		let names: Vec<&str> = recommend(&ranked).iter().map(|r| r.name.as_str()).collect();
		assert_eq!(names, vec!["A"]);
	}

	#[tokio::test]
	async fn test_empty_domains_and_zero_repeats() {
		let resolvers = vec![udp("A"), udp("B")];
		let executor = Arc::new(ScriptedExecutor::default().succeed("A", &[5]));

		for (doms, repeats) in [(domains(&[]), 3), (domains(&["a.com"]), 0)] {
			let progress = Arc::new(Progress::default());
			let ranked = run_benchmark(
				executor.clone(), &resolvers, &doms, &config(repeats, 4), progress.clone(),
			).await;
			assert_eq!(ranked.len(), 2);
			assert!(ranked.iter().all(|r| r.total == 0 && r.score == 0.0));
			assert!(is_done(&progress));
		}
	}

	#[tokio::test]
	async fn test_all_failing_recommends_nothing() {
		let resolvers = vec![udp("A"), udp("B"), udp("C")];
		let executor = Arc::new(ScriptedExecutor::default());

		let ranked = run_benchmark(
			executor, &resolvers, &domains(&["a.com"]), &config(2, 4),
			Arc::new(Progress::default()),
		).await;
		assert!(recommend(&ranked).is_empty());
		// Equal zero scores fall back to name order
		let names: HashSet<&str> = ranked.iter().map(|r| r.name.as_str()).collect();
		assert_eq!(names.len(), 3);
		assert_eq!(ranked[0].name, "A");
		assert_eq!(ranked[2].name, "C");
	}
}
