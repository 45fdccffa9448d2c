//! Validation-mode decision engine, rule trees, and timeout-supervised rule
//! execution.
//!
//! Rules are user-supplied objects behind a single-method capability trait.
//! The coordinator never trusts them: each execution is wrapped in
//! `catch_unwind` (a panicking rule becomes an Error-severity result) and
//! supervised against a per-rule timeout (an overrunning rule becomes a
//! Timeout-severity result and its worker thread is abandoned rather than
//! joined, so the caller is never blocked past the budget).

use crate::cancel::CancelToken;
use crate::error::ValidateError;
use ahash::AHashMap;
use datagrid_model::{Row, RowId, RuleResult, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// A single validation rule.
///
/// Implementations must be cheap to share (`Send + Sync`); the coordinator
/// runs them on worker threads for timeout supervision.
pub trait ValidationRule: Send + Sync {
    fn id(&self) -> &str;

    fn validate(&self, row: &Row) -> RuleResult;

    /// Per-rule timeout override; the coordinator's default applies otherwise.
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

pub type SharedRule = Arc<dyn ValidationRule>;

/// Rule composition tree.
///
/// `All`/`Any` always evaluate every child; the short-circuit variants stop at
/// the first failure/success respectively, which bounds cost when rule
/// evaluation is expensive. An empty `All` is vacuously valid; an empty `Any`
/// is invalid.
pub enum RuleNode {
    Leaf(SharedRule),
    All(Vec<RuleNode>),
    Any(Vec<RuleNode>),
    AllShortCircuit(Vec<RuleNode>),
    AnyShortCircuit(Vec<RuleNode>),
}

/// Real-time (synchronous per-edit) versus bulk (parallel batched) validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    RealTime,
    Bulk,
}

/// Inputs to the mode decision.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext {
    pub row_count: usize,
    pub rule_count: usize,
}

/// Explicit thresholds for the coordinator; nothing is baked into the
/// decision logic itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub max_realtime_rows: usize,
    pub max_realtime_rules: usize,
    /// Ceiling on the rolling average rule-execution time for real-time mode.
    pub max_realtime_budget: Duration,
    pub default_rule_timeout: Duration,
    pub batch_chunk_size: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_realtime_rows: 1_000,
            max_realtime_rules: 10,
            max_realtime_budget: Duration::from_millis(50),
            default_rule_timeout: Duration::from_secs(2),
            batch_chunk_size: 256,
        }
    }
}

/// Per-rule execution statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuleStats {
    pub executions: u64,
    pub total_time: Duration,
    /// Executions that produced an invalid result at Error or Timeout
    /// severity (including panics and overruns).
    pub errors: u64,
}

impl RuleStats {
    pub fn average_time(&self) -> Duration {
        if self.executions == 0 {
            return Duration::ZERO;
        }
        self.total_time / u32::try_from(self.executions).unwrap_or(u32::MAX)
    }

    fn record(&mut self, elapsed: Duration, result: &RuleResult) {
        self.executions += 1;
        self.total_time += elapsed;
        if !result.is_valid && matches!(result.severity, Severity::Error | Severity::Timeout) {
            self.errors += 1;
        }
    }
}

/// Aggregate outcome of a bulk validation run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub row_results: Vec<(RowId, Vec<RuleResult>)>,
    /// Per-rule statistics accumulated across this batch only.
    pub stats: BTreeMap<String, RuleStats>,
}

impl BatchReport {
    pub fn invalid_row_count(&self) -> usize {
        self.row_results
            .iter()
            .filter(|(_, results)| results.iter().any(|r| !r.is_valid))
            .count()
    }
}

/// Decides validation mode per editing operation, runs rules and rule trees,
/// and aggregates per-rule statistics across the coordinator's lifetime.
#[derive(Debug)]
pub struct ValidationCoordinator {
    config: ValidationConfig,
    stats: Mutex<AHashMap<String, RuleStats>>,
}

impl ValidationCoordinator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            stats: Mutex::new(AHashMap::new()),
        }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Real-time only when every gate passes: row count, rule count, and the
    /// rolling average rule-execution time.
    pub fn decide_mode(&self, context: &ValidationContext) -> ValidationMode {
        if context.row_count <= self.config.max_realtime_rows
            && context.rule_count <= self.config.max_realtime_rules
            && self.rolling_average() <= self.config.max_realtime_budget
        {
            ValidationMode::RealTime
        } else {
            ValidationMode::Bulk
        }
    }

    /// Rolling average rule-execution time across everything this coordinator
    /// has run so far. Zero when nothing has run yet.
    pub fn rolling_average(&self) -> Duration {
        let stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        let mut total = Duration::ZERO;
        let mut executions = 0u64;
        for s in stats.values() {
            total += s.total_time;
            executions += s.executions;
        }
        if executions == 0 {
            return Duration::ZERO;
        }
        total / u32::try_from(executions).unwrap_or(u32::MAX)
    }

    pub fn stats_snapshot(&self) -> BTreeMap<String, RuleStats> {
        let stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    fn record(&self, rule_id: &str, elapsed: Duration, result: &RuleResult) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats
            .entry(rule_id.to_string())
            .or_default()
            .record(elapsed, result);
    }

    /// Validate one row against a flat rule list, each rule under its own
    /// timeout.
    pub fn validate_row(&self, row: &Row, rules: &[SharedRule]) -> Vec<RuleResult> {
        rules
            .iter()
            .map(|rule| {
                let timeout = rule.timeout().unwrap_or(self.config.default_rule_timeout);
                let (elapsed, result) = run_supervised(rule, row, timeout);
                self.record(rule.id(), elapsed, &result);
                result
            })
            .collect()
    }

    /// Evaluate a rule tree against one row. Returns the combined verdict and
    /// every leaf result that was actually evaluated (short-circuit variants
    /// stop early).
    pub fn validate_tree(&self, row: &Row, node: &RuleNode) -> (bool, Vec<RuleResult>) {
        let mut results = Vec::new();
        let valid = self.eval_node(row, node, &mut results);
        (valid, results)
    }

    fn eval_node(&self, row: &Row, node: &RuleNode, results: &mut Vec<RuleResult>) -> bool {
        match node {
            RuleNode::Leaf(rule) => {
                let timeout = rule.timeout().unwrap_or(self.config.default_rule_timeout);
                let (elapsed, result) = run_supervised(rule, row, timeout);
                self.record(rule.id(), elapsed, &result);
                let valid = result.is_valid;
                results.push(result);
                valid
            }
            RuleNode::All(children) => {
                let mut valid = true;
                for child in children {
                    valid &= self.eval_node(row, child, results);
                }
                valid
            }
            RuleNode::Any(children) => {
                let mut valid = false;
                for child in children {
                    valid |= self.eval_node(row, child, results);
                }
                valid
            }
            RuleNode::AllShortCircuit(children) => {
                for child in children {
                    if !self.eval_node(row, child, results) {
                        return false;
                    }
                }
                true
            }
            RuleNode::AnyShortCircuit(children) => {
                for child in children {
                    if self.eval_node(row, child, results) {
                        return true;
                    }
                }
                false
            }
        }
    }

    /// Validate many rows, partitioned into parallel chunks.
    ///
    /// The cancellation token is checked between chunks; on cancellation all
    /// partial results are discarded and a distinct cancelled outcome is
    /// returned. Per-rule statistics are accumulated across the batch and
    /// folded into the coordinator's rolling averages.
    pub fn validate_batch(
        &self,
        rows: &[Row],
        rules: &[SharedRule],
        cancel: Option<&CancelToken>,
    ) -> Result<BatchReport, ValidateError> {
        let chunk_size = self.config.batch_chunk_size.max(1);
        let chunks: Vec<&[Row]> = rows.chunks(chunk_size).collect();

        let per_chunk = self.run_chunks(&chunks, rules, cancel)?;

        let mut row_results = Vec::with_capacity(rows.len());
        let mut batch_stats: BTreeMap<String, RuleStats> = BTreeMap::new();
        for chunk in per_chunk {
            for (id, timed) in chunk {
                let mut results = Vec::with_capacity(timed.len());
                for (rule_id, elapsed, result) in timed {
                    self.record(&rule_id, elapsed, &result);
                    batch_stats
                        .entry(rule_id)
                        .or_default()
                        .record(elapsed, &result);
                    results.push(result);
                }
                row_results.push((id, results));
            }
        }

        Ok(BatchReport {
            row_results,
            stats: batch_stats,
        })
    }

    #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
    fn run_chunks(
        &self,
        chunks: &[&[Row]],
        rules: &[SharedRule],
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<ChunkResults>, ValidateError> {
        use rayon::prelude::*;

        let pool = match crate::parallel::pool() {
            Some(pool) if chunks.len() > 1 => pool,
            _ => return self.run_chunks_sequential(chunks, rules, cancel),
        };

        let timeout = self.config.default_rule_timeout;
        pool.install(|| {
            chunks
                .par_iter()
                .map(|chunk| {
                    if cancel.is_some_and(CancelToken::is_cancelled) {
                        return Err(ValidateError::Cancelled);
                    }
                    Ok(run_chunk_supervised(chunk, rules, timeout))
                })
                .collect()
        })
    }

    #[cfg(not(all(feature = "parallel", not(target_arch = "wasm32"))))]
    fn run_chunks(
        &self,
        chunks: &[&[Row]],
        rules: &[SharedRule],
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<ChunkResults>, ValidateError> {
        self.run_chunks_sequential(chunks, rules, cancel)
    }

    fn run_chunks_sequential(
        &self,
        chunks: &[&[Row]],
        rules: &[SharedRule],
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<ChunkResults>, ValidateError> {
        let timeout = self.config.default_rule_timeout;
        chunks
            .iter()
            .map(|chunk| {
                if cancel.is_some_and(CancelToken::is_cancelled) {
                    return Err(ValidateError::Cancelled);
                }
                Ok(run_chunk_supervised(chunk, rules, timeout))
            })
            .collect()
    }
}

type TimedResult = (String, Duration, RuleResult);
type ChunkResults = Vec<(RowId, Vec<TimedResult>)>;

fn timeout_result(rule_id: &str, timeout: Duration) -> RuleResult {
    RuleResult::invalid(
        rule_id,
        Severity::Timeout,
        format!("rule exceeded its {}ms timeout", timeout.as_millis()),
    )
}

fn panic_result(rule_id: &str) -> RuleResult {
    RuleResult::invalid(rule_id, Severity::Error, "rule panicked during evaluation")
}

/// Run one rule against one row under a timeout.
///
/// The rule executes on a worker thread; if it overruns, the worker is
/// abandoned (it keeps running until the rule returns, then exits when its
/// send fails) and the caller gets a Timeout result after exactly the budget.
fn run_supervised(rule: &SharedRule, row: &Row, timeout: Duration) -> (Duration, RuleResult) {
    let (tx, rx) = sync_channel::<(Duration, RuleResult)>(1);
    let worker_rule = Arc::clone(rule);
    let worker_row = row.clone();
    let rule_id = rule.id().to_string();
    let spawn = std::thread::Builder::new()
        .name("datagrid-rule".to_string())
        .spawn(move || {
            let start = Instant::now();
            let outcome = catch_unwind(AssertUnwindSafe(|| worker_rule.validate(&worker_row)));
            let result = outcome.unwrap_or_else(|_| panic_result(worker_rule.id()));
            let _ = tx.send((start.elapsed(), result));
        });

    if spawn.is_err() {
        // No thread available; run inline without a timeout rather than fail.
        log::warn!("rule worker spawn failed; running rule '{rule_id}' inline");
        let start = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| rule.validate(row)))
            .unwrap_or_else(|_| panic_result(&rule_id));
        return (start.elapsed(), result);
    }

    match rx.recv_timeout(timeout) {
        Ok((elapsed, result)) => {
            if !result.is_valid && result.severity == Severity::Error {
                log::warn!("rule '{rule_id}' reported an error: {}", result.message);
            }
            (elapsed, result)
        }
        Err(_) => {
            log::warn!(
                "rule '{rule_id}' exceeded its {}ms timeout; worker abandoned",
                timeout.as_millis()
            );
            (timeout, timeout_result(&rule_id, timeout))
        }
    }
}

/// Run every (row, rule) pair of a chunk on one supervisor-managed worker.
///
/// Pairs execute sequentially on the worker; the supervisor enforces each
/// rule's timeout via `recv_timeout`. When a pair overruns, the stuck worker
/// is abandoned and a fresh worker resumes from the following pair, so one
/// runaway rule costs one thread, not the chunk.
fn run_chunk_supervised(
    rows: &[Row],
    rules: &[SharedRule],
    default_timeout: Duration,
) -> ChunkResults {
    let total = rows.len() * rules.len();
    let shared_rows: Arc<Vec<Row>> = Arc::new(rows.to_vec());
    let shared_rules: Arc<Vec<SharedRule>> = Arc::new(rules.to_vec());

    let mut timed: Vec<TimedResult> = Vec::with_capacity(total);
    let mut next_pair = 0usize;
    let mut worker: Option<Receiver<(usize, Duration, RuleResult)>> = None;

    while next_pair < total {
        let rx = match worker.take() {
            Some(rx) => rx,
            None => match spawn_pair_worker(&shared_rows, &shared_rules, next_pair) {
                Some(rx) => rx,
                None => {
                    // Thread exhaustion: finish the chunk inline, no timeouts.
                    log::warn!("chunk worker spawn failed; validating remainder inline");
                    for k in next_pair..total {
                        let (row, rule) = pair_at(&shared_rows, &shared_rules, k);
                        let start = Instant::now();
                        let result = catch_unwind(AssertUnwindSafe(|| rule.validate(row)))
                            .unwrap_or_else(|_| panic_result(rule.id()));
                        timed.push((rule.id().to_string(), start.elapsed(), result));
                    }
                    next_pair = total;
                    continue;
                }
            },
        };

        let (_, rule) = pair_at(&shared_rows, &shared_rules, next_pair);
        let timeout = rule.timeout().unwrap_or(default_timeout);
        match rx.recv_timeout(timeout) {
            Ok((k, elapsed, result)) => {
                debug_assert_eq!(k, next_pair);
                timed.push((rule.id().to_string(), elapsed, result));
                next_pair += 1;
                worker = Some(rx);
            }
            Err(_) => {
                log::warn!(
                    "rule '{}' exceeded its {}ms timeout during bulk validation; worker abandoned",
                    rule.id(),
                    timeout.as_millis()
                );
                timed.push((rule.id().to_string(), timeout, timeout_result(rule.id(), timeout)));
                next_pair += 1;
                // Dropping `rx` abandons the stuck worker; a fresh one is
                // spawned on the next loop iteration.
            }
        }
    }

    let mut out: ChunkResults = Vec::with_capacity(rows.len());
    let mut iter = timed.into_iter();
    for row in rows {
        let results: Vec<TimedResult> = iter.by_ref().take(rules.len()).collect();
        out.push((row.id, results));
    }
    out
}

fn pair_at<'a>(
    rows: &'a [Row],
    rules: &'a [SharedRule],
    pair: usize,
) -> (&'a Row, &'a SharedRule) {
    let row = &rows[pair / rules.len()];
    let rule = &rules[pair % rules.len()];
    (row, rule)
}

fn spawn_pair_worker(
    rows: &Arc<Vec<Row>>,
    rules: &Arc<Vec<SharedRule>>,
    start_pair: usize,
) -> Option<Receiver<(usize, Duration, RuleResult)>> {
    let (tx, rx): (SyncSender<(usize, Duration, RuleResult)>, _) = sync_channel(1);
    let rows = Arc::clone(rows);
    let rules = Arc::clone(rules);
    let total = rows.len() * rules.len();
    std::thread::Builder::new()
        .name("datagrid-validate".to_string())
        .spawn(move || {
            for k in start_pair..total {
                let (row, rule) = pair_at(&rows, &rules, k);
                let start = Instant::now();
                let result = catch_unwind(AssertUnwindSafe(|| rule.validate(row)))
                    .unwrap_or_else(|_| panic_result(rule.id()));
                if tx.send((k, start.elapsed(), result)).is_err() {
                    // Supervisor gave up on this worker.
                    return;
                }
            }
        })
        .ok()?;
    Some(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagrid_model::CellValue;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    struct CheckPositive;

    impl ValidationRule for CheckPositive {
        fn id(&self) -> &str {
            "positive"
        }

        fn validate(&self, row: &Row) -> RuleResult {
            match row.cell("value") {
                CellValue::Number(n) if *n > 0.0 => RuleResult::valid(self.id()),
                _ => RuleResult::invalid(self.id(), Severity::Error, "value must be positive")
                    .with_column("value"),
            }
        }
    }

    struct SlowRule {
        delay: Duration,
    }

    impl ValidationRule for SlowRule {
        fn id(&self) -> &str {
            "slow"
        }

        fn validate(&self, _row: &Row) -> RuleResult {
            std::thread::sleep(self.delay);
            RuleResult::valid(self.id())
        }

        fn timeout(&self) -> Option<Duration> {
            Some(Duration::from_millis(50))
        }
    }

    struct PanickingRule;

    impl ValidationRule for PanickingRule {
        fn id(&self) -> &str {
            "panicky"
        }

        fn validate(&self, _row: &Row) -> RuleResult {
            panic!("boom");
        }
    }

    fn row(value: f64) -> Row {
        Row {
            id: RowId(1),
            number: 1,
            cells: BTreeMap::from([("value".to_string(), CellValue::Number(value))]),
        }
    }

    fn rows(values: &[f64]) -> Vec<Row> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Row {
                id: RowId(i as u64 + 1),
                number: i as u64 + 1,
                cells: BTreeMap::from([("value".to_string(), CellValue::Number(*v))]),
            })
            .collect()
    }

    fn coordinator() -> ValidationCoordinator {
        ValidationCoordinator::new(ValidationConfig::default())
    }

    #[test]
    fn decide_mode_requires_every_gate_to_pass() {
        let coordinator = ValidationCoordinator::new(ValidationConfig {
            max_realtime_rows: 100,
            max_realtime_rules: 5,
            ..ValidationConfig::default()
        });
        assert_eq!(
            coordinator.decide_mode(&ValidationContext {
                row_count: 100,
                rule_count: 5
            }),
            ValidationMode::RealTime
        );
        assert_eq!(
            coordinator.decide_mode(&ValidationContext {
                row_count: 101,
                rule_count: 1
            }),
            ValidationMode::Bulk
        );
        assert_eq!(
            coordinator.decide_mode(&ValidationContext {
                row_count: 1,
                rule_count: 6
            }),
            ValidationMode::Bulk
        );
    }

    #[test]
    fn decide_mode_goes_bulk_when_rolling_average_exceeds_budget() {
        let coordinator = ValidationCoordinator::new(ValidationConfig {
            max_realtime_budget: Duration::from_millis(1),
            ..ValidationConfig::default()
        });
        let slow: SharedRule = Arc::new(SlowRule {
            delay: Duration::from_millis(10),
        });
        coordinator.validate_row(&row(1.0), &[slow]);
        assert!(coordinator.rolling_average() >= Duration::from_millis(1));
        assert_eq!(
            coordinator.decide_mode(&ValidationContext {
                row_count: 1,
                rule_count: 1
            }),
            ValidationMode::Bulk
        );
    }

    #[test]
    fn timed_out_rule_yields_timeout_result_within_budget() {
        let coordinator = coordinator();
        let stuck: SharedRule = Arc::new(SlowRule {
            delay: Duration::from_secs(60),
        });
        let start = Instant::now();
        let results = coordinator.validate_row(&row(1.0), &[stuck]);
        let elapsed = start.elapsed();

        assert_eq!(results.len(), 1);
        assert!(!results[0].is_valid);
        assert_eq!(results[0].severity, Severity::Timeout);
        // 50ms rule timeout plus bounded overhead, nowhere near the 60s sleep.
        assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    }

    #[test]
    fn panicking_rule_becomes_error_result_and_does_not_abort_batch() {
        let coordinator = coordinator();
        let rules: Vec<SharedRule> = vec![Arc::new(PanickingRule), Arc::new(CheckPositive)];
        let report = coordinator
            .validate_batch(&rows(&[1.0, 2.0]), &rules, None)
            .unwrap();
        assert_eq!(report.row_results.len(), 2);
        for (_, results) in &report.row_results {
            assert_eq!(results.len(), 2);
            assert_eq!(results[0].severity, Severity::Error);
            assert!(!results[0].is_valid);
            assert!(results[1].is_valid);
        }
        assert_eq!(report.stats["panicky"].errors, 2);
        assert_eq!(report.stats["positive"].errors, 0);
    }

    #[test]
    fn batch_aggregates_per_rule_stats() {
        let coordinator = coordinator();
        let rules: Vec<SharedRule> = vec![Arc::new(CheckPositive)];
        let report = coordinator
            .validate_batch(&rows(&[1.0, -1.0, 3.0]), &rules, None)
            .unwrap();
        let stats = &report.stats["positive"];
        assert_eq!(stats.executions, 3);
        assert_eq!(stats.errors, 1);
        assert_eq!(report.invalid_row_count(), 1);

        // Coordinator-level stats absorb the batch.
        assert_eq!(coordinator.stats_snapshot()["positive"].executions, 3);
    }

    #[test]
    fn cancelled_batch_discards_partials_and_reports_cancelled() {
        let coordinator = ValidationCoordinator::new(ValidationConfig {
            batch_chunk_size: 1,
            ..ValidationConfig::default()
        });
        let token = CancelToken::new();
        token.cancel();
        let rules: Vec<SharedRule> = vec![Arc::new(CheckPositive)];
        let err = coordinator
            .validate_batch(&rows(&[1.0, 2.0]), &rules, Some(&token))
            .unwrap_err();
        assert_eq!(err, ValidateError::Cancelled);
    }

    #[test]
    fn short_circuit_all_stops_at_first_failure() {
        let coordinator = coordinator();
        let tree = RuleNode::AllShortCircuit(vec![
            RuleNode::Leaf(Arc::new(CheckPositive)),
            RuleNode::Leaf(Arc::new(PanickingRule)),
        ]);
        // First child fails on a negative value, so the panicking rule is
        // never evaluated.
        let (valid, results) = coordinator.validate_tree(&row(-1.0), &tree);
        assert!(!valid);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rule_id, "positive");
    }

    #[test]
    fn short_circuit_any_stops_at_first_success() {
        let coordinator = coordinator();
        let tree = RuleNode::AnyShortCircuit(vec![
            RuleNode::Leaf(Arc::new(CheckPositive)),
            RuleNode::Leaf(Arc::new(PanickingRule)),
        ]);
        let (valid, results) = coordinator.validate_tree(&row(5.0), &tree);
        assert!(valid);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn eager_all_and_any_evaluate_every_child() {
        let coordinator = coordinator();
        let tree = RuleNode::All(vec![
            RuleNode::Leaf(Arc::new(CheckPositive)),
            RuleNode::Leaf(Arc::new(CheckPositive)),
        ]);
        let (valid, results) = coordinator.validate_tree(&row(-1.0), &tree);
        assert!(!valid);
        assert_eq!(results.len(), 2);

        let tree = RuleNode::Any(vec![
            RuleNode::Leaf(Arc::new(CheckPositive)),
            RuleNode::Leaf(Arc::new(CheckPositive)),
        ]);
        let (valid, results) = coordinator.validate_tree(&row(2.0), &tree);
        assert!(valid);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn bulk_timeout_is_isolated_to_the_offending_pair() {
        let coordinator = coordinator();
        let rules: Vec<SharedRule> = vec![
            Arc::new(SlowRule {
                delay: Duration::from_secs(60),
            }),
            Arc::new(CheckPositive),
        ];
        let start = Instant::now();
        let report = coordinator
            .validate_batch(&rows(&[1.0]), &rules, None)
            .unwrap();
        let elapsed = start.elapsed();

        let (_, results) = &report.row_results[0];
        assert_eq!(results[0].severity, Severity::Timeout);
        assert!(results[1].is_valid, "later rules still run after a timeout");
        assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    }
}
