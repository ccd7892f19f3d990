//! Filter execution
//!
//! Drives an expression tree across a collection of entries, sequentially or
//! in parallel partitions, with a cooperative wall-clock budget. The matched
//! output always preserves the input order of entries, regardless of which
//! worker finished first, and a run that exceeds its budget returns partial
//! results flagged incomplete rather than failing.

use crate::entry::FilterableEntry;
use crate::errors::SchemaError;
use crate::filter::config::FilterConfiguration;
use crate::filter::expression::ExpressionNode;
use crate::filter::optimizer;
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Tuning knobs for one execution run.
///
/// Treated as an immutable snapshot for the duration of the run; it is not
/// persisted with the filter tree.
#[derive(Debug, Clone)]
pub struct FilterContext {
    /// Caller's estimate of how many entries will be pushed through.
    pub estimated_total_count: usize,
    /// Wall-clock budget for the whole run.
    pub max_execution_time: Duration,
    pub enable_optimization: bool,
    pub enable_parallel_execution: bool,
    /// Number of entries evaluated per batch; cancellation is only checked
    /// at batch boundaries.
    pub batch_size: usize,
    /// Optional caller-supplied cancellation signal, polled alongside the
    /// timeout at batch boundaries.
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl Default for FilterContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterContext {
    pub fn new() -> Self {
        Self {
            estimated_total_count: 0,
            max_execution_time: Duration::from_secs(30),
            enable_optimization: true,
            enable_parallel_execution: true,
            batch_size: 1000,
            cancel_flag: None,
        }
    }

    pub fn with_estimated_total_count(mut self, count: usize) -> Self {
        self.estimated_total_count = count;
        self
    }

    pub fn with_max_execution_time(mut self, budget: Duration) -> Self {
        self.max_execution_time = budget;
        self
    }

    pub fn optimization(mut self, enabled: bool) -> Self {
        self.enable_optimization = enabled;
        self
    }

    pub fn parallel_execution(mut self, enabled: bool) -> Self {
        self.enable_parallel_execution = enabled;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}

/// Telemetry for one execution run. Produced fresh per call.
#[derive(Debug, Clone)]
pub struct FilterExecutionInfo {
    pub execution_time: Duration,
    /// Entries visited, including those visited before a cancelled run
    /// stopped.
    pub items_processed: usize,
    pub items_matched: usize,
    /// `items_matched / items_processed`, `0.0` for an empty run.
    pub actual_selectivity: f64,
    pub filter_description: String,
    /// False when the run was cut short by timeout or cancellation.
    pub completed: bool,
}

/// Execute a configuration against a collection of entries.
///
/// Fails only on a structurally invalid configuration; per-entry anomalies
/// degrade to non-matches inside the evaluator.
pub fn execute<E>(
    config: &FilterConfiguration,
    entries: &[E],
    context: &FilterContext,
) -> Result<(Vec<E>, FilterExecutionInfo), SchemaError>
where
    E: FilterableEntry + Clone + Send + Sync,
{
    let expression = config.build_expression()?;
    Ok(run(&expression, entries, context, config.filter_description()))
}

/// Execute a bare expression tree against a collection of entries.
pub fn execute_expression<E>(
    node: &ExpressionNode,
    entries: &[E],
    context: &FilterContext,
) -> (Vec<E>, FilterExecutionInfo)
where
    E: FilterableEntry + Clone + Send + Sync,
{
    run(node, entries, context, node.to_string())
}

fn run<E>(
    node: &ExpressionNode,
    entries: &[E],
    context: &FilterContext,
    filter_description: String,
) -> (Vec<E>, FilterExecutionInfo)
where
    E: FilterableEntry + Clone + Send + Sync,
{
    let started = Instant::now();
    let deadline = started + context.max_execution_time;
    let batch_size = context.batch_size.max(1);

    let optimized;
    let node = if context.enable_optimization {
        optimized = optimizer::optimize(node);
        &optimized
    } else {
        node
    };

    let parallel = context.enable_parallel_execution && entries.len() > batch_size;
    let (matched, items_processed, completed) = if parallel {
        run_parallel(node, entries, batch_size, deadline, context)
    } else {
        run_sequential(node, entries, batch_size, deadline, context)
    };

    if !completed {
        warn!(
            filter = %filter_description,
            items_processed,
            "filter run stopped before visiting every entry"
        );
    }

    let items_matched = matched.len();
    let actual_selectivity = if items_processed == 0 {
        0.0
    } else {
        items_matched as f64 / items_processed as f64
    };
    let info = FilterExecutionInfo {
        execution_time: started.elapsed(),
        items_processed,
        items_matched,
        actual_selectivity,
        filter_description,
        completed,
    };
    debug!(
        items_processed = info.items_processed,
        items_matched = info.items_matched,
        completed = info.completed,
        "filter run finished"
    );
    (matched, info)
}

fn run_sequential<E>(
    node: &ExpressionNode,
    entries: &[E],
    batch_size: usize,
    deadline: Instant,
    context: &FilterContext,
) -> (Vec<E>, usize, bool)
where
    E: FilterableEntry + Clone,
{
    let mut matched = Vec::new();
    let mut processed = 0usize;

    for chunk in entries.chunks(batch_size) {
        if context.is_cancelled() || Instant::now() >= deadline {
            return (matched, processed, false);
        }
        for entry in chunk {
            if node.matches(entry) {
                matched.push(entry.clone());
            }
        }
        processed += chunk.len();
    }

    (matched, processed, true)
}

fn run_parallel<E>(
    node: &ExpressionNode,
    entries: &[E],
    batch_size: usize,
    deadline: Instant,
    context: &FilterContext,
) -> (Vec<E>, usize, bool)
where
    E: FilterableEntry + Clone + Send + Sync,
{
    let halted = AtomicBool::new(false);

    // Ordered collect keeps chunk results in input order, so concatenation
    // below is input-order-stable no matter which worker finished first.
    let chunk_results: Vec<(Vec<E>, usize)> = entries
        .par_chunks(batch_size)
        .map(|chunk| {
            if halted.load(Ordering::Relaxed)
                || context.is_cancelled()
                || Instant::now() >= deadline
            {
                halted.store(true, Ordering::Relaxed);
                return (Vec::new(), 0);
            }
            let matched = chunk
                .iter()
                .filter(|entry| node.matches(*entry))
                .cloned()
                .collect();
            (matched, chunk.len())
        })
        .collect();

    let completed = !halted.load(Ordering::Relaxed);
    let mut matched = Vec::new();
    let mut processed = 0usize;
    for (chunk_matched, chunk_processed) in chunk_results {
        matched.extend(chunk_matched);
        processed += chunk_processed;
    }

    (matched, processed, completed)
}
