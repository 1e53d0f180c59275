//! Folding outcomes into one run-wide result.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::outcome::{Diagnostic, ValidationOutcome};

/// Final result of a run: one pass/fail bit plus every outcome produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateResult {
    pub any_failed: bool,
    pub outcomes: Vec<ValidationOutcome>,
}

impl AggregateResult {
    /// Combine two results. Associative and, up to outcome order, commutative.
    pub fn merge(mut self, other: AggregateResult) -> AggregateResult {
        self.any_failed |= other.any_failed;
        self.outcomes.extend(other.outcomes);
        self
    }

    /// Outcomes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &ValidationOutcome> {
        self.outcomes.iter().filter(|o| !o.ok)
    }

    /// Every diagnostic of every outcome.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.outcomes.iter().flat_map(|o| o.diagnostics.iter())
    }

    /// Order outcomes by scope, then subject.
    pub fn sorted(mut self) -> AggregateResult {
        self.outcomes
            .sort_by(|a, b| (a.scope, &a.subject).cmp(&(b.scope, &b.subject)));
        self
    }
}

/// Accumulates outcomes. Nothing recorded is ever dropped and a failure is
/// never forgotten.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    result: AggregateResult,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: ValidationOutcome) {
        if !outcome.ok {
            self.result.any_failed = true;
        }
        self.result.outcomes.push(outcome);
    }

    pub fn finish(self) -> AggregateResult {
        self.result.sorted()
    }
}

/// An aggregator shared between concurrent workers.
#[derive(Debug, Clone, Default)]
pub struct SharedAggregator {
    inner: Arc<Mutex<ResultAggregator>>,
}

impl SharedAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, outcome: ValidationOutcome) {
        self.inner.lock().await.record(outcome);
    }

    /// Take everything recorded so far, leaving the aggregator empty.
    pub async fn take(&self) -> AggregateResult {
        std::mem::take(&mut *self.inner.lock().await).finish()
    }
}
