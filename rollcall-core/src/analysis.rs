//! Analysis orchestration.
//!
//! Sequences statistics, day patterns and the summary into a
//! [`LocalAnalysis`], and for AI runs builds a prompt and asks the
//! configured [`TextGenerator`]. Successful AI results can be forwarded to a
//! [`SyncSink`] in the background; that forwarding never changes the result
//! returned to the caller.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::analytics::patterns::detect_day_patterns;
use crate::analytics::statistics::compute_statistics;
use crate::analytics::summary::LocalAnalysis;
use crate::error::Error as CoreError;
use crate::llm::TextGenerator;
use crate::prompt::{build_prompt, AnalysisKind};
use crate::sync::{SyncClient, SyncPayload, SyncSink};
use crate::types::{parse_date_key, AttendanceHistory, Roster, StudentStatistic};

/// Outcome of a local or AI analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// Model output; `None` for local-only runs
    pub generated_text: Option<String>,
    pub local_analysis: LocalAnalysis,
    pub statistics: Vec<StudentStatistic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisErrorKind {
    /// The roster or history could not be analyzed
    ComputationFailure,
    /// The model service failed or answered with something unusable
    ExternalServiceFailure,
}

impl std::fmt::Display for AnalysisErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisErrorKind::ComputationFailure => f.write_str("computation failure"),
            AnalysisErrorKind::ExternalServiceFailure => f.write_str("external service failure"),
        }
    }
}

/// Failure returned by the analysis entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct AnalysisError {
    pub kind: AnalysisErrorKind,
    pub message: String,
}

impl AnalysisError {
    pub fn computation(message: impl Into<String>) -> Self {
        Self {
            kind: AnalysisErrorKind::ComputationFailure,
            message: message.into(),
        }
    }

    pub fn external(message: impl Into<String>) -> Self {
        Self {
            kind: AnalysisErrorKind::ExternalServiceFailure,
            message: message.into(),
        }
    }
}

impl From<CoreError> for AnalysisError {
    fn from(err: CoreError) -> Self {
        if err.is_external() {
            Self::external(err.to_string())
        } else {
            Self::computation(err.to_string())
        }
    }
}

/// Statistics, day patterns and summary for a roster and history.
///
/// Inputs are only read. A history keyed by something other than a calendar
/// date is reported as [`AnalysisErrorKind::ComputationFailure`].
pub fn run_local_analysis(
    roster: &Roster,
    history: &AttendanceHistory,
) -> Result<AnalysisResult, AnalysisError> {
    if let Some(bad) = history.keys().find(|k| parse_date_key(k).is_none()) {
        return Err(AnalysisError::computation(format!(
            "attendance history has an invalid date key: {:?}",
            bad
        )));
    }

    let statistics = compute_statistics(roster, history);
    let patterns = detect_day_patterns(history);
    let local_analysis = LocalAnalysis::new(&statistics, patterns);

    tracing::debug!(
        students = statistics.len(),
        patterns = local_analysis.patterns.len(),
        "Local analysis complete"
    );

    Ok(AnalysisResult {
        generated_text: None,
        local_analysis,
        statistics,
    })
}

/// Runs analyses against a text generator, optionally forwarding results.
pub struct Analyzer<G, S = SyncClient> {
    generator: G,
    sync: Option<Arc<S>>,
    /// Detached forwarding tasks; dropping a handle does not cancel its task
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl<G: TextGenerator> Analyzer<G> {
    /// Analyzer without result forwarding.
    pub fn new(generator: G) -> Self {
        Self::with_sink(generator, None)
    }
}

impl<G: TextGenerator, S: SyncSink> Analyzer<G, S> {
    /// Analyzer forwarding successful AI results to `sink` when present.
    pub fn with_sink(generator: G, sink: Option<S>) -> Self {
        Self {
            generator,
            sync: sink.map(Arc::new),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn forwards_results(&self) -> bool {
        self.sync.is_some()
    }

    /// Same as the free [`run_local_analysis`].
    pub fn run_local_analysis(
        &self,
        roster: &Roster,
        history: &AttendanceHistory,
    ) -> Result<AnalysisResult, AnalysisError> {
        run_local_analysis(roster, history)
    }

    /// Local analysis followed by one generation request.
    ///
    /// A generator failure is returned as
    /// [`AnalysisErrorKind::ExternalServiceFailure`]; no substitute text is
    /// produced.
    pub async fn run_ai_analysis(
        &self,
        roster: &Roster,
        history: &AttendanceHistory,
        kind: &AnalysisKind,
    ) -> Result<AnalysisResult, AnalysisError> {
        let mut result = run_local_analysis(roster, history)?;
        let prompt = build_prompt(kind, &result.statistics, &result.local_analysis);

        tracing::info!(kind = kind.as_str(), "Running AI analysis");
        let text = self.generator.generate(&prompt).await.map_err(|e| {
            tracing::warn!(kind = kind.as_str(), error = %e, "AI analysis failed");
            AnalysisError::external(e.to_string())
        })?;

        result.generated_text = Some(text);
        self.forward(&result);
        Ok(result)
    }

    /// Wait for background forwarding started by earlier runs.
    ///
    /// Optional: forwarding also completes if the analyzer is dropped first.
    pub async fn flush_sync(&self) {
        let pending = std::mem::take(&mut *self.pending.lock().unwrap());
        for handle in pending {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Sync task did not complete");
            }
        }
    }

    /// Forwarding tasks started and not yet seen finished.
    pub fn pending_syncs(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    fn forward(&self, result: &AnalysisResult) {
        let Some(sink) = self.sync.clone() else {
            return;
        };

        let payload = SyncPayload::new(
            result.generated_text.clone(),
            result.statistics.clone(),
            result.local_analysis.clone(),
            Utc::now(),
        );

        let handle = tokio::spawn(async move {
            match sink.send(payload).await {
                Ok(receipt) => tracing::info!(message = %receipt.message, "Analysis synced"),
                Err(e) => tracing::warn!(error = %e, "Analysis sync failed"),
            }
        });

        let mut pending = self.pending.lock().unwrap();
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }
}
