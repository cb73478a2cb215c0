//! Operator-facing summary of a collected run.

use serde::Serialize;
use time::macros::format_description;

use std::collections::BTreeMap;
use std::path::Path;

use crate::{CheckpointStats, Config, Marker, Phase, QueryId, QueryOutcome, RunAggregate};

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub input: String,
    pub output: String,
    pub phases: BTreeMap<Phase, i64>,
    pub markers: Vec<MarkerSummary>,
    pub hit_ratio: f64,
    pub query_timeout_secs: u64,
    pub completed: Vec<QueryId>,
    pub cancelled: Vec<QueryId>,
    /// Sum of query durations with each one capped at the timeout.
    pub capped_query_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoints: Option<CheckpointStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkerSummary {
    pub marker: Marker,
    pub clock: Option<String>,
    pub counter: i64,
}

impl RunSummary {
    pub fn new(
        run: &RunAggregate,
        config: &Config,
        input: &Path,
        output: &Path,
        checkpoints: Option<CheckpointStats>,
    ) -> Self {
        let timeout = config.query_timeout();
        let mut completed = Vec::new();
        let mut cancelled = Vec::new();
        for (id, result) in &run.queries {
            match result.outcome(timeout) {
                QueryOutcome::Completed { .. } => completed.push(*id),
                QueryOutcome::Cancelled => cancelled.push(*id),
            }
        }

        let markers = run
            .timeline
            .events
            .iter()
            .map(|e| MarkerSummary {
                marker: e.marker,
                clock: e
                    .clock
                    .and_then(|t| t.format(format_description!("[hour]:[minute]:[second]")).ok()),
                counter: e.counter,
            })
            .collect();

        Self {
            input: input.display().to_string(),
            output: output.display().to_string(),
            phases: run.timeline.durations.clone(),
            markers,
            hit_ratio: run.stats.hit_ratio,
            query_timeout_secs: config.query_timeout_secs,
            completed,
            cancelled,
            capped_query_secs: run
                .queries
                .values()
                .map(|q| q.capped_duration(timeout))
                .sum(),
            checkpoints,
        }
    }

    pub fn phase_line(&self) -> String {
        Phase::ALL
            .iter()
            .map(|p| match self.phases.get(p) {
                Some(secs) => format!("{}={secs}s", p.as_str()),
                None => format!("{}=?", p.as_str()),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
