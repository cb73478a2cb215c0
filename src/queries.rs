//! Per-query results (`results.log`) and their plan fingerprints.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use std::collections::BTreeMap;
use std::path::Path;

use crate::{CollectError, CollectResult, plan_hash, read_artifact};

pub const RESULTS_FILE: &str = "results.log";
pub const EXPLAIN_DIR: &str = "explain";

static LEADING_INT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\+?([0-9]+)").expect("leading int pattern"));

static LEADING_FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?)")
        .expect("leading float pattern")
});

pub type QueryId = u32;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Measured duration in seconds.
    pub duration: f64,
    pub plan_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    Completed { duration: f64 },
    /// Hit the timeout; the duration must not be reported.
    Cancelled,
}

impl QueryResult {
    pub fn outcome(&self, timeout_secs: f64) -> QueryOutcome {
        if self.duration < timeout_secs {
            QueryOutcome::Completed {
                duration: self.duration,
            }
        } else {
            QueryOutcome::Cancelled
        }
    }

    /// Duration clamped to the timeout, for totals that include cancelled queries.
    pub fn capped_duration(&self, timeout_secs: f64) -> f64 {
        self.duration.min(timeout_secs)
    }
}

/// Parses one `<id>=<duration>` line. Lines without `=` yield `None`.
///
/// In permissive mode a garbled id or duration is coerced from its leading
/// numeric prefix (zero when there is none), matching what the benchmark
/// driver leaves behind for killed queries. In strict mode it is an error.
pub fn parse_result_line(
    line: &str,
    line_no: usize,
    strict: bool,
) -> CollectResult<Option<(QueryId, f64)>> {
    let mut parts = line.split('=');
    let (Some(id_part), Some(duration_part)) = (parts.next(), parts.next()) else {
        return Ok(None);
    };

    let exact_id = id_part.trim().parse::<QueryId>().ok();
    let exact_duration = duration_part
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite());

    match (exact_id, exact_duration, parts.next()) {
        (Some(id), Some(duration), None) => return Ok(Some((id, duration))),
        _ if strict => {
            return Err(CollectError::MalformedResultLine {
                line: line_no,
                content: line.to_string(),
            });
        }
        _ => {}
    }

    let id = coerce_int(id_part);
    let duration = coerce_float(duration_part);
    tracing::warn!(line = line_no, content = %line.trim_end(), id, duration, "coerced garbled results line");
    Ok(Some((id, duration)))
}

fn coerce_int(s: &str) -> QueryId {
    LEADING_INT
        .captures(s)
        .and_then(|c| c[1].parse::<QueryId>().ok())
        .unwrap_or(0)
}

fn coerce_float(s: &str) -> f64 {
    LEADING_FLOAT
        .captures(s)
        .and_then(|c| c[1].parse::<f64>().ok())
        .filter(|d| d.is_finite())
        .unwrap_or(0.0)
}

/// Reads `results.log` and hashes the companion plan of every listed query.
pub fn load_queries(dir: &Path, strict: bool) -> CollectResult<BTreeMap<QueryId, QueryResult>> {
    let text = read_artifact(&dir.join(RESULTS_FILE))?;
    let explain = dir.join(EXPLAIN_DIR);

    let mut queries = BTreeMap::new();
    for (idx, line) in text.lines().enumerate() {
        let Some((id, duration)) = parse_result_line(line, idx + 1, strict)? else {
            continue;
        };
        let plan_hash = plan_hash(&explain.join(id.to_string()))?;
        if queries
            .insert(id, QueryResult { duration, plan_hash })
            .is_some()
        {
            tracing::warn!(query = id, line = idx + 1, "duplicate query id, keeping the later entry");
        }
    }
    tracing::debug!(count = queries.len(), "loaded query results");
    Ok(queries)
}
