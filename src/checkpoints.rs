//! Checkpoint activity from the PostgreSQL server log.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use time::PrimitiveDateTime;
use time::macros::format_description;

use std::path::Path;

use crate::{CollectError, CollectResult, read_artifact};

const PREFIX: &str = r"^([0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2})\.[0-9]{3} [A-Z]+ [0-9]+ :[a-z0-9]+\.[a-z0-9]+\s+LOG:\s+";

static CHECKPOINT_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("{PREFIX}checkpoint starting: (.*)$")).expect("checkpoint start pattern")
});

static CHECKPOINT_COMPLETE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("{PREFIX}checkpoint complete: wrote ([0-9]+) buffers"))
        .expect("checkpoint complete pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub started_at: PrimitiveDateTime,
    pub finished_at: Option<PrimitiveDateTime>,
    pub cause: String,
    pub buffers: Option<u64>,
}

impl Checkpoint {
    pub fn is_timed(&self) -> bool {
        self.cause.split_whitespace().any(|w| w == "time")
    }

    pub fn duration_secs(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).whole_seconds())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckpointStats {
    pub count: usize,
    pub timed: usize,
    pub requested: usize,
    pub buffers_written: u64,
    pub total_secs: i64,
}

impl CheckpointStats {
    pub fn from_checkpoints(checkpoints: &[Checkpoint]) -> Self {
        let timed = checkpoints.iter().filter(|c| c.is_timed()).count();
        Self {
            count: checkpoints.len(),
            timed,
            requested: checkpoints.len() - timed,
            buffers_written: checkpoints.iter().filter_map(|c| c.buffers).sum(),
            total_secs: checkpoints.iter().filter_map(Checkpoint::duration_secs).sum(),
        }
    }
}

fn parse_stamp(stamp: &str, path: &Path, line: usize) -> CollectResult<PrimitiveDateTime> {
    PrimitiveDateTime::parse(
        stamp,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .map_err(|e| CollectError::MalformedLogLine {
        path: path.to_path_buf(),
        line,
        reason: format!("invalid timestamp {stamp:?}: {e}"),
    })
}

/// Parses checkpoint start/complete pairs; `path` is used for error reporting.
pub fn parse_checkpoints(text: &str, path: &Path) -> CollectResult<Vec<Checkpoint>> {
    let mut out: Vec<Checkpoint> = Vec::new();
    for (idx, row) in text.lines().enumerate() {
        let row = row.trim();
        if let Some(caps) = CHECKPOINT_START.captures(row) {
            out.push(Checkpoint {
                started_at: parse_stamp(&caps[1], path, idx + 1)?,
                finished_at: None,
                cause: caps[2].trim().to_string(),
                buffers: None,
            });
        } else if let Some(caps) = CHECKPOINT_COMPLETE.captures(row) {
            let finished_at = parse_stamp(&caps[1], path, idx + 1)?;
            match out.last_mut() {
                Some(open) if open.finished_at.is_none() => {
                    open.finished_at = Some(finished_at);
                    open.buffers = caps[2].parse().ok();
                }
                _ => tracing::warn!(line = idx + 1, "checkpoint completion without a start"),
            }
        }
    }
    Ok(out)
}

pub fn load_checkpoints(path: &Path) -> CollectResult<Vec<Checkpoint>> {
    let text = read_artifact(path)?;
    let checkpoints = parse_checkpoints(&text, path)?;
    tracing::debug!(count = checkpoints.len(), log = %path.display(), "parsed checkpoints");
    Ok(checkpoints)
}
