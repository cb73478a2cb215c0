//! Phase durations from the benchmark driver's shell log (`bench.log`).
//!
//! The driver prints one marker line per preparation step, e.g.
//!
//! ```text
//! 10:00:50 [150] :   creating primary keys
//! ```
//!
//! where `150` is the driver's elapsed-seconds counter. Every marker after
//! `loading data` closes the phase started by the marker before it. Markers
//! are expected in table order, each exactly once; a reordered or duplicated
//! marker is reported but still attributed by the table, so the resulting
//! durations are wrong for such logs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use time::Time;
use time::macros::format_description;

use std::collections::BTreeMap;
use std::path::Path;

use crate::{CollectResult, read_artifact};

pub const BENCH_LOG_FILE: &str = "bench.log";

static MARKER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{2}:[0-9]{2}:[0-9]{2}) \[([0-9]+)\] :\s+(.*?)\s*$").expect("marker line pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Load,
    Pkeys,
    Fkeys,
    Indexes,
    Analyze,
    Benchmark,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Load,
        Phase::Pkeys,
        Phase::Fkeys,
        Phase::Indexes,
        Phase::Analyze,
        Phase::Benchmark,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Load => "load",
            Phase::Pkeys => "pkeys",
            Phase::Fkeys => "fkeys",
            Phase::Indexes => "indexes",
            Phase::Analyze => "analyze",
            Phase::Benchmark => "benchmark",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Prepare,
    LoadData,
    PrimaryKeys,
    ForeignKeys,
    Indexes,
    Analyze,
    RunBenchmark,
    FinishBenchmark,
}

struct MarkerRule {
    marker: Marker,
    phrase: &'static str,
    closes: Option<Phase>,
}

/// Recognised markers in their expected order.
const MARKERS: &[MarkerRule] = &[
    MarkerRule { marker: Marker::Prepare, phrase: "preparing TPC-H database", closes: None },
    MarkerRule { marker: Marker::LoadData, phrase: "loading data", closes: None },
    MarkerRule { marker: Marker::PrimaryKeys, phrase: "creating primary keys", closes: Some(Phase::Load) },
    MarkerRule { marker: Marker::ForeignKeys, phrase: "creating foreign keys", closes: Some(Phase::Pkeys) },
    MarkerRule { marker: Marker::Indexes, phrase: "creating indexes", closes: Some(Phase::Fkeys) },
    MarkerRule { marker: Marker::Analyze, phrase: "analyzing", closes: Some(Phase::Indexes) },
    MarkerRule { marker: Marker::RunBenchmark, phrase: "running TPC-H benchmark", closes: Some(Phase::Analyze) },
    MarkerRule { marker: Marker::FinishBenchmark, phrase: "finished TPC-H benchmark", closes: Some(Phase::Benchmark) },
];

/// One recognised marker line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerEvent {
    pub marker: Marker,
    /// Wall-clock stamp printed by the driver, if it is a valid time of day.
    pub clock: Option<Time>,
    /// Driver's elapsed-seconds counter.
    pub counter: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseTimeline {
    pub events: Vec<MarkerEvent>,
    pub durations: BTreeMap<Phase, i64>,
}

impl PhaseTimeline {
    pub fn duration(&self, phase: Phase) -> Option<i64> {
        self.durations.get(&phase).copied()
    }

    pub fn parse(text: &str) -> Self {
        let mut timeline = Self::default();
        let mut cursor = 0i64;
        let mut expected = 0usize;

        for (idx, line) in text.lines().enumerate() {
            let Some(caps) = MARKER_LINE.captures(line) else {
                continue;
            };
            let message = caps.get(3).map_or("", |m| m.as_str());
            let Some(pos) = MARKERS.iter().position(|m| message.starts_with(m.phrase)) else {
                continue;
            };
            let rule = &MARKERS[pos];
            let Ok(counter) = caps[2].parse::<i64>() else {
                tracing::warn!(line = idx + 1, "marker counter out of range, skipping");
                continue;
            };
            let clock = Time::parse(&caps[1], format_description!("[hour]:[minute]:[second]")).ok();
            if clock.is_none() {
                tracing::warn!(line = idx + 1, stamp = &caps[1], "invalid wall-clock stamp");
            }

            if pos != expected {
                tracing::warn!(
                    line = idx + 1,
                    marker = ?rule.marker,
                    "marker out of sequence, phase attribution may be wrong"
                );
            }
            expected = pos + 1;

            if let Some(phase) = rule.closes {
                timeline.durations.insert(phase, counter - cursor);
            }
            cursor = counter;
            timeline.events.push(MarkerEvent {
                marker: rule.marker,
                clock,
                counter,
            });
        }
        timeline
    }

    pub fn load(path: &Path) -> CollectResult<Self> {
        let text = read_artifact(path)?;
        let timeline = Self::parse(&text);
        tracing::debug!(
            markers = timeline.events.len(),
            phases = timeline.durations.len(),
            "parsed phase timeline"
        );
        Ok(timeline)
    }
}
