//! Before/after statistics snapshots and their delta.
//!
//! A snapshot file is the psql output of two reports: `pg_stat_bgwriter`
//! (data row on line 3) and `pg_stat_database` for the benchmark database
//! (data row on line 8). Only those two rows are read.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use std::collections::BTreeMap;
use std::path::Path;

use crate::{CollectError, CollectResult, read_artifact};

pub const STATS_BEFORE_FILE: &str = "stats-before.log";
pub const STATS_AFTER_FILE: &str = "stats-after.log";

/// Zero-based line index of the bgwriter data row.
const BGWRITER_LINE: usize = 2;
/// Zero-based line index of the database data row.
const DATABASE_LINE: usize = 7;

static BGWRITER_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s+([0-9]+)\s\|\s+([0-9]+)\s\|\s+([0-9]+)\s\|\s+([0-9]+)\s\|\s+([0-9]+)\s\|\s+([0-9]+)\s\|\s+([0-9]+)\s*$")
        .expect("bgwriter row pattern")
});

static DATABASE_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^\s+([0-9]+)\s\|\s+([a-zA-Z_\-]+)\s+\|",
        r"\s+([0-9]+)\s\|\s+([0-9]+)\s\|\s+([0-9]+)\s\|\s+([0-9]+)\s\|\s+([0-9]+)\s\|",
        r"\s+([0-9]+)\s\|\s+([0-9]+)\s\|\s+([0-9]+)\s\|\s+([0-9]+)\s\|\s+([0-9]+)\s*$",
    ))
    .expect("database row pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Counter {
    CheckpointsTimed,
    CheckpointsReq,
    BuffersCheckpoint,
    BuffersClean,
    MaxwrittenClean,
    BuffersBackend,
    BuffersAlloc,
    XactCommit,
    XactRollback,
    BlocksRead,
    BlocksHit,
    TuplesReturned,
    TuplesFetched,
    TuplesInserted,
    TuplesUpdated,
    TuplesDeleted,
}

/// Which report row a counter lives in, and its capture group there.
#[derive(Debug, Clone, Copy)]
enum Source {
    Bgwriter(usize),
    Database(usize),
}

impl Counter {
    pub const ALL: [Counter; 16] = [
        Counter::CheckpointsTimed,
        Counter::CheckpointsReq,
        Counter::BuffersCheckpoint,
        Counter::BuffersClean,
        Counter::MaxwrittenClean,
        Counter::BuffersBackend,
        Counter::BuffersAlloc,
        Counter::XactCommit,
        Counter::XactRollback,
        Counter::BlocksRead,
        Counter::BlocksHit,
        Counter::TuplesReturned,
        Counter::TuplesFetched,
        Counter::TuplesInserted,
        Counter::TuplesUpdated,
        Counter::TuplesDeleted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Counter::CheckpointsTimed => "checkpoints_timed",
            Counter::CheckpointsReq => "checkpoints_req",
            Counter::BuffersCheckpoint => "buffers_checkpoint",
            Counter::BuffersClean => "buffers_clean",
            Counter::MaxwrittenClean => "maxwritten_clean",
            Counter::BuffersBackend => "buffers_backend",
            Counter::BuffersAlloc => "buffers_alloc",
            Counter::XactCommit => "xact_commit",
            Counter::XactRollback => "xact_rollback",
            Counter::BlocksRead => "blocks_read",
            Counter::BlocksHit => "blocks_hit",
            Counter::TuplesReturned => "tuples_returned",
            Counter::TuplesFetched => "tuples_fetched",
            Counter::TuplesInserted => "tuples_inserted",
            Counter::TuplesUpdated => "tuples_updated",
            Counter::TuplesDeleted => "tuples_deleted",
        }
    }

    fn source(self) -> Source {
        match self {
            Counter::CheckpointsTimed => Source::Bgwriter(1),
            Counter::CheckpointsReq => Source::Bgwriter(2),
            Counter::BuffersCheckpoint => Source::Bgwriter(3),
            Counter::BuffersClean => Source::Bgwriter(4),
            Counter::MaxwrittenClean => Source::Bgwriter(5),
            Counter::BuffersBackend => Source::Bgwriter(6),
            Counter::BuffersAlloc => Source::Bgwriter(7),
            // groups 1..=3 are datid, datname and numbackends
            Counter::XactCommit => Source::Database(4),
            Counter::XactRollback => Source::Database(5),
            Counter::BlocksRead => Source::Database(6),
            Counter::BlocksHit => Source::Database(7),
            Counter::TuplesReturned => Source::Database(8),
            Counter::TuplesFetched => Source::Database(9),
            Counter::TuplesInserted => Source::Database(10),
            Counter::TuplesUpdated => Source::Database(11),
            Counter::TuplesDeleted => Source::Database(12),
        }
    }
}

/// Counter values captured by one snapshot file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub database: String,
    values: BTreeMap<Counter, i64>,
}

impl StatsSnapshot {
    pub fn load(path: &Path) -> CollectResult<Self> {
        let text = read_artifact(path)?;
        Self::parse(&text, path)
    }

    /// Parses snapshot text; `path` is only used for error reporting.
    pub fn parse(text: &str, path: &Path) -> CollectResult<Self> {
        let lines: Vec<&str> = text.lines().collect();

        let bgwriter = capture_row(&lines, BGWRITER_LINE, &BGWRITER_ROW, path)?;
        let db = capture_row(&lines, DATABASE_LINE, &DATABASE_ROW, path)?;

        let mut values = BTreeMap::new();
        for counter in Counter::ALL {
            let (row, line, group) = match counter.source() {
                Source::Bgwriter(group) => (&bgwriter, BGWRITER_LINE, group),
                Source::Database(group) => (&db, DATABASE_LINE, group),
            };
            let raw = &row[group];
            let value = raw.parse::<i64>().map_err(|e| CollectError::MalformedSnapshot {
                path: path.to_path_buf(),
                line: line + 1,
                reason: format!("{} value {raw:?} out of range: {e}", counter.as_str()),
            })?;
            values.insert(counter, value);
        }

        Ok(Self {
            database: db[2].clone(),
            values,
        })
    }

    pub fn get(&self, counter: Counter) -> i64 {
        self.values.get(&counter).copied().unwrap_or_default()
    }
}

fn capture_row(
    lines: &[&str],
    index: usize,
    pattern: &Regex,
    path: &Path,
) -> CollectResult<Vec<String>> {
    let malformed = |reason: String| CollectError::MalformedSnapshot {
        path: path.to_path_buf(),
        line: index + 1,
        reason,
    };
    let line = lines
        .get(index)
        .ok_or_else(|| malformed(format!("file has only {} lines", lines.len())))?;
    let caps = pattern
        .captures(line)
        .ok_or_else(|| malformed(format!("row does not match expected columns: {line:?}")))?;
    Ok(caps
        .iter()
        .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
        .collect())
}

/// Counter deltas between two snapshots plus the derived cache hit ratio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsDelta {
    pub counters: BTreeMap<Counter, i64>,
    /// Percentage of block requests served from shared buffers, one decimal.
    pub hit_ratio: f64,
}

impl StatsDelta {
    /// Computes `after - before` for every counter. Negative deltas (a
    /// counter reset mid-run) are passed through unchanged.
    pub fn between(before: &StatsSnapshot, after: &StatsSnapshot) -> CollectResult<Self> {
        let counters: BTreeMap<Counter, i64> = Counter::ALL
            .iter()
            .map(|&c| (c, after.get(c).wrapping_sub(before.get(c))))
            .collect();
        let hit_ratio = hit_ratio(counters[&Counter::BlocksHit], counters[&Counter::BlocksRead])?;
        Ok(Self {
            counters,
            hit_ratio,
        })
    }

    pub fn get(&self, counter: Counter) -> i64 {
        self.counters.get(&counter).copied().unwrap_or_default()
    }
}

/// `100 * hit / (hit + read)` rounded to one decimal place.
pub fn hit_ratio(blocks_hit: i64, blocks_read: i64) -> CollectResult<f64> {
    let total = blocks_hit as f64 + blocks_read as f64;
    if total == 0.0 {
        return Err(CollectError::DivisionByZero(format!(
            "no block activity between snapshots (blocks_hit={blocks_hit}, blocks_read={blocks_read})"
        )));
    }
    let ratio = 100.0 * blocks_hit as f64 / total;
    Ok((ratio * 10.0).round() / 10.0)
}

/// Loads both snapshots from a run directory and diffs them.
pub fn load_stats(dir: &Path) -> CollectResult<StatsDelta> {
    let before = StatsSnapshot::load(&dir.join(STATS_BEFORE_FILE))?;
    let after = StatsSnapshot::load(&dir.join(STATS_AFTER_FILE))?;
    if before.database != after.database {
        tracing::warn!(
            before = %before.database,
            after = %after.database,
            "snapshots were taken on different databases"
        );
    }
    let delta = StatsDelta::between(&before, &after)?;
    tracing::debug!(hit_ratio = delta.hit_ratio, "computed stats delta");
    Ok(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{SnapshotValues, snapshot_text, temp_dir};

    fn parse(values: &SnapshotValues) -> StatsSnapshot {
        StatsSnapshot::parse(&snapshot_text(values), Path::new("test.log")).expect("parse")
    }

    #[test]
    fn parses_every_counter_from_its_column() {
        let values = SnapshotValues::sequential(100);
        let snap = parse(&values);
        assert_eq!(snap.database, "tpch");
        for (i, counter) in Counter::ALL.iter().enumerate() {
            assert_eq!(snap.get(*counter), 100 + i as i64, "{}", counter.as_str());
        }
    }

    #[test]
    fn delta_is_after_minus_before_including_negative() {
        let before = parse(&SnapshotValues::sequential(50));
        let mut after_values = SnapshotValues::sequential(80);
        after_values.set(Counter::BuffersClean, 10);
        let after = parse(&after_values);

        let delta = StatsDelta::between(&before, &after).expect("delta");
        for counter in Counter::ALL {
            assert_eq!(delta.get(counter), after.get(counter) - before.get(counter));
        }
        assert!(delta.get(Counter::BuffersClean) < 0);
    }

    #[test]
    fn hit_ratio_example() {
        let mut before = SnapshotValues::sequential(0);
        before.set(Counter::BlocksHit, 0);
        before.set(Counter::BlocksRead, 0);
        let mut after = SnapshotValues::sequential(0);
        after.set(Counter::BlocksHit, 90);
        after.set(Counter::BlocksRead, 10);

        let delta = StatsDelta::between(&parse(&before), &parse(&after)).expect("delta");
        assert_eq!(delta.get(Counter::BlocksHit), 90);
        assert_eq!(delta.get(Counter::BlocksRead), 10);
        assert_eq!(delta.hit_ratio, 90.0);
    }

    #[test]
    fn hit_ratio_rounds_to_one_decimal() {
        assert_eq!(hit_ratio(2, 1).expect("ratio"), 66.7);
        assert_eq!(hit_ratio(1, 2).expect("ratio"), 33.3);
    }

    #[test]
    fn zero_block_activity_is_an_error() {
        let err = hit_ratio(0, 0).expect_err("zero");
        assert!(matches!(err, CollectError::DivisionByZero(_)));
    }

    #[test]
    fn short_file_is_malformed() {
        let err = StatsSnapshot::parse("header\n----\n", Path::new("s.log")).expect_err("short");
        assert!(matches!(err, CollectError::MalformedSnapshot { line: 3, .. }));
    }

    #[test]
    fn extra_columns_are_malformed() {
        let valid = snapshot_text(&SnapshotValues::sequential(1));
        let widen = |index: usize, extra: &str| -> String {
            valid
                .lines()
                .enumerate()
                .map(|(i, line)| if i == index { format!("{line}{extra}") } else { line.to_string() })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let wide_bgwriter = widen(2, " |       999 |       888");
        let err = StatsSnapshot::parse(&wide_bgwriter, Path::new("s.log")).expect_err("wide bgwriter");
        assert!(matches!(err, CollectError::MalformedSnapshot { line: 3, .. }));

        let wide_database = widen(7, " |       777");
        let err = StatsSnapshot::parse(&wide_database, Path::new("s.log")).expect_err("wide database");
        assert!(matches!(err, CollectError::MalformedSnapshot { line: 8, .. }));

        assert!(StatsSnapshot::parse(&widen(2, "  "), Path::new("s.log")).is_ok());
    }

    #[test]
    fn garbled_row_is_malformed() {
        let text = snapshot_text(&SnapshotValues::sequential(1)).replace(" tpch ", " tp ch ");
        let err = StatsSnapshot::parse(&text, Path::new("s.log")).expect_err("garbled");
        assert!(matches!(err, CollectError::MalformedSnapshot { line: 8, .. }));
    }

    #[test]
    fn delta_serializes_with_counter_names() {
        let before = StatsSnapshot::parse(&snapshot_text(&SnapshotValues::sequential(1)), Path::new("b"))
            .expect("before");
        let after = StatsSnapshot::parse(&snapshot_text(&SnapshotValues::sequential(3)), Path::new("a"))
            .expect("after");
        let delta = StatsDelta::between(&before, &after).expect("delta");
        let value = serde_json::to_value(&delta).expect("json");
        assert_eq!(value["counters"]["blocks_hit"], 2);
        assert_eq!(value["hit_ratio"], 50.0);
    }

    #[test]
    fn load_stats_reads_both_files() {
        let dir = temp_dir("snapshot-load");
        std::fs::write(dir.join(STATS_BEFORE_FILE), snapshot_text(&SnapshotValues::sequential(1)))
            .expect("write before");
        std::fs::write(dir.join(STATS_AFTER_FILE), snapshot_text(&SnapshotValues::sequential(4)))
            .expect("write after");
        let delta = load_stats(&dir).expect("load");
        assert!(delta.counters.values().all(|v| *v == 3));
        assert_eq!(delta.hit_ratio, 50.0);
    }

    #[test]
    fn missing_after_snapshot_is_missing_artifact() {
        let dir = temp_dir("snapshot-missing");
        std::fs::write(dir.join(STATS_BEFORE_FILE), snapshot_text(&SnapshotValues::sequential(1)))
            .expect("write before");
        let err = load_stats(&dir).expect_err("missing after");
        assert!(matches!(err, CollectError::MissingArtifact { .. }));
    }
}
