//! Shared fixtures for unit tests: temp dirs and a synthetic run directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::Counter;

pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tpch-collect-{name}-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("mkdir");
    dir
}

/// Counter values for one synthetic snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotValues {
    values: BTreeMap<Counter, i64>,
}

impl SnapshotValues {
    /// Assigns `start`, `start + 1`, ... to the counters in column order.
    pub fn sequential(start: i64) -> Self {
        let values = Counter::ALL
            .iter()
            .enumerate()
            .map(|(i, c)| (*c, start + i as i64))
            .collect();
        Self { values }
    }

    pub fn set(&mut self, counter: Counter, value: i64) {
        self.values.insert(counter, value);
    }

    fn cells(&self, range: std::ops::Range<usize>) -> Vec<String> {
        Counter::ALL[range]
            .iter()
            .map(|c| format!("{:>10}", self.values[c]))
            .collect()
    }
}

/// Renders a snapshot the way psql prints both stats reports.
pub fn snapshot_text(values: &SnapshotValues) -> String {
    let bgwriter = values.cells(0..7).join(" |");
    let database = values.cells(7..16).join(" |");
    format!(
        " checkpoints_timed | checkpoints_req | buffers_checkpoint | buffers_clean | maxwritten_clean | buffers_backend | buffers_alloc\n\
         -------------------+-----------------+--------------------+---------------+------------------+-----------------+---------------\n\
         {bgwriter}\n\
         (1 row)\n\
         \n \
         datid | datname | numbackends | xact_commit | xact_rollback | blks_read | blks_hit | tup_returned | tup_fetched | tup_inserted | tup_updated | tup_deleted\n\
         -------+---------+-------------+-------------+---------------+-----------+----------+--------------+-------------+--------------+-------------+-------------\n \
         16384 | tpch    |           1 |{database}\n\
         (1 row)\n\n"
    )
}

pub const SAMPLE_PLAN: &str = "\
 Aggregate  (cost=1000.00..1000.01 rows=1 width=32)
   ->  Seq Scan on lineitem  (cost=0.00..172210.80 rows=5998820 width=12)
         Filter: (l_shipdate <= '1998-09-02'::date)
";

pub fn bench_log() -> String {
    [
        "10:00:00 [100] : preparing TPC-H database",
        "10:00:00 [100] :   loading data",
        "10:00:50 [150] :   creating primary keys",
        "10:01:00 [160] :   creating foreign keys",
        "10:01:30 [190] :   creating indexes",
        "10:03:10 [290] :   analyzing",
        "10:03:40 [320] : running TPC-H benchmark",
        "11:03:40 [3920] : finished TPC-H benchmark",
    ]
    .join("\n")
        + "\n"
}

/// Builds a complete run directory. Query `n` takes `n + 0.5` seconds,
/// except that entries in `overrides` replace the duration text verbatim.
pub fn write_run_dir(name: &str, overrides: &[(u32, &str)]) -> PathBuf {
    let dir = temp_dir(name);
    write_run_files(&dir, overrides);
    dir
}

pub fn write_run_files(dir: &Path, overrides: &[(u32, &str)]) {
    let mut before = SnapshotValues::sequential(1000);
    before.set(Counter::BlocksHit, 0);
    before.set(Counter::BlocksRead, 0);
    let mut after = SnapshotValues::sequential(2000);
    after.set(Counter::BlocksHit, 90);
    after.set(Counter::BlocksRead, 10);
    std::fs::write(dir.join(crate::STATS_BEFORE_FILE), snapshot_text(&before)).expect("before");
    std::fs::write(dir.join(crate::STATS_AFTER_FILE), snapshot_text(&after)).expect("after");

    let explain = dir.join(crate::EXPLAIN_DIR);
    std::fs::create_dir_all(&explain).expect("mkdir explain");
    let mut results = String::from("starting queries\n");
    for id in 1..=22u32 {
        let duration = overrides
            .iter()
            .find(|(q, _)| *q == id)
            .map(|(_, d)| d.to_string())
            .unwrap_or_else(|| format!("{}.5", id));
        results.push_str(&format!("{id}={duration}\n"));
        std::fs::write(explain.join(id.to_string()), SAMPLE_PLAN).expect("plan");
    }
    std::fs::write(dir.join(crate::RESULTS_FILE), results).expect("results");
    std::fs::write(dir.join(crate::BENCH_LOG_FILE), bench_log()).expect("bench log");
}
