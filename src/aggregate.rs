//! One benchmark run assembled from its artifact directory.

use std::collections::BTreeMap;
use std::path::Path;

use crate::{
    BENCH_LOG_FILE, CollectResult, Config, PhaseTimeline, QueryId, QueryResult, StatsDelta,
    load_queries, load_stats,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RunAggregate {
    pub stats: StatsDelta,
    pub timeline: PhaseTimeline,
    pub queries: BTreeMap<QueryId, QueryResult>,
}

/// Parses every artifact of a run directory. Nothing is written.
pub fn load_run(dir: &Path, config: &Config) -> CollectResult<RunAggregate> {
    tracing::info!(input = %dir.display(), "loading run artifacts");
    let stats = load_stats(dir)?;
    let queries = load_queries(dir, config.strict_results)?;
    let timeline = PhaseTimeline::load(&dir.join(BENCH_LOG_FILE))?;
    Ok(RunAggregate {
        stats,
        timeline,
        queries,
    })
}
