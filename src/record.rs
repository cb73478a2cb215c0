//! Flat, semicolon-delimited record of one run.
//!
//! Column order is part of the output contract: six phase columns, one
//! duration column per query, one plan hash column per query, then the
//! cache hit ratio. Header and data row are rendered from the same column
//! list.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use crate::{CollectError, CollectResult, Config, Phase, QueryId, QueryOutcome, RunAggregate};

pub const DELIMITER: char = ';';

/// Queries in the TPC-H suite; each gets a duration and a plan hash column.
pub const QUERY_COUNT: QueryId = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Phase(Phase),
    Duration(QueryId),
    PlanHash(QueryId),
    HitRatio,
}

impl Column {
    pub fn header(self) -> String {
        match self {
            Column::Phase(Phase::Benchmark) => "tpch_total".to_string(),
            Column::Phase(phase) => format!("tpch_{}", phase.as_str()),
            Column::Duration(id) => format!("query_{id}"),
            Column::PlanHash(id) => format!("query_{id}_hash"),
            Column::HitRatio => "db_cache_hit_ratio".to_string(),
        }
    }
}

pub fn columns() -> Vec<Column> {
    let mut out: Vec<Column> = Phase::ALL.iter().map(|p| Column::Phase(*p)).collect();
    out.extend((1..=QUERY_COUNT).map(Column::Duration));
    out.extend((1..=QUERY_COUNT).map(Column::PlanHash));
    out.push(Column::HitRatio);
    out
}

pub fn render_header() -> String {
    join(columns().into_iter().map(Column::header))
}

/// Renders the data row. Fails if any column has no value in `run`.
pub fn render_row(run: &RunAggregate, config: &Config) -> CollectResult<String> {
    let timeout = config.query_timeout();
    let fields = columns()
        .into_iter()
        .map(|column| -> CollectResult<String> {
            Ok(match column {
                Column::Phase(phase) => {
                    let secs = run.timeline.duration(phase).ok_or_else(|| {
                        CollectError::IncompleteAggregate(format!(
                            "no duration for phase {}",
                            phase.as_str()
                        ))
                    })?;
                    format!("{:.2}", secs as f64)
                }
                Column::Duration(id) => match query(run, id)?.outcome(timeout) {
                    QueryOutcome::Completed { duration } => format!("{duration:.2}"),
                    QueryOutcome::Cancelled => String::new(),
                },
                Column::PlanHash(id) => query(run, id)?.plan_hash.clone(),
                Column::HitRatio => format!("{:.1}", run.stats.hit_ratio),
            })
        })
        .collect::<CollectResult<Vec<_>>>()?;
    Ok(join(fields))
}

fn query(run: &RunAggregate, id: QueryId) -> CollectResult<&crate::QueryResult> {
    run.queries
        .get(&id)
        .ok_or_else(|| CollectError::IncompleteAggregate(format!("no result for query {id}")))
}

fn join(fields: impl IntoIterator<Item = String>) -> String {
    fields
        .into_iter()
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string())
}

/// Writes one record to `path`, with the header first when the file is new
/// or empty. Without `append` the file must not exist yet; the check happens
/// in the same call that creates it. The row is fully rendered before the
/// file is opened, so a failure leaves the output untouched.
pub fn append_record(
    run: &RunAggregate,
    config: &Config,
    path: &Path,
    append: bool,
) -> CollectResult<()> {
    let row = render_row(run, config)?;

    let mut options = OpenOptions::new();
    options.append(true);
    if append {
        options.create(true);
    } else {
        options.create_new(true);
    }
    let mut file = options.open(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::AlreadyExists => CollectError::Config(format!(
            "output {} already exists (use --append to add to it)",
            path.display()
        )),
        _ => CollectError::Io(err),
    })?;
    let mut buf = String::new();
    if file.metadata()?.len() == 0 {
        buf.push_str(&render_header());
        buf.push('\n');
    }
    buf.push_str(&row);
    buf.push('\n');
    file.write_all(buf.as_bytes())?;
    file.flush()?;

    tracing::info!(output = %path.display(), "appended run record");
    Ok(())
}
