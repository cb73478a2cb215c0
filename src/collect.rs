//! One collection pass: check preconditions, parse every artifact, then
//! write the record. Nothing touches the output until all inputs parsed.

use std::path::PathBuf;

use crate::{
    CheckpointStats, CollectResult, Config, RunSummary, append_record, load_checkpoints, load_run,
    validate_paths,
};

#[derive(Debug, Clone)]
pub struct CollectRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Allow adding to an existing output file.
    pub append: bool,
    /// Server log to summarize checkpoints from.
    pub pg_log: Option<PathBuf>,
}

pub fn collect_run(request: &CollectRequest, config: &Config) -> CollectResult<RunSummary> {
    config.validate()?;
    validate_paths(&request.input, &request.output, request.append)?;

    tracing::info!("input directory: {}", request.input.display());
    tracing::info!("output file: {}", request.output.display());

    let run = load_run(&request.input, config)?;
    let checkpoints = match &request.pg_log {
        Some(path) => Some(CheckpointStats::from_checkpoints(&load_checkpoints(path)?)),
        None => None,
    };

    append_record(&run, config, &request.output, request.append)?;

    Ok(RunSummary::new(
        &run,
        config,
        &request.input,
        &request.output,
        checkpoints,
    ))
}
