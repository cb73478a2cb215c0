//! tpch-collect core library: turns the artifacts of one TPC-H benchmark run
//! into a single flat record for cross-run comparison.

mod aggregate;
mod checkpoints;
mod collect;
mod config;
mod error;
mod fsutil;
mod plan;
mod queries;
mod record;
mod snapshot;
mod summary;
mod timeline;

#[cfg(test)]
mod testutil;

pub use aggregate::*;
pub use checkpoints::*;
pub use collect::*;
pub use config::*;
pub use error::*;
pub use fsutil::*;
pub use plan::*;
pub use queries::*;
pub use record::*;
pub use snapshot::*;
pub use summary::*;
pub use timeline::*;
