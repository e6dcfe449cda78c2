//! CLI command implementations.

mod chunk;
mod config;
mod doctor;
mod list;
mod rechunk;
mod serve;
mod submit;
mod worker;

pub use chunk::{run_chunk, run_context};
pub use config::run_config;
pub use doctor::run_doctor;
pub use list::{run_list, run_status};
pub use rechunk::run_rechunk;
pub use serve::run_serve;
pub use submit::{run_process, run_submit};
pub use worker::run_worker;

use crate::config::Settings;
use crate::script::Depth;
use crate::store::{JobStore, SqliteJobStore};
use std::sync::Arc;

/// Open the job database configured in `settings`.
fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn JobStore>> {
    Ok(Arc::new(SqliteJobStore::new(&settings.database_path())?))
}

fn parse_depth(depth: Option<&str>) -> anyhow::Result<Option<Depth>> {
    depth
        .map(|d| d.parse::<Depth>().map_err(anyhow::Error::msg))
        .transpose()
}
