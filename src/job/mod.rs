//! Job records and the pipeline state machine.

mod record;
mod status;

pub use record::{Job, JobId, FAILURE_SUMMARY};
pub use status::JobStatus;
