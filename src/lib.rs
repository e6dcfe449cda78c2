//! Lectern - narrated lectures from documents
//!
//! Turns a PDF or a page of notes into a spoken lecture: the document is
//! analyzed a few pages at a time, a lecture script is written from those
//! notes, the script is cut into short playback chunks, and (optionally) the
//! narration is synthesized to audio and copied to a sync folder.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Settings and prompt templates
//! - `job` - Job records and the status state machine
//! - `ingest` - Document submission
//! - `extraction` - Page-window document analysis
//! - `script` - Lecture scripts and script generation
//! - `chunking` - Playback chunks and lookback context
//! - `speech` - Speech synthesis and audio assembly
//! - `artifacts` - Atomic on-disk stage outputs
//! - `store` - Durable job and lecture records
//! - `pipeline` - Stage executors, submission queue and worker
//! - `library` - Read access for clients
//!
//! # Example
//!
//! ```rust,no_run
//! use lectern::config::Settings;
//! use lectern::ingest::{submit_file, SubmitOptions};
//! use lectern::pipeline::{Collaborators, Worker};
//! use lectern::store::{JobStore, SqliteJobStore};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let store: Arc<dyn JobStore> = Arc::new(SqliteJobStore::new(&settings.database_path())?);
//!
//!     let job = submit_file(&settings, store.as_ref(), "notes.pdf".as_ref(), SubmitOptions::default()).await?;
//!
//!     let worker = Worker::new(&settings, store.clone(), Collaborators::openai(&settings)?);
//!     let status = worker.process_job(&job.id, &CancellationToken::new()).await?;
//!     println!("{} finished as {:?}", job.id, status);
//!
//!     Ok(())
//! }
//! ```

pub mod artifacts;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod error;
pub mod extraction;
pub mod ingest;
pub mod job;
pub mod lecture;
pub mod library;
pub mod openai;
pub mod pipeline;
pub mod reply;
pub mod script;
pub mod speech;
pub mod store;

pub use error::{LecternError, Result};
