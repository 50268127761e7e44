//! Pipeline orchestrator for coordinating job execution.
//!
//! Each job runs a short sequence of steps chosen by its operation. Every
//! file a step may create is tracked before the tool creating it runs, and
//! all tracked files are removed when the job ends, whichever way it ends.
//!
//! # Architecture
//!
//! ```text
//! Transcribe                      SeparateVocals
//!     ├── Step: Convert?              ├── Step: Convert? (lossy input only)
//!     └── Step: Transcribe            ├── Step: Separate
//!                                     └── Step: Locate
//! ```
//!
//! # Example
//!
//! ```ignore
//! use stemscribe_core::orchestrator::Orchestrator;
//!
//! let orchestrator = Orchestrator::from_settings(settings)?;
//! let job = Job::new(staged_path, Operation::Transcribe).with_language("en");
//! match orchestrator.process(&job) {
//!     Ok(output) => println!("{:?}", output),
//!     Err(e) => eprintln!("{}: {}", e.kind(), e.detail()),
//! }
//! ```

mod errors;
mod intermediates;
mod pipeline;
mod processor;
mod step;
pub mod steps;
mod types;

pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use intermediates::{CleanupReport, Intermediates};
pub use pipeline::{Pipeline, PipelineRunResult};
pub use processor::{JobReport, Orchestrator};
pub use step::PipelineStep;
pub use steps::{ConvertStep, LocateStep, SeparateStep, TranscribeStep};
pub use types::{Context, JobState, SeparationOutput, Services};
