//! Job orchestrators.
//!
//! [`Analyzer`], [`Renderer`] and [`Previewer`] each sequence template sync,
//! script construction, host execution and post-processing for one job,
//! returning a [`JobOutcome`] instead of propagating errors.

pub mod analyze;
pub mod context;
pub mod outcome;
pub mod preview;
pub mod render;

pub use analyze::Analyzer;
pub use context::{JobContext, PipelineSettings, PreviewStorage};
pub use outcome::{JobFailure, JobOutcome};
pub use preview::Previewer;
pub use render::Renderer;
