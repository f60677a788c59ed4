pub mod capture;
pub mod generation;
pub mod orchestrator;
pub mod situation;

pub use capture::CaptureService;
pub use generation::{GenerationOutcome, GenerationService};
pub use orchestrator::{Orchestrator, ReconcileConfig, ReconcileStats};
pub use situation::{ClassificationDefaults, SituationService};
