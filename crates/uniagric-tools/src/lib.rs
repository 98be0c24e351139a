//! Adapters for the collaborators that live outside this process: the
//! farm-planning scripts, the prediction and risk services, and document
//! storage on disk.

pub mod documents;
pub mod prediction;
pub mod risk;
pub mod script;

pub use documents::{DocumentConfig, DocumentError, DocumentStorage, StoredDocument};
pub use prediction::{PredictionClient, PredictionConfig, PredictionError};
pub use risk::{RiskClient, RiskConfig, RiskError};
pub use script::{ScriptConfig, ScriptRunner};
