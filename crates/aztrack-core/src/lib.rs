pub mod azdo;
pub mod board;
pub mod config;
pub mod error;
pub mod gating;
pub mod github;
pub(crate) mod http;
pub mod ports;
pub mod sync;
pub mod tracking;

pub use error::{AztrackError, Result};
pub use gating::{decide, Decision, DeploymentFact, Gate};
pub use tracking::{parse, TrackingDirective, TrackingParser};
