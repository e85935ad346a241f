#![forbid(unsafe_code)]

pub mod controller;
pub mod error;
pub mod resync;

pub use controller::{ControllerState, SessionController, StartOutcome, SubmitOutcome};
pub use error::ControllerError;
pub use resync::{ResyncEngine, ResyncOutcome};
