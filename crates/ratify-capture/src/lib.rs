pub mod gate;
pub mod prompt;
pub mod protocol;

pub use gate::{govern, govern_and_apply, GateOutcome, GovernedAction};
pub use prompt::{Answer, Prompter, ScriptedPrompter, Validator};
pub use protocol::{capture_decision, AbortReason, Capture, CaptureRequest};
