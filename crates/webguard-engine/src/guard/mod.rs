//! Guard Engine: the interception points, their policy, and the one-shot
//! sandbox channel that delivers the Rule Set snapshot.

pub mod engine;
pub mod sandbox;

pub use engine::{GuardEngine, Hook, InstallReport, InterceptionPoint, Trigger, INTERCEPTION_POINTS};
pub use sandbox::{channel, GuardSandbox, PolicySender};
