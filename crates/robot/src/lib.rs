pub mod engine;
pub mod reconciler;
pub mod robot;
pub mod telemetry;

pub use engine::{CycleOutcome, Engine, EngineSnapshot};
pub use reconciler::{LegDiff, ProtectionPair, ReconcileAction};
pub use robot::{assemble_context, Robot};
pub use telemetry::spawn_telemetry;
