//! lmsprov Engine
//!
//! The reconciler: walks a provisioning plan in order, creating what is
//! missing and stopping at the first failure.

pub mod reconciler;

pub use reconciler::{PlanCheck, PlannedAction, Reconciler};
