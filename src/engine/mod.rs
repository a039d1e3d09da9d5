//! Workflow & Gating Engine
//!
//! Pure logic over the domain model: step predicates and state derivation,
//! dependency checking with fault attribution, payment-release eligibility,
//! financial rollups, step mutation payloads, and access scoping. Nothing in
//! this tree touches the store.

pub mod access;
pub mod dependency;
pub mod finance;
pub mod mutation;
pub mod payment;
pub mod steps;

pub use dependency::{check_dependency, DependencyCheck, FailureCategory};
pub use finance::{FinancialSummary, Period};
pub use mutation::StepUpdate;
pub use payment::{PaymentEligibility, TimelineExtension};
pub use steps::{derive_state, DerivedState, WorkflowStep};
