//! launchdesk — back-office CRM core for app-store publishing onboarding
//!
//! Walks a client company through a fixed seven-step workflow (compliance
//! certificates, review & submit, Play Console setup, domain acquisition,
//! parallel delivery work to publication). The workflow position is never
//! stored; it is derived on every read from persisted facts, so the
//! displayed step cannot drift from reality.
//!
//! Layout:
//! - [`model`] — persisted record types
//! - [`engine`] — pure derivation, gating, payment, and finance logic
//! - [`store`] — the entity-store seam plus an in-memory reference impl
//! - [`service`] — the transport-agnostic operations callers consume
//! - [`identity`] / [`rate_limit`] — collaborator seams

pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod model;
pub mod rate_limit;
pub mod service;
pub mod store;

pub use config::EngineConfig;
pub use error::{CrmError, Result};
pub use service::CrmService;
