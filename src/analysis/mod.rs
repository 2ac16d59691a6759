//! Analysis orchestration and result aggregation
//!
//! Schedules the feature components over one buffer and collects a typed
//! result:
//! - Per-run engine context (scratch, cancellation, progress, time slicing)
//! - Orchestrator and batch runner
//! - Live chord meter for single frames
//! - Result types, metadata and confidence roll-up

pub mod confidence;
pub mod context;
pub mod live;
pub mod metadata;
pub mod orchestrator;
pub mod result;
