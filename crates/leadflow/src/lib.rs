//! Lead-routing engine for a real-estate marketplace: lifecycle tracking,
//! SLA and escalation computation, and agent assignment recommendations.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
