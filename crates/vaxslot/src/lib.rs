//! Vaccination appointment scheduling: registrant priority, availability resolution,
//! slot search and the end-of-day reconciliation pass, driven by a text command script.

pub mod commands;
pub mod config;
pub mod error;
pub mod report;
pub mod scheduling;
pub mod session;
pub mod telemetry;
