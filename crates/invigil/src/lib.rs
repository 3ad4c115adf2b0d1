//! Invigilation scheduling for examination cells: examination series, staff
//! assignment and approval, and greedy room allocation.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
