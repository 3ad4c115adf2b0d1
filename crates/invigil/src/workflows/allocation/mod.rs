//! Room allocation: a greedy, non-backtracking placement of approved staff into
//! the rooms registered for a date and session.

mod engine;
pub mod plan;
mod pools;

pub use engine::{generate_allocations, AllocationError, ApprovalGate};
pub use plan::{
    Allocation, DayPlan, InvigilatorView, SessionPlan, SkippedSession, StaffDuty,
};
