//! Examination series, staff assignment, room registration, approval gating,
//! and the service that runs room allocation over them.

pub mod coverage;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use coverage::{coverage_for_date, CoverageEntry};
pub use domain::{
    AssignmentId, Department, ExamId, ExamStatus, Examination, ExaminationView, NewAssignment,
    NewExamination, NewRoom, Requirement, Room, RoomCapacity, RoomId, SeniorityClass, Session,
    SessionWindow, StaffAssignment, StaffId, StaffMember,
};
pub use repository::{
    AllocationLedger, ApprovalGateStore, AssignmentDirectory, ExaminationCatalog,
    InvigilationStore, RepositoryError, RequirementsDirectory, RoomRegistry,
};
pub use router::invigilation_router;
pub use service::{InvigilationService, InvigilationServiceError, RequirementInput};
