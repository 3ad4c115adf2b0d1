use chrono::NaiveDate;

use super::domain::{
    AssignmentId, Department, ExamId, Examination, Requirement, Room, RoomId, Session,
    StaffAssignment, StaffId,
};
use crate::workflows::allocation::Allocation;

/// Examination series storage.
pub trait ExaminationCatalog: Send + Sync {
    fn insert_examination(&self, examination: Examination)
        -> Result<Examination, RepositoryError>;
    fn fetch_examination(&self, id: &ExamId) -> Result<Option<Examination>, RepositoryError>;
    fn list_examinations(&self) -> Result<Vec<Examination>, RepositoryError>;
    fn delete_examination(&self, id: &ExamId) -> Result<(), RepositoryError>;
}

/// Staff placed on examination dates and sessions by department coordinators.
///
/// `list_assignments` returns assignments in the order they were added; the
/// allocation engine relies on that order when it forms its seniority pools.
pub trait AssignmentDirectory: Send + Sync {
    fn add_assignment(
        &self,
        assignment: StaffAssignment,
    ) -> Result<StaffAssignment, RepositoryError>;
    fn remove_assignment(&self, id: &AssignmentId) -> Result<StaffAssignment, RepositoryError>;
    fn list_assignments(
        &self,
        exam_id: &ExamId,
        date: Option<NaiveDate>,
        department: Option<&Department>,
    ) -> Result<Vec<StaffAssignment>, RepositoryError>;
}

/// Rooms registered by the exam section, listed in registration order.
pub trait RoomRegistry: Send + Sync {
    fn add_room(&self, room: Room) -> Result<Room, RepositoryError>;
    fn delete_room(&self, id: &RoomId) -> Result<Room, RepositoryError>;
    fn list_rooms(
        &self,
        exam_id: &ExamId,
        date: Option<NaiveDate>,
        session: Option<Session>,
    ) -> Result<Vec<Room>, RepositoryError>;
}

/// Per-department invigilator headcount targets. Saving an existing
/// (exam, department, date) key replaces its counts.
pub trait RequirementsDirectory: Send + Sync {
    fn upsert_requirement(&self, requirement: Requirement) -> Result<Requirement, RepositoryError>;
    fn list_requirements(&self, exam_id: &ExamId) -> Result<Vec<Requirement>, RepositoryError>;
}

/// Final administrative approval of staff assignments, per examination date.
pub trait ApprovalGateStore: Send + Sync {
    fn approve(&self, exam_id: &ExamId, date: NaiveDate) -> Result<(), RepositoryError>;
    fn is_approved(&self, exam_id: &ExamId, date: NaiveDate) -> Result<bool, RepositoryError>;
    fn approved_dates(&self, exam_id: &ExamId) -> Result<Vec<NaiveDate>, RepositoryError>;
}

/// Latest generated allocations per (exam, date, session).
pub trait AllocationLedger: Send + Sync {
    /// Replaces whatever an earlier run stored for the same session.
    fn record_session(
        &self,
        exam_id: &ExamId,
        date: NaiveDate,
        session: Session,
        allocations: Vec<Allocation>,
    ) -> Result<(), RepositoryError>;
    fn allocations_for_date(
        &self,
        exam_id: &ExamId,
        date: NaiveDate,
    ) -> Result<Vec<Allocation>, RepositoryError>;
    fn allocations_for_staff(
        &self,
        staff_id: &StaffId,
    ) -> Result<Vec<(ExamId, Allocation)>, RepositoryError>;
}

/// Everything the invigilation service needs from storage.
pub trait InvigilationStore:
    ExaminationCatalog
    + AssignmentDirectory
    + RoomRegistry
    + RequirementsDirectory
    + ApprovalGateStore
    + AllocationLedger
{
}

impl<T> InvigilationStore for T where
    T: ExaminationCatalog
        + AssignmentDirectory
        + RoomRegistry
        + RequirementsDirectory
        + ApprovalGateStore
        + AllocationLedger
{
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
