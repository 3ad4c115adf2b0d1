use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::config::SchedulingConfig;
use crate::workflows::allocation::Allocation;
use crate::workflows::examination::domain::{
    AssignmentId, Department, ExamId, Examination, NewAssignment, NewExamination, NewRoom,
    Requirement, Room, RoomCapacity, RoomId, Session, SessionWindow, StaffAssignment, StaffId,
    StaffMember,
};
use crate::workflows::examination::repository::{
    AllocationLedger, ApprovalGateStore, AssignmentDirectory, ExaminationCatalog,
    RepositoryError, RequirementsDirectory, RoomRegistry,
};
use crate::workflows::examination::{invigilation_router, InvigilationService};

pub(super) fn exam_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2031, 3, 3).expect("valid date")
}

pub(super) fn exam_day(offset: u64) -> NaiveDate {
    exam_start()
        .checked_add_days(chrono::Days::new(offset))
        .expect("valid date")
}

/// A week before the series starts, well clear of the change cutoff.
pub(super) fn planning_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2031, 2, 24)
        .expect("valid date")
        .and_hms_opt(10, 0, 0)
        .expect("valid time")
}

pub(super) fn new_examination() -> NewExamination {
    NewExamination {
        title: "Semester End Examinations".to_string(),
        start_date: exam_start(),
        end_date: exam_day(4),
        morning: SessionWindow::morning(),
        afternoon: SessionWindow::afternoon(),
    }
}

pub(super) fn staff(id: &str, department: &str, designation: &str) -> StaffMember {
    StaffMember::new(id, format!("Staff {id}"), department, designation)
}

pub(super) fn assignment_request(
    id: &str,
    department: &str,
    designation: &str,
    session: Session,
) -> NewAssignment {
    NewAssignment {
        staff: staff(id, department, designation),
        date: exam_start(),
        session,
    }
}

pub(super) fn room_request(number: &str, capacity: RoomCapacity, session: Session) -> NewRoom {
    NewRoom {
        block: "CB".to_string(),
        room_number: number.to_string(),
        capacity,
        date: exam_start(),
        session,
    }
}

pub(super) fn build_service() -> (InvigilationService<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let service = InvigilationService::new(store.clone(), SchedulingConfig::default());
    (service, store)
}

pub(super) fn router_with_service(service: InvigilationService<MemoryStore>) -> axum::Router {
    invigilation_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default)]
pub(super) struct MemoryStore {
    examinations: Mutex<Vec<Examination>>,
    assignments: Mutex<Vec<StaffAssignment>>,
    rooms: Mutex<Vec<Room>>,
    requirements: Mutex<Vec<Requirement>>,
    approvals: Mutex<BTreeSet<(ExamId, NaiveDate)>>,
    ledger: Mutex<BTreeMap<(ExamId, NaiveDate, Session), Vec<Allocation>>>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Makes every assignment lookup fail as if the backing store was down.
    pub(super) fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub(super) fn recorded_sessions(&self) -> usize {
        self.ledger.lock().expect("ledger mutex poisoned").len()
    }
}

impl ExaminationCatalog for MemoryStore {
    fn insert_examination(
        &self,
        examination: Examination,
    ) -> Result<Examination, RepositoryError> {
        let mut guard = self.examinations.lock().expect("exam mutex poisoned");
        if guard.iter().any(|existing| existing.id == examination.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(examination.clone());
        Ok(examination)
    }

    fn fetch_examination(&self, id: &ExamId) -> Result<Option<Examination>, RepositoryError> {
        let guard = self.examinations.lock().expect("exam mutex poisoned");
        Ok(guard.iter().find(|exam| &exam.id == id).cloned())
    }

    fn list_examinations(&self) -> Result<Vec<Examination>, RepositoryError> {
        Ok(self.examinations.lock().expect("exam mutex poisoned").clone())
    }

    fn delete_examination(&self, id: &ExamId) -> Result<(), RepositoryError> {
        let mut guard = self.examinations.lock().expect("exam mutex poisoned");
        let before = guard.len();
        guard.retain(|exam| &exam.id != id);
        if guard.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

impl AssignmentDirectory for MemoryStore {
    fn add_assignment(
        &self,
        assignment: StaffAssignment,
    ) -> Result<StaffAssignment, RepositoryError> {
        self.assignments
            .lock()
            .expect("assignment mutex poisoned")
            .push(assignment.clone());
        Ok(assignment)
    }

    fn remove_assignment(&self, id: &AssignmentId) -> Result<StaffAssignment, RepositoryError> {
        let mut guard = self.assignments.lock().expect("assignment mutex poisoned");
        let index = guard
            .iter()
            .position(|assignment| &assignment.id == id)
            .ok_or(RepositoryError::NotFound)?;
        Ok(guard.remove(index))
    }

    fn list_assignments(
        &self,
        exam_id: &ExamId,
        date: Option<NaiveDate>,
        department: Option<&Department>,
    ) -> Result<Vec<StaffAssignment>, RepositoryError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("database offline".to_string()));
        }
        let guard = self.assignments.lock().expect("assignment mutex poisoned");
        Ok(guard
            .iter()
            .filter(|assignment| &assignment.exam_id == exam_id)
            .filter(|assignment| date.map_or(true, |date| assignment.date == date))
            .filter(|assignment| department.map_or(true, |dept| &assignment.staff.department == dept))
            .cloned()
            .collect())
    }
}

impl RoomRegistry for MemoryStore {
    fn add_room(&self, room: Room) -> Result<Room, RepositoryError> {
        self.rooms
            .lock()
            .expect("room mutex poisoned")
            .push(room.clone());
        Ok(room)
    }

    fn delete_room(&self, id: &RoomId) -> Result<Room, RepositoryError> {
        let mut guard = self.rooms.lock().expect("room mutex poisoned");
        let index = guard
            .iter()
            .position(|room| &room.id == id)
            .ok_or(RepositoryError::NotFound)?;
        Ok(guard.remove(index))
    }

    fn list_rooms(
        &self,
        exam_id: &ExamId,
        date: Option<NaiveDate>,
        session: Option<Session>,
    ) -> Result<Vec<Room>, RepositoryError> {
        let guard = self.rooms.lock().expect("room mutex poisoned");
        Ok(guard
            .iter()
            .filter(|room| &room.exam_id == exam_id)
            .filter(|room| date.map_or(true, |date| room.date == date))
            .filter(|room| session.map_or(true, |session| room.session == session))
            .cloned()
            .collect())
    }
}

impl RequirementsDirectory for MemoryStore {
    fn upsert_requirement(&self, requirement: Requirement) -> Result<Requirement, RepositoryError> {
        let mut guard = self.requirements.lock().expect("requirement mutex poisoned");
        guard.retain(|existing| {
            !(existing.exam_id == requirement.exam_id
                && existing.department == requirement.department
                && existing.date == requirement.date)
        });
        guard.push(requirement.clone());
        Ok(requirement)
    }

    fn list_requirements(&self, exam_id: &ExamId) -> Result<Vec<Requirement>, RepositoryError> {
        let guard = self.requirements.lock().expect("requirement mutex poisoned");
        Ok(guard
            .iter()
            .filter(|requirement| &requirement.exam_id == exam_id)
            .cloned()
            .collect())
    }
}

impl ApprovalGateStore for MemoryStore {
    fn approve(&self, exam_id: &ExamId, date: NaiveDate) -> Result<(), RepositoryError> {
        self.approvals
            .lock()
            .expect("approval mutex poisoned")
            .insert((exam_id.clone(), date));
        Ok(())
    }

    fn is_approved(&self, exam_id: &ExamId, date: NaiveDate) -> Result<bool, RepositoryError> {
        let guard = self.approvals.lock().expect("approval mutex poisoned");
        Ok(guard.contains(&(exam_id.clone(), date)))
    }

    fn approved_dates(&self, exam_id: &ExamId) -> Result<Vec<NaiveDate>, RepositoryError> {
        let guard = self.approvals.lock().expect("approval mutex poisoned");
        Ok(guard
            .iter()
            .filter(|(id, _)| id == exam_id)
            .map(|(_, date)| *date)
            .collect())
    }
}

impl AllocationLedger for MemoryStore {
    fn record_session(
        &self,
        exam_id: &ExamId,
        date: NaiveDate,
        session: Session,
        allocations: Vec<Allocation>,
    ) -> Result<(), RepositoryError> {
        self.ledger
            .lock()
            .expect("ledger mutex poisoned")
            .insert((exam_id.clone(), date, session), allocations);
        Ok(())
    }

    fn allocations_for_date(
        &self,
        exam_id: &ExamId,
        date: NaiveDate,
    ) -> Result<Vec<Allocation>, RepositoryError> {
        let guard = self.ledger.lock().expect("ledger mutex poisoned");
        Ok(guard
            .iter()
            .filter(|((id, day, _), _)| id == exam_id && *day == date)
            .flat_map(|(_, allocations)| allocations.iter().cloned())
            .collect())
    }

    fn allocations_for_staff(
        &self,
        staff_id: &StaffId,
    ) -> Result<Vec<(ExamId, Allocation)>, RepositoryError> {
        let guard = self.ledger.lock().expect("ledger mutex poisoned");
        Ok(guard
            .iter()
            .flat_map(|((exam_id, _, _), allocations)| {
                allocations
                    .iter()
                    .filter(|allocation| allocation.includes(staff_id))
                    .map(move |allocation| (exam_id.clone(), allocation.clone()))
            })
            .collect())
    }
}
