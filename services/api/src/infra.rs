use chrono::NaiveDate;
use invigil::workflows::allocation::Allocation;
use invigil::workflows::examination::{
    AllocationLedger, ApprovalGateStore, AssignmentDirectory, AssignmentId, Department, ExamId,
    Examination, ExaminationCatalog, RepositoryError, Requirement, RequirementsDirectory, Room,
    RoomId, RoomRegistry, Session, StaffAssignment, StaffId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct StoreState {
    examinations: BTreeMap<ExamId, Examination>,
    assignments: Vec<StaffAssignment>,
    rooms: Vec<Room>,
    requirements: BTreeMap<(ExamId, Department, NaiveDate), Requirement>,
    approvals: BTreeSet<(ExamId, NaiveDate)>,
    ledger: BTreeMap<(ExamId, NaiveDate, Session), Vec<Allocation>>,
}

/// Process-local store backing every repository trait the service needs.
///
/// Assignments and rooms are kept in insertion order, which is the order the
/// allocation engine sees them in.
#[derive(Default, Clone)]
pub(crate) struct InMemoryInvigilationStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryInvigilationStore {
    fn state(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("in-memory store poisoned".to_string()))
    }
}

impl ExaminationCatalog for InMemoryInvigilationStore {
    fn insert_examination(
        &self,
        examination: Examination,
    ) -> Result<Examination, RepositoryError> {
        let mut state = self.state()?;
        if state.examinations.contains_key(&examination.id) {
            return Err(RepositoryError::Conflict);
        }
        state
            .examinations
            .insert(examination.id.clone(), examination.clone());
        Ok(examination)
    }

    fn fetch_examination(&self, id: &ExamId) -> Result<Option<Examination>, RepositoryError> {
        Ok(self.state()?.examinations.get(id).cloned())
    }

    fn list_examinations(&self) -> Result<Vec<Examination>, RepositoryError> {
        Ok(self.state()?.examinations.values().cloned().collect())
    }

    /// Removes the series together with everything recorded against it.
    fn delete_examination(&self, id: &ExamId) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if state.examinations.remove(id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        state.assignments.retain(|assignment| &assignment.exam_id != id);
        state.rooms.retain(|room| &room.exam_id != id);
        state.requirements.retain(|(exam_id, _, _), _| exam_id != id);
        state.approvals.retain(|(exam_id, _)| exam_id != id);
        state.ledger.retain(|(exam_id, _, _), _| exam_id != id);
        Ok(())
    }
}

impl AssignmentDirectory for InMemoryInvigilationStore {
    fn add_assignment(
        &self,
        assignment: StaffAssignment,
    ) -> Result<StaffAssignment, RepositoryError> {
        let mut state = self.state()?;
        if state
            .assignments
            .iter()
            .any(|existing| existing.id == assignment.id)
        {
            return Err(RepositoryError::Conflict);
        }
        state.assignments.push(assignment.clone());
        Ok(assignment)
    }

    fn remove_assignment(&self, id: &AssignmentId) -> Result<StaffAssignment, RepositoryError> {
        let mut state = self.state()?;
        let index = state
            .assignments
            .iter()
            .position(|assignment| &assignment.id == id)
            .ok_or(RepositoryError::NotFound)?;
        Ok(state.assignments.remove(index))
    }

    fn list_assignments(
        &self,
        exam_id: &ExamId,
        date: Option<NaiveDate>,
        department: Option<&Department>,
    ) -> Result<Vec<StaffAssignment>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .assignments
            .iter()
            .filter(|assignment| &assignment.exam_id == exam_id)
            .filter(|assignment| date.map_or(true, |date| assignment.date == date))
            .filter(|assignment| {
                department.map_or(true, |department| &assignment.staff.department == department)
            })
            .cloned()
            .collect())
    }
}

impl RoomRegistry for InMemoryInvigilationStore {
    fn add_room(&self, room: Room) -> Result<Room, RepositoryError> {
        let mut state = self.state()?;
        if state
            .rooms
            .iter()
            .any(|existing| existing.id == room.id)
        {
            return Err(RepositoryError::Conflict);
        }
        state.rooms.push(room.clone());
        Ok(room)
    }

    fn delete_room(&self, id: &RoomId) -> Result<Room, RepositoryError> {
        let mut state = self.state()?;
        let index = state
            .rooms
            .iter()
            .position(|room| &room.id == id)
            .ok_or(RepositoryError::NotFound)?;
        Ok(state.rooms.remove(index))
    }

    fn list_rooms(
        &self,
        exam_id: &ExamId,
        date: Option<NaiveDate>,
        session: Option<Session>,
    ) -> Result<Vec<Room>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .rooms
            .iter()
            .filter(|room| &room.exam_id == exam_id)
            .filter(|room| date.map_or(true, |date| room.date == date))
            .filter(|room| session.map_or(true, |session| room.session == session))
            .cloned()
            .collect())
    }
}

impl RequirementsDirectory for InMemoryInvigilationStore {
    fn upsert_requirement(&self, requirement: Requirement) -> Result<Requirement, RepositoryError> {
        let key = (
            requirement.exam_id.clone(),
            requirement.department.clone(),
            requirement.date,
        );
        self.state()?.requirements.insert(key, requirement.clone());
        Ok(requirement)
    }

    fn list_requirements(&self, exam_id: &ExamId) -> Result<Vec<Requirement>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .requirements
            .values()
            .filter(|requirement| &requirement.exam_id == exam_id)
            .cloned()
            .collect())
    }
}

impl ApprovalGateStore for InMemoryInvigilationStore {
    fn approve(&self, exam_id: &ExamId, date: NaiveDate) -> Result<(), RepositoryError> {
        self.state()?.approvals.insert((exam_id.clone(), date));
        Ok(())
    }

    fn is_approved(&self, exam_id: &ExamId, date: NaiveDate) -> Result<bool, RepositoryError> {
        Ok(self.state()?.approvals.contains(&(exam_id.clone(), date)))
    }

    fn approved_dates(&self, exam_id: &ExamId) -> Result<Vec<NaiveDate>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .approvals
            .iter()
            .filter(|(id, _)| id == exam_id)
            .map(|(_, date)| *date)
            .collect())
    }
}

impl AllocationLedger for InMemoryInvigilationStore {
    fn record_session(
        &self,
        exam_id: &ExamId,
        date: NaiveDate,
        session: Session,
        allocations: Vec<Allocation>,
    ) -> Result<(), RepositoryError> {
        self.state()?
            .ledger
            .insert((exam_id.clone(), date, session), allocations);
        Ok(())
    }

    fn allocations_for_date(
        &self,
        exam_id: &ExamId,
        date: NaiveDate,
    ) -> Result<Vec<Allocation>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .ledger
            .iter()
            .filter(|((id, day, _), _)| id == exam_id && *day == date)
            .flat_map(|(_, allocations)| allocations.iter().cloned())
            .collect())
    }

    fn allocations_for_staff(
        &self,
        staff_id: &StaffId,
    ) -> Result<Vec<(ExamId, Allocation)>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .ledger
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

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_session(raw: &str) -> Result<Session, String> {
    Session::parse(raw).ok_or_else(|| format!("'{raw}' is not a session; use AM or PM"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use invigil::workflows::examination::SessionWindow;

    fn examination(id: &str) -> Examination {
        Examination {
            id: ExamId::from(id),
            title: "Model Examinations".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 11, 3).expect("valid"),
            end_date: NaiveDate::from_ymd_opt(2025, 11, 5).expect("valid"),
            morning: SessionWindow::morning(),
            afternoon: SessionWindow::afternoon(),
        }
    }

    #[test]
    fn deleting_an_examination_clears_its_approvals() {
        let store = InMemoryInvigilationStore::default();
        let exam = store
            .insert_examination(examination("exam-1"))
            .expect("inserted");
        assert!(matches!(
            store.insert_examination(examination("exam-1")),
            Err(RepositoryError::Conflict)
        ));

        store.approve(&exam.id, exam.start_date).expect("approved");
        store.delete_examination(&exam.id).expect("deleted");
        assert!(!store
            .is_approved(&exam.id, exam.start_date)
            .expect("readable"));
        assert!(matches!(
            store.delete_examination(&exam.id),
            Err(RepositoryError::NotFound)
        ));
    }

    #[test]
    fn session_flags_accept_codes_and_labels() {
        assert_eq!(parse_session("AM"), Ok(Session::Morning));
        assert_eq!(parse_session("afternoon"), Ok(Session::Afternoon));
        assert!(parse_session("night").is_err());
        assert!(parse_date("2025-13-01").is_err());
    }
}
