use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, info};

use super::coverage::{coverage_for_date, CoverageEntry};
use super::domain::{
    AssignmentId, Department, ExamId, ExamStatus, Examination, ExaminationView, NewAssignment,
    NewExamination, NewRoom, Requirement, Room, RoomId, Session, StaffAssignment, StaffId,
};
use super::repository::{InvigilationStore, RepositoryError};
use crate::config::SchedulingConfig;
use crate::workflows::allocation::{
    generate_allocations, Allocation, AllocationError, DayPlan, SessionPlan, SkippedSession,
    StaffDuty,
};

/// Coordinator input for a department's headcount on one date.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequirementInput {
    pub department: Department,
    pub date: NaiveDate,
    #[serde(default)]
    pub morning: u16,
    #[serde(default)]
    pub afternoon: u16,
}

/// Service composing the examination catalog, staffing directories, approval
/// gate, and allocation ledger around the allocation engine.
pub struct InvigilationService<S> {
    store: Arc<S>,
    config: SchedulingConfig,
    sequence: AtomicU64,
    run_lock: Mutex<()>,
}

impl<S> InvigilationService<S>
where
    S: InvigilationStore + 'static,
{
    pub fn new(store: Arc<S>, config: SchedulingConfig) -> Self {
        Self {
            store,
            config,
            sequence: AtomicU64::new(1),
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> SchedulingConfig {
        self.config
    }

    fn next_id(&self, prefix: &str) -> String {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{id:06}")
    }

    /// Create an examination series after validating its dates and sessions.
    pub fn create_examination(
        &self,
        request: NewExamination,
    ) -> Result<Examination, InvigilationServiceError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(InvigilationServiceError::InvalidExamination(
                "title must not be empty".to_string(),
            ));
        }
        if request.start_date > request.end_date {
            return Err(InvigilationServiceError::InvalidExamination(format!(
                "start date {} is after end date {}",
                request.start_date, request.end_date
            )));
        }
        for (session, window) in [
            (Session::Morning, request.morning),
            (Session::Afternoon, request.afternoon),
        ] {
            if window.start >= window.end {
                return Err(InvigilationServiceError::InvalidExamination(format!(
                    "{} session must start before it ends",
                    session.label().to_ascii_lowercase()
                )));
            }
        }

        let examination = Examination {
            id: ExamId(self.next_id("exam")),
            title: title.to_string(),
            start_date: request.start_date,
            end_date: request.end_date,
            morning: request.morning,
            afternoon: request.afternoon,
        };

        let stored = self.store.insert_examination(examination)?;
        info!(exam_id = %stored.id, title = %stored.title, "examination created");
        Ok(stored)
    }

    /// List examinations, newest first, optionally narrowed to one status.
    pub fn list_examinations(
        &self,
        status: Option<ExamStatus>,
        today: NaiveDate,
    ) -> Result<Vec<ExaminationView>, InvigilationServiceError> {
        let mut views: Vec<ExaminationView> = self
            .store
            .list_examinations()?
            .into_iter()
            .map(|examination| ExaminationView::new(examination, today))
            .filter(|view| status.map_or(true, |wanted| view.status == wanted))
            .collect();
        views.sort_by(|a, b| b.examination.start_date.cmp(&a.examination.start_date));
        Ok(views)
    }

    pub fn get_examination(
        &self,
        exam_id: &ExamId,
    ) -> Result<Examination, InvigilationServiceError> {
        self.store
            .fetch_examination(exam_id)?
            .ok_or_else(|| InvigilationServiceError::ExaminationNotFound(exam_id.clone()))
    }

    pub fn delete_examination(&self, exam_id: &ExamId) -> Result<(), InvigilationServiceError> {
        match self.store.delete_examination(exam_id) {
            Ok(()) => {
                info!(%exam_id, "examination deleted");
                Ok(())
            }
            Err(RepositoryError::NotFound) => Err(InvigilationServiceError::ExaminationNotFound(
                exam_id.clone(),
            )),
            Err(other) => Err(other.into()),
        }
    }

    /// Save (or replace) a department's headcount target for one date.
    pub fn save_requirement(
        &self,
        exam_id: &ExamId,
        input: RequirementInput,
    ) -> Result<Requirement, InvigilationServiceError> {
        let examination = self.get_examination(exam_id)?;
        ensure_within(&examination, input.date)?;

        let requirement = Requirement {
            exam_id: exam_id.clone(),
            department: input.department,
            date: input.date,
            morning: input.morning,
            afternoon: input.afternoon,
        };
        let stored = self.store.upsert_requirement(requirement)?;
        debug!(%exam_id, department = %stored.department, date = %stored.date, "requirement saved");
        Ok(stored)
    }

    pub fn requirements(
        &self,
        exam_id: &ExamId,
    ) -> Result<Vec<Requirement>, InvigilationServiceError> {
        self.get_examination(exam_id)?;
        let mut requirements = self.store.list_requirements(exam_id)?;
        requirements.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.department.cmp(&b.department))
        });
        Ok(requirements)
    }

    /// Compare saved requirements with the staff actually assigned on `date`.
    pub fn requirement_coverage(
        &self,
        exam_id: &ExamId,
        date: NaiveDate,
    ) -> Result<Vec<CoverageEntry>, InvigilationServiceError> {
        let examination = self.get_examination(exam_id)?;
        ensure_within(&examination, date)?;

        let requirements = self.store.list_requirements(exam_id)?;
        let assignments = self.store.list_assignments(exam_id, Some(date), None)?;
        Ok(coverage_for_date(&requirements, &assignments, date))
    }

    /// Place a staff member on a session.
    ///
    /// Rejected when the date is outside the examination, when the staff
    /// member already holds that session, or once the session is inside the
    /// change cutoff relative to `now`.
    pub fn assign_staff(
        &self,
        exam_id: &ExamId,
        request: NewAssignment,
        now: NaiveDateTime,
    ) -> Result<StaffAssignment, InvigilationServiceError> {
        let examination = self.get_examination(exam_id)?;
        ensure_within(&examination, request.date)?;
        self.ensure_change_window(&examination, request.date, request.session, now)?;

        let already_assigned = self
            .store
            .list_assignments(exam_id, Some(request.date), None)?
            .iter()
            .any(|existing| {
                existing.session == request.session && existing.staff.id == request.staff.id
            });
        if already_assigned {
            return Err(InvigilationServiceError::DuplicateAssignment {
                staff_id: request.staff.id,
                date: request.date,
                session: request.session,
            });
        }

        let assignment = StaffAssignment {
            id: AssignmentId(self.next_id("asg")),
            exam_id: exam_id.clone(),
            staff: request.staff,
            date: request.date,
            session: request.session,
        };

        let stored = self.store.add_assignment(assignment)?;
        debug!(
            %exam_id,
            staff_id = %stored.staff.id,
            date = %stored.date,
            session = %stored.session,
            "staff assigned"
        );
        Ok(stored)
    }

    pub fn assignments(
        &self,
        exam_id: &ExamId,
        date: Option<NaiveDate>,
        department: Option<&Department>,
    ) -> Result<Vec<StaffAssignment>, InvigilationServiceError> {
        self.get_examination(exam_id)?;
        Ok(self.store.list_assignments(exam_id, date, department)?)
    }

    pub fn unassign_staff(
        &self,
        exam_id: &ExamId,
        assignment_id: &AssignmentId,
        now: NaiveDateTime,
    ) -> Result<StaffAssignment, InvigilationServiceError> {
        let examination = self.get_examination(exam_id)?;
        let assignment = self
            .store
            .list_assignments(exam_id, None, None)?
            .into_iter()
            .find(|assignment| &assignment.id == assignment_id)
            .ok_or(RepositoryError::NotFound)?;

        self.ensure_change_window(&examination, assignment.date, assignment.session, now)?;

        let removed = self.store.remove_assignment(assignment_id)?;
        self.discard_session_plan(exam_id, removed.date, removed.session)?;
        debug!(%exam_id, %assignment_id, "assignment removed");
        Ok(removed)
    }

    /// Register a room for a date and session. A block/room number may be
    /// registered once per session.
    pub fn register_room(
        &self,
        exam_id: &ExamId,
        request: NewRoom,
    ) -> Result<Room, InvigilationServiceError> {
        let examination = self.get_examination(exam_id)?;
        ensure_within(&examination, request.date)?;

        let room = Room {
            id: RoomId(self.next_id("room")),
            exam_id: exam_id.clone(),
            block: request.block.trim().to_string(),
            room_number: request.room_number.trim().to_string(),
            capacity: request.capacity,
            date: request.date,
            session: request.session,
        };

        let duplicate = self
            .store
            .list_rooms(exam_id, Some(room.date), Some(room.session))?
            .iter()
            .any(|existing| existing.same_slot(&room));
        if duplicate {
            return Err(InvigilationServiceError::DuplicateRoom {
                label: room.label(),
                date: room.date,
                session: room.session,
            });
        }

        let stored = self.store.add_room(room)?;
        debug!(%exam_id, room = %stored.label(), date = %stored.date, session = %stored.session, "room registered");
        Ok(stored)
    }

    pub fn rooms(
        &self,
        exam_id: &ExamId,
        date: Option<NaiveDate>,
        session: Option<Session>,
    ) -> Result<Vec<Room>, InvigilationServiceError> {
        self.get_examination(exam_id)?;
        Ok(self.store.list_rooms(exam_id, date, session)?)
    }

    pub fn remove_room(
        &self,
        exam_id: &ExamId,
        room_id: &RoomId,
    ) -> Result<Room, InvigilationServiceError> {
        self.get_examination(exam_id)?;
        let owned = self
            .store
            .list_rooms(exam_id, None, None)?
            .iter()
            .any(|room| &room.id == room_id);
        if !owned {
            return Err(RepositoryError::NotFound.into());
        }
        let removed = self.store.delete_room(room_id)?;
        self.discard_session_plan(exam_id, removed.date, removed.session)?;
        debug!(%exam_id, %room_id, "room removed");
        Ok(removed)
    }

    /// Record final approval of the staff assignments for `date`.
    pub fn approve_date(
        &self,
        exam_id: &ExamId,
        date: NaiveDate,
    ) -> Result<(), InvigilationServiceError> {
        let examination = self.get_examination(exam_id)?;
        ensure_within(&examination, date)?;
        self.store.approve(exam_id, date)?;
        info!(%exam_id, %date, "staff assignments approved for room allocation");
        Ok(())
    }

    pub fn is_date_approved(
        &self,
        exam_id: &ExamId,
        date: NaiveDate,
    ) -> Result<bool, InvigilationServiceError> {
        self.get_examination(exam_id)?;
        Ok(self.store.is_approved(exam_id, date)?)
    }

    pub fn approved_dates(
        &self,
        exam_id: &ExamId,
    ) -> Result<Vec<NaiveDate>, InvigilationServiceError> {
        self.get_examination(exam_id)?;
        let mut dates = self.store.approved_dates(exam_id)?;
        dates.sort();
        dates.dedup();
        Ok(dates)
    }

    /// Run the allocation engine for one session and store the result,
    /// replacing any earlier run for that session.
    pub fn generate_session_plan(
        &self,
        exam_id: &ExamId,
        date: NaiveDate,
        session: Session,
    ) -> Result<SessionPlan, InvigilationServiceError> {
        let _run = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let examination = self.get_examination(exam_id)?;
        ensure_within(&examination, date)?;
        self.run_session(exam_id, date, session)
    }

    /// Run both sessions of `date`.
    ///
    /// A session with no staff or no rooms is reported as skipped. The call
    /// fails when the date is not approved, or when every session was skipped.
    pub fn generate_day_plan(
        &self,
        exam_id: &ExamId,
        date: NaiveDate,
    ) -> Result<DayPlan, InvigilationServiceError> {
        let _run = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let examination = self.get_examination(exam_id)?;
        ensure_within(&examination, date)?;

        let mut sessions = Vec::new();
        let mut skipped = Vec::new();
        let mut first_skip: Option<AllocationError> = None;

        for session in Session::ordered() {
            match self.run_session(exam_id, date, session) {
                Ok(plan) => sessions.push(plan),
                Err(InvigilationServiceError::Allocation(
                    error @ (AllocationError::NoStaff { .. } | AllocationError::NoRooms { .. }),
                )) => {
                    skipped.push(SkippedSession {
                        session,
                        reason: error.to_string(),
                    });
                    first_skip.get_or_insert(error);
                }
                Err(other) => return Err(other),
            }
        }

        if sessions.is_empty() {
            if let Some(error) = first_skip {
                return Err(error.into());
            }
        }

        let plan = DayPlan {
            exam_id: exam_id.clone(),
            date,
            sessions,
            skipped,
        };
        info!(
            %exam_id,
            %date,
            allocations = plan.allocations().count(),
            shortfall = plan.total_shortfall(),
            "room allocation generated"
        );
        Ok(plan)
    }

    fn run_session(
        &self,
        exam_id: &ExamId,
        date: NaiveDate,
        session: Session,
    ) -> Result<SessionPlan, InvigilationServiceError> {
        let approved = self.store.is_approved(exam_id, date)?;
        let staff = self.store.list_assignments(exam_id, Some(date), None)?;
        let rooms = self.store.list_rooms(exam_id, Some(date), Some(session))?;

        let allocations = match generate_allocations(date, session, &staff, &rooms, &approved) {
            Ok(allocations) => allocations,
            Err(error @ (AllocationError::NoStaff { .. } | AllocationError::NoRooms { .. })) => {
                self.store
                    .record_session(exam_id, date, session, Vec::new())?;
                return Err(error.into());
            }
            Err(error) => return Err(error.into()),
        };

        let staff_available = staff
            .iter()
            .filter(|assignment| assignment.session == session)
            .count();

        self.store
            .record_session(exam_id, date, session, allocations.clone())?;

        Ok(SessionPlan {
            session,
            rooms_registered: rooms.len(),
            staff_available,
            allocations,
        })
    }

    /// Drops the stored plan for a session whose staff or rooms changed, so
    /// no duty outlives the assignment or room it was built from.
    fn discard_session_plan(
        &self,
        exam_id: &ExamId,
        date: NaiveDate,
        session: Session,
    ) -> Result<(), InvigilationServiceError> {
        let _run = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.record_session(exam_id, date, session, Vec::new())?;
        Ok(())
    }

    pub fn allocations_for_date(
        &self,
        exam_id: &ExamId,
        date: NaiveDate,
    ) -> Result<Vec<Allocation>, InvigilationServiceError> {
        self.get_examination(exam_id)?;
        Ok(self.store.allocations_for_date(exam_id, date)?)
    }

    /// Every stored duty held by a staff member, latest date first.
    pub fn duties_for_staff(
        &self,
        staff_id: &StaffId,
    ) -> Result<Vec<StaffDuty>, InvigilationServiceError> {
        let mut duties = Vec::new();
        for (exam_id, allocation) in self.store.allocations_for_staff(staff_id)? {
            let Some(examination) = self.store.fetch_examination(&exam_id)? else {
                continue;
            };
            duties.push(StaffDuty {
                exam_id,
                exam_title: examination.title,
                date: allocation.date,
                session: allocation.session,
                room_label: allocation.room_label,
                room_type: allocation.room_type,
            });
        }
        duties.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.session.cmp(&b.session)));
        Ok(duties)
    }

    fn ensure_change_window(
        &self,
        examination: &Examination,
        date: NaiveDate,
        session: Session,
        now: NaiveDateTime,
    ) -> Result<(), InvigilationServiceError> {
        let starts_at = examination.session_start(date, session);
        let cutoff = Duration::hours(i64::from(self.config.change_cutoff_hours));
        if starts_at - now <= cutoff {
            return Err(InvigilationServiceError::ChangeWindowClosed {
                date,
                session,
                cutoff_hours: self.config.change_cutoff_hours,
            });
        }
        Ok(())
    }
}

fn ensure_within(
    examination: &Examination,
    date: NaiveDate,
) -> Result<(), InvigilationServiceError> {
    if examination.covers(date) {
        Ok(())
    } else {
        Err(InvigilationServiceError::DateOutsideExam {
            date,
            start: examination.start_date,
            end: examination.end_date,
        })
    }
}

/// Error raised by the invigilation service.
#[derive(Debug, thiserror::Error)]
pub enum InvigilationServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error("examination {0} not found")]
    ExaminationNotFound(ExamId),
    #[error("invalid examination: {0}")]
    InvalidExamination(String),
    #[error("{date} falls outside the examination window ({start} to {end})")]
    DateOutsideExam {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("staff {staff_id} is already assigned on {date} ({session})")]
    DuplicateAssignment {
        staff_id: StaffId,
        date: NaiveDate,
        session: Session,
    },
    #[error("room {label} is already registered on {date} ({session})")]
    DuplicateRoom {
        label: String,
        date: NaiveDate,
        session: Session,
    },
    #[error("assignments for {date} ({session}) are locked within {cutoff_hours} hours of the session start")]
    ChangeWindowClosed {
        date: NaiveDate,
        session: Session,
        cutoff_hours: u32,
    },
}
