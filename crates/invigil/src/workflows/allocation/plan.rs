use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::workflows::examination::domain::{
    Department, ExamId, Room, RoomCapacity, RoomId, Session, StaffId, StaffMember,
};

/// Invigilator details carried on an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvigilatorView {
    pub id: StaffId,
    pub name: String,
    pub department: Department,
    pub designation: String,
}

impl From<&StaffMember> for InvigilatorView {
    fn from(staff: &StaffMember) -> Self {
        Self {
            id: staff.id.clone(),
            name: staff.name.clone(),
            department: staff.department.clone(),
            designation: staff.designation.clone(),
        }
    }
}

/// One room together with the ordered group of invigilators placed in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub room_id: RoomId,
    pub room_label: String,
    pub room_type: RoomCapacity,
    pub date: NaiveDate,
    pub session: Session,
    pub invigilators: Vec<InvigilatorView>,
}

impl Allocation {
    pub(crate) fn new(room: &Room, invigilators: &[&StaffMember]) -> Self {
        Self {
            room_id: room.id.clone(),
            room_label: room.label(),
            room_type: room.capacity,
            date: room.date,
            session: room.session,
            invigilators: invigilators
                .iter()
                .map(|staff| InvigilatorView::from(*staff))
                .collect(),
        }
    }

    pub fn includes(&self, staff_id: &StaffId) -> bool {
        self.invigilators
            .iter()
            .any(|invigilator| &invigilator.id == staff_id)
    }
}

/// Result of one engine run for a single date and session.
///
/// A run that could not fill every room is still a successful plan; compare
/// `allocations.len()` against `rooms_registered` (or call [`SessionPlan::shortfall`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPlan {
    pub session: Session,
    pub rooms_registered: usize,
    pub staff_available: usize,
    pub allocations: Vec<Allocation>,
}

impl SessionPlan {
    pub fn shortfall(&self) -> usize {
        self.rooms_registered.saturating_sub(self.allocations.len())
    }

    pub fn staff_placed(&self) -> usize {
        self.allocations
            .iter()
            .map(|allocation| allocation.invigilators.len())
            .sum()
    }

    pub fn is_complete(&self) -> bool {
        self.shortfall() == 0
    }
}

/// A session that was not run as part of a day plan, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSession {
    pub session: Session,
    pub reason: String,
}

/// Both sessions of one examination date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlan {
    pub exam_id: ExamId,
    pub date: NaiveDate,
    pub sessions: Vec<SessionPlan>,
    pub skipped: Vec<SkippedSession>,
}

impl DayPlan {
    pub fn allocations(&self) -> impl Iterator<Item = &Allocation> {
        self.sessions
            .iter()
            .flat_map(|session| session.allocations.iter())
    }

    pub fn total_shortfall(&self) -> usize {
        self.sessions.iter().map(SessionPlan::shortfall).sum()
    }
}

/// An invigilation duty as seen by the staff member holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffDuty {
    pub exam_id: ExamId,
    pub exam_title: String,
    pub date: NaiveDate,
    pub session: Session,
    pub room_label: String,
    pub room_type: RoomCapacity,
}
