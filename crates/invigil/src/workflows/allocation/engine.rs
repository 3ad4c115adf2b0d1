use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::plan::Allocation;
use super::pools::SeniorityPools;
use crate::workflows::examination::domain::{Room, Session, StaffAssignment};

/// Answers whether staff assignments for a date have been finally approved.
pub trait ApprovalGate {
    fn is_approved(&self, date: NaiveDate) -> bool;
}

impl ApprovalGate for bool {
    fn is_approved(&self, _date: NaiveDate) -> bool {
        *self
    }
}

impl ApprovalGate for BTreeSet<NaiveDate> {
    fn is_approved(&self, date: NaiveDate) -> bool {
        self.contains(&date)
    }
}

impl ApprovalGate for HashSet<NaiveDate> {
    fn is_approved(&self, date: NaiveDate) -> bool {
        self.contains(&date)
    }
}

impl ApprovalGate for [NaiveDate] {
    fn is_approved(&self, date: NaiveDate) -> bool {
        self.contains(&date)
    }
}

impl<G: ApprovalGate + ?Sized> ApprovalGate for &G {
    fn is_approved(&self, date: NaiveDate) -> bool {
        (**self).is_approved(date)
    }
}

/// Preconditions the engine refuses to run without.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("staff assignments for {date} have not been approved; submit final approval before generating room allocation")]
    NotApproved { date: NaiveDate },
    #[error("no staff assigned for {date} ({session})")]
    NoStaff { date: NaiveDate, session: Session },
    #[error("no rooms registered for {date} ({session})")]
    NoRooms { date: NaiveDate, session: Session },
}

/// Partitions the staff assigned to one date and session into the rooms
/// registered for it.
///
/// Rooms are filled in registration order. Each room takes the earliest
/// available senior, then the earliest junior, then falls back to the other
/// pools until it holds its required headcount, never placing two staff of the
/// same department together. A room that cannot reach its headcount is dropped
/// and the staff already drawn for it are not returned to the pools. Filling
/// stops once fewer than two staff remain.
///
/// Fewer allocations than rooms is a normal outcome, not an error.
pub fn generate_allocations<G>(
    date: NaiveDate,
    session: Session,
    staff: &[StaffAssignment],
    rooms: &[Room],
    approval_gate: &G,
) -> Result<Vec<Allocation>, AllocationError>
where
    G: ApprovalGate + ?Sized,
{
    if !approval_gate.is_approved(date) {
        return Err(AllocationError::NotApproved { date });
    }

    let session_staff: Vec<&StaffAssignment> = staff
        .iter()
        .filter(|assignment| assignment.date == date && assignment.session == session)
        .collect();
    if session_staff.is_empty() {
        return Err(AllocationError::NoStaff { date, session });
    }

    let session_rooms: Vec<&Room> = rooms
        .iter()
        .filter(|room| room.date == date && room.session == session)
        .collect();
    if session_rooms.is_empty() {
        return Err(AllocationError::NoRooms { date, session });
    }

    let mut pools =
        SeniorityPools::partition(session_staff.iter().map(|assignment| &assignment.staff));
    let mut allocations = Vec::with_capacity(session_rooms.len());

    for room in &session_rooms {
        if pools.remaining() < 2 {
            break;
        }

        let needed = room.capacity.required_invigilators();
        let selected = pools.draw_for_room(needed);

        if selected.len() < needed {
            warn!(
                room = %room.label(),
                %date,
                %session,
                collected = selected.len(),
                needed,
                "room abandoned; drawn staff are not returned to the pool"
            );
            continue;
        }

        allocations.push(Allocation::new(room, &selected));
    }

    debug!(
        %date,
        %session,
        rooms = session_rooms.len(),
        staff = session_staff.len(),
        allocated = allocations.len(),
        unplaced = pools.remaining(),
        "room allocation finished"
    );

    Ok(allocations)
}
