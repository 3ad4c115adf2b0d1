use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{Department, Requirement, Session, StaffAssignment};

/// Required versus assigned invigilators for one department and session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageEntry {
    pub department: Department,
    pub date: NaiveDate,
    pub session: Session,
    pub required: u16,
    pub assigned: u16,
    pub shortfall: u16,
}

impl CoverageEntry {
    fn new(
        department: Department,
        date: NaiveDate,
        session: Session,
        required: u16,
        assigned: u16,
    ) -> Self {
        Self {
            department,
            date,
            session,
            required,
            assigned,
            shortfall: required.saturating_sub(assigned),
        }
    }

    pub fn is_met(&self) -> bool {
        self.shortfall == 0
    }
}

/// Builds the coverage table for `date`, one row per department and session.
///
/// Departments with assignments but no saved requirement appear with a
/// requirement of zero. Rows are ordered by department, then session.
pub fn coverage_for_date(
    requirements: &[Requirement],
    assignments: &[StaffAssignment],
    date: NaiveDate,
) -> Vec<CoverageEntry> {
    let mut table: BTreeMap<(Department, Session), (u16, u16)> = BTreeMap::new();

    for requirement in requirements.iter().filter(|req| req.date == date) {
        for session in Session::ordered() {
            let row = table
                .entry((requirement.department.clone(), session))
                .or_default();
            row.0 = requirement.for_session(session);
        }
    }

    for assignment in assignments.iter().filter(|asg| asg.date == date) {
        let row = table
            .entry((assignment.staff.department.clone(), assignment.session))
            .or_default();
        row.1 = row.1.saturating_add(1);
    }

    table
        .into_iter()
        .map(|((department, session), (required, assigned))| {
            CoverageEntry::new(department, date, session, required, assigned)
        })
        .collect()
}
