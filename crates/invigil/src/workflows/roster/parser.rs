use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::io::Read;

use super::RosterImportError;
use crate::workflows::examination::domain::{
    AssignmentId, ExamId, Room, RoomCapacity, RoomId, Session, StaffAssignment, StaffMember,
};

#[derive(Debug, Deserialize)]
struct StaffRow {
    staff_id: String,
    name: String,
    department: String,
    designation: String,
    date: String,
    session: String,
}

#[derive(Debug, Deserialize)]
struct RoomRow {
    room_id: String,
    block: String,
    room_number: String,
    #[serde(rename = "type")]
    room_type: String,
    date: String,
    session: String,
}

/// Reads `staff_id,name,department,designation,date,session` rows, keeping
/// file order as assignment order. A staff member may appear once per date
/// and session.
pub(crate) fn parse_staff<R: Read>(
    reader: R,
    exam_id: &ExamId,
) -> Result<Vec<StaffAssignment>, RosterImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut assignments = Vec::new();
    let mut seen: BTreeSet<(String, NaiveDate, Session)> = BTreeSet::new();

    for (index, record) in csv_reader.deserialize::<StaffRow>().enumerate() {
        let row = record?;
        let line = index + 2;
        let date = parse_date(&row.date, line)?;
        let session = parse_session(&row.session, line)?;
        if row.staff_id.is_empty() || row.department.is_empty() {
            return Err(RosterImportError::InvalidRow {
                line,
                message: "staff_id and department are required".to_string(),
            });
        }
        if !seen.insert((row.staff_id.clone(), date, session)) {
            return Err(RosterImportError::InvalidRow {
                line,
                message: format!(
                    "staff '{}' is already listed for {} {}",
                    row.staff_id,
                    date,
                    session.label()
                ),
            });
        }

        assignments.push(StaffAssignment {
            id: AssignmentId(format!("{}-{}-{}", row.staff_id, date, session)),
            exam_id: exam_id.clone(),
            staff: StaffMember::new(row.staff_id, row.name, row.department, row.designation),
            date,
            session,
        });
    }

    Ok(assignments)
}

/// Reads `room_id,block,room_number,type,date,session` rows in registration
/// order.
pub(crate) fn parse_rooms<R: Read>(
    reader: R,
    exam_id: &ExamId,
) -> Result<Vec<Room>, RosterImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rooms = Vec::new();

    for (index, record) in csv_reader.deserialize::<RoomRow>().enumerate() {
        let row = record?;
        let line = index + 2;
        let capacity =
            RoomCapacity::parse(&row.room_type).ok_or_else(|| RosterImportError::InvalidRow {
                line,
                message: format!("unknown room type '{}'", row.room_type),
            })?;

        rooms.push(Room {
            id: RoomId(row.room_id),
            exam_id: exam_id.clone(),
            block: row.block,
            room_number: row.room_number,
            capacity,
            date: parse_date(&row.date, line)?,
            session: parse_session(&row.session, line)?,
        });
    }

    Ok(rooms)
}

fn parse_date(value: &str, line: usize) -> Result<NaiveDate, RosterImportError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| RosterImportError::InvalidRow {
        line,
        message: format!("date '{value}' is not YYYY-MM-DD"),
    })
}

fn parse_session(value: &str, line: usize) -> Result<Session, RosterImportError> {
    Session::parse(value).ok_or_else(|| RosterImportError::InvalidRow {
        line,
        message: format!("session '{value}' is neither AM nor PM"),
    })
}
