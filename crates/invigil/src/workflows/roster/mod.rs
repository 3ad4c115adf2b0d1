//! CSV roster import feeding the allocation engine outside the HTTP service.

mod parser;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::workflows::examination::domain::{ExamId, Room, StaffAssignment};

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: usize, message: String },
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read roster file: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid roster CSV data: {}", err),
            RosterImportError::InvalidRow { line, message } => {
                write!(f, "roster line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Staff assignments and rooms loaded for one examination.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    pub assignments: Vec<StaffAssignment>,
    pub rooms: Vec<Room>,
}

/// Loads staff and room rosters tagged with a single examination id.
pub struct RosterImporter {
    exam_id: ExamId,
}

impl RosterImporter {
    pub fn new(exam_id: ExamId) -> Self {
        Self { exam_id }
    }

    pub fn read_staff<R: Read>(&self, reader: R) -> Result<Vec<StaffAssignment>, RosterImportError> {
        parser::parse_staff(reader, &self.exam_id)
    }

    pub fn read_rooms<R: Read>(&self, reader: R) -> Result<Vec<Room>, RosterImportError> {
        parser::parse_rooms(reader, &self.exam_id)
    }

    pub fn from_paths<P, Q>(&self, staff_path: P, rooms_path: Q) -> Result<Roster, RosterImportError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let assignments = self.read_staff(File::open(staff_path)?)?;
        let rooms = self.read_rooms(File::open(rooms_path)?)?;
        tracing::debug!(
            exam_id = %self.exam_id,
            staff = assignments.len(),
            rooms = rooms.len(),
            "roster loaded"
        );
        Ok(Roster { assignments, rooms })
    }
}
