use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of an examination series.
    ExamId
);
string_id!(
    /// Staff (employee) identifier.
    StaffId
);
string_id!(
    /// Identifier of a registered room.
    RoomId
);
string_id!(
    /// Identifier of a single staff-to-session assignment.
    AssignmentId
);
string_id!(
    /// Owning department of a staff member, e.g. `CSE` or `MECH`.
    Department
);

/// One of the two daily examination blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Session {
    #[serde(rename = "AM", alias = "am", alias = "morning")]
    Morning,
    #[serde(rename = "PM", alias = "pm", alias = "afternoon")]
    Afternoon,
}

impl Session {
    pub const fn ordered() -> [Self; 2] {
        [Self::Morning, Self::Afternoon]
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::Morning => "AM",
            Self::Afternoon => "PM",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Morning => "Morning",
            Self::Afternoon => "Afternoon",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "am" | "morning" | "fn" => Some(Self::Morning),
            "pm" | "afternoon" | "an" => Some(Self::Afternoon),
            _ => None,
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Coarse rank used to pair an experienced and a junior invigilator per room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeniorityClass {
    Senior,
    Junior,
    Other,
}

impl SeniorityClass {
    /// Maps a free-text designation onto its seniority class.
    ///
    /// Matching ignores case and repeated whitespace, so `"  assistant   PROFESSOR"`
    /// is still a junior designation. Anything not recognised is `Other`.
    pub fn from_designation(designation: &str) -> Self {
        let normalized = designation
            .split_whitespace()
            .map(str::to_ascii_lowercase)
            .collect::<Vec<_>>()
            .join(" ");

        match normalized.as_str() {
            "professor" => Self::Senior,
            "assistant professor" => Self::Junior,
            _ => Self::Other,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Senior => "Senior",
            Self::Junior => "Junior",
            Self::Other => "Other",
        }
    }
}

/// Capacity class of a room, fixing how many invigilators it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomCapacity {
    #[serde(alias = "normal")]
    Normal,
    #[serde(alias = "Drawing Hall", alias = "Special Hall", alias = "special_hall")]
    SpecialHall,
}

impl RoomCapacity {
    pub const fn required_invigilators(self) -> usize {
        match self {
            Self::Normal => 2,
            Self::SpecialHall => 3,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::SpecialHall => "Special Hall",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let compact: String = raw
            .chars()
            .filter(|ch| !ch.is_whitespace() && *ch != '_' && *ch != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match compact.as_str() {
            "normal" => Some(Self::Normal),
            "specialhall" | "drawinghall" => Some(Self::SpecialHall),
            _ => None,
        }
    }
}

/// A staff member eligible for invigilation duty.
///
/// The seniority class is derived from the designation once, at construction, so
/// downstream code never compares designation strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StaffMemberRecord")]
pub struct StaffMember {
    pub id: StaffId,
    pub name: String,
    pub department: Department,
    pub designation: String,
    pub seniority: SeniorityClass,
}

impl StaffMember {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        department: impl Into<String>,
        designation: impl Into<String>,
    ) -> Self {
        let designation = designation.into();
        let seniority = SeniorityClass::from_designation(&designation);
        Self {
            id: StaffId(id.into()),
            name: name.into(),
            department: Department(department.into()),
            designation,
            seniority,
        }
    }
}

#[derive(Deserialize)]
struct StaffMemberRecord {
    id: StaffId,
    name: String,
    department: Department,
    designation: String,
}

impl From<StaffMemberRecord> for StaffMember {
    fn from(record: StaffMemberRecord) -> Self {
        let seniority = SeniorityClass::from_designation(&record.designation);
        Self {
            id: record.id,
            name: record.name,
            department: record.department,
            designation: record.designation,
            seniority,
        }
    }
}

/// A staff member placed on a specific examination date and session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffAssignment {
    pub id: AssignmentId,
    pub exam_id: ExamId,
    pub staff: StaffMember,
    pub date: NaiveDate,
    pub session: Session,
}

/// Coordinator request to place a staff member on a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAssignment {
    pub staff: StaffMember,
    pub date: NaiveDate,
    pub session: Session,
}

/// A room registered by the exam section for one date and session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub exam_id: ExamId,
    pub block: String,
    pub room_number: String,
    #[serde(rename = "type")]
    pub capacity: RoomCapacity,
    pub date: NaiveDate,
    pub session: Session,
}

impl Room {
    pub fn label(&self) -> String {
        format!("{}-{}", self.block, self.room_number)
    }

    pub(crate) fn same_slot(&self, other: &Room) -> bool {
        self.exam_id == other.exam_id
            && self.block.eq_ignore_ascii_case(&other.block)
            && self.room_number.eq_ignore_ascii_case(&other.room_number)
            && self.date == other.date
            && self.session == other.session
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoom {
    pub block: String,
    pub room_number: String,
    #[serde(rename = "type", default = "default_capacity")]
    pub capacity: RoomCapacity,
    pub date: NaiveDate,
    pub session: Session,
}

fn default_capacity() -> RoomCapacity {
    RoomCapacity::Normal
}

/// Start and end time of an examination session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SessionWindow {
    pub fn morning() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn afternoon() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(14, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// An examination series spanning a contiguous range of dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Examination {
    pub id: ExamId,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub morning: SessionWindow,
    pub afternoon: SessionWindow,
}

impl Examination {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn window(&self, session: Session) -> SessionWindow {
        match session {
            Session::Morning => self.morning,
            Session::Afternoon => self.afternoon,
        }
    }

    pub fn session_start(&self, date: NaiveDate, session: Session) -> NaiveDateTime {
        date.and_time(self.window(session).start)
    }

    pub fn status(&self, today: NaiveDate) -> ExamStatus {
        if today < self.start_date {
            ExamStatus::Upcoming
        } else if today > self.end_date {
            ExamStatus::Completed
        } else {
            ExamStatus::Ongoing
        }
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start_date
            .iter_days()
            .take_while(move |date| *date <= self.end_date)
    }
}

/// Request body for creating an examination series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExamination {
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "SessionWindow::morning")]
    pub morning: SessionWindow,
    #[serde(default = "SessionWindow::afternoon")]
    pub afternoon: SessionWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    Upcoming,
    Ongoing,
    Completed,
}

impl ExamStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
        }
    }
}

/// An examination together with its status on a reference date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExaminationView {
    #[serde(flatten)]
    pub examination: Examination,
    pub status: ExamStatus,
}

impl ExaminationView {
    pub fn new(examination: Examination, today: NaiveDate) -> Self {
        let status = examination.status(today);
        Self {
            examination,
            status,
        }
    }
}

/// Per-department invigilator headcount target for one examination date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub exam_id: ExamId,
    pub department: Department,
    pub date: NaiveDate,
    #[serde(default)]
    pub morning: u16,
    #[serde(default)]
    pub afternoon: u16,
}

impl Requirement {
    pub fn for_session(&self, session: Session) -> u16 {
        match session {
            Session::Morning => self.morning,
            Session::Afternoon => self.afternoon,
        }
    }
}
