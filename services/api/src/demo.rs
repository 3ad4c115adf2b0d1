use crate::infra::{parse_date, parse_session, InMemoryInvigilationStore};
use chrono::{Days, Duration, Local, NaiveDate, NaiveDateTime};
use clap::Args;
use invigil::config::SchedulingConfig;
use invigil::error::AppError;
use invigil::workflows::allocation::{generate_allocations, Allocation, AllocationError, DayPlan};
use invigil::workflows::examination::{
    InvigilationService, NewAssignment, NewExamination, NewRoom, RoomCapacity, Session,
    SessionWindow, StaffMember,
};
use invigil::workflows::roster::{Roster, RosterImporter};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub(crate) struct AllocateArgs {
    /// Staff roster CSV (staff_id,name,department,designation,date,session)
    #[arg(long)]
    pub(crate) staff: PathBuf,
    /// Room roster CSV (room_id,block,room_number,type,date,session)
    #[arg(long)]
    pub(crate) rooms: PathBuf,
    /// Examination date to allocate (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: NaiveDate,
    /// Restrict the run to one session (AM or PM). Both run when omitted.
    #[arg(long, value_parser = parse_session)]
    pub(crate) session: Option<Session>,
    /// Date whose staff assignments have been finally approved (repeatable).
    /// The run is refused unless `--date` is among them.
    #[arg(long = "approved", value_parser = parse_date)]
    pub(crate) approved: Vec<NaiveDate>,
    /// Identifier stamped on the imported rows
    #[arg(long, default_value = "roster")]
    pub(crate) exam_id: String,
    /// Print allocations as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// First examination date (YYYY-MM-DD). Defaults to a week from today.
    /// Dates inside the staff change cutoff move to the first open day.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Print the generated day plan as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

/// Runs the allocation engine over CSV rosters. Only dates passed through
/// `--approved` are allocated.
pub(crate) fn run_allocate(args: AllocateArgs) -> Result<(), AppError> {
    let importer = RosterImporter::new(args.exam_id.as_str().into());
    let roster = importer.from_paths(&args.staff, &args.rooms)?;
    let approved: BTreeSet<NaiveDate> = args.approved.iter().copied().collect();

    let outcomes = allocate_roster(&roster, args.date, args.session, &approved)?;

    let mut allocations: Vec<Allocation> = Vec::new();
    for outcome in outcomes {
        match outcome {
            SessionOutcome::Allocated {
                session,
                registered,
                allocations: placed,
            } => {
                info!(
                    date = %args.date,
                    %session,
                    rooms = registered,
                    allocated = placed.len(),
                    "session allocated"
                );
                if !args.json {
                    print_session(args.date, session, registered, &placed);
                }
                allocations.extend(placed);
            }
            SessionOutcome::Skipped { session, reason } => {
                if !args.json {
                    println!("\n{} {} session: skipped ({})", args.date, session.label(), reason);
                }
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&allocations)?);
    }
    Ok(())
}

#[derive(Debug)]
pub(crate) enum SessionOutcome {
    Allocated {
        session: Session,
        registered: usize,
        allocations: Vec<Allocation>,
    },
    Skipped {
        session: Session,
        reason: AllocationError,
    },
}

/// Allocates one session, or both when `only` is `None`. An empty session is
/// only fatal when it was asked for explicitly.
pub(crate) fn allocate_roster(
    roster: &Roster,
    date: NaiveDate,
    only: Option<Session>,
    approved: &BTreeSet<NaiveDate>,
) -> Result<Vec<SessionOutcome>, AllocationError> {
    if !approved.contains(&date) {
        return Err(AllocationError::NotApproved { date });
    }

    let sessions: Vec<Session> = match only {
        Some(session) => vec![session],
        None => Session::ordered().to_vec(),
    };

    let mut outcomes = Vec::new();
    for session in sessions {
        let registered = roster
            .rooms
            .iter()
            .filter(|room| room.date == date && room.session == session)
            .count();
        match generate_allocations(date, session, &roster.assignments, &roster.rooms, approved) {
            Ok(allocations) => outcomes.push(SessionOutcome::Allocated {
                session,
                registered,
                allocations,
            }),
            Err(reason @ (AllocationError::NoStaff { .. } | AllocationError::NoRooms { .. }))
                if only.is_none() =>
            {
                outcomes.push(SessionOutcome::Skipped { session, reason })
            }
            Err(err) => return Err(err),
        }
    }
    Ok(outcomes)
}

/// Seeds an in-memory examination, approves its first day, and prints the
/// generated plan.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let now = Local::now().naive_local();
    let config = SchedulingConfig::default();
    let requested = args
        .start
        .or_else(|| now.date().checked_add_days(Days::new(7)))
        .unwrap_or(now.date());
    let start = demo_start(requested, now, &config);
    if start != requested {
        warn!(%requested, %start, "demo start moved past the staff change cutoff");
    }
    let end = start.checked_add_days(Days::new(4)).unwrap_or(start);

    let service = InvigilationService::new(
        Arc::new(InMemoryInvigilationStore::default()),
        config,
    );
    let exam = service.create_examination(NewExamination {
        title: "End Semester Examinations".to_string(),
        start_date: start,
        end_date: end,
        morning: SessionWindow::morning(),
        afternoon: SessionWindow::afternoon(),
    })?;

    for (id, name, department, designation, session) in demo_staff() {
        service.assign_staff(
            &exam.id,
            NewAssignment {
                staff: StaffMember::new(id, name, department, designation),
                date: start,
                session,
            },
            now,
        )?;
    }

    for (block, number, capacity, session) in demo_rooms() {
        service.register_room(
            &exam.id,
            NewRoom {
                block: block.to_string(),
                room_number: number.to_string(),
                capacity,
                date: start,
                session,
            },
        )?;
    }

    service.approve_date(&exam.id, start)?;
    let plan = service.generate_day_plan(&exam.id, start)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("Invigilation demo: {} ({})", exam.title, exam.id);
        render_day_plan(&plan);
    }
    Ok(())
}

/// Earliest day whose morning session still accepts staff changes at `now`.
fn demo_start(requested: NaiveDate, now: NaiveDateTime, config: &SchedulingConfig) -> NaiveDate {
    let cutoff = Duration::hours(i64::from(config.change_cutoff_hours));
    let mut start = requested;
    while start.and_time(SessionWindow::morning().start) - now <= cutoff {
        match start.succ_opt() {
            Some(next) => start = next,
            None => break,
        }
    }
    start
}

fn demo_staff() -> Vec<(&'static str, &'static str, &'static str, &'static str, Session)> {
    vec![
        ("E101", "Dr. Meena Rao", "CSE", "Professor", Session::Morning),
        ("E102", "Arun Kumar", "ECE", "Assistant Professor", Session::Morning),
        ("E103", "Dr. Sunil Nair", "MECH", "Professor", Session::Morning),
        ("E104", "Priya Menon", "CSE", "Assistant Professor", Session::Morning),
        ("E105", "Kavya Iyer", "CIVIL", "Lecturer", Session::Morning),
        ("E106", "Rahul Das", "EEE", "Assistant Professor", Session::Morning),
        ("E107", "Dr. Farah Khan", "IT", "Professor", Session::Afternoon),
        ("E108", "Joseph Mathew", "ECE", "Assistant Professor", Session::Afternoon),
        ("E109", "Lakshmi Varma", "MECH", "Associate Professor", Session::Afternoon),
    ]
}

fn demo_rooms() -> Vec<(&'static str, &'static str, RoomCapacity, Session)> {
    vec![
        ("CB", "101", RoomCapacity::Normal, Session::Morning),
        ("DH", "1", RoomCapacity::SpecialHall, Session::Morning),
        ("CB", "102", RoomCapacity::Normal, Session::Morning),
        ("CB", "201", RoomCapacity::Normal, Session::Afternoon),
        ("CB", "202", RoomCapacity::Normal, Session::Afternoon),
    ]
}

fn render_day_plan(plan: &DayPlan) {
    for session in &plan.sessions {
        print_session(
            plan.date,
            session.session,
            session.rooms_registered,
            &session.allocations,
        );
        println!(
            "  Staff placed: {} of {}",
            session.staff_placed(),
            session.staff_available
        );
    }
    for skipped in &plan.skipped {
        println!("\n{} {}: skipped ({})", plan.date, skipped.session.label(), skipped.reason);
    }
}

fn print_session(date: NaiveDate, session: Session, registered: usize, allocations: &[Allocation]) {
    println!("\n{} {} session", date, session.label());
    if allocations.is_empty() {
        println!("  No rooms allocated");
    }
    for allocation in allocations {
        let names: Vec<String> = allocation
            .invigilators
            .iter()
            .map(|invigilator| format!("{} ({})", invigilator.name, invigilator.department))
            .collect();
        println!(
            "  {:<8} {:<12} {}",
            allocation.room_label,
            allocation.room_type.label(),
            names.join(", ")
        );
    }
    let unfilled = registered.saturating_sub(allocations.len());
    if unfilled > 0 {
        println!("  Rooms without invigilators: {}", unfilled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use invigil::workflows::examination::ExamId;

    const STAFF_CSV: &str = "\
staff_id,name,department,designation,date,session
e-1,Dr. Rao,CSE,Professor,2025-11-03,AM
e-2,Ms. Das,ECE,Assistant Professor,2025-11-03,AM
";

    const ROOMS_CSV: &str = "\
room_id,block,room_number,type,date,session
r-1,CB,101,Normal,2025-11-03,AM
";

    fn roster() -> Roster {
        let importer = RosterImporter::new(ExamId::from("roster"));
        Roster {
            assignments: importer.read_staff(STAFF_CSV.as_bytes()).expect("staff"),
            rooms: importer.read_rooms(ROOMS_CSV.as_bytes()).expect("rooms"),
        }
    }

    fn exam_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 3).expect("valid date")
    }

    #[test]
    fn allocation_is_refused_until_the_date_is_approved() {
        let other_day: BTreeSet<NaiveDate> =
            [NaiveDate::from_ymd_opt(2025, 11, 4).expect("valid date")]
                .into_iter()
                .collect();

        for approved in [BTreeSet::new(), other_day] {
            match allocate_roster(&roster(), exam_date(), None, &approved) {
                Err(AllocationError::NotApproved { date }) => assert_eq!(date, exam_date()),
                other => panic!("expected approval refusal, got {other:?}"),
            }
        }
    }

    #[test]
    fn approved_date_allocates_and_skips_the_empty_session() {
        let approved: BTreeSet<NaiveDate> = [exam_date()].into_iter().collect();
        let outcomes =
            allocate_roster(&roster(), exam_date(), None, &approved).expect("allocates");

        assert_eq!(outcomes.len(), 2);
        match &outcomes[0] {
            SessionOutcome::Allocated {
                registered,
                allocations,
                ..
            } => {
                assert_eq!(*registered, 1);
                assert_eq!(allocations.len(), 1);
                assert_eq!(allocations[0].room_label, "CB-101");
            }
            other => panic!("expected morning allocation, got {other:?}"),
        }
        assert!(matches!(
            outcomes[1],
            SessionOutcome::Skipped {
                session: Session::Afternoon,
                ..
            }
        ));

        assert!(matches!(
            allocate_roster(&roster(), exam_date(), Some(Session::Afternoon), &approved),
            Err(AllocationError::NoStaff { .. })
        ));
    }

    #[test]
    fn demo_start_moves_past_the_change_cutoff() {
        let config = SchedulingConfig::default();
        let now = exam_date().and_time(NaiveTime::from_hms_opt(10, 0, 0).expect("valid time"));

        // Tomorrow 09:00 is 23 hours away, inside the 24 hour cutoff.
        let tomorrow = exam_date().succ_opt().expect("next day");
        let day_after = tomorrow.succ_opt().expect("next day");
        assert_eq!(demo_start(exam_date(), now, &config), day_after);
        assert_eq!(demo_start(tomorrow, now, &config), day_after);

        let later = NaiveDate::from_ymd_opt(2025, 11, 10).expect("valid date");
        assert_eq!(demo_start(later, now, &config), later);
    }
}
