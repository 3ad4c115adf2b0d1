use std::collections::HashSet;

use chrono::NaiveDate;
use invigil::workflows::allocation::{generate_allocations, Allocation, AllocationError};
use invigil::workflows::examination::{
    AssignmentId, ExamId, Room, RoomCapacity, RoomId, Session, StaffAssignment, StaffMember,
};

fn exam_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 3).expect("valid date")
}

fn staff(id: &str, department: &str, designation: &str) -> StaffAssignment {
    StaffAssignment {
        id: AssignmentId(format!("asg-{id}")),
        exam_id: ExamId::from("exam-1"),
        staff: StaffMember::new(id, format!("Staff {id}"), department, designation),
        date: exam_date(),
        session: Session::Morning,
    }
}

fn room(number: &str, capacity: RoomCapacity) -> Room {
    Room {
        id: RoomId(format!("room-{number}")),
        exam_id: ExamId::from("exam-1"),
        block: "MB".to_string(),
        room_number: number.to_string(),
        capacity,
        date: exam_date(),
        session: Session::Morning,
    }
}

fn ids(allocation: &Allocation) -> Vec<&str> {
    allocation
        .invigilators
        .iter()
        .map(|invigilator| invigilator.id.0.as_str())
        .collect()
}

fn run(staff: &[StaffAssignment], rooms: &[Room]) -> Vec<Allocation> {
    generate_allocations(exam_date(), Session::Morning, staff, rooms, &true)
        .expect("approved run succeeds")
}

/// Deterministic mix of designations and a small department set, so that
/// department clashes and abandoned rooms both occur.
fn mixed_roster(seed: u64, size: usize) -> Vec<StaffAssignment> {
    const DEPARTMENTS: [&str; 4] = ["CSE", "ECE", "MECH", "CIVIL"];
    const DESIGNATIONS: [&str; 4] = [
        "Professor",
        "Assistant Professor",
        "Associate Professor",
        "Lecturer",
    ];
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..size)
        .map(|index| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let department = DEPARTMENTS[((state >> 33) % 4) as usize];
            let designation = DESIGNATIONS[((state >> 40) % 4) as usize];
            staff(&format!("e{seed}-{index}"), department, designation)
        })
        .collect()
}

fn mixed_rooms(seed: u64, count: usize) -> Vec<Room> {
    (0..count)
        .map(|index| {
            let capacity = if (seed + index as u64) % 3 == 0 {
                RoomCapacity::SpecialHall
            } else {
                RoomCapacity::Normal
            };
            room(&format!("{}", 100 + index), capacity)
        })
        .collect()
}

#[test]
fn allocations_hold_exact_headcount_and_distinct_departments() {
    for seed in 0..40 {
        let staff = mixed_roster(seed, 3 + (seed as usize % 12));
        let rooms = mixed_rooms(seed, 1 + (seed as usize % 5));
        let allocations = run(&staff, &rooms);

        let mut placed = HashSet::new();
        for allocation in &allocations {
            let expected = allocation.room_type.required_invigilators();
            assert_eq!(allocation.invigilators.len(), expected, "seed {seed}");

            let departments: HashSet<_> = allocation
                .invigilators
                .iter()
                .map(|invigilator| invigilator.department.clone())
                .collect();
            assert_eq!(departments.len(), expected, "seed {seed}");

            for invigilator in &allocation.invigilators {
                assert!(
                    placed.insert(invigilator.id.clone()),
                    "seed {seed}: {} placed twice",
                    invigilator.id
                );
            }
        }
        assert!(allocations.len() <= rooms.len());
    }
}

#[test]
fn identical_inputs_give_identical_plans() {
    for seed in 0..20 {
        let staff = mixed_roster(seed, 10);
        let rooms = mixed_rooms(seed, 4);
        assert_eq!(run(&staff, &rooms), run(&staff, &rooms), "seed {seed}");
    }
}

#[test]
fn dropping_a_room_never_adds_allocations_when_no_room_is_abandoned() {
    let departments = ["CSE", "ECE", "MECH", "CIVIL", "EEE", "IT", "CHEM"];
    let designations = ["Professor", "Assistant Professor", "Lecturer"];
    let staff: Vec<_> = departments
        .iter()
        .enumerate()
        .map(|(index, department)| {
            staff(
                &format!("e{index}"),
                department,
                designations[index % designations.len()],
            )
        })
        .collect();
    let rooms: Vec<_> = (0..5)
        .map(|index| room(&format!("{}", 200 + index), RoomCapacity::Normal))
        .collect();

    let full = run(&staff, &rooms).len();
    for removed in 0..rooms.len() {
        let mut remaining = rooms.clone();
        remaining.remove(removed);
        assert!(run(&staff, &remaining).len() <= full);
    }
}

#[test]
fn closed_gate_allocates_nothing() {
    let staff = mixed_roster(7, 8);
    let rooms = mixed_rooms(7, 3);

    let result = generate_allocations(exam_date(), Session::Morning, &staff, &rooms, &false);
    assert_eq!(
        result,
        Err(AllocationError::NotApproved { date: exam_date() })
    );
}

#[test]
fn special_hall_skips_the_clashing_junior() {
    let staff = vec![
        staff("s1", "CSE", "Professor"),
        staff("s2", "ECE", "Professor"),
        staff("j1", "CSE", "Assistant Professor"),
        staff("o1", "MECH", "Lecturer"),
    ];
    let rooms = vec![room("DH1", RoomCapacity::SpecialHall)];

    let allocations = run(&staff, &rooms);
    assert_eq!(allocations.len(), 1);
    assert_eq!(ids(&allocations[0]), vec!["s1", "o1", "s2"]);
    assert!(!allocations[0].includes(&"j1".into()));
}

#[test]
fn special_hall_is_abandoned_without_a_third_department() {
    let staff = vec![
        staff("s1", "CSE", "Professor"),
        staff("s2", "CSE", "Professor"),
        staff("j1", "ECE", "Assistant Professor"),
        staff("o1", "ECE", "Lecturer"),
    ];
    let rooms = vec![room("DH1", RoomCapacity::SpecialHall)];

    assert!(run(&staff, &rooms).is_empty());
}

#[test]
fn three_rooms_five_staff_leaves_one_room_and_one_person() {
    let staff = vec![
        staff("s1", "CSE", "Professor"),
        staff("s2", "ECE", "Professor"),
        staff("j1", "MECH", "Assistant Professor"),
        staff("j2", "CIVIL", "Assistant Professor"),
        staff("o1", "EEE", "Lecturer"),
    ];
    let rooms = vec![
        room("101", RoomCapacity::Normal),
        room("102", RoomCapacity::Normal),
        room("103", RoomCapacity::Normal),
    ];

    let allocations = run(&staff, &rooms);
    assert_eq!(allocations.len(), 2);
    assert_eq!(ids(&allocations[0]), vec!["s1", "j1"]);
    assert_eq!(ids(&allocations[1]), vec!["s2", "j2"]);
    assert!(allocations
        .iter()
        .all(|allocation| allocation.room_label != "MB-103"));
    assert!(allocations
        .iter()
        .all(|allocation| !allocation.includes(&"o1".into())));
}

#[test]
fn no_rooms_is_reported() {
    let staff = vec![staff("s1", "CSE", "Professor")];

    let result = generate_allocations(exam_date(), Session::Morning, &staff, &[], &true);
    assert_eq!(
        result,
        Err(AllocationError::NoRooms {
            date: exam_date(),
            session: Session::Morning
        })
    );
}

#[test]
fn abandoned_room_keeps_its_drawn_staff_out_of_later_rooms() {
    let staff = vec![
        staff("s1", "CSE", "Professor"),
        staff("j1", "ECE", "Assistant Professor"),
        staff("o1", "CSE", "Lecturer"),
        staff("o2", "ECE", "Lecturer"),
    ];
    let with_hall = vec![
        room("DH1", RoomCapacity::SpecialHall),
        room("102", RoomCapacity::Normal),
        room("103", RoomCapacity::Normal),
    ];

    // s1 and j1 are lost with the hall, so only one normal room fills.
    let allocations = run(&staff, &with_hall);
    assert_eq!(allocations.len(), 1);
    assert_eq!(ids(&allocations[0]), vec!["o1", "o2"]);

    // Without the hall both normal rooms fill.
    let without_hall = run(&staff, &with_hall[1..]);
    assert_eq!(without_hall.len(), 2);
}
