use crate::store::{AssignmentError, AssignmentStore};
use paxalloc_resources::ResourceContainer;
use paxalloc_roster::{Passenger, Roster};
use paxalloc_shared::{ContainerId, PassengerId, SlotId};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AutoFillReport {
    pub container_id: ContainerId,
    pub assigned_count: usize,
    /// Passenger -> slot, in placement order
    pub placements: Vec<(PassengerId, SlotId)>,
    /// Candidates left without a slot because the container ran out of room
    pub unplaced: Vec<PassengerId>,
}

/// One free bed or seat. A room with two free beds yields two units.
#[derive(Debug, Clone)]
struct FreeUnit {
    number: u32,
    slot_id: SlotId,
}

/// Plan the bulk placement of `candidates` into one container.
///
/// Travel parties (same `group_id`) are placed largest first, ties in
/// roster order. Each party takes the first run of adjacent free units
/// (slot numbers advancing by 0 or 1) matching its size; if no such run
/// exists it takes the next free units in slot order, splitting the party.
/// Planning stops when the container has no free units left.
pub fn plan_auto_fill(container: &ResourceContainer, candidates: &[&Passenger]) -> Vec<(PassengerId, SlotId)> {
    // 1. Group by travel party, keeping first-seen order
    let mut groups: Vec<Vec<&Passenger>> = Vec::new();
    let mut group_index: HashMap<&str, usize> = HashMap::new();
    for &passenger in candidates {
        match group_index.get(passenger.group_id.as_str()) {
            Some(&i) => groups[i].push(passenger),
            None => {
                group_index.insert(passenger.group_id.as_str(), groups.len());
                groups.push(vec![passenger]);
            }
        }
    }

    // 2. Largest parties first; sort_by is stable so ties keep roster order
    groups.sort_by(|a, b| b.len().cmp(&a.len()));

    // 3. Free units in display order
    let mut free: Vec<FreeUnit> = container
        .slots
        .iter()
        .flat_map(|slot| {
            (0..slot.free_capacity()).map(move |_| FreeUnit {
                number: slot.number,
                slot_id: slot.id.clone(),
            })
        })
        .collect();

    // 4. Place each party
    let mut plan = Vec::new();
    for group in groups {
        if free.is_empty() {
            break;
        }

        let taken: Vec<FreeUnit> = match find_window(&free, group.len()) {
            Some(start) => free.drain(start..start + group.len()).collect(),
            None => {
                let available = group.len().min(free.len());
                free.drain(..available).collect()
            }
        };

        for (passenger, unit) in group.into_iter().zip(taken) {
            plan.push((passenger.id.clone(), unit.slot_id));
        }
    }

    plan
}

/// First start index of `size` adjacent free units
fn find_window(free: &[FreeUnit], size: usize) -> Option<usize> {
    if size == 0 || size > free.len() {
        return None;
    }
    (0..=free.len() - size).find(|&start| {
        free[start..start + size]
            .windows(2)
            .all(|pair| is_adjacent(pair[0].number, pair[1].number))
    })
}

fn is_adjacent(previous: u32, next: u32) -> bool {
    next == previous || previous.checked_add(1) == Some(next)
}

impl AssignmentStore {
    /// Fill one container with every roster passenger unassigned in this
    /// space. Other containers and already placed passengers are untouched.
    pub fn auto_fill(&mut self, container_id: &ContainerId, roster: &Roster) -> Result<AutoFillReport, AssignmentError> {
        let container = self
            .container(container_id)
            .ok_or_else(|| AssignmentError::ContainerNotFound(container_id.to_string()))?;

        let candidates: Vec<&Passenger> = roster
            .iter()
            .filter(|p| !self.is_assigned(&p.id))
            .collect();
        let plan = plan_auto_fill(container, &candidates);

        let unplaced: Vec<PassengerId> = candidates
            .iter()
            .filter(|p| !plan.iter().any(|(id, _)| id == &p.id))
            .map(|p| p.id.clone())
            .collect();

        for (passenger_id, slot_id) in &plan {
            self.assign(passenger_id, container_id, slot_id)?;
        }

        tracing::info!(
            "Auto-fill placed {} passengers in {} ({} left unplaced)",
            plan.len(),
            container_id,
            unplaced.len()
        );

        Ok(AutoFillReport {
            container_id: container_id.clone(),
            assigned_count: plan.len(),
            placements: plan,
            unplaced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paxalloc_resources::{ContainerKind, Layout, RoomBatch, RoomType, VehicleLayout};
    use paxalloc_roster::PassengerSource;
    use paxalloc_shared::AllocationSpace;

    fn passenger(id: &str, group: &str) -> Passenger {
        Passenger {
            id: PassengerId::from(id),
            group_id: group.to_string(),
            display_name: id.to_string(),
            is_primary: false,
            source: PassengerSource::Booking,
            booking_id: Some(group.to_string()),
            name_is_placeholder: false,
        }
    }

    fn bus(seats: u32) -> ResourceContainer {
        ResourceContainer::create_with_id(
            ContainerId::from("bus-1"),
            ContainerKind::Vehicle,
            "Bus 1",
            &Layout::Vehicle(VehicleLayout { total_slots: seats, columns: 4 }),
        )
        .unwrap()
    }

    fn occupy(container: &mut ResourceContainer, seats: &[&str]) {
        for (i, seat) in seats.iter().enumerate() {
            container
                .slot_mut(&SlotId::from(*seat))
                .unwrap()
                .occupants
                .push(PassengerId::from(format!("taken-{}", i).as_str()));
        }
    }

    fn seat_numbers(plan: &[(PassengerId, SlotId)]) -> Vec<&str> {
        plan.iter().map(|(_, slot)| slot.as_str()).collect()
    }

    #[test]
    fn test_group_skips_gap_for_consecutive_run() {
        // seat 5 taken: the party of three lands on 1..=3
        let mut bus = bus(10);
        occupy(&mut bus, &["5"]);
        let party = [passenger("x0", "b"), passenger("x1", "b"), passenger("x2", "b")];
        let candidates: Vec<&Passenger> = party.iter().collect();

        let plan = plan_auto_fill(&bus, &candidates);
        assert_eq!(seat_numbers(&plan), vec!["1", "2", "3"]);
        assert_eq!(plan[0].0.as_str(), "x0");
        assert_eq!(plan[2].0.as_str(), "x2");
    }

    #[test]
    fn test_window_uses_numeric_adjacency() {
        // free: 1, 3, 4, 5 -> first window of three is 3,4,5
        let mut bus = bus(5);
        occupy(&mut bus, &["2"]);
        let party = [passenger("x0", "b"), passenger("x1", "b"), passenger("x2", "b")];
        let candidates: Vec<&Passenger> = party.iter().collect();

        let plan = plan_auto_fill(&bus, &candidates);
        assert_eq!(seat_numbers(&plan), vec!["3", "4", "5"]);
    }

    #[test]
    fn test_largest_group_first_ties_in_roster_order() {
        let bus = bus(10);
        let roster = [
            passenger("solo", "s"),
            passenger("a0", "a"),
            passenger("a1", "a"),
            passenger("b0", "b"),
            passenger("b1", "b"),
            passenger("b2", "b"),
            passenger("c0", "c"),
            passenger("c1", "c"),
        ];
        let candidates: Vec<&Passenger> = roster.iter().collect();

        let plan = plan_auto_fill(&bus, &candidates);
        let order: Vec<&str> = plan.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, vec!["b0", "b1", "b2", "a0", "a1", "c0", "c1", "solo"]);
        assert_eq!(seat_numbers(&plan), vec!["1", "2", "3", "4", "5", "6", "7", "8"]);
    }

    #[test]
    fn test_fragmented_seats_fall_back_to_list_order() {
        let mut bus = bus(6);
        occupy(&mut bus, &["2", "4", "6"]);
        let party = [passenger("x0", "b"), passenger("x1", "b"), passenger("x2", "b")];
        let candidates: Vec<&Passenger> = party.iter().collect();

        let plan = plan_auto_fill(&bus, &candidates);
        assert_eq!(seat_numbers(&plan), vec!["1", "3", "5"]);
    }

    #[test]
    fn test_partial_group_when_out_of_room() {
        let mut bus = bus(4);
        occupy(&mut bus, &["1", "2"]);
        let party = [passenger("x0", "b"), passenger("x1", "b"), passenger("x2", "b")];
        let candidates: Vec<&Passenger> = party.iter().collect();

        let plan = plan_auto_fill(&bus, &candidates);
        assert_eq!(plan.len(), 2);
        assert_eq!(seat_numbers(&plan), vec!["3", "4"]);
    }

    #[test]
    fn test_full_container_plans_nothing() {
        let mut bus = bus(2);
        occupy(&mut bus, &["1", "2"]);
        let party = [passenger("x0", "b")];
        let candidates: Vec<&Passenger> = party.iter().collect();
        assert!(plan_auto_fill(&bus, &candidates).is_empty());
    }

    #[test]
    fn test_rooms_window_spans_adjacent_rooms() {
        let mut hotel = ResourceContainer::create_with_id(
            ContainerId::from("hotel"),
            ContainerKind::RoomSet,
            "Hotel",
            &Layout::Rooms {
                batches: vec![RoomBatch::new(RoomType::Double, 1), RoomBatch::new(RoomType::Quad, 1)],
            },
        )
        .unwrap();
        hotel.slots[0].occupants.push(PassengerId::from("someone"));
        let room_one = hotel.slots[0].id.clone();
        let room_two = hotel.slots[1].id.clone();

        let roster = [
            passenger("solo", "s"),
            passenger("p0", "p"),
            passenger("p1", "p"),
            passenger("p2", "p"),
        ];
        let candidates: Vec<&Passenger> = roster.iter().collect();

        let plan = plan_auto_fill(&hotel, &candidates);
        // free units by room number: 1, 2, 2, 2, 2
        assert_eq!(plan[0], (PassengerId::from("p0"), room_one.clone()));
        assert_eq!(plan[1], (PassengerId::from("p1"), room_two.clone()));
        assert_eq!(plan[2], (PassengerId::from("p2"), room_two.clone()));
        assert_eq!(plan[3], (PassengerId::from("solo"), room_two));
    }

    #[test]
    fn test_highest_slot_number_is_not_adjacent_to_wraparound() {
        assert!(!is_adjacent(u32::MAX, 0));
        assert!(is_adjacent(u32::MAX, u32::MAX));

        // persisted data may carry arbitrary numbers
        let mut bus = bus(3);
        bus.slots[0].number = u32::MAX;
        bus.slots[1].number = 1;
        bus.slots[2].number = 2;
        let party = [passenger("x0", "b"), passenger("x1", "b")];
        let candidates: Vec<&Passenger> = party.iter().collect();

        let plan = plan_auto_fill(&bus, &candidates);
        assert_eq!(seat_numbers(&plan), vec!["2", "3"]);
    }

    #[test]
    fn test_store_auto_fill_only_touches_unassigned() {
        use paxalloc_roster::{build_roster, Booking, BookingStatus, RosterInputs, RosterSettings};

        let bookings = vec![
            Booking {
                id: "bk1".to_string(),
                trip_id: "t".to_string(),
                status: BookingStatus::Confirmed,
                passengers: 3,
                client_id: "c1".to_string(),
            },
            Booking {
                id: "bk2".to_string(),
                trip_id: "t".to_string(),
                status: BookingStatus::Confirmed,
                passengers: 1,
                client_id: "c2".to_string(),
            },
        ];
        let roster = build_roster(
            RosterInputs {
                bookings: &bookings,
                manual_passengers: &[],
                overrides: &Default::default(),
                details: &Default::default(),
                account_holders: &Default::default(),
            },
            &RosterSettings::default(),
        );

        let other = ResourceContainer::create_with_id(
            ContainerId::from("bus-2"),
            ContainerKind::Vehicle,
            "Bus 2",
            &Layout::Vehicle(VehicleLayout { total_slots: 4, columns: 2 }),
        )
        .unwrap();
        let mut store = AssignmentStore::load(AllocationSpace::Seats, vec![bus(10), other]).unwrap();
        store
            .assign(&PassengerId::from("bk2-0"), &ContainerId::from("bus-2"), &SlotId::from("1"))
            .unwrap();

        let report = store.auto_fill(&ContainerId::from("bus-1"), &roster).unwrap();
        assert_eq!(report.assigned_count, 3);
        assert!(report.unplaced.is_empty());
        assert_eq!(
            store.placement(&PassengerId::from("bk2-0")).unwrap().container_id.as_str(),
            "bus-2"
        );

        // nothing left to place
        let again = store.auto_fill(&ContainerId::from("bus-1"), &roster).unwrap();
        assert_eq!(again.assigned_count, 0);
        assert!(store.check_invariants().is_ok());
    }

    #[test]
    fn test_store_auto_fill_unknown_container() {
        let mut store = AssignmentStore::load(AllocationSpace::Seats, vec![bus(2)]).unwrap();
        let result = store.auto_fill(&ContainerId::from("nope"), &Roster::default());
        assert!(matches!(result, Err(AssignmentError::ContainerNotFound(_))));
    }
}
