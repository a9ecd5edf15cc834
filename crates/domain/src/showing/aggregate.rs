//! Showing aggregate: the seat ledger of one screening.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use common::{AggregateId, SeatLabel};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, SnapshotCapable};

use super::{
    SeatPool, SeatTransition, ShowingError, ShowingEvent,
    events::{SeatsMovedData, ShowingScheduledData},
};

/// A scheduled screening and the state of each of its seats.
///
/// Every seat of the inventory is in exactly one of `available`, `reserved`
/// or `booked`. The inventory is fixed when the showing is scheduled and
/// seats only move between pools through [`transition`](Showing::transition).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Showing {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    movie_id: Option<AggregateId>,
    start_time: Option<DateTime<Utc>>,
    auditorium: String,
    created_at: Option<DateTime<Utc>>,

    inventory: BTreeSet<SeatLabel>,
    available: BTreeSet<SeatLabel>,
    reserved: BTreeSet<SeatLabel>,
    booked: BTreeSet<SeatLabel>,
}

impl Aggregate for Showing {
    type Event = ShowingEvent;
    type Error = ShowingError;

    fn aggregate_type() -> &'static str {
        "Showing"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            ShowingEvent::ShowingScheduled(data) => self.apply_scheduled(data),
            ShowingEvent::SeatsLocked(data) => self.apply_moved(SeatTransition::Lock, data),
            ShowingEvent::SeatsConfirmed(data) => self.apply_moved(SeatTransition::Confirm, data),
            ShowingEvent::SeatsReleased(data) => self.apply_moved(SeatTransition::Release, data),
        }
    }
}

impl SnapshotCapable for Showing {
    fn snapshot_interval() -> usize {
        50
    }
}

// Query methods
impl Showing {
    pub fn movie_id(&self) -> Option<AggregateId> {
        self.movie_id
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn auditorium(&self) -> &str {
        &self.auditorium
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn inventory(&self) -> &BTreeSet<SeatLabel> {
        &self.inventory
    }

    pub fn available_seats(&self) -> &BTreeSet<SeatLabel> {
        &self.available
    }

    pub fn reserved_seats(&self) -> &BTreeSet<SeatLabel> {
        &self.reserved
    }

    pub fn booked_seats(&self) -> &BTreeSet<SeatLabel> {
        &self.booked
    }

    pub fn pool(&self, pool: SeatPool) -> &BTreeSet<SeatLabel> {
        match pool {
            SeatPool::Available => &self.available,
            SeatPool::Reserved => &self.reserved,
            SeatPool::Booked => &self.booked,
        }
    }

    /// Checks that the pools are pairwise disjoint and together are exactly
    /// the inventory.
    pub fn is_consistent(&self) -> bool {
        let pools = [&self.available, &self.reserved, &self.booked];
        let counted: usize = pools.iter().map(|p| p.len()).sum();
        let union: BTreeSet<&SeatLabel> = pools.iter().flat_map(|p| p.iter()).collect();

        counted == union.len()
            && union.len() == self.inventory.len()
            && union.into_iter().all(|seat| self.inventory.contains(seat))
    }
}

// Command methods (return events, don't mutate)
impl Showing {
    /// Schedules the showing with every seat of `seats` available.
    pub fn schedule(
        &self,
        showing_id: AggregateId,
        movie_id: AggregateId,
        start_time: DateTime<Utc>,
        auditorium: String,
        seats: BTreeSet<SeatLabel>,
    ) -> Result<Vec<ShowingEvent>, ShowingError> {
        if self.id.is_some() {
            return Err(ShowingError::AlreadyScheduled);
        }

        Ok(vec![ShowingEvent::ShowingScheduled(ShowingScheduledData {
            showing_id,
            movie_id,
            start_time,
            auditorium,
            seats: seats.into_iter().collect(),
            scheduled_at: Utc::now(),
        })])
    }

    /// Moves every seat in `seats` from the transition's source pool to its
    /// target pool, or nothing at all.
    ///
    /// Fails with [`ShowingError::SeatsUnavailable`] listing each requested
    /// seat that is not currently in the source pool, including labels that
    /// aren't part of the inventory.
    pub fn transition(
        &self,
        transition: SeatTransition,
        seats: &BTreeSet<SeatLabel>,
    ) -> Result<Vec<ShowingEvent>, ShowingError> {
        if self.id.is_none() {
            return Err(ShowingError::NotScheduled);
        }
        if seats.is_empty() {
            return Err(ShowingError::SeatsRequired);
        }

        let source = self.pool(transition.source());
        let missing: Vec<SeatLabel> = seats
            .iter()
            .filter(|seat| !source.contains(*seat))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ShowingError::SeatsUnavailable {
                transition,
                seats: missing,
            });
        }

        Ok(vec![ShowingEvent::seats_moved(
            transition,
            seats.iter().cloned().collect(),
        )])
    }

    pub fn lock(&self, seats: &BTreeSet<SeatLabel>) -> Result<Vec<ShowingEvent>, ShowingError> {
        self.transition(SeatTransition::Lock, seats)
    }

    pub fn confirm(&self, seats: &BTreeSet<SeatLabel>) -> Result<Vec<ShowingEvent>, ShowingError> {
        self.transition(SeatTransition::Confirm, seats)
    }

    pub fn release(&self, seats: &BTreeSet<SeatLabel>) -> Result<Vec<ShowingEvent>, ShowingError> {
        self.transition(SeatTransition::Release, seats)
    }
}

// Event application
impl Showing {
    fn apply_scheduled(&mut self, data: ShowingScheduledData) {
        self.id = Some(data.showing_id);
        self.movie_id = Some(data.movie_id);
        self.start_time = Some(data.start_time);
        self.auditorium = data.auditorium;
        self.created_at = Some(data.scheduled_at);
        self.inventory = data.seats.into_iter().collect();
        self.available = self.inventory.clone();
        self.reserved.clear();
        self.booked.clear();
    }

    fn apply_moved(&mut self, transition: SeatTransition, data: SeatsMovedData) {
        for seat in data.seats {
            if self.pool_mut(transition.source()).remove(&seat) {
                self.pool_mut(transition.target()).insert(seat);
            }
        }
    }

    fn pool_mut(&mut self, pool: SeatPool) -> &mut BTreeSet<SeatLabel> {
        match pool {
            SeatPool::Available => &mut self.available,
            SeatPool::Reserved => &mut self.reserved,
            SeatPool::Booked => &mut self.booked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seats(labels: &[&str]) -> BTreeSet<SeatLabel> {
        labels.iter().map(|l| SeatLabel::new(*l).unwrap()).collect()
    }

    fn scheduled(labels: &[&str]) -> Showing {
        let mut showing = Showing::default();
        let events = showing
            .schedule(
                AggregateId::new(),
                AggregateId::new(),
                Utc::now(),
                "Main Hall".to_string(),
                seats(labels),
            )
            .unwrap();
        showing.apply_events(events);
        showing
    }

    fn run(showing: &mut Showing, transition: SeatTransition, labels: &[&str]) {
        let events = showing.transition(transition, &seats(labels)).unwrap();
        showing.apply_events(events);
        assert!(showing.is_consistent());
    }

    #[test]
    fn schedule_makes_inventory_available() {
        let showing = scheduled(&["A1", "A2", "A3"]);

        assert!(showing.id().is_some());
        assert_eq!(showing.available_seats(), &seats(&["A1", "A2", "A3"]));
        assert!(showing.reserved_seats().is_empty());
        assert!(showing.booked_seats().is_empty());
        assert!(showing.is_consistent());
    }

    #[test]
    fn cannot_schedule_twice() {
        let showing = scheduled(&["A1"]);
        let result = showing.schedule(
            AggregateId::new(),
            AggregateId::new(),
            Utc::now(),
            String::new(),
            seats(&["B1"]),
        );
        assert!(matches!(result, Err(ShowingError::AlreadyScheduled)));
    }

    #[test]
    fn transitions_require_a_scheduled_showing() {
        let showing = Showing::default();
        assert!(matches!(
            showing.lock(&seats(&["A1"])),
            Err(ShowingError::NotScheduled)
        ));
    }

    #[test]
    fn empty_request_is_rejected() {
        let showing = scheduled(&["A1"]);
        assert!(matches!(
            showing.lock(&BTreeSet::new()),
            Err(ShowingError::SeatsRequired)
        ));
    }

    #[test]
    fn lock_confirm_release_flow() {
        let mut showing = scheduled(&["A1", "A2", "A3"]);

        run(&mut showing, SeatTransition::Lock, &["A1", "A2"]);
        assert_eq!(showing.reserved_seats(), &seats(&["A1", "A2"]));

        run(&mut showing, SeatTransition::Confirm, &["A1"]);
        assert_eq!(showing.booked_seats(), &seats(&["A1"]));

        run(&mut showing, SeatTransition::Release, &["A2"]);
        assert_eq!(showing.available_seats(), &seats(&["A2", "A3"]));
        assert!(showing.reserved_seats().is_empty());
        assert!(showing.pool(SeatPool::Booked).contains(&SeatLabel::new("A1").unwrap()));
    }

    #[test]
    fn partial_overlap_reports_only_missing_seats() {
        let mut showing = scheduled(&["A1", "A2"]);
        run(&mut showing, SeatTransition::Lock, &["A2"]);

        let err = showing.lock(&seats(&["A1", "A2", "Z9"])).unwrap_err();
        match err {
            ShowingError::SeatsUnavailable { transition, seats: missing } => {
                assert_eq!(transition, SeatTransition::Lock);
                assert_eq!(missing, seats(&["A2", "Z9"]).into_iter().collect::<Vec<_>>());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(showing.available_seats().contains(&SeatLabel::new("A1").unwrap()));
    }

    #[test]
    fn booked_seats_cannot_move() {
        let mut showing = scheduled(&["A1"]);
        run(&mut showing, SeatTransition::Lock, &["A1"]);
        run(&mut showing, SeatTransition::Confirm, &["A1"]);

        for transition in SeatTransition::ALL {
            assert!(showing.transition(transition, &seats(&["A1"])).is_err());
        }
    }

    #[test]
    fn snapshot_round_trip_preserves_pools() {
        let mut showing = scheduled(&["A1", "A2", "A3"]);
        run(&mut showing, SeatTransition::Lock, &["A1", "A3"]);
        run(&mut showing, SeatTransition::Confirm, &["A3"]);
        showing.set_version(Version::new(3));

        let restored: Showing =
            serde_json::from_value(serde_json::to_value(&showing).unwrap()).unwrap();

        assert_eq!(restored.version(), Version::new(3));
        assert_eq!(restored.available_seats(), showing.available_seats());
        assert_eq!(restored.reserved_seats(), showing.reserved_seats());
        assert_eq!(restored.booked_seats(), showing.booked_seats());
        assert!(restored.is_consistent());
    }

    #[test]
    fn inconsistency_is_detected() {
        let mut showing = scheduled(&["A1", "A2"]);
        showing.reserved.insert(SeatLabel::new("A1").unwrap());
        assert!(!showing.is_consistent());

        let mut stray = scheduled(&["A1"]);
        stray.booked.insert(SeatLabel::new("Q5").unwrap());
        assert!(!stray.is_consistent());
    }
}
