//! Per-turtle telemetry cache.
//!
//! The cache holds the latest state, map, inventory, and config each
//! connected turtle has reported. A turtle's record is only ever written
//! while handling that turtle's own messages, and is purged when its
//! connection closes.

use std::collections::HashMap;

use turtle_types::{
    BasicState, FullState, Inventory, StateUpdate, TurtleConfig, TurtleId, TurtleMap,
    TurtleSnapshot,
};

/// Everything cached for one turtle. Each group is absent until reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurtleRecord {
    /// Merged full state.
    pub state: Option<FullState>,
    /// Latest map snapshot.
    pub map: Option<TurtleMap>,
    /// Latest inventory snapshot.
    pub inventory: Option<Inventory>,
    /// Latest config.
    pub config: Option<TurtleConfig>,
}

impl TurtleRecord {
    /// True when nothing has been reported yet.
    pub const fn is_empty(&self) -> bool {
        self.state.is_none()
            && self.map.is_none()
            && self.inventory.is_none()
            && self.config.is_none()
    }

    /// Merge a partial state update and return the merged state.
    ///
    /// Present fields overwrite, absent fields are left untouched. An
    /// explicit `null` target clears the target.
    pub fn merge_state(&mut self, turtle: TurtleId, update: StateUpdate) -> &FullState {
        let state = self
            .state
            .get_or_insert_with(|| FullState::empty(turtle));

        let StateUpdate {
            id: _,
            name,
            position,
            facing,
            target,
            home,
            top_left,
            bounds_size,
            fuel,
            status,
            warnings,
            paused,
        } = update;

        overwrite(&mut state.name, name);
        overwrite(&mut state.position, position);
        overwrite(&mut state.facing, facing);
        if let Some(target) = target {
            state.target = target;
        }
        overwrite(&mut state.home, home);
        overwrite(&mut state.top_left, top_left);
        overwrite(&mut state.bounds_size, bounds_size);
        overwrite(&mut state.fuel, fuel);
        overwrite(&mut state.status, status);
        overwrite(&mut state.warnings, warnings);
        overwrite(&mut state.paused, paused);

        state
    }

    /// Copy of the record for a subscribe reply.
    pub fn snapshot(&self) -> TurtleSnapshot {
        TurtleSnapshot {
            state: self.state.clone(),
            map: self.map.clone(),
            inventory: self.inventory.clone(),
            config: self.config.clone(),
        }
    }

    /// Fleet digest, available once both state and config are known.
    pub fn digest(&self) -> Option<BasicState> {
        match (&self.state, &self.config) {
            (Some(state), Some(config)) => Some(BasicState::digest(state, config)),
            _ => None,
        }
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Telemetry records keyed by turtle id.
#[derive(Debug, Default)]
pub struct StateCache {
    records: HashMap<TurtleId, TurtleRecord>,
}

impl StateCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The record for `turtle`, if anything was reported.
    pub fn record(&self, turtle: TurtleId) -> Option<&TurtleRecord> {
        self.records.get(&turtle).filter(|record| !record.is_empty())
    }

    /// The record for `turtle`, created empty on first use.
    pub fn entry(&mut self, turtle: TurtleId) -> &mut TurtleRecord {
        self.records.entry(turtle).or_default()
    }

    /// The cached state for `turtle`, only if one exists.
    pub fn state_mut(&mut self, turtle: TurtleId) -> Option<&mut FullState> {
        self.records
            .get_mut(&turtle)
            .and_then(|record| record.state.as_mut())
    }

    /// Drop everything cached for `turtle`.
    pub fn purge(&mut self, turtle: TurtleId) -> Option<TurtleRecord> {
        self.records.remove(&turtle)
    }

    /// Snapshot for a subscribe reply, if anything was reported.
    pub fn snapshot(&self, turtle: TurtleId) -> Option<TurtleSnapshot> {
        self.record(turtle).map(TurtleRecord::snapshot)
    }

    /// Fleet digest for `turtle`, if both state and config are cached.
    pub fn digest(&self, turtle: TurtleId) -> Option<BasicState> {
        self.records.get(&turtle).and_then(TurtleRecord::digest)
    }

    /// Whether anything is cached for `turtle`.
    pub fn contains(&self, turtle: TurtleId) -> bool {
        self.record(turtle).is_some()
    }

    /// Number of turtles with at least one reported group.
    pub fn len(&self) -> usize {
        self.records.values().filter(|record| !record.is_empty()).count()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use turtle_types::{BlockTarget, Facing, FuelAmount, PlantConfig, StringList};

    use super::*;

    const BOB: TurtleId = TurtleId(1);

    fn plant_config(block: &str) -> TurtleConfig {
        TurtleConfig::Plant(PlantConfig {
            block: Some(BlockTarget {
                name: block.to_owned(),
                age: Some(7),
            }),
            ..PlantConfig::default()
        })
    }

    #[test]
    fn partial_updates_accumulate() {
        let mut record = TurtleRecord::default();

        let mut fuel = StateUpdate::new(BOB);
        fuel.fuel = Some(FuelAmount::Units(50));
        record.merge_state(BOB, fuel);

        let mut name = StateUpdate::new(BOB);
        name.name = Some("x".to_owned());
        let merged = record.merge_state(BOB, name);

        assert_eq!(merged.fuel, Some(FuelAmount::Units(50)));
        assert_eq!(merged.name.as_deref(), Some("x"));
        assert_eq!(merged.id, BOB);
    }

    #[test]
    fn null_target_clears_and_absent_target_keeps() {
        let mut record = TurtleRecord::default();

        let mut set = StateUpdate::new(BOB);
        set.target = Some(Some([1, 64, 1]));
        record.merge_state(BOB, set);

        let untouched = record.merge_state(BOB, StateUpdate::new(BOB));
        assert_eq!(untouched.target, Some([1, 64, 1]));

        let mut clear = StateUpdate::new(BOB);
        clear.target = Some(None);
        let cleared = record.merge_state(BOB, clear);
        assert_eq!(cleared.target, None);
    }

    #[test]
    fn digest_needs_state_and_config() {
        let mut cache = StateCache::new();
        let mut update = StateUpdate::new(BOB);
        update.name = Some("Bob".to_owned());
        update.warnings = Some(StringList(vec!["no seeds".to_owned()]));
        cache.entry(BOB).merge_state(BOB, update);
        assert_eq!(cache.digest(BOB), None);

        cache.entry(BOB).config = Some(plant_config("minecraft:carrots"));
        let digest = cache.digest(BOB);
        assert_eq!(
            digest,
            Some(BasicState {
                id: BOB,
                has_warning: true,
                name: Some("Bob".to_owned()),
                block: Some("minecraft:carrots".to_owned()),
            })
        );
    }

    #[test]
    fn state_mut_does_not_create_records() {
        let mut cache = StateCache::new();
        assert!(cache.state_mut(BOB).is_none());
        assert!(cache.is_empty());

        cache.entry(BOB).merge_state(BOB, StateUpdate::new(BOB));
        if let Some(state) = cache.state_mut(BOB) {
            state.facing = Some(Facing::South);
        }
        assert_eq!(
            cache.record(BOB).and_then(|r| r.state.as_ref()).and_then(|s| s.facing),
            Some(Facing::South)
        );
    }

    #[test]
    fn snapshot_omits_unreported_groups_and_purge_forgets() {
        let mut cache = StateCache::new();
        assert_eq!(cache.snapshot(BOB), None);

        cache.entry(BOB).map = Some(Vec::new());
        let snapshot = cache.snapshot(BOB);
        assert_eq!(
            snapshot,
            Some(TurtleSnapshot {
                map: Some(Vec::new()),
                ..TurtleSnapshot::default()
            })
        );

        assert!(cache.purge(BOB).is_some());
        assert!(!cache.contains(BOB));
        assert_eq!(cache.len(), 0);
    }
}
