//! Read-only view of the simulation consumed by the decision core.
//!
//! Every field defaults to an empty or zero value so that partially populated
//! snapshots (for example JSON emitted by an external simulation) still read
//! as a consistent, neutral state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type PlayerId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Banked resources for one player.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Resources {
    #[serde(default)]
    pub minerals: f64,
    #[serde(default)]
    pub gas: f64,
}

impl Resources {
    #[must_use]
    pub const fn new(minerals: f64, gas: f64) -> Self {
        Self { minerals, gas }
    }

    #[must_use]
    pub fn total(self) -> f64 {
        self.minerals + self.gas
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Worker,
    Infantry,
    Ranged,
    Cavalry,
    Siege,
}

impl UnitKind {
    pub const ALL: [Self; 5] = [
        Self::Worker,
        Self::Infantry,
        Self::Ranged,
        Self::Cavalry,
        Self::Siege,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Worker => "worker",
            Self::Infantry => "infantry",
            Self::Ranged => "ranged",
            Self::Cavalry => "cavalry",
            Self::Siege => "siege",
        }
    }

    #[must_use]
    pub const fn is_military(self) -> bool {
        !matches!(self, Self::Worker)
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingKind {
    Base,
    Barracks,
    Factory,
    Tower,
    Lab,
    Depot,
}

impl BuildingKind {
    pub const ALL: [Self; 6] = [
        Self::Base,
        Self::Barracks,
        Self::Factory,
        Self::Tower,
        Self::Lab,
        Self::Depot,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Barracks => "barracks",
            Self::Factory => "factory",
            Self::Tower => "tower",
            Self::Lab => "lab",
            Self::Depot => "depot",
        }
    }
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub player_id: PlayerId,
    pub kind: UnitKind,
    #[serde(default)]
    pub hp: f64,
    #[serde(default)]
    pub max_hp: f64,
    #[serde(default)]
    pub position: Position,
}

impl Unit {
    /// Remaining health as a fraction; a missing maximum reads as full health.
    #[must_use]
    pub fn health_fraction(&self) -> f64 {
        if self.max_hp <= 0.0 {
            1.0
        } else {
            (self.hp / self.max_hp).clamp(0.0, 1.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub player_id: PlayerId,
    pub kind: BuildingKind,
    #[serde(default)]
    pub hp: f64,
    #[serde(default)]
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerState {
    #[serde(default)]
    pub resources: Resources,
    /// Number of completed research upgrades.
    #[serde(default)]
    pub researched: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapSize {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl Default for MapSize {
    fn default() -> Self {
        Self {
            width: 128.0,
            height: 128.0,
        }
    }
}

/// Consistent, read-only view of one simulation instant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub tick: u64,
    #[serde(default)]
    pub map: MapSize,
    #[serde(default)]
    pub players: BTreeMap<PlayerId, PlayerState>,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub buildings: Vec<Building>,
    #[serde(default)]
    pub winner: Option<PlayerId>,
    #[serde(default)]
    pub game_over: bool,
}

impl StateSnapshot {
    /// Resources of `player`, zero when the player is absent.
    #[must_use]
    pub fn resources_of(&self, player: PlayerId) -> Resources {
        self.players
            .get(&player)
            .map(|p| p.resources)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn researched_by(&self, player: PlayerId) -> u32 {
        self.players.get(&player).map_or(0, |p| p.researched)
    }

    /// Every player id other than `player`, including ids that only appear on units or buildings.
    #[must_use]
    pub fn opponents_of(&self, player: PlayerId) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self
            .players
            .keys()
            .copied()
            .chain(self.units.iter().map(|u| u.player_id))
            .chain(self.buildings.iter().map(|b| b.player_id))
            .filter(|id| *id != player)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn units_of(&self, player: PlayerId) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(move |u| u.player_id == player)
    }

    pub fn units_of_kind(&self, player: PlayerId, kind: UnitKind) -> impl Iterator<Item = &Unit> {
        self.units_of(player).filter(move |u| u.kind == kind)
    }

    pub fn enemy_units(&self, player: PlayerId) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(move |u| u.player_id != player)
    }

    pub fn buildings_of(&self, player: PlayerId) -> impl Iterator<Item = &Building> {
        self.buildings.iter().filter(move |b| b.player_id == player)
    }

    pub fn buildings_of_kind(
        &self,
        player: PlayerId,
        kind: BuildingKind,
    ) -> impl Iterator<Item = &Building> {
        self.buildings_of(player).filter(move |b| b.kind == kind)
    }

    #[must_use]
    pub fn worker_count(&self, player: PlayerId) -> usize {
        self.units_of_kind(player, UnitKind::Worker).count()
    }

    /// Number of non-worker units owned by `player`.
    #[must_use]
    pub fn army_size(&self, player: PlayerId) -> usize {
        self.units_of(player).filter(|u| u.kind.is_military()).count()
    }

    #[must_use]
    pub fn base_count(&self, player: PlayerId) -> usize {
        self.buildings_of_kind(player, BuildingKind::Base).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_deserialize_to_neutral_state() {
        let snapshot: StateSnapshot = serde_json::from_str(r#"{"tick": 12}"#).unwrap();
        assert_eq!(snapshot.tick, 12);
        assert!(snapshot.players.is_empty());
        assert!(snapshot.winner.is_none());
        assert!(snapshot.resources_of(1).total().abs() < f64::EPSILON);
    }

    #[test]
    fn partial_unit_records_default_numeric_fields() {
        let json = r#"{
            "players": {"1": {"resources": {"minerals": 120}}},
            "units": [{"player_id": 1, "kind": "worker"}, {"player_id": 2, "kind": "siege", "hp": 5, "max_hp": 10}]
        }"#;
        let snapshot: StateSnapshot = serde_json::from_str(json).unwrap();
        assert!((snapshot.resources_of(1).minerals - 120.0).abs() < f64::EPSILON);
        assert!(snapshot.resources_of(1).gas.abs() < f64::EPSILON);
        assert_eq!(snapshot.worker_count(1), 1);
        assert_eq!(snapshot.army_size(2), 1);
        assert!((snapshot.units[0].health_fraction() - 1.0).abs() < f64::EPSILON);
        assert!((snapshot.units[1].health_fraction() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn opponents_include_players_only_seen_on_units() {
        let snapshot = StateSnapshot {
            players: BTreeMap::from([(1, PlayerState::default())]),
            units: vec![Unit {
                id: 1,
                player_id: 3,
                kind: UnitKind::Infantry,
                hp: 10.0,
                max_hp: 10.0,
                position: Position::default(),
            }],
            ..StateSnapshot::default()
        };
        assert_eq!(snapshot.opponents_of(1), vec![3]);
        assert_eq!(snapshot.opponents_of(3), vec![1]);
    }
}
