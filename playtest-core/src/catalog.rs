//! Cost and value tables shared by the evaluator, the planner and final scoring.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::snapshot::{BuildingKind, PlayerId, Resources, StateSnapshot, UnitKind};

/// Price of an action in banked resources.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Cost {
    #[serde(default)]
    pub minerals: f64,
    #[serde(default)]
    pub gas: f64,
}

impl Cost {
    #[must_use]
    pub const fn new(minerals: f64, gas: f64) -> Self {
        Self { minerals, gas }
    }

    #[must_use]
    pub fn total(self) -> f64 {
        self.minerals + self.gas
    }

    #[must_use]
    pub fn affordable_with(self, resources: Resources) -> bool {
        resources.minerals >= self.minerals && resources.gas >= self.gas
    }

    /// Fraction of the cost covered by `resources`, taken over the limiting resource.
    #[must_use]
    pub fn coverage(self, resources: Resources) -> f64 {
        let part = |have: f64, need: f64| {
            if need <= 0.0 {
                1.0
            } else {
                (have.max(0.0) / need).min(1.0)
            }
        };
        part(resources.minerals, self.minerals).min(part(resources.gas, self.gas))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub cost: Cost,
    /// Contribution of one full-health unit to military strength.
    pub base_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingSpec {
    pub cost: Cost,
    pub defensive_value: f64,
}

/// Per-kind costs and values. Kinds missing from a loaded catalog fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCatalog {
    #[serde(default = "CostCatalog::default_units")]
    pub units: BTreeMap<UnitKind, UnitSpec>,
    #[serde(default = "CostCatalog::default_buildings")]
    pub buildings: BTreeMap<BuildingKind, BuildingSpec>,
    #[serde(default = "CostCatalog::default_research")]
    pub research: Cost,
}

impl Default for CostCatalog {
    fn default() -> Self {
        Self {
            units: Self::default_units(),
            buildings: Self::default_buildings(),
            research: Self::default_research(),
        }
    }
}

impl CostCatalog {
    fn default_units() -> BTreeMap<UnitKind, UnitSpec> {
        BTreeMap::from([
            (UnitKind::Worker, unit(50.0, 0.0, 1.0)),
            (UnitKind::Infantry, unit(75.0, 0.0, 5.0)),
            (UnitKind::Ranged, unit(100.0, 25.0, 7.0)),
            (UnitKind::Cavalry, unit(125.0, 50.0, 9.0)),
            (UnitKind::Siege, unit(150.0, 100.0, 14.0)),
        ])
    }

    fn default_buildings() -> BTreeMap<BuildingKind, BuildingSpec> {
        BTreeMap::from([
            (BuildingKind::Base, building(400.0, 0.0, 20.0)),
            (BuildingKind::Barracks, building(150.0, 0.0, 5.0)),
            (BuildingKind::Factory, building(200.0, 100.0, 5.0)),
            (BuildingKind::Tower, building(100.0, 0.0, 40.0)),
            (BuildingKind::Lab, building(150.0, 100.0, 0.0)),
            (BuildingKind::Depot, building(100.0, 0.0, 0.0)),
        ])
    }

    const fn default_research() -> Cost {
        Cost::new(100.0, 100.0)
    }

    /// Load a catalog from JSON, filling any missing kinds with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into catalog data.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut catalog: Self = serde_json::from_str(json)?;
        for (kind, spec) in Self::default_units() {
            catalog.units.entry(kind).or_insert(spec);
        }
        for (kind, spec) in Self::default_buildings() {
            catalog.buildings.entry(kind).or_insert(spec);
        }
        Ok(catalog)
    }

    #[must_use]
    pub fn unit(&self, kind: UnitKind) -> UnitSpec {
        self.units
            .get(&kind)
            .copied()
            .or_else(|| Self::default_units().get(&kind).copied())
            .unwrap_or(unit(0.0, 0.0, 0.0))
    }

    #[must_use]
    pub fn building(&self, kind: BuildingKind) -> BuildingSpec {
        self.buildings
            .get(&kind)
            .copied()
            .or_else(|| Self::default_buildings().get(&kind).copied())
            .unwrap_or(building(0.0, 0.0, 0.0))
    }

    /// Replacement cost of every unit and building owned by `player`, plus half of its bank.
    #[must_use]
    pub fn asset_valuation(&self, state: &StateSnapshot, player: PlayerId) -> f64 {
        let units: f64 = state
            .units_of(player)
            .map(|u| self.unit(u.kind).cost.total())
            .sum();
        let buildings: f64 = state
            .buildings_of(player)
            .map(|b| self.building(b.kind).cost.total())
            .sum();
        units + buildings + state.resources_of(player).total() * 0.5
    }
}

const fn unit(minerals: f64, gas: f64, base_value: f64) -> UnitSpec {
    UnitSpec {
        cost: Cost::new(minerals, gas),
        base_value,
    }
}

const fn building(minerals: f64, gas: f64, defensive_value: f64) -> BuildingSpec {
    BuildingSpec {
        cost: Cost::new(minerals, gas),
        defensive_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Building, PlayerState, Position, Unit};

    #[test]
    fn coverage_uses_limiting_resource() {
        let cost = Cost::new(100.0, 50.0);
        assert!((cost.coverage(Resources::new(200.0, 25.0)) - 0.5).abs() < 1e-9);
        assert!((cost.coverage(Resources::new(50.0, 50.0)) - 0.5).abs() < 1e-9);
        assert!(cost.affordable_with(Resources::new(100.0, 50.0)));
        assert!(!cost.affordable_with(Resources::new(99.0, 50.0)));
    }

    #[test]
    fn partial_json_keeps_default_kinds() {
        let json = r#"{"units": {"worker": {"cost": {"minerals": 40}, "base_value": 1.5}}}"#;
        let catalog = CostCatalog::from_json(json).unwrap();
        assert!((catalog.unit(UnitKind::Worker).cost.minerals - 40.0).abs() < 1e-9);
        assert!((catalog.unit(UnitKind::Siege).base_value - 14.0).abs() < 1e-9);
        assert!((catalog.building(BuildingKind::Tower).defensive_value - 40.0).abs() < 1e-9);
        assert!((catalog.research.gas - 100.0).abs() < 1e-9);
    }

    #[test]
    fn valuation_counts_assets_and_half_bank() {
        let state = StateSnapshot {
            players: BTreeMap::from([(
                1,
                PlayerState {
                    resources: Resources::new(100.0, 20.0),
                    researched: 0,
                },
            )]),
            units: vec![Unit {
                id: 1,
                player_id: 1,
                kind: UnitKind::Worker,
                hp: 10.0,
                max_hp: 10.0,
                position: Position::default(),
            }],
            buildings: vec![Building {
                id: 2,
                player_id: 1,
                kind: BuildingKind::Base,
                hp: 100.0,
                position: Position::default(),
            }],
            ..StateSnapshot::default()
        };
        let value = CostCatalog::default().asset_valuation(&state, 1);
        assert!((value - (50.0 + 400.0 + 60.0)).abs() < 1e-9);
    }
}
