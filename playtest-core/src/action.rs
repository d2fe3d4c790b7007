//! Actions the agent can hand back to the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::{Cost, CostCatalog};
use crate::snapshot::{BuildingKind, PlayerId, StateSnapshot, UnitKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmyOrder {
    Attack,
    Defend,
}

/// Optional scoring hints, consumed only by persona modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionHints {
    #[serde(default)]
    pub time_horizon: f64,
    #[serde(default)]
    pub risk_level: f64,
    #[serde(default)]
    pub efficiency: f64,
    #[serde(default)]
    pub novelty: f64,
}

impl ActionHints {
    #[must_use]
    pub const fn new(time_horizon: f64, risk_level: f64, efficiency: f64, novelty: f64) -> Self {
        Self {
            time_horizon,
            risk_level,
            efficiency,
            novelty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    BuildUnit { unit: UnitKind, cost: Cost },
    BuildBuilding { building: BuildingKind, cost: Cost },
    Army { order: ArmyOrder, army_size: usize },
    GatherResources,
    Research { cost: Cost },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    #[serde(default)]
    pub hints: ActionHints,
}

impl Action {
    #[must_use]
    pub const fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            hints: ActionHints::new(0.0, 0.0, 0.0, 0.0),
        }
    }

    #[must_use]
    pub const fn with_hints(mut self, hints: ActionHints) -> Self {
        self.hints = hints;
        self
    }

    #[must_use]
    pub const fn build_unit(unit: UnitKind, cost: Cost) -> Self {
        Self::new(ActionKind::BuildUnit { unit, cost })
    }

    #[must_use]
    pub const fn build_building(building: BuildingKind, cost: Cost) -> Self {
        Self::new(ActionKind::BuildBuilding { building, cost })
    }

    #[must_use]
    pub const fn army(order: ArmyOrder, army_size: usize) -> Self {
        Self::new(ActionKind::Army { order, army_size })
    }

    #[must_use]
    pub const fn gather() -> Self {
        Self::new(ActionKind::GatherResources)
    }

    #[must_use]
    pub const fn research(cost: Cost) -> Self {
        Self::new(ActionKind::Research { cost })
    }

    /// Resources the action commits when executed.
    #[must_use]
    pub const fn cost(&self) -> Cost {
        match self.kind {
            ActionKind::BuildUnit { cost, .. }
            | ActionKind::BuildBuilding { cost, .. }
            | ActionKind::Research { cost } => cost,
            ActionKind::Army { .. } | ActionKind::GatherResources => Cost::new(0.0, 0.0),
        }
    }

    #[must_use]
    pub const fn is_attack(&self) -> bool {
        matches!(
            self.kind,
            ActionKind::Army {
                order: ArmyOrder::Attack,
                ..
            }
        )
    }

    #[must_use]
    pub const fn is_defend(&self) -> bool {
        matches!(
            self.kind,
            ActionKind::Army {
                order: ArmyOrder::Defend,
                ..
            }
        )
    }

    #[must_use]
    pub const fn is_research(&self) -> bool {
        matches!(self.kind, ActionKind::Research { .. })
    }

    #[must_use]
    pub const fn is_expansion(&self) -> bool {
        matches!(
            self.kind,
            ActionKind::BuildBuilding {
                building: BuildingKind::Base,
                ..
            }
        )
    }

    /// Short stable label, e.g. `build_unit:worker` or `army:attack`.
    #[must_use]
    pub fn label(&self) -> String {
        match self.kind {
            ActionKind::BuildUnit { unit, .. } => format!("build_unit:{unit}"),
            ActionKind::BuildBuilding { building, .. } => format!("build_building:{building}"),
            ActionKind::Army { order, .. } => match order {
                ArmyOrder::Attack => "army:attack".to_string(),
                ArmyOrder::Defend => "army:defend".to_string(),
            },
            ActionKind::GatherResources => "gather_resources".to_string(),
            ActionKind::Research { .. } => "research".to_string(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

const fn unit_hints(kind: UnitKind) -> ActionHints {
    match kind {
        UnitKind::Worker => ActionHints::new(0.8, 0.1, 0.7, 0.0),
        UnitKind::Infantry => ActionHints::new(0.3, 0.4, 0.6, 0.1),
        UnitKind::Ranged => ActionHints::new(0.4, 0.3, 0.5, 0.3),
        UnitKind::Cavalry => ActionHints::new(0.2, 0.6, 0.4, 0.5),
        UnitKind::Siege => ActionHints::new(0.6, 0.5, 0.3, 0.7),
    }
}

const fn building_hints(kind: BuildingKind) -> ActionHints {
    match kind {
        BuildingKind::Base => ActionHints::new(0.9, 0.6, 0.5, 0.2),
        BuildingKind::Barracks => ActionHints::new(0.5, 0.2, 0.5, 0.1),
        BuildingKind::Factory => ActionHints::new(0.6, 0.3, 0.4, 0.4),
        BuildingKind::Tower => ActionHints::new(0.4, 0.1, 0.6, 0.1),
        BuildingKind::Lab => ActionHints::new(0.8, 0.3, 0.3, 0.8),
        BuildingKind::Depot => ActionHints::new(0.7, 0.1, 0.8, 0.0),
    }
}

/// Enumerate the candidate actions for `player` in `state`.
///
/// Unaffordable builds are still listed; affordability is priced in by the evaluator.
/// Army orders are only offered when the player owns at least one non-worker unit.
#[must_use]
pub fn candidate_actions(
    state: &StateSnapshot,
    player: PlayerId,
    catalog: &CostCatalog,
) -> Vec<Action> {
    let mut actions = Vec::with_capacity(UnitKind::ALL.len() + BuildingKind::ALL.len() + 4);
    for kind in UnitKind::ALL {
        actions.push(
            Action::build_unit(kind, catalog.unit(kind).cost).with_hints(unit_hints(kind)),
        );
    }
    for kind in BuildingKind::ALL {
        actions.push(
            Action::build_building(kind, catalog.building(kind).cost)
                .with_hints(building_hints(kind)),
        );
    }
    let army_size = state.army_size(player);
    if army_size > 0 {
        actions.push(
            Action::army(ArmyOrder::Attack, army_size)
                .with_hints(ActionHints::new(0.1, 0.8, 0.5, 0.3)),
        );
        actions.push(
            Action::army(ArmyOrder::Defend, army_size)
                .with_hints(ActionHints::new(0.5, 0.1, 0.6, 0.0)),
        );
    }
    actions.push(Action::gather().with_hints(ActionHints::new(0.6, 0.0, 0.9, 0.0)));
    actions.push(
        Action::research(catalog.research).with_hints(ActionHints::new(1.0, 0.3, 0.4, 0.9)),
    );
    actions
}
