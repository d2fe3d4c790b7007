//! Deterministic two-player skirmish used to exercise the decision core.
//!
//! Player 1 is driven by the playtesting agent, player 2 follows a fixed
//! script whose attack timing is drawn from the match seed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::sync::Arc;

use playtest_core::numbers::usize_to_f64;
use playtest_core::{
    Action, ActionKind, ArmyOrder, Building, BuildingKind, Cost, CostCatalog, MapSize, PlayerId,
    PlayerState, Position, Resources, Simulation, SimulationError, SimulationFactory,
    StateSnapshot, Unit, UnitKind,
};

pub const AI_PLAYER: PlayerId = 1;
pub const SCRIPTED_PLAYER: PlayerId = 2;
pub const MAP_EDGE: f64 = 128.0;

const START_MINERALS: f64 = 200.0;
const START_WORKERS: usize = 4;
const MINERALS_PER_WORKER: f64 = 0.8;
const GAS_PER_WORKER: f64 = 0.15;
const WORKERS_PER_BASE: usize = 8;
const RESEARCH_DAMAGE_BONUS: f64 = 0.05;
const MOVE_SPEED: f64 = 1.5;
const ATTACK_RANGE: f64 = 6.0;
/// Radius around the home base that idle and defending units guard.
const GUARD_RADIUS: f64 = 20.0;
/// Enemy military inside this radius of a base counts as an attack on it.
const ALARM_RADIUS: f64 = 25.0;
const GATHER_BOOST: f64 = 0.1;
const GATHER_BOOST_TICKS: u64 = 50;
const SCRIPTED_WORKER_TARGET: usize = 10;
const EXPANSION_OFFSET: f64 = 14.0;

#[derive(Debug, Clone, Copy)]
struct UnitStats {
    hp: f64,
    damage: f64,
}

const fn unit_stats(kind: UnitKind) -> UnitStats {
    match kind {
        UnitKind::Worker => UnitStats {
            hp: 40.0,
            damage: 0.0,
        },
        UnitKind::Infantry => UnitStats {
            hp: 60.0,
            damage: 1.0,
        },
        UnitKind::Ranged => UnitStats {
            hp: 45.0,
            damage: 1.3,
        },
        UnitKind::Cavalry => UnitStats {
            hp: 80.0,
            damage: 1.1,
        },
        UnitKind::Siege => UnitStats {
            hp: 70.0,
            damage: 2.4,
        },
    }
}

const fn building_hp(kind: BuildingKind) -> f64 {
    match kind {
        BuildingKind::Base => 1_500.0,
        BuildingKind::Barracks => 800.0,
        BuildingKind::Factory => 900.0,
        BuildingKind::Tower => 600.0,
        BuildingKind::Lab | BuildingKind::Depot => 500.0,
    }
}

const TOWER_DAMAGE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Order {
    Attack,
    Defend,
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Unit(usize),
    Building(usize),
}

/// One running skirmish.
#[derive(Debug, Clone)]
pub struct Skirmish {
    state: StateSnapshot,
    catalog: Arc<CostCatalog>,
    rng: ChaCha8Rng,
    orders: BTreeMap<u64, Order>,
    gather_boost_until: BTreeMap<PlayerId, u64>,
    next_id: u64,
    attack_threshold: usize,
    scripted_attacking: bool,
}

impl Skirmish {
    #[must_use]
    pub fn new(seed: u64, catalog: Arc<CostCatalog>) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let attack_threshold = rng.gen_range(6..=10);
        let mut sim = Self {
            state: StateSnapshot {
                map: MapSize {
                    width: MAP_EDGE,
                    height: MAP_EDGE,
                },
                ..StateSnapshot::default()
            },
            catalog,
            rng,
            orders: BTreeMap::new(),
            gather_boost_until: BTreeMap::new(),
            next_id: 1,
            attack_threshold,
            scripted_attacking: false,
        };
        for (player, corner) in [(AI_PLAYER, 16.0), (SCRIPTED_PLAYER, MAP_EDGE - 16.0)] {
            sim.state.players.insert(
                player,
                PlayerState {
                    resources: Resources::new(START_MINERALS, 0.0),
                    researched: 0,
                },
            );
            let jitter_x = sim.rng.gen_range(-4.0..=4.0);
            let jitter_y = sim.rng.gen_range(-4.0..=4.0);
            let home = Position::new(corner + jitter_x, corner + jitter_y);
            sim.place_building(player, BuildingKind::Base, home);
            for _ in 0..START_WORKERS {
                sim.spawn_unit(player, UnitKind::Worker);
            }
        }
        sim
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn home(&self, player: PlayerId) -> Option<Position> {
        self.state
            .buildings_of_kind(player, BuildingKind::Base)
            .next()
            .map(|b| b.position)
    }

    fn clamp(position: Position) -> Position {
        Position::new(
            position.x.clamp(0.0, MAP_EDGE),
            position.y.clamp(0.0, MAP_EDGE),
        )
    }

    fn place_building(&mut self, player: PlayerId, kind: BuildingKind, position: Position) {
        let id = self.allocate_id();
        self.state.buildings.push(Building {
            id,
            player_id: player,
            kind,
            hp: building_hp(kind),
            position: Self::clamp(position),
        });
    }

    fn spawn_unit(&mut self, player: PlayerId, kind: UnitKind) {
        let Some(home) = self.home(player) else {
            return;
        };
        let dx = self.rng.gen_range(-3.0..=3.0);
        let dy = self.rng.gen_range(-3.0..=3.0);
        let id = self.allocate_id();
        let stats = unit_stats(kind);
        self.state.units.push(Unit {
            id,
            player_id: player,
            kind,
            hp: stats.hp,
            max_hp: stats.hp,
            position: Self::clamp(Position::new(home.x + dx, home.y + dy)),
        });
    }

    /// Spend `cost` from `player`'s bank; `false` when it cannot be afforded.
    fn spend(&mut self, player: PlayerId, cost: Cost) -> bool {
        let Some(state) = self.state.players.get_mut(&player) else {
            return false;
        };
        if !cost.affordable_with(state.resources) {
            return false;
        }
        state.resources.minerals -= cost.minerals;
        state.resources.gas -= cost.gas;
        true
    }

    fn build_unit(&mut self, player: PlayerId, kind: UnitKind) -> bool {
        let cost = self.catalog.unit(kind).cost;
        if self.home(player).is_none() || !self.spend(player, cost) {
            return false;
        }
        self.spawn_unit(player, kind);
        if kind.is_military() && player == SCRIPTED_PLAYER && self.scripted_attacking {
            let id = self.next_id - 1;
            self.orders.insert(id, Order::Attack);
        }
        true
    }

    fn build_building(&mut self, player: PlayerId, kind: BuildingKind) -> bool {
        let Some(home) = self.home(player) else {
            return false;
        };
        let cost = self.catalog.building(kind).cost;
        if !self.spend(player, cost) {
            return false;
        }
        let toward_center = if home.x < MAP_EDGE / 2.0 { 1.0 } else { -1.0 };
        let position = if kind == BuildingKind::Base {
            let bases = usize_to_f64(self.state.base_count(player));
            let step = EXPANSION_OFFSET * bases * toward_center;
            Position::new(home.x + step, home.y)
        } else {
            let dx = self.rng.gen_range(2.0..=6.0) * toward_center;
            let dy = self.rng.gen_range(-6.0..=6.0);
            Position::new(home.x + dx, home.y + dy)
        };
        self.place_building(player, kind, position);
        true
    }

    fn issue_army_order(&mut self, player: PlayerId, order: Order) {
        let ids: Vec<u64> = self
            .state
            .units_of(player)
            .filter(|u| u.kind.is_military())
            .map(|u| u.id)
            .collect();
        for id in ids {
            self.orders.insert(id, order);
        }
    }

    /// Apply one agent action. Unaffordable builds are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error when `player` is not part of this match.
    pub fn apply(&mut self, player: PlayerId, action: &Action) -> Result<(), SimulationError> {
        if !self.state.players.contains_key(&player) {
            return Err(SimulationError::InvalidAction {
                action: action.label(),
                message: format!("player {player} is not in this match"),
            });
        }
        match action.kind {
            ActionKind::BuildUnit { unit, .. } => {
                self.build_unit(player, unit);
            }
            ActionKind::BuildBuilding { building, .. } => {
                self.build_building(player, building);
            }
            ActionKind::Army {
                order: ArmyOrder::Attack,
                ..
            } => self.issue_army_order(player, Order::Attack),
            ActionKind::Army {
                order: ArmyOrder::Defend,
                ..
            } => self.issue_army_order(player, Order::Defend),
            ActionKind::GatherResources => {
                self.gather_boost_until
                    .insert(player, self.state.tick + GATHER_BOOST_TICKS);
            }
            ActionKind::Research { .. } => {
                let cost = self.catalog.research;
                if self.spend(player, cost)
                    && let Some(state) = self.state.players.get_mut(&player)
                {
                    state.researched += 1;
                }
            }
        }
        Ok(())
    }

    fn gather(&mut self) {
        let tick = self.state.tick;
        let players: Vec<PlayerId> = self.state.players.keys().copied().collect();
        for player in players {
            let cap = WORKERS_PER_BASE * self.state.base_count(player);
            let working = usize_to_f64(self.state.worker_count(player).min(cap));
            let boost = match self.gather_boost_until.get(&player) {
                Some(until) if tick < *until => 1.0 + GATHER_BOOST,
                _ => 1.0,
            };
            if let Some(state) = self.state.players.get_mut(&player) {
                state.resources.minerals += working * MINERALS_PER_WORKER * boost;
                state.resources.gas += working * GAS_PER_WORKER * boost;
            }
        }
    }

    fn under_attack(&self, player: PlayerId) -> bool {
        self.state.buildings_of_kind(player, BuildingKind::Base).any(|base| {
            self.state
                .enemy_units(player)
                .any(|u| u.kind.is_military() && u.position.distance(base.position) <= ALARM_RADIUS)
        })
    }

    fn run_script(&mut self) {
        let player = SCRIPTED_PLAYER;
        if self.home(player).is_none() {
            return;
        }
        let has_tower = self
            .state
            .buildings_of_kind(player, BuildingKind::Tower)
            .next()
            .is_some();
        if self.under_attack(player) && !has_tower {
            self.build_building(player, BuildingKind::Tower);
        } else if self.state.worker_count(player) < SCRIPTED_WORKER_TARGET {
            self.build_unit(player, UnitKind::Worker);
        } else {
            let kind = if self.state.army_size(player) % 2 == 0 {
                UnitKind::Infantry
            } else {
                UnitKind::Ranged
            };
            self.build_unit(player, kind);
        }

        let army = self.state.army_size(player);
        if army == 0 {
            self.scripted_attacking = false;
        } else if !self.scripted_attacking && army >= self.attack_threshold {
            self.scripted_attacking = true;
            self.issue_army_order(player, Order::Attack);
        }
    }

    fn nearest_enemy_base(&self, player: PlayerId, from: Position) -> Option<Position> {
        self.state
            .buildings
            .iter()
            .filter(|b| b.player_id != player && b.kind == BuildingKind::Base)
            .map(|b| b.position)
            .min_by(|a, b| from.distance(*a).total_cmp(&from.distance(*b)))
    }

    fn enemy_in_range(&self, unit: &Unit, range: f64) -> bool {
        let from = unit.position;
        self.state
            .enemy_units(unit.player_id)
            .any(|u| u.position.distance(from) <= range)
            || self
                .state
                .buildings
                .iter()
                .any(|b| b.player_id != unit.player_id && b.position.distance(from) <= range)
    }

    fn destination(&self, unit: &Unit) -> Option<Position> {
        match self.orders.get(&unit.id) {
            Some(Order::Attack) => self.nearest_enemy_base(unit.player_id, unit.position),
            _ => {
                let home = self.home(unit.player_id)?;
                self.state
                    .enemy_units(unit.player_id)
                    .filter(|e| e.position.distance(home) <= GUARD_RADIUS)
                    .map(|e| e.position)
                    .min_by(|a, b| {
                        unit.position
                            .distance(*a)
                            .total_cmp(&unit.position.distance(*b))
                    })
                    .or(Some(home))
            }
        }
    }

    fn movement(&mut self) {
        let moves: Vec<(usize, Position)> = self
            .state
            .units
            .iter()
            .enumerate()
            .filter(|(_, u)| u.kind.is_military() && !self.enemy_in_range(u, ATTACK_RANGE))
            .filter_map(|(index, u)| {
                let target = self.destination(u)?;
                let distance = u.position.distance(target);
                if distance <= f64::EPSILON {
                    return None;
                }
                let step = MOVE_SPEED.min(distance) / distance;
                let next = Position::new(
                    u.position.x + (target.x - u.position.x) * step,
                    u.position.y + (target.y - u.position.y) * step,
                );
                Some((index, next))
            })
            .collect();
        for (index, position) in moves {
            self.state.units[index].position = Self::clamp(position);
        }
    }

    fn nearest_target(&self, player: PlayerId, from: Position) -> Option<Target> {
        let units = self
            .state
            .units
            .iter()
            .enumerate()
            .filter(|(_, u)| u.player_id != player)
            .map(|(i, u)| (Target::Unit(i), u.position.distance(from)));
        let buildings = self
            .state
            .buildings
            .iter()
            .enumerate()
            .filter(|(_, b)| b.player_id != player)
            .map(|(i, b)| (Target::Building(i), b.position.distance(from)));
        units
            .chain(buildings)
            .filter(|(_, d)| *d <= ATTACK_RANGE)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(target, _)| target)
    }

    fn damage_multiplier(&self, player: PlayerId) -> f64 {
        1.0 + RESEARCH_DAMAGE_BONUS * f64::from(self.state.researched_by(player))
    }

    fn combat(&mut self) {
        let mut hits: Vec<(Target, f64)> = Vec::new();
        for unit in &self.state.units {
            let damage = unit_stats(unit.kind).damage;
            if damage <= 0.0 {
                continue;
            }
            if let Some(target) = self.nearest_target(unit.player_id, unit.position) {
                hits.push((target, damage * self.damage_multiplier(unit.player_id)));
            }
        }
        for tower in self
            .state
            .buildings
            .iter()
            .filter(|b| b.kind == BuildingKind::Tower)
        {
            if let Some(Target::Unit(index)) = self.nearest_target(tower.player_id, tower.position)
            {
                hits.push((Target::Unit(index), TOWER_DAMAGE));
            }
        }
        for (target, damage) in hits {
            match target {
                Target::Unit(index) => self.state.units[index].hp -= damage,
                Target::Building(index) => self.state.buildings[index].hp -= damage,
            }
        }
        let orders = &mut self.orders;
        self.state.units.retain(|u| {
            let alive = u.hp > 0.0;
            if !alive {
                orders.remove(&u.id);
            }
            alive
        });
        self.state.buildings.retain(|b| b.hp > 0.0);
    }

    fn resolve(&mut self) {
        let ai_alive = self.state.base_count(AI_PLAYER) > 0;
        let scripted_alive = self.state.base_count(SCRIPTED_PLAYER) > 0;
        match (ai_alive, scripted_alive) {
            (true, true) => {}
            (false, false) => self.state.game_over = true,
            (true, false) => {
                self.state.game_over = true;
                self.state.winner = Some(AI_PLAYER);
            }
            (false, true) => {
                self.state.game_over = true;
                self.state.winner = Some(SCRIPTED_PLAYER);
            }
        }
    }
}

impl Simulation for Skirmish {
    fn snapshot(&self) -> &StateSnapshot {
        &self.state
    }

    fn step(&mut self) -> Result<(), SimulationError> {
        if self.state.game_over {
            return Err(SimulationError::Step {
                tick: self.state.tick,
                message: "match is already over".into(),
            });
        }
        self.state.tick += 1;
        self.gather();
        self.run_script();
        self.movement();
        self.combat();
        self.resolve();
        Ok(())
    }

    fn ai_player(&self) -> PlayerId {
        AI_PLAYER
    }
}

/// Builds skirmishes that share one cost catalog.
#[derive(Debug, Clone, Default)]
pub struct SkirmishFactory {
    catalog: Arc<CostCatalog>,
}

impl SkirmishFactory {
    #[must_use]
    pub const fn new(catalog: Arc<CostCatalog>) -> Self {
        Self { catalog }
    }
}

impl SimulationFactory for SkirmishFactory {
    type Sim = Skirmish;

    fn create(&self, seed: u64) -> Result<Skirmish, SimulationError> {
        let sim = Skirmish::new(seed, Arc::clone(&self.catalog));
        if sim.home(AI_PLAYER).is_none() || sim.home(SCRIPTED_PLAYER).is_none() {
            return Err(SimulationError::Setup(format!(
                "seed {seed} produced a map without starting bases"
            )));
        }
        Ok(sim)
    }

    fn execute(
        &self,
        sim: &mut Skirmish,
        player: PlayerId,
        action: &Action,
    ) -> Result<(), SimulationError> {
        sim.apply(player, action)
    }

    fn catalog(&self) -> &CostCatalog {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playtest_core::candidate_actions;

    fn skirmish(seed: u64) -> Skirmish {
        Skirmish::new(seed, Arc::new(CostCatalog::default()))
    }

    #[test]
    fn opening_position_matches_rules() {
        let sim = skirmish(7);
        let state = sim.snapshot();
        for player in [AI_PLAYER, SCRIPTED_PLAYER] {
            assert_eq!(state.base_count(player), 1);
            assert_eq!(state.worker_count(player), START_WORKERS);
            assert!((state.resources_of(player).minerals - START_MINERALS).abs() < f64::EPSILON);
        }
        assert!((6..=10).contains(&sim.attack_threshold));
        assert_eq!(sim.ai_player(), AI_PLAYER);
    }

    #[test]
    fn workers_generate_income_each_tick() {
        let mut sim = skirmish(3);
        sim.step().unwrap();
        let ai = sim.snapshot().resources_of(AI_PLAYER);
        assert!((ai.minerals - (START_MINERALS + 4.0 * MINERALS_PER_WORKER)).abs() < 1e-9);
        assert!((ai.gas - 4.0 * GAS_PER_WORKER).abs() < 1e-9);
    }

    #[test]
    fn gather_action_boosts_income() {
        let mut plain = skirmish(11);
        let mut boosted = skirmish(11);
        boosted.apply(AI_PLAYER, &Action::gather()).unwrap();
        plain.step().unwrap();
        boosted.step().unwrap();
        let a = plain.snapshot().resources_of(AI_PLAYER).minerals;
        let b = boosted.snapshot().resources_of(AI_PLAYER).minerals;
        assert!(b > a);
    }

    #[test]
    fn unaffordable_builds_are_ignored() {
        let mut sim = skirmish(5);
        let before = sim.snapshot().clone();
        let cost = Cost::new(400.0, 0.0);
        sim.apply(
            AI_PLAYER,
            &Action::build_building(BuildingKind::Base, cost),
        )
        .unwrap();
        assert_eq!(sim.snapshot(), &before);
    }

    #[test]
    fn affordable_builds_spend_and_spawn_at_home() {
        let mut sim = skirmish(5);
        let home = sim.home(AI_PLAYER).unwrap();
        let cost = sim.catalog.unit(UnitKind::Infantry).cost;
        sim.apply(AI_PLAYER, &Action::build_unit(UnitKind::Infantry, cost))
            .unwrap();
        let state = sim.snapshot();
        assert_eq!(state.army_size(AI_PLAYER), 1);
        let unit = state.units_of_kind(AI_PLAYER, UnitKind::Infantry).next().unwrap();
        assert!(unit.position.distance(home) < 5.0);
        assert!((state.resources_of(AI_PLAYER).minerals - (START_MINERALS - 75.0)).abs() < 1e-9);
    }

    #[test]
    fn research_spends_and_levels_up() {
        let mut sim = skirmish(9);
        sim.state.players.get_mut(&AI_PLAYER).unwrap().resources = Resources::new(150.0, 150.0);
        sim.apply(AI_PLAYER, &Action::research(Cost::new(100.0, 100.0)))
            .unwrap();
        assert_eq!(sim.snapshot().researched_by(AI_PLAYER), 1);
        assert!((sim.damage_multiplier(AI_PLAYER) - 1.05).abs() < 1e-9);
    }

    #[test]
    fn unknown_player_is_rejected() {
        let mut sim = skirmish(1);
        let err = sim.apply(9, &Action::gather()).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidAction { .. }));
    }

    #[test]
    fn losing_every_base_ends_the_match() {
        let mut sim = skirmish(2);
        sim.state
            .buildings
            .retain(|b| b.player_id != SCRIPTED_PLAYER);
        sim.step().unwrap();
        assert!(sim.snapshot().game_over);
        assert_eq!(sim.snapshot().winner, Some(AI_PLAYER));
        assert!(sim.step().is_err());
    }

    #[test]
    fn mutual_destruction_is_a_draw() {
        let mut sim = skirmish(2);
        sim.state
            .buildings
            .retain(|b| b.kind != BuildingKind::Base);
        sim.step().unwrap();
        assert!(sim.snapshot().game_over);
        assert_eq!(sim.snapshot().winner, None);
    }

    #[test]
    fn attack_order_marches_toward_the_enemy() {
        let mut sim = skirmish(4);
        let cost = sim.catalog.unit(UnitKind::Infantry).cost;
        sim.apply(AI_PLAYER, &Action::build_unit(UnitKind::Infantry, cost))
            .unwrap();
        let enemy = sim.home(SCRIPTED_PLAYER).unwrap();
        let start = sim
            .snapshot()
            .units_of_kind(AI_PLAYER, UnitKind::Infantry)
            .next()
            .unwrap()
            .position
            .distance(enemy);
        sim.apply(AI_PLAYER, &Action::army(ArmyOrder::Attack, 1)).unwrap();
        for _ in 0..10 {
            sim.step().unwrap();
        }
        let now = sim
            .snapshot()
            .units_of_kind(AI_PLAYER, UnitKind::Infantry)
            .next()
            .unwrap()
            .position
            .distance(enemy);
        assert!(start - now > 10.0 * MOVE_SPEED - 1e-6);
    }

    #[test]
    fn same_seed_replays_identically() {
        let factory = SkirmishFactory::default();
        let mut a = factory.create(42).unwrap();
        let mut b = factory.create(42).unwrap();
        for _ in 0..200 {
            let actions = candidate_actions(a.snapshot(), AI_PLAYER, factory.catalog());
            let pick = actions[usize::try_from(a.snapshot().tick).unwrap() % actions.len()];
            factory.execute(&mut a, AI_PLAYER, &pick).unwrap();
            factory.execute(&mut b, AI_PLAYER, &pick).unwrap();
            if a.snapshot().game_over {
                break;
            }
            a.step().unwrap();
            b.step().unwrap();
        }
        assert_eq!(a.snapshot(), b.snapshot());
    }
}
