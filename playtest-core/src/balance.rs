//! Balance detector: batch statistics over playtest results and ranked findings.
//!
//! [`BalanceDetector::analyze_balance`] recomputes everything from the raw
//! batch on every call; no derived state is kept between calls.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;

use crate::agent::PlaytestResult;
use crate::numbers::{ratio_or, u64_to_f64, usize_to_f64};

pub const RUSH_TICK: u64 = 2_000;
pub const TURTLE_DEFENDS: usize = 5;

const OVERPOWERED_CRITICAL: f64 = 0.65;
const OVERPOWERED_HIGH: f64 = 0.60;
const OVERPOWERED_MEDIUM: f64 = 0.55;
const UNDERPOWERED: f64 = 0.45;
const UNDERPOWERED_HIGH: f64 = 0.35;
const UNDERPOWERED_MIN_PICK: f64 = 0.10;
const DOMINANT_PICK: f64 = 0.5;
const DOMINANT_WIN: f64 = 0.55;
const DOMINANCE_CRITICAL: f64 = 0.4;
const DEVIATION_HIGH: f64 = 3.0;
const DEVIATION_MEDIUM: f64 = 2.0;
const EFFICIENCY_RATIO: f64 = 2.0;
const EFFICIENCY_RATIO_CAP: f64 = 1_000.0;
const EFFICIENCY_VARIANCE: f64 = 0.1;
const UNWINNABLE: f64 = 0.05;
const TRIVIAL: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Self; 3] = [Self::Critical, Self::High, Self::Medium];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    OverpoweredStrategy,
    UnderpoweredStrategy,
    DominantStrategy,
    DifficultySpike,
    ResourceEfficiency,
    Unwinnable,
    Trivial,
}

impl IssueKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OverpoweredStrategy => "overpowered_strategy",
            Self::UnderpoweredStrategy => "underpowered_strategy",
            Self::DominantStrategy => "dominant_strategy",
            Self::DifficultySpike => "difficulty_spike",
            Self::ResourceEfficiency => "resource_efficiency",
            Self::Unwinnable => "unwinnable",
            Self::Trivial => "trivial",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    /// Strategy label the issue is attributed to; `None` for batch-wide findings.
    pub strategy: Option<String>,
    pub value: f64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallBalance {
    Balanced,
    SlightlyImbalanced,
    Imbalanced,
    SeverelyImbalanced,
}

impl OverallBalance {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::SlightlyImbalanced => "slightly_imbalanced",
            Self::Imbalanced => "imbalanced",
            Self::SeverelyImbalanced => "severely_imbalanced",
        }
    }

    /// Classify an issue list by severity counts.
    #[must_use]
    pub fn classify(issues: &[BalanceIssue]) -> Self {
        let count = |severity| issues.iter().filter(|i| i.severity == severity).count();
        if count(Severity::Critical) > 0 {
            Self::SeverelyImbalanced
        } else if count(Severity::High) >= 3 {
            Self::Imbalanced
        } else if count(Severity::High) > 0 || count(Severity::Medium) >= 5 {
            Self::SlightlyImbalanced
        } else {
            Self::Balanced
        }
    }
}

impl fmt::Display for OverallBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-strategy aggregates, keyed by strategy label.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BalanceMetrics {
    pub win_rate: BTreeMap<String, f64>,
    pub pick_rate: BTreeMap<String, f64>,
    pub dominance: BTreeMap<String, f64>,
    pub resource_efficiency: BTreeMap<String, f64>,
    pub difficulty_deviation: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    pub overall_balance: OverallBalance,
    pub total_games: usize,
    pub global_win_rate: f64,
    pub issues: Vec<BalanceIssue>,
    pub metrics: BalanceMetrics,
    pub recommendations: Vec<String>,
}

impl BalanceReport {
    #[must_use]
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// Persona label refined by behaviour suffixes, appended in a fixed order:
/// `_rush`, `_turtle`, `_tech`, `_expand`.
#[must_use]
pub fn strategy_label(result: &PlaytestResult) -> String {
    let mut label = result.persona.label().to_string();
    let actions = &result.actions;
    if actions
        .iter()
        .any(|r| r.action.is_attack() && r.tick < RUSH_TICK)
    {
        label.push_str("_rush");
    }
    if actions.iter().filter(|r| r.action.is_defend()).count() > TURTLE_DEFENDS {
        label.push_str("_turtle");
    }
    if actions.iter().any(|r| r.action.is_research()) {
        label.push_str("_tech");
    }
    if actions.iter().any(|r| r.action.is_expansion()) {
        label.push_str("_expand");
    }
    label
}

/// Expected difficulty at normalized progress `p`.
#[must_use]
pub fn expected_difficulty(progress: f64) -> f64 {
    0.2 + 0.6 * progress * progress + 0.2 * progress
}

#[derive(Debug, Clone, Copy, Default)]
struct RunningStats {
    count: u32,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn add(&mut self, value: f64) {
        self.count += 1;
        let count = f64::from(self.count);
        let delta = value - self.mean;
        self.mean += delta / count;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    const fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    fn variance(&self) -> f64 {
        if self.count > 1 {
            self.m2 / f64::from(self.count - 1)
        } else {
            0.0
        }
    }

    fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

#[derive(Debug, Default)]
struct StrategyBuilder {
    games: u32,
    wins: u32,
    efficiency: RunningStats,
}

impl StrategyBuilder {
    fn ingest(&mut self, result: &PlaytestResult) {
        self.games += 1;
        if result.outcome.is_win() {
            self.wins += 1;
        }
        self.efficiency.add(result.metrics.resource_efficiency);
    }

    fn win_rate(&self) -> f64 {
        ratio_or(f64::from(self.wins), f64::from(self.games), 0.0)
    }
}

/// Deviation of each `(strategy, tick)` spike group from the expected curve.
#[must_use]
pub fn difficulty_deviations(results: &[PlaytestResult]) -> BTreeMap<(String, u64), f64> {
    let mut groups: BTreeMap<(String, u64), RunningStats> = BTreeMap::new();
    let mut max_tick = 0;
    for result in results {
        let label = strategy_label(result);
        for spike in &result.metrics.difficulty_spikes {
            max_tick = max_tick.max(spike.tick);
            groups
                .entry((label.clone(), spike.tick))
                .or_default()
                .add(spike.severity);
        }
    }
    groups
        .into_iter()
        .map(|(key, stats)| {
            let progress = ratio_or(u64_to_f64(key.1), u64_to_f64(max_tick), 0.0);
            let std_dev = stats.std_dev();
            let deviation = if stats.count < 2 || std_dev <= 0.0 {
                0.0
            } else {
                (stats.mean() - expected_difficulty(progress)).abs() / std_dev
            };
            (key, deviation)
        })
        .collect()
}

/// One medium issue when the best and worst strategy efficiencies differ by more than 2x.
#[must_use]
pub fn resource_efficiency_issues(efficiency: &BTreeMap<String, f64>) -> Vec<BalanceIssue> {
    let best = efficiency.iter().max_by(|a, b| a.1.total_cmp(b.1));
    let worst = efficiency.iter().min_by(|a, b| a.1.total_cmp(b.1));
    let (Some((best_label, best)), Some((worst_label, worst))) = (best, worst) else {
        return Vec::new();
    };
    if *best <= 0.0 {
        return Vec::new();
    }
    // Zero efficiency makes the ratio unbounded; the cap keeps it representable in JSON.
    let (ratio, description) = if *worst <= 0.0 {
        (
            EFFICIENCY_RATIO_CAP,
            format!(
                "{best_label} converts resources at {best:.2} while {worst_label} commits none"
            ),
        )
    } else {
        let ratio = (best / worst).min(EFFICIENCY_RATIO_CAP);
        (
            ratio,
            format!(
                "{best_label} converts resources {ratio:.2}x more efficiently than {worst_label}"
            ),
        )
    };
    if ratio <= EFFICIENCY_RATIO {
        return Vec::new();
    }
    vec![BalanceIssue {
        kind: IssueKind::ResourceEfficiency,
        severity: Severity::Medium,
        strategy: Some(best_label.clone()),
        value: ratio,
        description,
    }]
}

fn strategy_issues(label: &str, win_rate: f64, pick_rate: f64, issues: &mut Vec<BalanceIssue>) {
    let percent = win_rate * 100.0;
    let overpowered = if win_rate > OVERPOWERED_CRITICAL {
        Some(Severity::Critical)
    } else if win_rate > OVERPOWERED_HIGH {
        Some(Severity::High)
    } else if win_rate > OVERPOWERED_MEDIUM {
        Some(Severity::Medium)
    } else {
        None
    };
    if let Some(severity) = overpowered {
        issues.push(BalanceIssue {
            kind: IssueKind::OverpoweredStrategy,
            severity,
            strategy: Some(label.to_string()),
            value: win_rate,
            description: format!("{label} wins {percent:.1}% of its games"),
        });
    }
    if win_rate < UNDERPOWERED && pick_rate > UNDERPOWERED_MIN_PICK {
        let severity = if win_rate < UNDERPOWERED_HIGH {
            Severity::High
        } else {
            Severity::Medium
        };
        issues.push(BalanceIssue {
            kind: IssueKind::UnderpoweredStrategy,
            severity,
            strategy: Some(label.to_string()),
            value: win_rate,
            description: format!(
                "{label} wins only {percent:.1}% of its games despite a {:.1}% pick rate",
                pick_rate * 100.0
            ),
        });
    }
    if pick_rate > DOMINANT_PICK && win_rate > DOMINANT_WIN {
        let dominance = win_rate * pick_rate;
        let severity = if dominance > DOMINANCE_CRITICAL {
            Severity::Critical
        } else {
            Severity::High
        };
        issues.push(BalanceIssue {
            kind: IssueKind::DominantStrategy,
            severity,
            strategy: Some(label.to_string()),
            value: dominance,
            description: format!("{label} is both common and winning (dominance {dominance:.2})"),
        });
    }
}

fn recommendations(issues: &[BalanceIssue], efficiency: &BTreeMap<String, f64>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |line: String| {
        if !out.contains(&line) {
            out.push(line);
        }
    };
    for issue in issues {
        let Some(strategy) = issue.strategy.as_deref() else {
            continue;
        };
        match issue.kind {
            IssueKind::OverpoweredStrategy | IssueKind::DominantStrategy => push(format!(
                "Nerf {strategy}: reduce the payoff of its core actions or raise their cost"
            )),
            IssueKind::UnderpoweredStrategy => push(format!(
                "Buff {strategy}: lower the cost or raise the payoff of its core actions"
            )),
            IssueKind::DifficultySpike
            | IssueKind::ResourceEfficiency
            | IssueKind::Unwinnable
            | IssueKind::Trivial => {}
        }
    }
    if issues.iter().any(|i| i.kind == IssueKind::DifficultySpike) {
        push(
            "Smooth the difficulty curve: opponent pressure ramps faster than expected".to_string(),
        );
    }
    let mut spread = RunningStats::default();
    for value in efficiency.values() {
        spread.add(*value);
    }
    if spread.variance() > EFFICIENCY_VARIANCE {
        push(
            "Rebalance resource income and costs: strategies convert resources very unevenly"
                .to_string(),
        );
    }
    if issues.is_empty() && out.is_empty() {
        out.push("Balance appears healthy; no changes recommended".to_string());
    }
    out
}

/// Accumulates playtest results and analyzes them on demand.
#[derive(Debug, Clone, Default)]
pub struct BalanceDetector {
    results: Vec<PlaytestResult>,
}

impl BalanceDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_result(&mut self, result: PlaytestResult) {
        self.results.push(result);
    }

    pub fn add_results(&mut self, results: impl IntoIterator<Item = PlaytestResult>) {
        self.results.extend(results);
    }

    #[must_use]
    pub fn results(&self) -> &[PlaytestResult] {
        &self.results
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }

    /// Recompute the full report from the accumulated batch.
    #[must_use]
    pub fn analyze_balance(&self) -> BalanceReport {
        let total = self.results.len();
        let mut builders: BTreeMap<String, StrategyBuilder> = BTreeMap::new();
        for result in &self.results {
            builders.entry(strategy_label(result)).or_default().ingest(result);
        }

        let total_f = usize_to_f64(total);
        let mut metrics = BalanceMetrics::default();
        let mut issues = Vec::new();
        for (label, builder) in &builders {
            let win_rate = builder.win_rate();
            let pick_rate = ratio_or(f64::from(builder.games), total_f, 0.0);
            metrics.win_rate.insert(label.clone(), win_rate);
            metrics.pick_rate.insert(label.clone(), pick_rate);
            metrics.dominance.insert(label.clone(), win_rate * pick_rate);
            metrics
                .resource_efficiency
                .insert(label.clone(), builder.efficiency.mean());
            strategy_issues(label, win_rate, pick_rate, &mut issues);
        }

        for ((label, tick), deviation) in difficulty_deviations(&self.results) {
            let worst = metrics.difficulty_deviation.entry(label.clone()).or_insert(0.0);
            *worst = worst.max(deviation);
            let severity = if deviation > DEVIATION_HIGH {
                Severity::High
            } else if deviation > DEVIATION_MEDIUM {
                Severity::Medium
            } else {
                continue;
            };
            issues.push(BalanceIssue {
                kind: IssueKind::DifficultySpike,
                severity,
                description: format!(
                    "{label} hits a difficulty spike at tick {tick} ({deviation:.2} std-dev off the expected curve)"
                ),
                strategy: Some(label),
                value: deviation,
            });
        }

        issues.extend(resource_efficiency_issues(&metrics.resource_efficiency));

        let wins = self.results.iter().filter(|r| r.outcome.is_win()).count();
        let global_win_rate = ratio_or(usize_to_f64(wins), total_f, 0.0);
        if total > 0 {
            if global_win_rate < UNWINNABLE {
                issues.push(BalanceIssue {
                    kind: IssueKind::Unwinnable,
                    severity: Severity::Critical,
                    strategy: None,
                    value: global_win_rate,
                    description: format!(
                        "AI side wins {:.1}% of all games; the opponent may be unbeatable",
                        global_win_rate * 100.0
                    ),
                });
            } else if global_win_rate > TRIVIAL {
                issues.push(BalanceIssue {
                    kind: IssueKind::Trivial,
                    severity: Severity::High,
                    strategy: None,
                    value: global_win_rate,
                    description: format!(
                        "AI side wins {:.1}% of all games; the opponent offers no resistance",
                        global_win_rate * 100.0
                    ),
                });
            }
        }

        issues.sort_by_key(|issue| Reverse(issue.severity));
        let recommendations = recommendations(&issues, &metrics.resource_efficiency);
        BalanceReport {
            overall_balance: OverallBalance::classify(&issues),
            total_games: total,
            global_win_rate,
            issues,
            metrics,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, ArmyOrder};
    use crate::agent::{ActionRecord, DifficultySpike, Outcome, PlaytestMetrics};
    use crate::catalog::Cost;
    use crate::persona::PersonaKind;
    use crate::snapshot::BuildingKind;

    fn result(persona: PersonaKind, outcome: Outcome) -> PlaytestResult {
        PlaytestResult {
            persona,
            outcome,
            duration_ticks: 3_000,
            final_score: 100.0,
            metrics: PlaytestMetrics::default(),
            actions: Vec::new(),
        }
    }

    fn record(tick: u64, action: Action) -> ActionRecord {
        ActionRecord {
            tick,
            action,
            score: 0.5,
            reasoning: String::new(),
        }
    }

    #[test]
    fn label_appends_every_matching_suffix_in_order() {
        let mut r = result(PersonaKind::AggressiveRusher, Outcome::Win);
        r.actions.push(record(1_500, Action::army(ArmyOrder::Attack, 4)));
        r.actions.push(record(1_600, Action::research(Cost::new(100.0, 100.0))));
        r.actions.push(record(
            1_700,
            Action::build_building(BuildingKind::Base, Cost::new(400.0, 0.0)),
        ));
        assert_eq!(strategy_label(&r), "aggressive_rusher_rush_tech_expand");

        let mut turtle = result(PersonaKind::DefensiveTurtle, Outcome::Loss);
        for tick in 0..6 {
            turtle.actions.push(record(tick, Action::army(ArmyOrder::Defend, 2)));
        }
        turtle.actions.push(record(2_500, Action::army(ArmyOrder::Attack, 2)));
        assert_eq!(strategy_label(&turtle), "defensive_turtle_turtle");
    }

    #[test]
    fn turtle_needs_more_than_five_defends() {
        let mut r = result(PersonaKind::DefensiveTurtle, Outcome::Loss);
        for tick in 0..5 {
            r.actions.push(record(3_000 + tick, Action::army(ArmyOrder::Defend, 2)));
        }
        assert_eq!(strategy_label(&r), "defensive_turtle");
        r.actions.push(record(3_010, Action::army(ArmyOrder::Defend, 2)));
        assert_eq!(strategy_label(&r), "defensive_turtle_turtle");
    }

    #[test]
    fn rush_window_closes_at_tick_two_thousand() {
        let mut early = result(PersonaKind::AggressiveRusher, Outcome::Win);
        early.actions.push(record(1_999, Action::army(ArmyOrder::Attack, 3)));
        assert_eq!(strategy_label(&early), "aggressive_rusher_rush");

        let mut late = result(PersonaKind::AggressiveRusher, Outcome::Win);
        late.actions.push(record(2_000, Action::army(ArmyOrder::Attack, 3)));
        assert_eq!(strategy_label(&late), "aggressive_rusher");
    }

    #[test]
    fn every_suffix_composes_in_fixed_order() {
        let mut r = result(PersonaKind::BalancedStrategist, Outcome::Draw);
        r.actions.push(record(
            2_500,
            Action::build_building(BuildingKind::Base, Cost::new(400.0, 0.0)),
        ));
        r.actions.push(record(2_400, Action::research(Cost::new(100.0, 100.0))));
        for tick in 0..6 {
            r.actions.push(record(2_100 + tick, Action::army(ArmyOrder::Defend, 2)));
        }
        r.actions.push(record(10, Action::army(ArmyOrder::Attack, 2)));
        assert_eq!(strategy_label(&r), "balanced_strategist_rush_turtle_tech_expand");
    }

    #[test]
    fn dominance_severity_splits_at_point_four() {
        let dominant = |win_rate, pick_rate| {
            let mut issues = Vec::new();
            strategy_issues("s", win_rate, pick_rate, &mut issues);
            issues.into_iter().find(|i| i.kind == IssueKind::DominantStrategy)
        };
        let critical = dominant(0.9, 0.6).unwrap();
        assert_eq!(critical.severity, Severity::Critical);
        assert!((critical.value - 0.54).abs() < 1e-9);

        let high = dominant(0.6, 0.55).unwrap();
        assert_eq!(high.severity, Severity::High);
        assert!((high.value - 0.33).abs() < 1e-9);

        assert!(dominant(0.9, 0.5).is_none());
        assert!(dominant(0.55, 0.9).is_none());
    }

    #[test]
    fn zero_efficiency_floor_still_reports_the_gap() {
        let efficiency = BTreeMap::from([
            ("a".to_string(), 0.0),
            ("b".to_string(), 0.2),
            ("c".to_string(), 0.9),
        ]);
        let issues = resource_efficiency_issues(&efficiency);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::ResourceEfficiency);
        assert_eq!(issues[0].severity, Severity::Medium);
        assert_eq!(issues[0].strategy.as_deref(), Some("c"));
        assert!(issues[0].value.is_finite());
        assert!(issues[0].value > EFFICIENCY_RATIO);
        assert!(issues[0].description.contains("commits none"));
    }

    #[test]
    fn efficiency_gap_needs_more_than_double() {
        let even = BTreeMap::from([("a".to_string(), 0.4), ("b".to_string(), 0.8)]);
        assert!(resource_efficiency_issues(&even).is_empty());
        let idle = BTreeMap::from([("a".to_string(), 0.0), ("b".to_string(), 0.0)]);
        assert!(resource_efficiency_issues(&idle).is_empty());
        let wide = BTreeMap::from([("a".to_string(), 0.3), ("b".to_string(), 0.9)]);
        let issues = resource_efficiency_issues(&wide);
        assert!((issues[0].value - 3.0).abs() < 1e-9);
    }

    #[test]
    fn classification_thresholds() {
        let issue = |severity| BalanceIssue {
            kind: IssueKind::OverpoweredStrategy,
            severity,
            strategy: None,
            value: 0.0,
            description: String::new(),
        };
        assert_eq!(OverallBalance::classify(&[]), OverallBalance::Balanced);
        assert_eq!(
            OverallBalance::classify(&vec![issue(Severity::Medium); 4]),
            OverallBalance::Balanced
        );
        assert_eq!(
            OverallBalance::classify(&vec![issue(Severity::Medium); 5]),
            OverallBalance::SlightlyImbalanced
        );
        assert_eq!(
            OverallBalance::classify(&vec![issue(Severity::High); 3]),
            OverallBalance::Imbalanced
        );
        assert_eq!(
            OverallBalance::classify(&[issue(Severity::Critical)]),
            OverallBalance::SeverelyImbalanced
        );
    }

    #[test]
    fn underpowered_needs_a_meaningful_pick_rate() {
        let mut issues = Vec::new();
        strategy_issues("a", 0.30, 0.05, &mut issues);
        assert!(issues.is_empty());
        strategy_issues("a", 0.30, 0.20, &mut issues);
        strategy_issues("b", 0.40, 0.20, &mut issues);
        assert!(issues.iter().all(|i| i.kind == IssueKind::UnderpoweredStrategy));
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(issues[1].severity, Severity::Medium);
    }

    #[test]
    fn win_rate_bands() {
        let severity_for = |rate| {
            let mut issues = Vec::new();
            strategy_issues("s", rate, 0.2, &mut issues);
            issues.first().map(|i| i.severity)
        };
        assert_eq!(severity_for(0.66), Some(Severity::Critical));
        assert_eq!(severity_for(0.65), Some(Severity::High));
        assert_eq!(severity_for(0.60), Some(Severity::Medium));
        assert_eq!(severity_for(0.55), None);
    }

    #[test]
    fn grouped_spikes_measure_deviation_against_the_curve() {
        let mut results = Vec::new();
        for severity in [0.9, 0.7] {
            let mut r = result(PersonaKind::TechInnovator, Outcome::Loss);
            r.metrics.difficulty_spikes.push(DifficultySpike {
                tick: 1_000,
                severity,
                delta: 0.4,
            });
            results.push(r);
        }
        let deviations = difficulty_deviations(&results);
        let deviation = deviations[&("tech_innovator".to_string(), 1_000)];
        let std_dev = (0.02_f64).sqrt();
        assert!((deviation - (0.8_f64 - 1.0).abs() / std_dev).abs() < 1e-9);
    }

    #[test]
    fn healthy_batch_gets_fallback_recommendation() {
        let mut detector = BalanceDetector::new();
        for (i, kind) in PersonaKind::ALL.into_iter().enumerate() {
            detector.add_result(result(kind, Outcome::Win));
            let outcome = if i % 2 == 0 { Outcome::Loss } else { Outcome::Draw };
            detector.add_result(result(kind, outcome));
        }
        let report = detector.analyze_balance();
        assert_eq!(report.overall_balance, OverallBalance::Balanced);
        assert!(report.issues.is_empty());
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].contains("healthy"));
    }

    #[test]
    fn losing_everything_is_unwinnable() {
        let mut detector = BalanceDetector::new();
        detector.add_results((0..4).map(|_| result(PersonaKind::RiskTaker, Outcome::Loss)));
        let report = detector.analyze_balance();
        assert_eq!(report.issues[0].kind, IssueKind::Unwinnable);
        assert_eq!(report.overall_balance, OverallBalance::SeverelyImbalanced);
        assert!(report.recommendations.iter().any(|r| r.starts_with("Buff risk_taker")));
    }
}
