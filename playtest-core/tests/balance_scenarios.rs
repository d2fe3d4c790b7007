use std::collections::BTreeMap;
use std::sync::Arc;

use playtest_core::balance::difficulty_deviations;
use playtest_core::{
    BalanceDetector, Building, BuildingKind, CostCatalog, DifficultySpike, IssueKind, Outcome,
    OverallBalance, Persona, PersonaKind, PlayerState, PlaytestAgent, PlaytestMetrics,
    PlaytestResult, Position, Resources, Severity, StateSnapshot, Unit, UnitKind,
    resource_efficiency_issues,
};

fn result(persona: PersonaKind, outcome: Outcome) -> PlaytestResult {
    PlaytestResult {
        persona,
        outcome,
        duration_ticks: 2_400,
        final_score: 500.0,
        metrics: PlaytestMetrics::default(),
        actions: Vec::new(),
    }
}

#[test]
fn lone_winning_rusher_is_severely_imbalanced() {
    let mut detector = BalanceDetector::new();
    for _ in 0..10 {
        detector.add_result(result(PersonaKind::AggressiveRusher, Outcome::Win));
    }
    let report = detector.analyze_balance();
    assert_eq!(report.overall_balance, OverallBalance::SeverelyImbalanced);
    assert!((report.global_win_rate - 1.0).abs() < f64::EPSILON);
    assert!((report.metrics.win_rate["aggressive_rusher"] - 1.0).abs() < f64::EPSILON);
    assert!(report.issues.iter().any(|i| i.kind == IssueKind::Trivial));
    assert!(
        report
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::OverpoweredStrategy && i.severity == Severity::Critical)
    );
    assert!(
        report
            .recommendations
            .iter()
            .any(|r| r.starts_with("Nerf aggressive_rusher"))
    );
}

#[test]
fn single_spike_sample_has_zero_deviation() {
    let mut r = result(PersonaKind::DefensiveTurtle, Outcome::Loss);
    let expected_at_end = 0.2 + 0.6 + 0.2;
    r.metrics.difficulty_spikes.push(DifficultySpike {
        tick: 500,
        severity: 2.0 * expected_at_end,
        delta: 0.5,
    });
    let deviations = difficulty_deviations(std::slice::from_ref(&r));
    assert_eq!(deviations.len(), 1);
    assert!(deviations.values().all(|d| *d == 0.0));

    let mut detector = BalanceDetector::new();
    detector.add_result(r);
    let report = detector.analyze_balance();
    assert!(report.issues.iter().all(|i| i.kind != IssueKind::DifficultySpike));
    assert!(report.metrics.difficulty_deviation["defensive_turtle"].abs() < f64::EPSILON);
}

#[test]
fn efficiency_gap_yields_one_medium_issue() {
    let map = BTreeMap::from([("A".to_string(), 1.0), ("B".to_string(), 2.5)]);
    let issues = resource_efficiency_issues(&map);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::ResourceEfficiency);
    assert_eq!(issues[0].severity, Severity::Medium);
    assert!((issues[0].value - 2.5).abs() < 1e-9);

    let close = BTreeMap::from([("A".to_string(), 1.0), ("B".to_string(), 1.9)]);
    assert!(resource_efficiency_issues(&close).is_empty());
}

#[test]
fn analysis_is_a_pure_function_of_the_batch() {
    let mut detector = BalanceDetector::new();
    for (i, kind) in PersonaKind::ALL.into_iter().enumerate() {
        for game in 0..3 {
            let outcome = if (i + game) % 3 == 0 {
                Outcome::Win
            } else {
                Outcome::Loss
            };
            let mut r = result(kind, outcome);
            r.metrics.resource_efficiency = 0.1 * f64::from(u8::try_from(i + 1).unwrap());
            detector.add_result(r);
        }
    }
    let first = detector.analyze_balance();
    let second = detector.analyze_balance();
    assert_eq!(first, second);
    assert_eq!(first.total_games, 24);
}

#[test]
fn frozen_agent_results_do_not_drift() {
    let state = StateSnapshot {
        tick: 300,
        players: BTreeMap::from([(
            1,
            PlayerState {
                resources: Resources::new(350.0, 40.0),
                researched: 0,
            },
        )]),
        units: vec![Unit {
            id: 1,
            player_id: 1,
            kind: UnitKind::Worker,
            hp: 20.0,
            max_hp: 20.0,
            position: Position::new(8.0, 8.0),
        }],
        buildings: vec![Building {
            id: 2,
            player_id: 1,
            kind: BuildingKind::Base,
            hp: 1_000.0,
            position: Position::new(8.0, 8.0),
        }],
        ..StateSnapshot::default()
    };
    let mut agent = PlaytestAgent::new(
        1,
        Persona::create(PersonaKind::TechInnovator),
        Arc::new(CostCatalog::default()),
    );
    agent.update(&state);
    agent.best_action();
    let first = agent.playtest_result(Outcome::Draw, 42.0);
    let second = agent.playtest_result(Outcome::Draw, 42.0);
    assert_eq!(first, second);
    assert_eq!(first.actions.len(), 1);
}
