//! Exploit detection contract and a small anomaly-based default detector.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::agent::PlaytestResult;
use crate::balance::{Severity, strategy_label};
use crate::numbers::{u64_to_f64, usize_to_f64};

/// Analyzes a result batch for degenerate or abusable play patterns.
pub trait ExploitDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn analyze(&self, results: &[PlaytestResult]) -> Vec<ExploitFinding>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExploitKind {
    FastWin,
    RepetitiveAction,
}

impl ExploitKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FastWin => "fast_win",
            Self::RepetitiveAction => "repetitive_action",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploitFinding {
    pub kind: ExploitKind,
    pub severity: Severity,
    pub strategy: String,
    pub description: String,
    pub occurrences: usize,
}

/// Flags wins far faster than the batch median and wins driven by a single repeated action.
#[derive(Debug, Clone, Copy)]
pub struct AnomalyExploitDetector {
    pub fast_win_fraction: f64,
    pub repetition_share: f64,
    pub min_trace_len: usize,
}

impl Default for AnomalyExploitDetector {
    fn default() -> Self {
        Self {
            fast_win_fraction: 0.25,
            repetition_share: 0.8,
            min_trace_len: 20,
        }
    }
}

fn median(values: &mut [u64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    let median = if values.len() % 2 == 0 {
        (u64_to_f64(values[mid - 1]) + u64_to_f64(values[mid])) / 2.0
    } else {
        u64_to_f64(values[mid])
    };
    Some(median)
}

/// Label of the most frequent action kind with its count; ties go to the smaller label.
fn dominant_action(result: &PlaytestResult) -> Option<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in &result.actions {
        *counts.entry(record.action.label()).or_default() += 1;
    }
    counts
        .into_iter()
        .fold(None, |best: Option<(String, usize)>, (label, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((label, count)),
        })
}

impl AnomalyExploitDetector {
    fn fast_wins(&self, results: &[PlaytestResult]) -> Vec<ExploitFinding> {
        let mut durations: Vec<u64> = results.iter().map(|r| r.duration_ticks).collect();
        let Some(median) = median(&mut durations) else {
            return Vec::new();
        };
        let cutoff = median * self.fast_win_fraction;
        let mut by_strategy: BTreeMap<String, usize> = BTreeMap::new();
        for result in results {
            if result.outcome.is_win() && u64_to_f64(result.duration_ticks) < cutoff {
                *by_strategy.entry(strategy_label(result)).or_default() += 1;
            }
        }
        by_strategy
            .into_iter()
            .map(|(strategy, occurrences)| ExploitFinding {
                kind: ExploitKind::FastWin,
                severity: Severity::High,
                description: format!(
                    "{strategy} won {occurrences} game(s) in under {cutoff:.0} ticks (median {median:.0})"
                ),
                strategy,
                occurrences,
            })
            .collect()
    }

    fn repetition(&self, results: &[PlaytestResult]) -> Vec<ExploitFinding> {
        let mut by_strategy: BTreeMap<(String, String), usize> = BTreeMap::new();
        for result in results {
            if !result.outcome.is_win() || result.actions.len() < self.min_trace_len {
                continue;
            }
            let Some((action, count)) = dominant_action(result) else {
                continue;
            };
            let share = usize_to_f64(count) / usize_to_f64(result.actions.len());
            if share > self.repetition_share {
                *by_strategy
                    .entry((strategy_label(result), action))
                    .or_default() += 1;
            }
        }
        by_strategy
            .into_iter()
            .map(|((strategy, action), occurrences)| ExploitFinding {
                kind: ExploitKind::RepetitiveAction,
                severity: Severity::Medium,
                description: format!(
                    "{strategy} won {occurrences} game(s) repeating {action} for most decisions"
                ),
                strategy,
                occurrences,
            })
            .collect()
    }
}

impl ExploitDetector for AnomalyExploitDetector {
    fn name(&self) -> &'static str {
        "anomaly"
    }

    fn analyze(&self, results: &[PlaytestResult]) -> Vec<ExploitFinding> {
        let mut findings = self.fast_wins(results);
        findings.extend(self.repetition(results));
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::agent::{ActionRecord, Outcome, PlaytestMetrics};
    use crate::persona::PersonaKind;

    fn result(outcome: Outcome, duration_ticks: u64) -> PlaytestResult {
        PlaytestResult {
            persona: PersonaKind::RiskTaker,
            outcome,
            duration_ticks,
            final_score: 0.0,
            metrics: PlaytestMetrics::default(),
            actions: Vec::new(),
        }
    }

    #[test]
    fn median_handles_even_and_odd() {
        assert_eq!(median(&mut []), None);
        assert_eq!(median(&mut [5, 1, 3]), Some(3.0));
        assert_eq!(median(&mut [4, 1, 3, 2]), Some(2.5));
    }

    #[test]
    fn flags_wins_far_below_median() {
        let results = vec![
            result(Outcome::Win, 100),
            result(Outcome::Loss, 4_000),
            result(Outcome::Loss, 4_000),
            result(Outcome::Win, 4_000),
        ];
        let findings = AnomalyExploitDetector::default().analyze(&results);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, ExploitKind::FastWin);
        assert_eq!(findings[0].strategy, "risk_taker");
        assert_eq!(findings[0].occurrences, 1);
    }

    #[test]
    fn flags_single_action_wins() {
        let mut spammed = result(Outcome::Win, 3_000);
        for tick in 0..20 {
            spammed.actions.push(ActionRecord {
                tick,
                action: Action::gather(),
                score: 0.4,
                reasoning: String::new(),
            });
        }
        let mut lost = spammed.clone();
        lost.outcome = Outcome::Loss;
        let findings = AnomalyExploitDetector::default().analyze(&[spammed, lost]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, ExploitKind::RepetitiveAction);
        assert!(findings[0].description.contains("gather_resources"));
    }

    #[test]
    fn short_traces_are_not_repetition() {
        let mut short = result(Outcome::Win, 3_000);
        short.actions = (0..5)
            .map(|tick| ActionRecord {
                tick,
                action: Action::gather(),
                score: 0.4,
                reasoning: String::new(),
            })
            .collect();
        assert!(AnomalyExploitDetector::default().analyze(&[short]).is_empty());
    }
}
