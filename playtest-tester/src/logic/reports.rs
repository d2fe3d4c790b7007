use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use playtest_core::{
    OverallBalance, PlaytestResult, SessionStatus, SessionSummary, Severity, strategy_label,
};

fn balance_label(balance: OverallBalance) -> colored::ColoredString {
    match balance {
        OverallBalance::Balanced => balance.label().green(),
        OverallBalance::SlightlyImbalanced => balance.label().yellow(),
        OverallBalance::Imbalanced => balance.label().bright_red(),
        OverallBalance::SeverelyImbalanced => balance.label().red().bold(),
    }
}

fn severity_tag(severity: Severity) -> colored::ColoredString {
    let tag = format!("[{}]", severity.label().to_uppercase());
    match severity {
        Severity::Critical => tag.red().bold(),
        Severity::High => tag.bright_red(),
        Severity::Medium => tag.yellow(),
    }
}

fn status_label(status: SessionStatus) -> colored::ColoredString {
    match status {
        SessionStatus::Completed => status.label().green(),
        SessionStatus::CompletedWithErrors => status.label().yellow(),
        SessionStatus::Failed => status.label().red(),
        SessionStatus::Running => status.label().normal(),
    }
}

pub fn generate_console_report(
    writer: &mut dyn Write,
    summary: &SessionSummary,
    wall_time: Duration,
) -> Result<()> {
    let report = &summary.balance_report;
    writeln!(writer)?;
    writeln!(writer, "{}", "📊 Playtest Session Summary".bright_cyan().bold())?;
    writeln!(writer, "{}", "===========================".cyan())?;
    writeln!(writer, "Session: {}", summary.session_id)?;
    writeln!(writer, "Status: {}", status_label(summary.status))?;
    writeln!(writer, "Seed: {}", summary.seed)?;
    writeln!(
        writer,
        "Games: {} ({} errored)",
        summary.total_games,
        summary.errored_games.to_string().red()
    )?;
    writeln!(writer, "Wall time: {wall_time:?}")?;
    writeln!(writer, "Overall balance: {}", balance_label(report.overall_balance))?;
    writeln!(writer, "Global win rate: {:.1}%", report.global_win_rate * 100.0)?;
    writeln!(writer)?;

    writeln!(writer, "{}", "⚖️  Balance Issues".bright_yellow().bold())?;
    writeln!(writer, "{}", "=================".yellow())?;
    if report.issues.is_empty() {
        writeln!(writer, "No balance issues detected.")?;
    }
    for issue in &report.issues {
        let strategy = issue.strategy.as_deref().unwrap_or("global");
        writeln!(
            writer,
            "{} {} {}: {}",
            severity_tag(issue.severity),
            issue.kind,
            strategy.bold(),
            issue.description
        )?;
    }
    writeln!(writer)?;

    writeln!(writer, "{}", "🛠  Recommendations".bright_green().bold())?;
    for recommendation in &summary.recommendations {
        writeln!(writer, "  • {recommendation}")?;
    }
    writeln!(writer)?;

    writeln!(writer, "{}", "🎯 Strategies".bright_blue().bold())?;
    writeln!(writer, "  {:40} {:>8} {:>8}", "strategy", "win", "pick")?;
    for (strategy, win_rate) in &report.metrics.win_rate {
        let pick_rate = report
            .metrics
            .pick_rate
            .get(strategy)
            .copied()
            .unwrap_or_default();
        writeln!(
            writer,
            "  {strategy:40} {:>7.1}% {:>7.1}%",
            win_rate * 100.0,
            pick_rate * 100.0
        )?;
    }

    if !summary.exploit_findings.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "{}", "🕳  Exploit Findings".bright_magenta().bold())?;
        for finding in &summary.exploit_findings {
            writeln!(
                writer,
                "{} {} {} x{}: {}",
                severity_tag(finding.severity),
                finding.kind.label(),
                finding.strategy.bold(),
                finding.occurrences,
                finding.description
            )?;
        }
    }
    Ok(())
}

pub fn generate_json_report(writer: &mut dyn Write, summary: &SessionSummary) -> Result<()> {
    let json_output = serde_json::to_string_pretty(summary)?;
    writeln!(writer, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(writer: &mut dyn Write, summary: &SessionSummary) -> Result<()> {
    let report = &summary.balance_report;
    writeln!(writer, "# Playtest Session Report\n")?;

    writeln!(writer, "## Summary\n")?;
    writeln!(writer, "- **Session**: {}", summary.session_id)?;
    writeln!(writer, "- **Status**: {}", summary.status)?;
    writeln!(writer, "- **Seed**: {}", summary.seed)?;
    writeln!(writer, "- **Games**: {}", summary.total_games)?;
    writeln!(writer, "- **Errored games**: {}", summary.errored_games)?;
    writeln!(writer, "- **Overall balance**: {}", report.overall_balance)?;
    writeln!(
        writer,
        "- **Global win rate**: {:.1}%\n",
        report.global_win_rate * 100.0
    )?;

    writeln!(writer, "## Issues\n")?;
    if report.issues.is_empty() {
        writeln!(writer, "_No balance issues detected._\n")?;
    } else {
        writeln!(writer, "| Severity | Type | Strategy | Description |")?;
        writeln!(writer, "|---|---|---|---|")?;
        for issue in &report.issues {
            writeln!(
                writer,
                "| {} | {} | {} | {} |",
                issue.severity,
                issue.kind,
                issue.strategy.as_deref().unwrap_or("-"),
                issue.description
            )?;
        }
        writeln!(writer)?;
    }

    writeln!(writer, "## Recommendations\n")?;
    for recommendation in &summary.recommendations {
        writeln!(writer, "- {recommendation}")?;
    }

    if !summary.exploit_findings.is_empty() {
        writeln!(writer, "\n## Exploit Findings\n")?;
        for finding in &summary.exploit_findings {
            writeln!(
                writer,
                "- **{}** ({}, {}): {}",
                finding.kind.label(),
                finding.severity,
                finding.strategy,
                finding.description
            )?;
        }
    }
    Ok(())
}

pub fn generate_csv_report(writer: &mut dyn Write, results: &[PlaytestResult]) -> Result<()> {
    writeln!(
        writer,
        "persona,strategy,outcome,duration_ticks,final_score,resource_efficiency,peak_military_power,average_army_size,worker_count,difficulty_spikes,actions"
    )?;
    for result in results {
        let metrics = &result.metrics;
        writeln!(
            writer,
            "{},{},{},{},{:.3},{:.4},{:.3},{:.3},{},{},{}",
            result.persona,
            strategy_label(result),
            result.outcome.label(),
            result.duration_ticks,
            result.final_score,
            metrics.resource_efficiency,
            metrics.peak_military_power,
            metrics.average_army_size,
            metrics.worker_count,
            metrics.difficulty_spikes.len(),
            result.actions.len()
        )?;
    }
    Ok(())
}
