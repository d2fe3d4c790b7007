mod logic;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use logic::{SeedInput, SkirmishFactory, TesterAssets};
use playtest_core::{Coordinator, PersonaKind, SessionConfig, SessionStatus, SessionSummary};

#[derive(Debug, Parser)]
#[command(name = "playtest-tester", version = "0.1.0")]
#[command(
    about = "Automated RTS playtesting - persona-driven matches with balance and exploit analysis"
)]
struct Args {
    /// Session config JSON (defaults to the bundled assets/session.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cost catalog JSON (defaults to the bundled assets/catalog.json)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Personas to play (comma-separated labels)
    #[arg(long)]
    personas: Option<String>,

    /// List all available personas and exit
    #[arg(long)]
    list_personas: bool,

    /// Games played by each persona
    #[arg(long)]
    games_per_persona: Option<u32>,

    /// Tick ceiling per match
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Session seed: an integer, or `time` for a clock-derived seed
    #[arg(long, allow_hyphen_values = true)]
    seed: Option<String>,

    /// Run matches concurrently
    #[arg(long)]
    parallel: bool,

    /// Abort the session on the first match failure
    #[arg(long)]
    fail_fast: bool,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_personas(&args)? {
        return Ok(());
    }

    announce_banner();

    let assets = TesterAssets::load_with_overrides(args.config.as_deref(), args.catalog.as_deref());
    let config = session_config(&args, assets.session.clone())?;
    let start_time = Instant::now();

    let summary = match run_session(&assets, config).await {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("❌ Playtest session failed: {err:#}");
            std::process::exit(1);
        }
    };

    if args.verbose {
        print_match_lines(&summary);
    }

    write_reports(&args, &summary, start_time.elapsed())?;

    if summary.status == SessionStatus::Failed {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_personas(args: &Args) -> Result<bool> {
    if !args.list_personas {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available personas:")?;
    for kind in PersonaKind::ALL {
        writeln!(
            output_target.writer(),
            "  {:22} - {}",
            kind.label(),
            kind.description()
        )?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎮 RTS Playtest Runner".bright_cyan().bold());
    println!("{}", "======================".cyan());
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve persona labels in first-seen order; repeats are dropped.
fn parse_personas(raw: &str) -> Result<Vec<PersonaKind>> {
    let mut seen = HashSet::new();
    let mut personas = Vec::new();
    for token in split_csv(raw) {
        let kinds = if token.eq_ignore_ascii_case("all") {
            PersonaKind::ALL.to_vec()
        } else if let Some(kind) = PersonaKind::from_label(&token) {
            vec![kind]
        } else {
            bail!("Unknown persona: {token} (see --list-personas)");
        };
        personas.extend(kinds.into_iter().filter(|kind| seen.insert(*kind)));
    }
    Ok(personas)
}

/// Apply CLI overrides on top of the file-provided session config.
fn session_config(args: &Args, mut config: SessionConfig) -> Result<SessionConfig> {
    if let Some(raw) = args.personas.as_deref() {
        config.personas = parse_personas(raw)?;
    }
    if let Some(games) = args.games_per_persona {
        config.games_per_persona = games;
    }
    if let Some(ticks) = args.max_ticks {
        config.max_ticks = ticks;
    }
    if let Some(token) = args.seed.as_deref() {
        config.seed = SeedInput::parse(token)?.seed();
    }
    config.parallel |= args.parallel;
    config.fail_fast |= args.fail_fast;
    config.validate().context("session config rejected")?;
    Ok(config)
}

async fn run_session(assets: &TesterAssets, config: SessionConfig) -> Result<SessionSummary> {
    println!(
        "🧠 Running {} matches ({} personas x {} games, {} ticks max)",
        config.total_games(),
        config.personas.len(),
        config.games_per_persona,
        config.max_ticks
    );
    let factory = Arc::new(SkirmishFactory::new(Arc::clone(&assets.catalog)));
    let mut coordinator = Coordinator::new(factory, config);
    let summary = coordinator.run().await?;
    if summary.errored_games > 0 {
        eprintln!(
            "⚠️  {} of {} matches ended in errors",
            summary.errored_games.to_string().yellow(),
            summary.total_games
        );
    }
    Ok(summary)
}

fn print_match_lines(summary: &SessionSummary) {
    for (index, result) in summary.results.iter().enumerate() {
        let outcome = if result.outcome.is_win() {
            result.outcome.to_string().green()
        } else if result.outcome.is_error() {
            result.outcome.to_string().red()
        } else {
            result.outcome.to_string().normal()
        };
        println!(
            "  #{index:<3} {:22} {outcome} after {} ticks (score {:.1}, {} actions)",
            result.persona.label(),
            result.duration_ticks,
            result.final_score,
            result.actions.len()
        );
    }
}

fn write_reports(args: &Args, summary: &SessionSummary, wall_time: Duration) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut output_target, summary)?,
        "markdown" => logic::reports::generate_markdown_report(&mut output_target, summary)?,
        "csv" => logic::reports::generate_csv_report(&mut output_target, &summary.results)?,
        _ => {
            logic::reports::generate_console_report(&mut output_target, summary, wall_time)?;
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {wall_time:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
