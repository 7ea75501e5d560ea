use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use phaseline::analyzer;
use phaseline::export::{self, Format};
use phaseline::library::{self, TrackSummary};
use phaseline::sequence::reasoning::TemplateNarrator;
use phaseline::sequence::scoring::TransitionScorer;
use phaseline::sequence::{self, Sequence};

#[derive(Parser)]
#[command(name = "phaseline", version, about = "Music structure analyzer and playlist sequencer")]
struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze feature files into labeled structural phases
    Analyze {
        /// Feature files or directories (defaults to config feature_dirs)
        paths: Vec<String>,

        /// Number of parallel workers (0 = auto-detect from config)
        #[arg(short = 'j', long, default_value = "0")]
        jobs: usize,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<Format>,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze and order a collection into a playlist by transition score
    Sequence {
        /// Feature files or directories (defaults to config feature_dirs)
        paths: Vec<String>,

        /// Number of parallel workers (0 = auto-detect from config)
        #[arg(short = 'j', long, default_value = "0")]
        jobs: usize,

        /// Override the key compatibility weight
        #[arg(long)]
        key_weight: Option<f64>,

        /// Override the tempo weight
        #[arg(long)]
        tempo_weight: Option<f64>,

        /// Override the energy weight
        #[arg(long)]
        energy_weight: Option<f64>,

        /// Override the mood overlap weight
        #[arg(long)]
        mood_weight: Option<f64>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<Format>,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the phase breakdown of a single feature file
    Phases {
        /// Path to one feature file
        path: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = phaseline::config::AppConfig::load();

    match cli.command {
        Commands::Analyze {
            paths,
            jobs,
            format,
            output,
        } => {
            let result = run_analysis(&config, paths, jobs)?;
            report_failures(&result);

            match format {
                None => print_track_table(&result.summaries),
                Some(f) => {
                    let contents = render_phases(&result.summaries, f)?;
                    export::write_output(output.as_deref(), &contents)
                        .context("Failed to write output")?;
                }
            }
        }

        Commands::Sequence {
            paths,
            jobs,
            key_weight,
            tempo_weight,
            energy_weight,
            mood_weight,
            format,
            output,
        } => {
            let mut params = config.scoring;
            if let Some(w) = key_weight {
                params.weights.key = w;
            }
            if let Some(w) = tempo_weight {
                params.weights.tempo = w;
            }
            if let Some(w) = energy_weight {
                params.weights.energy = w;
            }
            if let Some(w) = mood_weight {
                params.weights.mood = w;
            }
            let scorer = TransitionScorer::new(params).context("Invalid scoring configuration")?;

            let result = run_analysis(&config, paths, jobs)?;
            report_failures(&result);

            let seq = sequence::build_sequence(&result.summaries, &scorer, &TemplateNarrator);

            match format {
                None => print_sequence_table(&seq, &result.summaries),
                Some(f) => {
                    let contents = render_sequence(&result.summaries, &seq, f)?;
                    export::write_output(output.as_deref(), &contents)
                        .context("Failed to write output")?;
                }
            }
        }

        Commands::Phases { path } => {
            let outcome = library::load_features(&[path]);
            if let Some(failure) = outcome.failures.first() {
                anyhow::bail!("{}: {}", failure.path.display(), failure.message);
            }
            let features = outcome
                .features
                .first()
                .context("No feature file found at the given path")?;

            let summary = analyzer::analyze_track(features, &config.analysis)
                .with_context(|| format!("Analysis failed for {}", features.id))?;
            print_phase_table(&summary);
        }
    }

    Ok(())
}

fn run_analysis(
    config: &phaseline::config::AppConfig,
    paths: Vec<String>,
    jobs: usize,
) -> Result<analyzer::BatchResult> {
    // Resolve input paths: CLI args > config feature_dirs
    let paths = if !paths.is_empty() {
        paths
    } else if !config.feature_dirs.is_empty() {
        config
            .feature_dirs
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect()
    } else {
        anyhow::bail!(
            "No feature files to analyze. Pass paths as arguments or set feature_dirs in config."
        );
    };

    let outcome = library::load_features(&paths);
    for failure in &outcome.failures {
        eprintln!("skipped {}: {}", failure.path.display(), failure.message);
    }

    let workers = if jobs > 0 {
        jobs
    } else {
        config.resolve_workers()
    };
    Ok(analyzer::analyze_batch(
        &outcome.features,
        &config.analysis,
        workers,
    ))
}

fn report_failures(result: &analyzer::BatchResult) {
    for f in &result.failures {
        eprintln!("analysis failed for {}: {}", f.id, f.message);
    }
}

fn render_phases(summaries: &[TrackSummary], format: Format) -> Result<String> {
    Ok(match format {
        Format::Json => export::phases_json(summaries).context("JSON export failed")?,
        Format::Csv => export::phases_csv(summaries),
        Format::Markdown => export::markdown_report(summaries, None),
    })
}

fn render_sequence(summaries: &[TrackSummary], seq: &Sequence, format: Format) -> Result<String> {
    Ok(match format {
        Format::Json => export::sequence_json(seq).context("JSON export failed")?,
        Format::Csv => export::sequence_csv(seq),
        Format::Markdown => export::markdown_report(summaries, Some(seq)),
    })
}

/// Print a per-track summary table.
fn print_track_table(summaries: &[TrackSummary]) {
    if summaries.is_empty() {
        println!("No tracks analyzed.");
        return;
    }

    println!(
        "{:<30} {:>6} {:>6} {:>5} {:>7} {:>7}  {}",
        "Track", "Min", "BPM", "Key", "Energy", "Phases", "Mood"
    );
    println!("{}", "-".repeat(90));

    for t in summaries {
        let id = truncate_id(&t.id, 30);
        println!(
            "{:<30} {:>6.1} {:>6.0} {:>5} {:>7.3} {:>7}  {}",
            id,
            t.duration / 60.0,
            t.tempo_bpm,
            t.key.name(),
            t.energy_mean,
            t.phases.len(),
            t.mood_tags.join(", "),
        );
    }
}

/// Print one track's phase breakdown.
fn print_phase_table(summary: &TrackSummary) {
    println!(
        "{} — {:.1} min, {:.0} BPM, {}",
        summary.id,
        summary.duration / 60.0,
        summary.tempo_bpm,
        summary.key.name()
    );
    println!();
    println!(
        "{:>3} {:<15} {:>8} {:>8} {:>8} {:>10} {:>7}  {}",
        "#", "Phase", "Start", "End", "Energy", "Bright", "Rhythm", "Mood"
    );
    println!("{}", "-".repeat(88));

    for p in &summary.phases {
        println!(
            "{:>3} {:<15} {:>8.1} {:>8.1} {:>8.3} {:>9.0}Hz {:>7.2}  {}",
            p.index,
            p.phase_type.label(),
            p.start_time,
            p.end_time,
            p.energy_mean,
            p.brightness_mean,
            p.rhythm_density,
            p.mood_tags.join(", "),
        );
    }
}

/// Shorten an id to `max_chars` for table display. Counts characters, not
/// bytes — ids are user-supplied UTF-8 and must never split a character.
fn truncate_id(id: &str, max_chars: usize) -> String {
    if id.chars().count() > max_chars {
        let head: String = id.chars().take(max_chars - 3).collect();
        format!("{head}...")
    } else {
        id.to_string()
    }
}

/// Print the recommended playlist with per-step transition scores.
fn print_sequence_table(seq: &Sequence, summaries: &[TrackSummary]) {
    if seq.steps.is_empty() {
        println!("Nothing to sequence.");
        return;
    }

    println!(
        "{:>3} {:<30} {:>6}  {}",
        "#", "Track", "Score", "Why"
    );
    println!("{}", "-".repeat(90));

    for step in &seq.steps {
        let score = step
            .transition_score
            .map_or("    -".to_string(), |s| format!("{s:>6.2}"));
        println!(
            "{:>3} {:<30} {:>6}  {}",
            step.position + 1,
            step.track_id,
            score,
            step.reasoning.as_deref().unwrap_or("opening track"),
        );
    }

    println!();
    println!(
        "{} tracks — greedy ordering, locally best transition at each step",
        summaries.len()
    );
}
