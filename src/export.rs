use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::library::TrackSummary;
use crate::sequence::scoring::ScoreBreakdown;
use crate::sequence::{Sequence, SequenceStep};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Output format for analysis and sequencing results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Json,
    Csv,
    Markdown,
}

/// Pretty-printed JSON for the full per-track phase breakdown.
pub fn phases_json(summaries: &[TrackSummary]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(summaries)?)
}

/// One JSON record per step, with the component breakdown attached for every
/// non-opening step.
#[derive(Serialize)]
struct SequenceRecord<'a> {
    #[serde(flatten)]
    step: &'a SequenceStep,
    #[serde(skip_serializing_if = "Option::is_none")]
    breakdown: Option<&'a ScoreBreakdown>,
}

pub fn sequence_json(sequence: &Sequence) -> Result<String, ExportError> {
    let records: Vec<SequenceRecord> = sequence
        .steps
        .iter()
        .zip(&sequence.breakdowns)
        .map(|(step, breakdown)| SequenceRecord {
            step,
            breakdown: breakdown.as_ref(),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// One CSV row per phase across all tracks.
pub fn phases_csv(summaries: &[TrackSummary]) -> String {
    let mut out = String::from(
        "track_id,phase_index,phase_type,start_time,end_time,energy_mean,brightness_mean,rhythm_density,mood_tags\n",
    );
    for t in summaries {
        for p in &t.phases {
            out.push_str(&format!(
                "{},{},{},{:.3},{:.3},{:.4},{:.1},{:.3},{}\n",
                csv_field(&t.id),
                p.index,
                p.phase_type.label(),
                p.start_time,
                p.end_time,
                p.energy_mean,
                p.brightness_mean,
                p.rhythm_density,
                csv_field(&p.mood_tags.join("|")),
            ));
        }
    }
    out
}

pub fn sequence_csv(sequence: &Sequence) -> String {
    let mut out = String::from("position,track_id,transition_score,reasoning\n");
    for step in &sequence.steps {
        out.push_str(&format!(
            "{},{},{},{}\n",
            step.position,
            csv_field(&step.track_id),
            step.transition_score
                .map_or(String::new(), |s| format!("{s:.3}")),
            csv_field(step.reasoning.as_deref().unwrap_or("")),
        ));
    }
    out
}

/// Human-readable Markdown report covering phases and (optionally) the
/// recommended sequence.
pub fn markdown_report(summaries: &[TrackSummary], sequence: Option<&Sequence>) -> String {
    let mut out = String::new();
    out.push_str("# phaseline report\n\n");
    out.push_str(&format!(
        "Generated {} — {} tracks\n\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M"),
        summaries.len()
    ));

    for t in summaries {
        out.push_str(&format!(
            "## {} ({:.1} min, {:.0} BPM, {})\n\n",
            t.id,
            t.duration / 60.0,
            t.tempo_bpm,
            t.key.name()
        ));
        if !t.mood_tags.is_empty() {
            out.push_str(&format!("Mood: {}\n\n", t.mood_tags.join(", ")));
        }
        out.push_str("| # | Phase | Start | End | Energy | Brightness |\n");
        out.push_str("|---|-------|-------|-----|--------|------------|\n");
        for p in &t.phases {
            out.push_str(&format!(
                "| {} | {} | {} | {} | {:.3} | {:.0} Hz |\n",
                p.index,
                p.phase_type.label(),
                format_time(p.start_time),
                format_time(p.end_time),
                p.energy_mean,
                p.brightness_mean,
            ));
        }
        out.push('\n');
    }

    if let Some(seq) = sequence {
        out.push_str("## Recommended sequence\n\n");
        for step in &seq.steps {
            match (step.transition_score, step.reasoning.as_deref()) {
                (Some(score), Some(reason)) => out.push_str(&format!(
                    "{}. **{}** (score {:.2}) — {}\n",
                    step.position + 1,
                    step.track_id,
                    score,
                    reason
                )),
                _ => out.push_str(&format!(
                    "{}. **{}** (opener)\n",
                    step.position + 1,
                    step.track_id
                )),
            }
        }
        out.push('\n');
    }

    out
}

/// Write to a file, or to stdout when no path is given.
pub fn write_output(path: Option<&Path>, contents: &str) -> Result<(), ExportError> {
    match path {
        Some(p) => {
            fs::write(p, contents)?;
            log::info!("Wrote {}", p.display());
        }
        None => {
            std::io::stdout().write_all(contents.as_bytes())?;
        }
    }
    Ok(())
}

fn format_time(secs: f64) -> String {
    let m = (secs / 60.0).floor() as u64;
    let s = secs - m as f64 * 60.0;
    format!("{m}:{s:04.1}")
}

/// Quote a CSV field only when it needs it.
fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
