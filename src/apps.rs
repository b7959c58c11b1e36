use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, error::ErrorKind};
use tracing::info;

use crate::config::PipelineConfig;
use crate::constants::artifacts::PIPELINE_FILE;
use crate::constants::defaults::{MIN_DUPES, MIN_TEXT_CHARS};
use crate::orchestration::{TrainingPipeline, TrainingPipelineOptions, WorkspaceConfig};
use crate::pipeline::{PipelineInputs, run};
use crate::sampler::CandidateCount;
use crate::splits::SplitRatios;

#[derive(Debug, Parser)]
#[command(
    name = "prepare_pairs",
    disable_help_subcommand = true,
    about = "Build train/tune/test pair tables for duplicate-question matching",
    long_about = "Clean canonical and duplicate questions, prune them to groups with enough duplicates, split duplicates per group, and write labeled candidate pair tables.",
    after_help = "Without --seed a seed is drawn at random; it is logged and recorded in manifest.json so the run can be replayed."
)]
/// CLI for `prepare_pairs`.
///
/// Common usage:
/// - `prepare_pairs --questions q.tsv --dupes d.tsv --answers a.tsv --output-dir out/`
/// - Fix the seed: `--seed 42`
/// - Also emit the remote pipeline descriptor: `--workspace-config config.json --emit-pipeline`
struct PreparePairsCli {
    #[arg(long, value_name = "PATH", help = "Canonical questions table (TSV)")]
    questions: PathBuf,
    #[arg(long, value_name = "PATH", help = "Duplicate questions table (TSV)")]
    dupes: PathBuf,
    #[arg(long, value_name = "PATH", help = "Answers table (TSV)")]
    answers: PathBuf,
    #[arg(long = "output-dir", value_name = "DIR", help = "Directory receiving every artifact")]
    output_dir: PathBuf,
    #[arg(long, help = "Deterministic seed for splits and negative draws")]
    seed: Option<u64>,
    #[arg(
        long = "min-dupes",
        default_value_t = MIN_DUPES,
        value_parser = parse_positive_usize,
        help = "Minimum duplicates a canonical question needs to be kept"
    )]
    min_dupes: usize,
    #[arg(
        long = "min-text-chars",
        default_value_t = MIN_TEXT_CHARS,
        help = "Drop rows whose cleaned text is shorter than this"
    )]
    min_text_chars: usize,
    #[arg(
        long = "train-candidates",
        value_name = "N|all",
        default_value = "20",
        value_parser = parse_candidates_arg,
        help = "Candidates per training duplicate (match plus N-1 negatives)"
    )]
    train_candidates: CandidateCount,
    #[arg(
        long = "eval-candidates",
        value_name = "N|all",
        default_value = "all",
        value_parser = parse_candidates_arg,
        help = "Candidates per tune/test duplicate"
    )]
    eval_candidates: CandidateCount,
    #[arg(
        long = "split-ratios",
        value_name = "TEST,TUNE",
        value_parser = parse_split_ratios_arg,
        default_value = "0.21,0.21",
        help = "Per-group test fraction and tune fraction of the remainder"
    )]
    split: SplitRatios,
    #[arg(
        long = "workspace-config",
        value_name = "PATH",
        help = "Workspace identity (JSON) used by the pipeline descriptor"
    )]
    workspace_config: Option<PathBuf>,
    #[arg(
        long = "emit-pipeline",
        requires = "workspace_config",
        help = "Write pipeline.json describing the remote training steps"
    )]
    emit_pipeline: bool,
}

/// Parse `args` (without the program name) and run the full preparation.
pub fn run_prepare_pairs<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) = parse_cli::<PreparePairsCli, _>(
        std::iter::once("prepare_pairs".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let workspace = cli
        .workspace_config
        .as_deref()
        .map(WorkspaceConfig::from_json_file)
        .transpose()?;

    let config = PipelineConfig {
        seed: cli.seed,
        min_dupes: cli.min_dupes,
        min_text_chars: cli.min_text_chars,
        split: cli.split,
        train_candidates: cli.train_candidates,
        eval_candidates: cli.eval_candidates,
    };
    let inputs = PipelineInputs {
        questions: cli.questions,
        duplicates: cli.dupes,
        answers: cli.answers,
    };

    let dataset = run(&inputs, &config)?;
    let manifest = dataset.write_to(&cli.output_dir)?;
    for entry in &manifest.artifacts {
        println!("{:<18} {:>9} rows  {}", entry.name.as_str(), entry.rows, entry.file);
    }
    println!("seed: {}", manifest.seed);

    if let Some(workspace) = workspace.as_ref().filter(|_| cli.emit_pipeline) {
        let pipeline = TrainingPipeline::standard(workspace, &TrainingPipelineOptions::default());
        let path = cli.output_dir.join(PIPELINE_FILE);
        pipeline.write_to(&path)?;
        info!(path = %path.display(), steps = pipeline.steps.len(), "wrote pipeline descriptor");
    }
    Ok(())
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{}' as a positive integer", raw))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_candidates_arg(raw: &str) -> Result<CandidateCount, String> {
    if raw.trim().eq_ignore_ascii_case("all") {
        return Ok(CandidateCount::All);
    }
    parse_positive_usize(raw.trim()).map(CandidateCount::Limit)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

fn parse_split_ratios_arg(raw: &str) -> Result<SplitRatios, String> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 2 {
        return Err("--split-ratios expects exactly 2 comma-separated values".to_string());
    }
    let test = parts[0]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid test ratio '{}': must be a float", parts[0].trim()))?;
    let tune = parts[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid tune ratio '{}': must be a float", parts[1].trim()))?;
    SplitRatios { test, tune }
        .normalized()
        .map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_accept_numbers_and_all() {
        assert_eq!(parse_candidates_arg("all").unwrap(), CandidateCount::All);
        assert_eq!(parse_candidates_arg(" ALL ").unwrap(), CandidateCount::All);
        assert_eq!(parse_candidates_arg("20").unwrap(), CandidateCount::Limit(20));
        assert!(parse_candidates_arg("0").is_err());
        assert!(parse_candidates_arg("many").is_err());
    }

    #[test]
    fn split_ratios_parse_and_validate() {
        let ratios = parse_split_ratios_arg("0.2, 0.25").unwrap();
        assert_eq!(ratios, SplitRatios { test: 0.2, tune: 0.25 });
        assert!(parse_split_ratios_arg("0.2").is_err());
        assert!(parse_split_ratios_arg("0.2,x").is_err());
        assert!(parse_split_ratios_arg("1.0,0.2").is_err());
    }

    #[test]
    fn help_exits_without_running() {
        assert!(run_prepare_pairs(vec!["--help".to_string()].into_iter()).is_ok());
    }

    #[test]
    fn missing_required_args_are_errors() {
        assert!(run_prepare_pairs(std::iter::empty()).is_err());
    }

    #[test]
    fn emit_pipeline_requires_workspace_config() {
        let args = [
            "--questions", "q.tsv", "--dupes", "d.tsv", "--answers", "a.tsv", "--output-dir", "out",
            "--emit-pipeline",
        ];
        let result = parse_cli::<PreparePairsCli, _>(
            std::iter::once("prepare_pairs").chain(args.iter().copied()),
        );
        assert!(result.is_err());
    }
}
