//! Sensory CLI - Command-line interface for Sensory Topics
//!
//! Commands:
//! - vocab: Show activities and the vocabulary of a set of token files
//! - prepare: Build the topic-model input (vocabulary, embeddings, corpus)
//! - evaluate: Score classifiers and clusterers on averaged embeddings
//! - config: Print the effective configuration

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use sensory_topics::vocabulary::VocabularyBuilder;
use sensory_topics::{
    classify_features, prepare_topic_model_input, PerformanceLog, PipelineConfig, PipelineError,
    PRODUCER_NAME, SENSORY_VERSION,
};

/// Sensory - vocabulary, embedding and evaluation pipeline for activity topic models
#[derive(Parser)]
#[command(name = "sensory")]
#[command(author = "Synheart AI Inc")]
#[command(version = SENSORY_VERSION)]
#[command(about = "Prepare sensor-token corpora for topic models and score clusterings", long_about = None)]
struct Cli {
    /// Pipeline configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show activities and vocabulary of the token files
    Vocab {
        /// Glob pattern of token files (e.g. "data/*activity*.txt")
        #[arg(short, long)]
        pattern: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the topic-model input
    Prepare {
        /// Glob pattern of token files
        #[arg(short, long)]
        pattern: String,

        /// Embedding file, one comma-separated row per cluster name
        #[arg(short, long)]
        embeddings: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Score classifiers and clusterers on averaged word embeddings
    Evaluate {
        /// Training instance table (CSV)
        #[arg(long)]
        train: PathBuf,

        /// Test instance table (CSV)
        #[arg(long)]
        test: PathBuf,

        /// Word embeddings (CSV, token followed by values)
        #[arg(short, long)]
        embeddings: PathBuf,

        /// Cluster count recorded with the scores
        #[arg(long)]
        cluster_count: usize,

        /// Append the scores to this CSV log
        #[arg(long)]
        log: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), SensoryCliError> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Vocab { pattern, json } => cmd_vocab(&pattern, json, &config),
        Commands::Prepare {
            pattern,
            embeddings,
            output,
        } => cmd_prepare(&pattern, &embeddings, &output, &config),
        Commands::Evaluate {
            train,
            test,
            embeddings,
            cluster_count,
            log,
        } => cmd_evaluate(
            &train,
            &test,
            &embeddings,
            cluster_count,
            log.as_deref(),
            &config,
        ),
        Commands::Config => {
            println!("{}", config.to_json()?);
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct VocabReport {
    producer: String,
    activities: Vec<String>,
    vocabulary: Vec<String>,
}

fn cmd_vocab(pattern: &str, json: bool, config: &PipelineConfig) -> Result<(), SensoryCliError> {
    let loaded = VocabularyBuilder::load_samples(pattern, config)?;
    let vocabulary = loaded.vocabulary();

    let report = VocabReport {
        producer: PRODUCER_NAME.to_string(),
        activities: loaded.activities.iter().map(|a| a.to_string()).collect(),
        vocabulary: vocabulary.tokens().to_vec(),
    };

    if json {
        println!("{}", to_json(&report)?);
    } else {
        println!("Samples: {}", loaded.len());
        for (sample, activity) in loaded.samples.iter().zip(&loaded.activities) {
            println!("  {} {} ({} tokens)", activity, sample.source().display(), sample.len());
        }
        println!("Vocabulary ({} tokens):", report.vocabulary.len());
        println!("  {}", report.vocabulary.join(" "));
    }

    Ok(())
}

#[derive(Serialize)]
struct PrepareOutput<'a> {
    #[serde(flatten)]
    input: &'a sensory_topics::types::TopicModelInput,
    activities: Vec<String>,
}

fn cmd_prepare(
    pattern: &str,
    embeddings: &Path,
    output: &Path,
    config: &PipelineConfig,
) -> Result<(), SensoryCliError> {
    let prepared = prepare_topic_model_input(pattern, embeddings, config)?;
    let payload = PrepareOutput {
        input: &prepared.input,
        activities: prepared.activities.iter().map(|a| a.to_string()).collect(),
    };
    let output_data = to_json(&payload)?;

    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_evaluate(
    train: &Path,
    test: &Path,
    embeddings: &Path,
    cluster_count: usize,
    log: Option<&Path>,
    config: &PipelineConfig,
) -> Result<(), SensoryCliError> {
    let report = classify_features(train, test, embeddings, cluster_count, config)?;

    if let Some(log_path) = log {
        PerformanceLog::append(log_path, &report.to_row())?;
    }

    println!("{}", to_json(&report)?);
    Ok(())
}

/// Pretty JSON on a terminal, compact JSON when piped
fn to_json<T: Serialize>(value: &T) -> Result<String, SensoryCliError> {
    if atty::is(atty::Stream::Stdout) {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

// Error types

#[derive(Debug)]
enum SensoryCliError {
    Io(io::Error),
    Pipeline(PipelineError),
    Json(serde_json::Error),
}

impl From<io::Error> for SensoryCliError {
    fn from(e: io::Error) -> Self {
        SensoryCliError::Io(e)
    }
}

impl From<PipelineError> for SensoryCliError {
    fn from(e: PipelineError) -> Self {
        SensoryCliError::Pipeline(e)
    }
}

impl From<serde_json::Error> for SensoryCliError {
    fn from(e: serde_json::Error) -> Self {
        SensoryCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SensoryCliError> for CliError {
    fn from(e: SensoryCliError) -> Self {
        match e {
            SensoryCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SensoryCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            SensoryCliError::Pipeline(e) => {
                let (code, hint) = pipeline_hint(&e);
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: hint.map(str::to_string),
                }
            }
        }
    }
}

fn pipeline_hint(e: &PipelineError) -> (&'static str, Option<&'static str>) {
    match e {
        PipelineError::NoInputFiles { .. } => (
            "NO_INPUT_FILES",
            Some("Check the glob pattern; token files are named like ..._<activity>.txt"),
        ),
        PipelineError::EmptySample { .. } | PipelineError::EmptyInput(_) => {
            ("EMPTY_INPUT", Some("Ensure input files are not empty"))
        }
        PipelineError::UnknownToken { .. } => (
            "UNKNOWN_TOKEN",
            Some("Every token must have an embedding; check cluster_universe"),
        ),
        PipelineError::ShapeMismatch(_) | PipelineError::EmptyInstance(_) => {
            ("VALIDATION_ERROR", Some("Check the shape of the input tables"))
        }
        PipelineError::InvalidConfig(_) => {
            ("CONFIG_ERROR", Some("Run 'sensory config' to see valid settings"))
        }
        PipelineError::EstimatorError(_) => ("ESTIMATOR_ERROR", None),
        _ => ("PARSE_ERROR", Some("Check input format")),
    }
}
