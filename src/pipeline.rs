//! Pipeline orchestration
//!
//! This module provides the public API for Sensory Topics. It chains the stages
//! from token files to topic-model input, and from instance tables to
//! evaluation reports.

use crate::config::PipelineConfig;
use crate::corpus::CorpusEncoder;
use crate::embedding::load_filtered_embeddings;
use crate::error::PipelineError;
use crate::evaluator::{score_assignments, EvaluationReport, Evaluator, TrainTestSplit};
use crate::features::{InstanceTable, WordEmbeddings};
use crate::types::{ActivityLabel, TopicModelInput};
use crate::vocabulary::VocabularyBuilder;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// Topic-model input together with the activity of each document
#[derive(Debug, Clone)]
pub struct PreparedCorpus {
    pub input: TopicModelInput,
    pub activities: Vec<ActivityLabel>,
}

/// External Gaussian-LDA style trainer.
///
/// Implementations are constructed from a [`TopicModelInput`] and return one
/// topic id per document after sampling.
pub trait TopicModelTrainer {
    fn sample(&mut self, iterations: usize) -> Result<Vec<usize>, PipelineError>;
}

/// Build the topic-model input from token files and an embedding table.
///
/// Pipeline stages:
/// 1. VocabularyBuilder - Read samples and activity labels
/// 2. Embedding filter - Keep `W_1..W_K` entries used by the samples
/// 3. PowerTransformer - Yeo-Johnson standardize the embeddings
/// 4. CorpusEncoder - Encode samples against the filtered vocabulary
pub fn prepare_topic_model_input(
    pattern: &str,
    embeddings_path: &Path,
    config: &PipelineConfig,
) -> Result<PreparedCorpus, PipelineError> {
    config.validate()?;

    // Stage 1: Load samples
    let loaded = VocabularyBuilder::load_samples(pattern, config)?;
    let vocabulary = loaded.vocabulary();

    // Stages 2-3: Filter and normalize embeddings
    let (vocabulary, embeddings) =
        load_filtered_embeddings(embeddings_path, &vocabulary, config)?.into_parts();

    // Stage 4: Encode corpus against the filtered vocabulary
    let corpus = CorpusEncoder::new(&vocabulary).encode(&loaded.samples)?;

    let num_topics = loaded.activities.iter().collect::<BTreeSet<_>>().len();
    info!(
        documents = corpus.len(),
        vocabulary = vocabulary.len(),
        num_topics,
        "prepared topic model input"
    );

    Ok(PreparedCorpus {
        input: TopicModelInput {
            corpus,
            embeddings,
            vocabulary,
            num_topics,
            concentration: config.concentration,
            save_path: config.save_path.clone(),
            show_topics: num_topics,
        },
        activities: loaded.activities,
    })
}

/// Run the trainer and score its per-document topics against the activities
pub fn run_topic_model(
    trainer: &mut dyn TopicModelTrainer,
    prepared: &PreparedCorpus,
    iterations: usize,
) -> Result<f64, PipelineError> {
    let assignments = trainer.sample(iterations)?;
    if assignments.len() != prepared.activities.len() {
        return Err(PipelineError::ShapeMismatch(format!(
            "trainer returned {} assignments for {} documents",
            assignments.len(),
            prepared.activities.len()
        )));
    }

    let score = score_assignments(&prepared.activities, &assignments)?;
    info!(iterations, macro_f1 = score, "scored topic assignments");
    Ok(score)
}

/// Load train/test instance tables and word embeddings into a split
pub fn load_split(
    train_path: &Path,
    test_path: &Path,
    embeddings_path: &Path,
    config: &PipelineConfig,
) -> Result<TrainTestSplit, PipelineError> {
    let embeddings = WordEmbeddings::from_path(embeddings_path)?;
    let (x_train, y_train) = InstanceTable::from_path(train_path)?.feature_matrix(&embeddings, config)?;
    let (x_test, y_test) = InstanceTable::from_path(test_path)?.feature_matrix(&embeddings, config)?;

    let split = TrainTestSplit {
        x_train,
        y_train,
        x_test,
        y_test,
    };
    split.validate()?;
    Ok(split)
}

/// Score every estimator on averaged word-embedding features
pub fn classify_features(
    train_path: &Path,
    test_path: &Path,
    embeddings_path: &Path,
    cluster_count: usize,
    config: &PipelineConfig,
) -> Result<EvaluationReport, PipelineError> {
    config.validate()?;
    let split = load_split(train_path, test_path, embeddings_path, config)?;
    Evaluator::new(config.evaluation.clone()).evaluate_all(&split, cluster_count)
}
