use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;
use sensory_topics::config::{EvaluationConfig, ForestConfig};
use sensory_topics::estimator::EstimatorKind;
use sensory_topics::types::ActivityLabel;
use sensory_topics::{
    classify_features, prepare_topic_model_input, run_topic_model, PerformanceLog,
    PipelineConfig, PipelineError, TopicModelTrainer,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Trainer that replays a fixed assignment and records the requested iterations
struct ReplayTrainer {
    assignments: Vec<usize>,
    iterations: Option<usize>,
}

impl TopicModelTrainer for ReplayTrainer {
    fn sample(&mut self, iterations: usize) -> Result<Vec<usize>, PipelineError> {
        self.iterations = Some(iterations);
        Ok(self.assignments.clone())
    }
}

fn write_token_files(dir: &TempDir) -> (String, PathBuf) {
    let files = [
        ("s1_activity_1.txt", "W_1 W_2 W_1\nW_2"),
        ("s1_activity_2.txt", "W_4 W_4\nW_5 W_4"),
        ("s2_activity_1.txt", "W_2 W_1"),
        ("s2_activity_2.txt", "W_5 W_5 W_4"),
    ];
    for (name, body) in files {
        fs::write(dir.path().join(name), body).unwrap();
    }
    // W_3 is never used and must be filtered out
    let emb = dir.path().join("word_embeddings_from_clusters.txt");
    fs::write(&emb, "1.0,0.2\n0.9,0.1\n5,5\n0.1,1.1\n0.2,0.8\n").unwrap();

    (format!("{}/*activity*.txt", dir.path().display()), emb)
}

#[test]
fn test_token_files_to_topic_scores() {
    let dir = TempDir::new().unwrap();
    let (pattern, emb) = write_token_files(&dir);
    let config = PipelineConfig::default().with_cluster_universe(5);

    let prepared = prepare_topic_model_input(&pattern, &emb, &config).unwrap();
    let input = &prepared.input;

    assert_eq!(input.vocabulary.tokens(), &["W_1", "W_2", "W_4", "W_5"]);
    assert_eq!(input.embeddings.dim(), (4, 2));
    assert_eq!(input.corpus.len(), 4);
    assert_eq!(input.num_topics, 2);
    assert_eq!(
        prepared.activities,
        vec![
            ActivityLabel::new("activity_1"),
            ActivityLabel::new("activity_2"),
            ActivityLabel::new("activity_1"),
            ActivityLabel::new("activity_2"),
        ]
    );

    // Every column is standardized
    for column in input.embeddings.columns() {
        assert_abs_diff_eq!(column.sum(), 0.0, epsilon = 1e-9);
    }

    // Topic ids are arbitrary; only the grouping matters
    let mut trainer = ReplayTrainer {
        assignments: vec![7, 3, 7, 3],
        iterations: None,
    };
    let score = run_topic_model(&mut trainer, &prepared, config.sample_iterations).unwrap();
    assert_abs_diff_eq!(score, 100.0);
    assert_eq!(trainer.iterations, Some(5));

    let mut collapsed = ReplayTrainer {
        assignments: vec![0, 0, 0, 0],
        iterations: None,
    };
    let score = run_topic_model(&mut collapsed, &prepared, 1).unwrap();
    // activity_1 claims cluster 0; activity_2 is never predicted
    assert_abs_diff_eq!(score, (2.0 / 3.0) / 2.0 * 100.0, epsilon = 1e-9);
}

#[test]
fn test_prepared_input_serializes() {
    let dir = TempDir::new().unwrap();
    let (pattern, emb) = write_token_files(&dir);

    let prepared = prepare_topic_model_input(&pattern, &emb, &PipelineConfig::default()).unwrap();
    let json: serde_json::Value = serde_json::to_value(&prepared.input).unwrap();

    assert_eq!(json["vocabulary"][0], "W_1");
    assert_eq!(json["num_topics"], 2);
    assert_eq!(json["embeddings"].as_array().unwrap().len(), 4);
}

#[test]
fn test_missing_files_reported() {
    let dir = TempDir::new().unwrap();
    let pattern = format!("{}/*activity*.txt", dir.path().display());
    let emb = dir.path().join("emb.txt");

    let err = prepare_topic_model_input(&pattern, &emb, &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, PipelineError::NoInputFiles { .. }));
}

fn write_instance_tables(dir: &TempDir) -> (PathBuf, PathBuf, PathBuf) {
    let emb = dir.path().join("word_embeddings.csv");
    fs::write(
        &emb,
        "a,1.0,0.1\nc,0.9,0.2\nb,0.1,1.0\nd,0.2,0.9\n",
    )
    .unwrap();

    let train = dir.path().join("train.csv");
    fs::write(
        &train,
        "activity,subject,t1,t2,time\n\
         1,s1,a,c,0\n\
         1,s1,a,,1\n\
         1,s2,c,c,0\n\
         1,s3,a,a,0\n\
         1,s4,c,a,0\n\
         2,s1,b,d,0\n\
         2,s2,d,d,0\n\
         2,s2,b,,1\n\
         2,s3,b,b,0\n\
         2,s4,d,b,0\n",
    )
    .unwrap();

    let test = dir.path().join("test.csv");
    fs::write(
        &test,
        "activity,subject,t1,t2,time\n\
         1,s5,a,c,0\n\
         2,s5,d,b,0\n\
         1,s6,c,,0\n\
         2,s6,b,,0\n",
    )
    .unwrap();

    (train, test, emb)
}

fn small_config() -> PipelineConfig {
    PipelineConfig {
        evaluation: EvaluationConfig {
            forest: ForestConfig {
                n_trees: 25,
                max_depth: None,
            },
            kmeans_clusters: 2,
            gmm_components: 2,
            ..EvaluationConfig::default()
        },
        ..PipelineConfig::default()
    }
}

#[test]
fn test_classify_features_and_log() {
    let dir = TempDir::new().unwrap();
    let (train, test, emb) = write_instance_tables(&dir);

    let report = classify_features(&train, &test, &emb, 2, &small_config()).unwrap();

    assert_eq!(report.cluster_count, 2);
    assert_eq!(report.scores.len(), EstimatorKind::ALL.len());
    for score in &report.scores {
        assert!((0.0..=100.0).contains(&score.macro_f1), "{score:?}");
    }
    assert_abs_diff_eq!(report.score(EstimatorKind::KMeans).unwrap(), 100.0);
    assert_abs_diff_eq!(report.score(EstimatorKind::RandomForest).unwrap(), 100.0);

    let log = dir.path().join("performance.csv");
    PerformanceLog::append(&log, &report.to_row()).unwrap();
    PerformanceLog::append(&log, &report.to_row()).unwrap();

    let rows = PerformanceLog::read(&log).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].cluster_count, 2);
    assert_abs_diff_eq!(rows[1].kmeans_f1, 100.0);
}

#[test]
fn test_classify_features_unknown_token() {
    let dir = TempDir::new().unwrap();
    let (train, test, emb) = write_instance_tables(&dir);
    fs::write(&test, "activity,subject,t1,t2,time\n1,s5,zz,a,0\n").unwrap();

    let err = classify_features(&train, &test, &emb, 2, &small_config()).unwrap_err();
    assert!(matches!(err, PipelineError::UnknownToken { ref token, .. } if token == "zz"));
}
