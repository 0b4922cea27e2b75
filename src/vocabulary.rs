//! Vocabulary building
//!
//! Locates per-activity token files, reads each into one [`Sample`] and derives
//! the activity label from the file name (`..._<id>.txt` → `activity_<id>`).

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::types::{ActivityLabel, Sample, Vocabulary};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Samples read from disk, index-aligned with their activity labels
#[derive(Debug, Clone)]
pub struct LoadedSamples {
    pub samples: Vec<Sample>,
    pub activities: Vec<ActivityLabel>,
}

impl LoadedSamples {
    /// Union of all tokens across the loaded samples
    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary::from_samples(&self.samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Builder reading token-sequence files into samples
pub struct VocabularyBuilder;

impl VocabularyBuilder {
    /// Load every file matching `pattern`, in sorted path order
    pub fn load_samples(
        pattern: &str,
        config: &PipelineConfig,
    ) -> Result<LoadedSamples, PipelineError> {
        let mut samples = Vec::new();
        let mut activities = Vec::new();

        for entry in glob::glob(pattern)? {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                PipelineError::io(path, e.into_error())
            })?;
            if !path.is_file() {
                continue;
            }

            let activity = activity_label(&path, &config.activity_prefix)?;
            let contents = fs::read_to_string(&path).map_err(|e| PipelineError::io(&path, e))?;
            let tokens = tokenize(&contents);
            if tokens.is_empty() {
                return Err(PipelineError::EmptySample { path });
            }

            debug!(path = %path.display(), %activity, tokens = tokens.len(), "loaded sample");
            samples.push(Sample::new(path, tokens));
            activities.push(activity);
        }

        if samples.is_empty() {
            return Err(PipelineError::NoInputFiles {
                pattern: pattern.to_string(),
            });
        }

        info!(files = samples.len(), pattern, "loaded token samples");
        Ok(LoadedSamples {
            samples,
            activities,
        })
    }
}

/// Concatenate the tokens of every line
fn tokenize(contents: &str) -> Vec<String> {
    contents
        .lines()
        .flat_map(str::split_whitespace)
        .map(str::to_string)
        .collect()
}

/// Derive the activity label from the suffix after the last `_` of the file stem
pub fn activity_label(path: &Path, prefix: &str) -> Result<ActivityLabel, PipelineError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PipelineError::InvalidActivityName {
            path: path.to_path_buf(),
        })?;

    let suffix = file_name.rsplit('_').next().unwrap_or(file_name);
    let id = suffix.split('.').next().unwrap_or(suffix);

    if id.is_empty() {
        return Err(PipelineError::InvalidActivityName {
            path: path.to_path_buf(),
        });
    }

    Ok(ActivityLabel::from_id(prefix, id))
}
