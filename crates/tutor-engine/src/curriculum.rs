//! Curriculum model and loading.
//!
//! A curriculum is an immutable tree of checkpoints (main questions), each
//! broken into ordered steps (guiding questions). It is loaded once from a
//! JSON exercise document, validated, and then shared read-only by every
//! session that works through the same exercise.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TutorError};

/// Maximum allowed curriculum file size in bytes (1 MiB).
pub const MAX_CURRICULUM_SIZE: u64 = 1024 * 1024;

fn default_version() -> String {
    "1.0".to_string()
}

/// A guiding question that scaffolds the learner toward the main answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Position within the checkpoint, starting at 1.
    pub step_number: usize,
    /// The guiding question shown to the learner.
    pub guiding_question: String,
    /// Sample answer revealed once the step is completed.
    pub guiding_answer: String,
    /// Optional illustration shown alongside the question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A top-level curriculum unit with one main question and answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Position within the curriculum, starting at 1.
    pub checkpoint_number: usize,
    /// The main question of this checkpoint.
    pub main_question: String,
    /// Sample answer revealed when the checkpoint is left.
    pub main_answer: String,
    /// Optional illustration of the solution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_solution: Option<String>,
    /// Ordered guiding questions.
    pub steps: Vec<Step>,
}

impl Checkpoint {
    /// Returns the step with the given 1-based number, if it exists.
    #[must_use]
    pub fn step(&self, number: usize) -> Option<&Step> {
        number.checked_sub(1).and_then(|idx| self.steps.get(idx))
    }
}

/// Descriptive information about an exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseMetadata {
    /// Name of the exercise.
    pub title: String,
    /// Topic area, e.g. "ANOVA".
    pub topic: String,
    /// Intended difficulty level.
    pub level: String,
    /// Exercise language code, e.g. "en" or "de".
    pub language: String,
    /// Author of the exercise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Keywords for filtering.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Format or content version.
    #[serde(default = "default_version")]
    pub version: String,
}

/// An ordered sequence of checkpoints plus opening and closing messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Curriculum {
    /// Descriptive metadata.
    pub metadata: ExerciseMetadata,
    /// Opening message shown when a session starts.
    pub first_message: String,
    /// Closing message shown after the last checkpoint.
    pub end_message: String,
    /// Ordered checkpoints.
    pub checkpoints: Vec<Checkpoint>,
}

impl Curriculum {
    /// Number of checkpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// Returns `true` if the curriculum has no checkpoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Returns the checkpoint with the given 1-based number, if it exists.
    #[must_use]
    pub fn checkpoint(&self, number: usize) -> Option<&Checkpoint> {
        number.checked_sub(1).and_then(|idx| self.checkpoints.get(idx))
    }

    /// Loads and validates a curriculum from a JSON file.
    ///
    /// Relative image references are resolved against the directory that
    /// contains the file.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::CurriculumNotFound` if the file doesn't exist,
    /// `TutorError::CurriculumTooLarge` if it exceeds 1 MiB,
    /// `TutorError::CurriculumEncodingError` if it is not UTF-8,
    /// `TutorError::CurriculumParseError` if it is not a valid exercise document and
    /// `TutorError::CurriculumValidationError` if the numbering is broken.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let metadata = std::fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TutorError::curriculum_not_found(path)
            } else {
                TutorError::Io(e)
            }
        })?;

        let file_size = metadata.len();
        if file_size > MAX_CURRICULUM_SIZE {
            return Err(TutorError::curriculum_too_large(path, file_size / 1024));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidData {
                TutorError::curriculum_encoding(path)
            } else {
                TutorError::Io(e)
            }
        })?;

        let mut curriculum: Self = serde_json::from_str(&content)
            .map_err(|e| TutorError::curriculum_parse(path, e.to_string()))?;
        curriculum.validate()?;

        if let Some(base_dir) = path.parent() {
            curriculum.resolve_media(base_dir);
        }

        tracing::info!(
            title = %curriculum.metadata.title,
            checkpoints = curriculum.len(),
            path = %path.display(),
            "Curriculum loaded"
        );

        Ok(curriculum)
    }

    /// Parses and validates a curriculum from a JSON string.
    ///
    /// Image references are kept exactly as written.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::Json` for malformed documents and
    /// `TutorError::CurriculumValidationError` for broken numbering.
    pub fn from_json(json: &str) -> Result<Self> {
        let curriculum: Self = serde_json::from_str(json)?;
        curriculum.validate()?;
        Ok(curriculum)
    }

    /// Checks the structural rules of the exercise format.
    ///
    /// - at least one checkpoint
    /// - checkpoint numbers are contiguous starting at 1
    /// - every checkpoint has at least one step
    /// - step numbers are contiguous starting at 1 within each checkpoint
    /// - questions and answers are not blank
    ///
    /// # Errors
    ///
    /// Returns `TutorError::CurriculumValidationError` on the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.checkpoints.is_empty() {
            return Err(TutorError::curriculum_validation(
                "the exercise has no checkpoints",
                "Add at least one checkpoint with a main question",
            ));
        }

        for (idx, checkpoint) in self.checkpoints.iter().enumerate() {
            let expected = idx + 1;
            if checkpoint.checkpoint_number != expected {
                return Err(TutorError::curriculum_validation(
                    format!(
                        "checkpoint at position {expected} is numbered {}",
                        checkpoint.checkpoint_number
                    ),
                    "Number checkpoints contiguously starting at 1",
                ));
            }

            if checkpoint.main_question.trim().is_empty()
                || checkpoint.main_answer.trim().is_empty()
            {
                return Err(TutorError::curriculum_validation(
                    format!("checkpoint {expected} has an empty main question or answer"),
                    "Provide both main_question and main_answer",
                ));
            }

            if checkpoint.steps.is_empty() {
                return Err(TutorError::curriculum_validation(
                    format!("checkpoint {expected} has no steps"),
                    "Add at least one guiding question to every checkpoint",
                ));
            }

            for (step_idx, step) in checkpoint.steps.iter().enumerate() {
                let expected_step = step_idx + 1;
                if step.step_number != expected_step {
                    return Err(TutorError::curriculum_validation(
                        format!(
                            "step at position {expected_step} of checkpoint {expected} is numbered {}",
                            step.step_number
                        ),
                        "Number steps contiguously starting at 1 within each checkpoint",
                    ));
                }

                if step.guiding_question.trim().is_empty()
                    || step.guiding_answer.trim().is_empty()
                {
                    return Err(TutorError::curriculum_validation(
                        format!(
                            "step {expected_step} of checkpoint {expected} has an empty guiding question or answer"
                        ),
                        "Provide both guiding_question and guiding_answer",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Resolves relative image references against `base_dir`.
    ///
    /// URLs are left untouched. Missing files and unsupported formats are
    /// logged and kept, so a broken illustration never blocks a session.
    pub fn resolve_media(&mut self, base_dir: &Path) {
        for checkpoint in &mut self.checkpoints {
            if let Some(image) = checkpoint.image_solution.as_mut() {
                resolve_reference(image, base_dir);
            }
            for step in &mut checkpoint.steps {
                if let Some(image) = step.image.as_mut() {
                    resolve_reference(image, base_dir);
                }
            }
        }
    }
}

fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with("data:")
}

fn resolve_reference(reference: &mut String, base_dir: &Path) {
    if is_remote(reference) {
        return;
    }

    let path = PathBuf::from(reference.as_str());
    let resolved = if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    };

    if ImageFormat::from_path(&resolved).is_none() {
        tracing::warn!(image = %resolved.display(), "Unsupported image format");
    }
    if !resolved.exists() {
        tracing::warn!(image = %resolved.display(), "Image not found");
    }

    *reference = resolved.to_string_lossy().into_owned();
}

/// Supported image formats for curriculum illustrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG image format.
    Png,
    /// JPEG image format.
    Jpg,
    /// GIF image format.
    Gif,
    /// SVG image format.
    Svg,
}

impl ImageFormat {
    /// Attempts to detect image format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpg),
            "gif" => Some(Self::Gif),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    /// Attempts to detect image format from a file path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Jpg => write!(f, "jpg"),
            Self::Gif => write!(f, "gif"),
            Self::Svg => write!(f, "svg"),
        }
    }
}
