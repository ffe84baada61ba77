//! Configuration types for the tutoring engine.
//!
//! Controls which curriculum is loaded, how the tutor frames its replies,
//! how many turns a learner gets per step and checkpoint, and which
//! generation models are tried in which order.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TutorError};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "tutor.json";

/// Default curriculum file path.
fn default_curriculum() -> String {
    "exercise.json".to_string()
}

const fn default_history_window() -> usize {
    3
}

const fn default_max_step_iterations() -> u32 {
    2
}

const fn default_max_checkpoint_iterations() -> u32 {
    6
}

/// Default ordered list of model candidates.
fn default_models() -> Vec<String> {
    vec![
        "gpt-4o-mini".to_string(),
        "gpt-4o".to_string(),
        "o3-mini".to_string(),
    ]
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Default per-attempt timeout in seconds.
const fn default_timeout_seconds() -> u64 {
    5
}

const fn default_sampling() -> f32 {
    0.5
}

/// Main configuration for a tutoring deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Path to the curriculum (exercise) file.
    #[serde(default = "default_curriculum")]
    pub curriculum: String,

    /// Framing used for feedback and instructions.
    #[serde(default)]
    pub tutor_mode: TutorMode,

    /// Iteration limits per step and per checkpoint.
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Generation backend settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Number of recent transcript entries included in prompts.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            curriculum: default_curriculum(),
            tutor_mode: TutorMode::default(),
            budget: BudgetConfig::default(),
            generation: GenerationConfig::default(),
            history_window: default_history_window(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `tutor.json` in the current directory and falls back to
    /// defaults when it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            TutorError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `tutor.json` in the given directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::ConfigParseError` if the file cannot be read or
    /// contains invalid JSON or enum values, and
    /// `TutorError::ConfigValidationError` if a value is out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(TutorError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| TutorError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::ConfigValidationError` for the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.curriculum.trim().is_empty() {
            return Err(TutorError::config_validation(
                "curriculum path must not be empty",
                "Provide the path to an exercise JSON file in your tutor.json",
            ));
        }

        if self.budget.max_step_iterations == 0 {
            return Err(TutorError::config_validation(
                "budget.maxStepIterations must be greater than 0",
                "Set budget.maxStepIterations to at least 1 in your tutor.json",
            ));
        }

        if self.budget.max_checkpoint_iterations == 0 {
            return Err(TutorError::config_validation(
                "budget.maxCheckpointIterations must be greater than 0",
                "Set budget.maxCheckpointIterations to at least 1 in your tutor.json",
            ));
        }

        if self.generation.models.iter().all(|m| m.trim().is_empty()) {
            return Err(TutorError::config_validation(
                "generation.models must name at least one model",
                "List one or more model names in generation.models, in the order they should be tried",
            ));
        }

        if self.generation.timeout_seconds == 0 {
            return Err(TutorError::config_validation(
                "generation.timeoutSeconds must be greater than 0",
                "Set generation.timeoutSeconds to at least 1 second in your tutor.json",
            ));
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(TutorError::config_validation(
                format!(
                    "generation.temperature must be between 0 and 2, got {}",
                    self.generation.temperature
                ),
                "Use a temperature such as 0.5 in your tutor.json",
            ));
        }

        if !(0.0..=1.0).contains(&self.generation.top_p) {
            return Err(TutorError::config_validation(
                format!(
                    "generation.topP must be between 0 and 1, got {}",
                    self.generation.top_p
                ),
                "Use a topP such as 0.5 in your tutor.json",
            ));
        }

        Ok(())
    }
}

/// How the tutor frames feedback and instructions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TutorMode {
    /// Guide with questions only, never state the answer (default).
    #[default]
    Socratic,
    /// Explain concepts directly and give worked hints.
    Instructional,
}

impl TutorMode {
    /// Parses a string into a `TutorMode`, case-insensitively.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "socratic" => Some(Self::Socratic),
            "instructional" => Some(Self::Instructional),
            _ => None,
        }
    }

    /// Returns the lowercase wire name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Socratic => "socratic",
            Self::Instructional => "instructional",
        }
    }
}

impl std::fmt::Display for TutorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TutorMode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid tutor mode '{s}': expected one of 'socratic', 'instructional'"
            ))
        })
    }
}

impl Serialize for TutorMode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Iteration limits.
///
/// Once a learner has spent this many turns on a step (or checkpoint)
/// without answering it, the tutor reveals the answer and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetConfig {
    /// Turns allowed on one guiding question.
    #[serde(default = "default_max_step_iterations")]
    pub max_step_iterations: u32,

    /// Turns allowed on one checkpoint.
    #[serde(default = "default_max_checkpoint_iterations")]
    pub max_checkpoint_iterations: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_step_iterations: default_max_step_iterations(),
            max_checkpoint_iterations: default_max_checkpoint_iterations(),
        }
    }
}

/// Generation backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Model names tried in order until one answers.
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Time budget for a single attempt, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Sampling temperature.
    #[serde(default = "default_sampling")]
    pub temperature: f32,

    /// Nucleus sampling parameter.
    #[serde(default = "default_sampling")]
    pub top_p: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_seconds: default_timeout_seconds(),
            temperature: default_sampling(),
            top_p: default_sampling(),
        }
    }
}

impl GenerationConfig {
    /// Per-attempt timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Reads the API key from the configured environment variable.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
