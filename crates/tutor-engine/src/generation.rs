//! Structured outputs requested from the generation backend.
//!
//! Each turn asks for up to three results: an [`Understanding`] assessment,
//! [`Feedback`] on the learner's answer, and optionally further
//! [`Instructions`]. Every type has a documented default that stands in when
//! no backend produces a usable result.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Text used when no backend produced feedback.
pub const DEFAULT_FEEDBACK: &str = "I could not create feedback for your answer this time.";

/// Text used when no backend produced instructions.
pub const DEFAULT_INSTRUCTIONS: &str =
    "Let's think about this step by step. What do you understand so far?";

/// Confidence assumed when a backend does not report one.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

const fn default_confidence() -> f32 {
    DEFAULT_CONFIDENCE
}

/// The kinds of structured output a backend can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schema {
    /// Assessment of what the learner has answered.
    Understanding,
    /// Constructive feedback on the learner's message.
    Feedback,
    /// A next prompt nudging the learner forward.
    Instructions,
}

impl Schema {
    /// Lowercase name used in logs and prompts.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Understanding => "understanding",
            Self::Feedback => "feedback",
            Self::Instructions => "instructions",
        }
    }

    /// The JSON object shape the backend must answer with.
    #[must_use]
    pub const fn json_shape(self) -> &'static str {
        match self {
            Self::Understanding => {
                r#"{"main_question_answered": bool, "guiding_question_answered": bool, "summary": [string], "confidence_score": number from 0 to 1, "identified_concepts": [string], "misconceptions": [string], "reasoning": string}"#
            }
            Self::Feedback => {
                r#"{"feedback": string, "positive_aspects": [string], "areas_for_improvement": [string], "reasoning": string}"#
            }
            Self::Instructions => {
                r#"{"instructions": string, "instruction_type": "question" | "hint" | "explanation" | "redirect" | "guidance", "follow_up_questions": [string], "reasoning": string}"#
            }
        }
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A structured result the gateway can request and fall back from.
pub trait Generated: DeserializeOwned + Default + Send + 'static {
    /// The schema requested from the backend.
    const SCHEMA: Schema;

    /// Returns `false` if a parsed result carries no usable content.
    fn is_usable(&self) -> bool {
        true
    }
}

/// Per-turn judgment of the learner's answer.
///
/// Both answered flags are required; an object without them is the wrong
/// schema and does not count as an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Understanding {
    /// Whether the main question of the checkpoint was answered.
    pub main_question_answered: bool,
    /// Whether the current guiding question was answered.
    pub guiding_question_answered: bool,
    /// One-line statements of what the learner has shown so far.
    #[serde(default)]
    pub summary: Vec<String>,
    /// How sure the assessment is, from 0 to 1.
    #[serde(default = "default_confidence")]
    pub confidence_score: f32,
    /// Concepts the learner has used correctly.
    #[serde(default)]
    pub identified_concepts: Vec<String>,
    /// Misconceptions visible in the learner's answers.
    #[serde(default)]
    pub misconceptions: Vec<String>,
    /// Why the flags were set the way they are.
    #[serde(default)]
    pub reasoning: String,
}

impl Default for Understanding {
    fn default() -> Self {
        Self {
            main_question_answered: false,
            guiding_question_answered: false,
            summary: Vec::new(),
            confidence_score: DEFAULT_CONFIDENCE,
            identified_concepts: Vec::new(),
            misconceptions: Vec::new(),
            reasoning: String::new(),
        }
    }
}

impl Understanding {
    /// Renders the summary as a bullet list for prompt context.
    #[must_use]
    pub fn summary_text(&self) -> String {
        let items: Vec<String> = self
            .summary
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| format!("- {s}"))
            .collect();

        if items.is_empty() {
            "No previous understanding recorded.".to_string()
        } else {
            items.join("\n")
        }
    }
}

impl Generated for Understanding {
    const SCHEMA: Schema = Schema::Understanding;

    fn is_usable(&self) -> bool {
        (0.0..=1.0).contains(&self.confidence_score)
    }
}

/// Feedback on the learner's latest message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// Text shown to the learner.
    pub feedback: String,
    /// What the learner did well.
    #[serde(default)]
    pub positive_aspects: Vec<String>,
    /// Where the answer falls short.
    #[serde(default)]
    pub areas_for_improvement: Vec<String>,
    /// Why the feedback was phrased this way.
    #[serde(default)]
    pub reasoning: String,
}

impl Default for Feedback {
    fn default() -> Self {
        Self {
            feedback: DEFAULT_FEEDBACK.to_string(),
            positive_aspects: Vec::new(),
            areas_for_improvement: Vec::new(),
            reasoning: String::new(),
        }
    }
}

impl Generated for Feedback {
    const SCHEMA: Schema = Schema::Feedback;

    fn is_usable(&self) -> bool {
        !self.feedback.trim().is_empty()
    }
}

/// The form an instruction takes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionType {
    /// A question that prompts reflection.
    Question,
    /// A hint toward the answer.
    Hint,
    /// A short explanation of a concept.
    Explanation,
    /// Steering back to the current question.
    Redirect,
    /// General guidance.
    #[default]
    Guidance,
}

/// Further instructions when the learner stays on a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instructions {
    /// Text shown to the learner.
    pub instructions: String,
    /// The form of the instruction.
    #[serde(default)]
    pub instruction_type: InstructionType,
    /// Questions the tutor may ask next.
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
    /// Why this instruction was chosen.
    #[serde(default)]
    pub reasoning: String,
}

impl Default for Instructions {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            instruction_type: InstructionType::Guidance,
            follow_up_questions: Vec::new(),
            reasoning: String::new(),
        }
    }
}

impl Generated for Instructions {
    const SCHEMA: Schema = Schema::Instructions;

    fn is_usable(&self) -> bool {
        !self.instructions.trim().is_empty()
    }
}
