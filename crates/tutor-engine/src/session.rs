//! Per-learner tutoring session.
//!
//! A [`TutorSession`] exclusively owns everything that changes during a
//! dialogue: the progression pointer, the iteration budget, the latest
//! understanding and the transcript. Only the curriculum is shared.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::budget::IterationBudget;
use crate::config::{BudgetConfig, TutorMode};
use crate::curriculum::Curriculum;
use crate::error::Result;
use crate::generation::Understanding;
use crate::progression::{ProgressionPointer, ProgressionState};
use crate::prompt::{GenerationRequest, PromptTurn};

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The learner.
    Learner,
    /// The tutor.
    Tutor,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Learner => write!(f, "learner"),
            Self::Tutor => write!(f, "tutor"),
        }
    }
}

/// One line of the dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Who said it.
    pub role: Role,
    /// What was said.
    pub content: String,
    /// Checkpoint at the time.
    pub checkpoint: usize,
    /// Step at the time.
    pub step: usize,
    /// When it was said.
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of a session for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session id.
    pub session_id: String,
    /// Exercise title.
    pub exercise_title: String,
    /// Tutor mode in use.
    pub tutor_mode: TutorMode,
    /// Current checkpoint.
    pub current_checkpoint: usize,
    /// Current step.
    pub current_step: usize,
    /// Number of checkpoints in the exercise.
    pub total_checkpoints: usize,
    /// Learner turns so far.
    pub total_interactions: u32,
    /// Turns on the current step.
    pub step_interactions: u32,
    /// Turns on the current checkpoint.
    pub checkpoint_interactions: u32,
    /// Whether the exercise is complete.
    pub exercise_complete: bool,
    /// Number of transcript entries.
    pub conversation_length: usize,
    /// Latest summary of what the learner has shown.
    pub understanding_summary: Vec<String>,
    /// Concepts the learner has used correctly on this checkpoint.
    pub identified_concepts: Vec<String>,
    /// Misconceptions noticed on this checkpoint.
    pub misconceptions: Vec<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

/// State of one learner working through one curriculum.
#[derive(Debug, Clone)]
pub struct TutorSession {
    id: String,
    tutor_mode: TutorMode,
    created_at: DateTime<Utc>,
    /// Position in the curriculum.
    pub progression: ProgressionState,
    /// Turn counters.
    pub budget: IterationBudget,
    /// Latest assessment of the learner.
    pub understanding: Understanding,
    transcript: Vec<TranscriptEntry>,
}

impl TutorSession {
    /// Creates a session at checkpoint 1 with a fresh budget.
    #[must_use]
    pub fn new(curriculum: Arc<Curriculum>, tutor_mode: TutorMode, limits: BudgetConfig) -> Self {
        let id = Uuid::new_v4().to_string();
        tracing::info!(
            session_id = %id,
            exercise = %curriculum.metadata.title,
            mode = %tutor_mode,
            "Session created"
        );

        Self {
            id,
            tutor_mode,
            created_at: Utc::now(),
            progression: ProgressionState::new(curriculum),
            budget: IterationBudget::new(limits),
            understanding: Understanding::default(),
            transcript: Vec::new(),
        }
    }

    /// Session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Tutor mode.
    #[must_use]
    pub const fn tutor_mode(&self) -> TutorMode {
        self.tutor_mode
    }

    /// The curriculum being worked through.
    #[must_use]
    pub fn curriculum(&self) -> &Arc<Curriculum> {
        self.progression.curriculum()
    }

    /// Snapshot of the progression pointer.
    #[must_use]
    pub const fn pointer(&self) -> ProgressionPointer {
        self.progression.pointer()
    }

    /// Returns `true` once the exercise is complete.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.progression.is_finished()
    }

    /// The full transcript, oldest first.
    #[must_use]
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Appends an entry stamped with the current pointer and time.
    pub fn record(&mut self, role: Role, content: impl Into<String>) {
        let pointer = self.pointer();
        self.transcript.push(TranscriptEntry {
            role,
            content: content.into(),
            checkpoint: pointer.checkpoint,
            step: pointer.step,
            timestamp: Utc::now(),
        });
    }

    /// Builds the prompt context for `learner_input`.
    ///
    /// `history_window` caps how many recent transcript entries are included.
    /// Call it before recording `learner_input`, so the message is not
    /// repeated in the history. Past the last checkpoint the curriculum
    /// fields are left empty.
    pub fn generation_request(
        &self,
        learner_input: &str,
        history_window: usize,
    ) -> Result<GenerationRequest> {
        let progression = &self.progression;
        let (main_question, main_answer, guiding_question, guiding_answer) =
            if progression.has_another_checkpoint() {
                (
                    progression.main_question()?.to_string(),
                    progression.main_answer()?.to_string(),
                    progression.guiding_question()?.map(str::to_string),
                    progression.guiding_answer()?.map(str::to_string),
                )
            } else {
                (String::new(), String::new(), None, None)
            };

        let start = self.transcript.len().saturating_sub(history_window);
        let history = self.transcript[start..]
            .iter()
            .map(|entry| PromptTurn {
                role: entry.role,
                content: entry.content.clone(),
            })
            .collect();

        Ok(GenerationRequest {
            exercise_title: self.curriculum().metadata.title.clone(),
            tutor_mode: self.tutor_mode,
            checkpoint: progression.current_checkpoint(),
            step: progression.current_step(),
            main_question,
            main_answer,
            guiding_question,
            guiding_answer,
            understanding: self.understanding.clone(),
            history,
            learner_input: learner_input.to_string(),
        })
    }

    /// Summarizes the session.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        let pointer = self.pointer();
        SessionSummary {
            session_id: self.id.clone(),
            exercise_title: self.curriculum().metadata.title.clone(),
            tutor_mode: self.tutor_mode,
            current_checkpoint: pointer.checkpoint,
            current_step: pointer.step,
            total_checkpoints: self.curriculum().len(),
            total_interactions: self.budget.total,
            step_interactions: self.budget.step,
            checkpoint_interactions: self.budget.checkpoint,
            exercise_complete: pointer.finished,
            conversation_length: self.transcript.len(),
            understanding_summary: self.understanding.summary.clone(),
            identified_concepts: self.understanding.identified_concepts.clone(),
            misconceptions: self.understanding.misconceptions.clone(),
            created_at: self.created_at,
        }
    }
}
