//! Prompt context handed to generation backends.
//!
//! A [`GenerationRequest`] is a snapshot of everything a backend needs for
//! one call: the current curriculum content, the learner's latest message,
//! the prior understanding and a short window of recent transcript. It
//! renders into a system prompt (role, tutor mode, required JSON shape) and
//! a user prompt (the context itself).

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::config::TutorMode;
use crate::generation::{Schema, Understanding};
use crate::session::Role;

/// One transcript entry included as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTurn {
    /// Who spoke.
    pub role: Role,
    /// What was said.
    pub content: String,
}

/// Context for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Exercise title.
    pub exercise_title: String,
    /// Framing for feedback and instructions.
    pub tutor_mode: TutorMode,
    /// Current checkpoint number.
    pub checkpoint: usize,
    /// Current step number.
    pub step: usize,
    /// Main question of the checkpoint.
    pub main_question: String,
    /// Main answer of the checkpoint.
    pub main_answer: String,
    /// Current guiding question, absent before the first step or after the last.
    pub guiding_question: Option<String>,
    /// Current guiding answer.
    pub guiding_answer: Option<String>,
    /// Understanding carried into this call.
    pub understanding: Understanding,
    /// Most recent transcript entries, oldest first.
    pub history: Vec<PromptTurn>,
    /// The learner's message for this turn.
    pub learner_input: String,
}

fn role_statement(schema: Schema) -> &'static str {
    match schema {
        Schema::Understanding => {
            "You are a tutor evaluating a learner's understanding. Decide whether the learner \
             has answered the current guiding question and whether they have answered the main \
             question. Be generous: an answer that shows the key concept counts, even when it is \
             incomplete. Summarize what the learner has shown in short one-line statements."
        }
        Schema::Feedback => {
            "You are a supportive tutor giving constructive feedback. Acknowledge what the \
             learner got right, point out gaps or misconceptions, and never reveal the answers. \
             Do not ask questions; the next question is posed separately."
        }
        Schema::Instructions => {
            "You are a tutor helping a learner discover the answer themselves. Write one brief \
             instruction that focuses their thinking on the current question. Never give the \
             answer, never repeat what was already said, and never introduce concepts beyond \
             the current question."
        }
    }
}

fn mode_statement(mode: TutorMode) -> &'static str {
    match mode {
        TutorMode::Socratic => {
            "Tutor mode: socratic. Guide through questions and reflection so the learner finds \
             their own misconceptions."
        }
        TutorMode::Instructional => {
            "Tutor mode: instructional. Explain concepts clearly, break them into small steps \
             and relate them to the problem at hand."
        }
    }
}

impl GenerationRequest {
    /// Renders the system prompt for `schema`.
    #[must_use]
    pub fn system_prompt(&self, schema: Schema) -> String {
        let mut prompt = String::from(role_statement(schema));
        prompt.push_str("\n\n");
        if schema != Schema::Understanding {
            prompt.push_str(mode_statement(self.tutor_mode));
            prompt.push_str("\n\n");
        }
        let _ = write!(
            prompt,
            "Respond with a single JSON object of the form {}",
            schema.json_shape()
        );
        prompt
    }

    /// Renders the context the learner's message is judged against.
    #[must_use]
    pub fn user_prompt(&self) -> String {
        let mut prompt = String::new();

        let _ = writeln!(prompt, "Exercise: {}", self.exercise_title);
        let _ = writeln!(
            prompt,
            "Checkpoint {}, step {}",
            self.checkpoint, self.step
        );
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "Main question: {}", self.main_question);
        let _ = writeln!(prompt, "Main answer: {}", self.main_answer);

        if let Some(question) = &self.guiding_question {
            let _ = writeln!(prompt, "Guiding question: {question}");
        }
        if let Some(answer) = &self.guiding_answer {
            let _ = writeln!(prompt, "Guiding answer: {answer}");
        }

        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "Current understanding of the learner:");
        let _ = writeln!(
            prompt,
            "- main question answered: {}",
            self.understanding.main_question_answered
        );
        let _ = writeln!(
            prompt,
            "- guiding question answered: {}",
            self.understanding.guiding_question_answered
        );
        let _ = writeln!(prompt, "{}", self.understanding.summary_text());
        if !self.understanding.identified_concepts.is_empty() {
            let _ = writeln!(
                prompt,
                "Concepts used correctly: {}",
                self.understanding.identified_concepts.join("; ")
            );
        }
        if !self.understanding.misconceptions.is_empty() {
            let _ = writeln!(
                prompt,
                "Misconceptions noticed: {}",
                self.understanding.misconceptions.join("; ")
            );
        }

        if !self.history.is_empty() {
            let _ = writeln!(prompt);
            let _ = writeln!(prompt, "Recent conversation:");
            for turn in &self.history {
                let _ = writeln!(prompt, "{}: {}", turn.role, turn.content);
            }
        }

        let _ = writeln!(prompt);
        let _ = write!(prompt, "Learner's message: {}", self.learner_input);
        prompt
    }
}
