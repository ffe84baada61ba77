//! Transition decision rule.
//!
//! A pure function from the learner's assessed understanding, the iteration
//! budget, and the curriculum shape to the next action. Correctness on the
//! main question dominates everything else, then correctness on the guiding
//! question, then budget exhaustion.

use serde::{Deserialize, Serialize};

use crate::budget::IterationBudget;
use crate::generation::Understanding;
use crate::progression::ProgressionState;

/// What the orchestrator does after assessing a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Stay on the current question and give further instructions.
    ContinueQuestion,
    /// Reveal the guiding answer and move to the next step.
    AdvanceStep,
    /// Reveal the main answer and move to the next checkpoint.
    AdvanceCheckpoint,
    /// The exercise is over.
    Finish,
}

/// Why an action was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// The learner answered the main question.
    MainAnswered,
    /// The learner answered the guiding question.
    GuidingAnswered,
    /// The checkpoint ran out of turns.
    CheckpointBudgetExhausted,
    /// The step ran out of turns.
    StepBudgetExhausted,
    /// Nothing was answered and turns remain.
    InProgress,
    /// The exercise had already finished.
    AlreadyFinished,
}

/// Outcome of the decision rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// The chosen action.
    pub action: Action,
    /// What triggered it.
    pub reason: Reason,
}

/// Everything the decision rule looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct TransitionInputs {
    /// Main question judged answered this turn.
    pub main_answered: bool,
    /// Guiding question judged answered this turn.
    pub guiding_answered: bool,
    /// Step counter below its limit.
    pub step_budget_left: bool,
    /// Checkpoint counter below its limit.
    pub checkpoint_budget_left: bool,
    /// Steps not yet exhausted.
    pub has_another_step: bool,
    /// Checkpoints not yet exhausted.
    pub has_another_checkpoint: bool,
    /// Exercise already finished.
    pub finished: bool,
}

impl TransitionInputs {
    /// Gathers inputs from live session state.
    #[must_use]
    pub fn gather(
        understanding: &Understanding,
        budget: &IterationBudget,
        progression: &ProgressionState,
    ) -> Self {
        Self {
            main_answered: understanding.main_question_answered,
            guiding_answered: understanding.guiding_question_answered,
            step_budget_left: budget.has_step_budget_left(),
            checkpoint_budget_left: budget.has_checkpoint_budget_left(),
            has_another_step: progression.has_another_step(),
            has_another_checkpoint: progression.has_another_checkpoint(),
            finished: progression.is_finished(),
        }
    }
}

/// Picks the next action.
///
/// # Examples
///
/// ```
/// use tutor_engine::decision::{decide, Action, TransitionInputs};
///
/// let inputs = TransitionInputs {
///     main_answered: true,
///     has_another_checkpoint: true,
///     step_budget_left: true,
///     checkpoint_budget_left: true,
///     ..TransitionInputs::default()
/// };
/// assert_eq!(decide(&inputs).action, Action::AdvanceCheckpoint);
/// ```
#[must_use]
pub const fn decide(inputs: &TransitionInputs) -> Decision {
    if inputs.finished {
        return Decision {
            action: Action::Finish,
            reason: Reason::AlreadyFinished,
        };
    }

    if inputs.main_answered || !inputs.checkpoint_budget_left {
        let reason = if inputs.main_answered {
            Reason::MainAnswered
        } else {
            Reason::CheckpointBudgetExhausted
        };
        let action = if inputs.has_another_checkpoint {
            Action::AdvanceCheckpoint
        } else {
            Action::Finish
        };
        return Decision { action, reason };
    }

    if inputs.guiding_answered || !inputs.step_budget_left {
        let reason = if inputs.guiding_answered {
            Reason::GuidingAnswered
        } else {
            Reason::StepBudgetExhausted
        };
        let action = if inputs.has_another_step {
            Action::AdvanceStep
        } else {
            Action::ContinueQuestion
        };
        return Decision { action, reason };
    }

    Decision {
        action: Action::ContinueQuestion,
        reason: Reason::InProgress,
    }
}
