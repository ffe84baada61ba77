//! Curriculum-aware progression pointer.
//!
//! [`ProgressionState`] tracks where a learner stands in a shared
//! [`Curriculum`]: the current checkpoint, the current step within it, and
//! whether the exercise is finished. All movement goes through the
//! transition methods here.
//!
//! Step `0` means no guiding question has been issued yet for the current
//! checkpoint; a step past the last one means the learner has been sent back
//! to the main question.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::curriculum::{Checkpoint, Curriculum, Step};
use crate::error::{Result, TutorError};

/// Position of a learner within a curriculum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionPointer {
    /// Current checkpoint, 1-based. Rests at `len + 1` once finished.
    pub checkpoint: usize,
    /// Current step within the checkpoint, 0 before the first is issued.
    pub step: usize,
    /// Set once, when the last checkpoint is left.
    pub finished: bool,
}

impl Default for ProgressionPointer {
    fn default() -> Self {
        Self {
            checkpoint: 1,
            step: 0,
            finished: false,
        }
    }
}

/// Progression through one curriculum for one session.
#[derive(Debug, Clone)]
pub struct ProgressionState {
    curriculum: Arc<Curriculum>,
    pointer: ProgressionPointer,
}

impl ProgressionState {
    /// Starts at checkpoint 1 with no step issued.
    #[must_use]
    pub fn new(curriculum: Arc<Curriculum>) -> Self {
        Self {
            curriculum,
            pointer: ProgressionPointer::default(),
        }
    }

    /// The curriculum being worked through.
    #[must_use]
    pub fn curriculum(&self) -> &Arc<Curriculum> {
        &self.curriculum
    }

    /// Snapshot of the pointer.
    #[must_use]
    pub const fn pointer(&self) -> ProgressionPointer {
        self.pointer
    }

    /// Current checkpoint number.
    #[must_use]
    pub const fn current_checkpoint(&self) -> usize {
        self.pointer.checkpoint
    }

    /// Current step number.
    #[must_use]
    pub const fn current_step(&self) -> usize {
        self.pointer.step
    }

    /// Returns `true` once the last checkpoint has been left.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.pointer.finished
    }

    fn checkpoint(&self) -> Result<&Checkpoint> {
        self.curriculum
            .checkpoint(self.pointer.checkpoint)
            .ok_or_else(|| {
                TutorError::checkpoint_out_of_range(self.pointer.checkpoint, self.curriculum.len())
            })
    }

    fn step(&self) -> Result<Option<&Step>> {
        Ok(self.checkpoint()?.step(self.pointer.step))
    }

    /// Main question of the current checkpoint.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::CheckpointOutOfRange` past the last checkpoint.
    pub fn main_question(&self) -> Result<&str> {
        Ok(&self.checkpoint()?.main_question)
    }

    /// Main answer of the current checkpoint.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::CheckpointOutOfRange` past the last checkpoint.
    pub fn main_answer(&self) -> Result<&str> {
        Ok(&self.checkpoint()?.main_answer)
    }

    /// Solution illustration of the current checkpoint, if any.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::CheckpointOutOfRange` past the last checkpoint.
    pub fn checkpoint_solution_image(&self) -> Result<Option<&str>> {
        Ok(self.checkpoint()?.image_solution.as_deref())
    }

    /// Guiding question of the current step.
    ///
    /// `None` at step 0 or past the last step.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::CheckpointOutOfRange` past the last checkpoint.
    pub fn guiding_question(&self) -> Result<Option<&str>> {
        Ok(self.step()?.map(|s| s.guiding_question.as_str()))
    }

    /// Guiding answer of the current step.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::CheckpointOutOfRange` past the last checkpoint.
    pub fn guiding_answer(&self) -> Result<Option<&str>> {
        Ok(self.step()?.map(|s| s.guiding_answer.as_str()))
    }

    /// Illustration of the current step, if any.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::CheckpointOutOfRange` past the last checkpoint.
    pub fn step_image(&self) -> Result<Option<&str>> {
        Ok(self.step()?.and_then(|s| s.image.as_deref()))
    }

    /// Returns `true` while the current step pointer still refers to a step
    /// (or to "no step yet"), i.e. the steps are not exhausted.
    #[must_use]
    pub fn has_another_step(&self) -> bool {
        self.curriculum
            .checkpoint(self.pointer.checkpoint)
            .is_some_and(|c| self.pointer.step <= c.steps.len())
    }

    /// Returns `true` while the checkpoint pointer is within the curriculum.
    #[must_use]
    pub fn has_another_checkpoint(&self) -> bool {
        self.pointer.checkpoint <= self.curriculum.len()
    }

    /// Moves to the next step.
    pub fn advance_step(&mut self) {
        self.pointer.step += 1;
    }

    /// Moves to the next checkpoint with no step issued.
    ///
    /// Leaving the last checkpoint marks the progression finished. Calls on
    /// a finished progression do nothing.
    pub fn advance_checkpoint(&mut self) {
        if self.pointer.finished {
            return;
        }

        self.pointer.checkpoint += 1;
        self.pointer.step = 0;

        if !self.has_another_checkpoint() {
            self.pointer.finished = true;
            tracing::info!(
                checkpoints = self.curriculum.len(),
                "Curriculum completed"
            );
        }
    }

    /// Jumps to checkpoint `target` with no step issued.
    ///
    /// Clears the finished flag, so a completed exercise can be revisited.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidCheckpoint` if `target` is outside
    /// `1..=len`; the pointer is left untouched.
    pub fn jump_to_checkpoint(&mut self, target: usize) -> Result<()> {
        let available = self.curriculum.len();
        if target == 0 || target > available {
            return Err(TutorError::invalid_checkpoint(target, available));
        }

        self.pointer = ProgressionPointer {
            checkpoint: target,
            step: 0,
            finished: false,
        };
        Ok(())
    }
}
