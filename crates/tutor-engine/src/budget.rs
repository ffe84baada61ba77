//! Iteration budget tracking.
//!
//! Each learner turn counts against two nested limits. When the step limit
//! is reached the guiding answer is revealed; when the checkpoint limit is
//! reached the main answer is revealed and the tutor moves on.

use serde::{Deserialize, Serialize};

use crate::config::BudgetConfig;

/// Turn counters for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationBudget {
    /// Turns taken over the whole session.
    pub total: u32,
    /// Turns taken on the current step.
    pub step: u32,
    /// Turns taken on the current checkpoint.
    pub checkpoint: u32,
    /// Limit for `step`.
    pub max_step: u32,
    /// Limit for `checkpoint`.
    pub max_checkpoint: u32,
}

impl Default for IterationBudget {
    fn default() -> Self {
        Self::new(BudgetConfig::default())
    }
}

impl IterationBudget {
    /// Creates a fresh budget with all counters at zero.
    #[must_use]
    pub const fn new(limits: BudgetConfig) -> Self {
        Self {
            total: 0,
            step: 0,
            checkpoint: 0,
            max_step: limits.max_step_iterations,
            max_checkpoint: limits.max_checkpoint_iterations,
        }
    }

    /// Records one learner turn on all three counters.
    pub fn increment(&mut self) {
        self.total = self.total.saturating_add(1);
        self.step = self.step.saturating_add(1);
        self.checkpoint = self.checkpoint.saturating_add(1);
    }

    /// Returns `true` while the current step may take more turns.
    ///
    /// # Examples
    ///
    /// ```
    /// use tutor_engine::IterationBudget;
    ///
    /// let mut budget = IterationBudget::default();
    /// budget.increment();
    /// assert!(budget.has_step_budget_left());
    /// budget.increment();
    /// assert!(!budget.has_step_budget_left());
    /// ```
    #[must_use]
    pub const fn has_step_budget_left(&self) -> bool {
        self.step < self.max_step
    }

    /// Returns `true` while the current checkpoint may take more turns.
    #[must_use]
    pub const fn has_checkpoint_budget_left(&self) -> bool {
        self.checkpoint < self.max_checkpoint
    }

    /// Zeroes the step counter.
    pub fn reset_step(&mut self) {
        self.step = 0;
    }

    /// Zeroes the checkpoint counter and, with it, the step counter.
    pub fn reset_checkpoint(&mut self) {
        self.checkpoint = 0;
        self.reset_step();
    }
}
