//! Guided Tutor Engine
//!
//! Drives a guided tutoring dialogue through a fixed curriculum of
//! checkpoints and steps: tracks progression and iteration budgets, runs the
//! per-turn generation pipeline, and exposes sessions over HTTP.

pub mod api;
pub mod backend;
pub mod budget;
pub mod config;
pub mod curriculum;
pub mod decision;
pub mod error;
pub mod events;
pub mod gateway;
pub mod generation;
pub mod orchestrator;
pub mod progression;
pub mod prompt;
pub mod session;

pub use api::{
    create_router, AppState, CreateSessionRequest, CreateSessionResponse, ErrorResponse,
    MessageRequest,
};
pub use backend::{ChatCompletionsBackend, GenerationBackend, ScriptedBackend, ScriptedReply};
pub use budget::IterationBudget;
pub use config::{BudgetConfig, Config, GenerationConfig, TutorMode};
pub use curriculum::{
    Checkpoint, Curriculum, ExerciseMetadata, ImageFormat, Step, MAX_CURRICULUM_SIZE,
};
pub use decision::{decide, Action, Decision, Reason, TransitionInputs};
pub use error::{GenerationError, GenerationErrorKind, Result, TutorError};
pub use events::TutorEvent;
pub use gateway::{GatewayOutcome, GenerationGateway};
pub use generation::{
    Feedback, Generated, InstructionType, Instructions, Schema, Understanding, DEFAULT_CONFIDENCE,
};
pub use orchestrator::{TurnOrchestrator, TurnOutcome};
pub use progression::{ProgressionPointer, ProgressionState};
pub use prompt::{GenerationRequest, PromptTurn};
pub use session::{Role, SessionSummary, TranscriptEntry, TutorSession};
