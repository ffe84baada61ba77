//! End-to-end tests for a tutoring session.
//!
//! These tests load the sample exercise and config from disk and drive a
//! full dialogue through the orchestrator, with a scripted generation
//! backend standing in for the language model.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tutor_engine::{
    Action, Config, Curriculum, GenerationBackend, GenerationErrorKind, GenerationGateway, Reason,
    ScriptedBackend, ScriptedReply, TurnOrchestrator, TutorError, TutorEvent, TutorMode,
    TutorSession,
};

/// Path to the sample exercise fixture.
fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/sample-exercise")
}

fn load_fixture() -> (Config, Arc<Curriculum>) {
    let config =
        Config::load_from_dir(&fixture_path()).expect("Failed to load fixture config");
    let curriculum = Curriculum::load(fixture_path().join(&config.curriculum))
        .expect("Failed to load fixture exercise");
    (config, Arc::new(curriculum))
}

fn orchestrator(config: &Config, backends: &[Arc<ScriptedBackend>]) -> TurnOrchestrator {
    let candidates = backends
        .iter()
        .map(|b| Arc::clone(b) as Arc<dyn GenerationBackend>)
        .collect();
    let gateway = GenerationGateway::new(candidates, config.generation.timeout());
    TurnOrchestrator::new(gateway, config.history_window)
}

fn understanding(main: bool, guiding: bool) -> ScriptedReply {
    ScriptedReply::Value(json!({
        "main_question_answered": main,
        "guiding_question_answered": guiding,
        "summary": []
    }))
}

fn feedback(text: &str) -> ScriptedReply {
    ScriptedReply::Value(json!({ "feedback": text }))
}

fn texts(events: &[TutorEvent]) -> Vec<&str> {
    events.iter().map(TutorEvent::text).collect()
}

// ============================================================================
// Fixture Loading
// ============================================================================

#[test]
fn test_sample_config_loads() {
    let config =
        Config::load_from_file(&fixture_path().join("tutor.json")).expect("Failed to load config");

    assert_eq!(config.curriculum, "exercise.json");
    assert_eq!(config.tutor_mode, TutorMode::Instructional);
    assert_eq!(config.budget.max_step_iterations, 2);
    assert_eq!(config.budget.max_checkpoint_iterations, 4);
    assert_eq!(config.generation.models, vec!["gpt-4o-mini", "gpt-4o"]);
    assert_eq!(config.generation.timeout_seconds, 2);
    assert_eq!(config.history_window, 4);
}

#[test]
fn test_sample_exercise_loads() {
    let (_, curriculum) = load_fixture();

    assert_eq!(curriculum.metadata.title, "Repeated-Measures ANOVA");
    assert_eq!(curriculum.metadata.tags.len(), 3);
    assert_eq!(curriculum.len(), 2);

    let first = curriculum.checkpoint(1).expect("checkpoint 1");
    assert_eq!(first.steps.len(), 2);

    // Remote references are kept, local ones resolved against the exercise directory
    assert_eq!(
        first.steps[0].image.as_deref(),
        Some("https://example.org/anova/design-table.png")
    );
    let solution = PathBuf::from(first.image_solution.as_deref().expect("solution image"));
    assert_eq!(solution, fixture_path().join("images/variance-partition.png"));
}

#[test]
fn test_missing_exercise_is_reported() {
    let result = Curriculum::load(fixture_path().join("missing.json"));
    assert!(matches!(result, Err(TutorError::CurriculumNotFound { .. })));
}

#[test]
fn test_broken_numbering_is_rejected() {
    let document = json!({
        "metadata": {"title": "Broken", "topic": "t", "level": "l", "language": "en"},
        "first_message": "Hi",
        "end_message": "Bye",
        "checkpoints": [{
            "checkpoint_number": 2,
            "main_question": "Q",
            "main_answer": "A",
            "steps": [{"step_number": 1, "guiding_question": "GQ", "guiding_answer": "GA"}]
        }]
    });

    let result = Curriculum::from_json(&document.to_string());
    assert!(matches!(
        result,
        Err(TutorError::CurriculumValidationError { .. })
    ));
}

// ============================================================================
// Full Dialogue
// ============================================================================

/// Walks the whole exercise: a guiding answer, a struggling turn, the main
/// answer, navigation back and forth, and completion.
#[tokio::test]
async fn test_full_dialogue_through_sample_exercise() {
    let (config, curriculum) = load_fixture();
    let backend = Arc::new(ScriptedBackend::with_replies(
        "scripted",
        [
            // turn 1: guiding question answered
            understanding(false, true),
            feedback("Exactly, three measurements per person."),
            // turn 2: no progress
            understanding(false, false),
            feedback("Not quite."),
            ScriptedReply::Value(json!({"instructions": "Think about who produced the values."})),
            // turn 3: main question answered
            understanding(true, false),
            feedback("That's the key point."),
            // turn 6: main question of the last checkpoint answered
            understanding(true, false),
            feedback("Correct, that is sphericity."),
        ],
    ));
    let orchestrator = orchestrator(&config, &[Arc::clone(&backend)]);
    let mut session = TutorSession::new(Arc::clone(&curriculum), config.tutor_mode, config.budget);

    // Opening
    let opening = orchestrator.opening(&mut session);
    assert_eq!(opening.len(), 3);
    assert!(opening[0].text().contains("three lighting conditions"));
    assert!(opening[1].text().starts_with("The main question is:"));
    assert_eq!(
        opening[2].image(),
        Some("https://example.org/anova/design-table.png")
    );

    // Turn 1: guiding answer advances to step 2
    let outcome = orchestrator
        .handle_input(&mut session, "Three times, once per condition")
        .await;
    let decision = outcome.decision.expect("turn decision");
    assert_eq!(decision.action, Action::AdvanceStep);
    assert_eq!(decision.reason, Reason::GuidingAnswered);
    assert_eq!(
        texts(&outcome.events),
        vec![
            "Exactly, three measurements per person.",
            "You answered the question correctly!",
            "Here is the sample answer to this question:\nThree times, once per lighting condition.",
            "Now let's think about this question:\nWhat does that mean for the independence of the observations?",
        ]
    );
    assert_eq!(session.pointer().step, 2);

    // Turn 2: no progress, instructions are requested
    let outcome = orchestrator.handle_input(&mut session, "I don't know").await;
    assert_eq!(
        outcome.decision.map(|d| d.action),
        Some(Action::ContinueQuestion)
    );
    assert_eq!(
        texts(&outcome.events),
        vec!["Not quite.", "Think about who produced the values."]
    );

    // Turn 3: main answer moves on to checkpoint 2
    let outcome = orchestrator
        .handle_input(&mut session, "The observations are dependent")
        .await;
    assert_eq!(
        outcome.decision.map(|d| d.action),
        Some(Action::AdvanceCheckpoint)
    );
    let summary_image = outcome
        .events
        .iter()
        .find_map(|e| match e {
            TutorEvent::Message(payload) if payload.side_panel => payload.image.clone(),
            _ => None,
        })
        .expect("solution image event");
    assert!(summary_image.ends_with("variance-partition.png"));
    assert!(texts(&outcome.events).contains(&"Let's continue with the next task."));
    assert_eq!(session.pointer().checkpoint, 2);
    assert_eq!(session.pointer().step, 1);
    assert_eq!(session.budget.checkpoint, 0);

    // Turn 4: navigation back to checkpoint 1 costs no generation
    let calls_before = backend.calls();
    let outcome = orchestrator.handle_input(&mut session, "/goto 1").await;
    assert!(outcome.decision.is_none());
    assert_eq!(outcome.events[0].text(), "Jumping to checkpoint 1.");
    assert_eq!(session.pointer().checkpoint, 1);
    assert_eq!(backend.calls(), calls_before);

    // Turn 5: out-of-range navigation is rejected without side effects
    let pointer = session.pointer();
    let transcript_len = session.transcript().len();
    let outcome = orchestrator.handle_input(&mut session, "/goto 3").await;
    assert_eq!(
        outcome.events,
        vec![TutorEvent::error("Checkpoint 3 does not exist. Available: 1-2")]
    );
    assert_eq!(session.pointer(), pointer);
    assert_eq!(session.transcript().len(), transcript_len);

    orchestrator.handle_input(&mut session, "/goto 2").await;

    // Turn 6: the last main answer completes the exercise
    let outcome = orchestrator
        .handle_input(&mut session, "Sphericity of the differences")
        .await;
    assert!(outcome.finished);
    assert_eq!(
        outcome.events.last(),
        Some(&TutorEvent::exercise_complete(
            "Great work! You have completed the repeated-measures ANOVA exercise."
        ))
    );
    assert!(session.is_finished());
    assert_eq!(backend.queued().await, 0);

    // Turn 7: a finished session no longer calls the backend
    let calls_before = backend.calls();
    let outcome = orchestrator.handle_input(&mut session, "anything else?").await;
    let decision = outcome.decision.expect("turn decision");
    assert_eq!(decision.action, Action::Finish);
    assert_eq!(decision.reason, Reason::AlreadyFinished);
    assert_eq!(backend.calls(), calls_before);

    let summary = session.summary();
    assert!(summary.exercise_complete);
    assert_eq!(summary.total_interactions, 5);
    assert_eq!(summary.tutor_mode, TutorMode::Instructional);
}

/// Two silent turns on a step exhaust its budget and reveal the answer.
#[tokio::test]
async fn test_step_budget_reveals_answer() {
    let (config, curriculum) = load_fixture();
    let backend = Arc::new(ScriptedBackend::with_replies(
        "scripted",
        [
            understanding(false, false),
            feedback("Keep going."),
            ScriptedReply::Value(json!({"instructions": "Count the columns."})),
            understanding(false, false),
            feedback("Still not there."),
        ],
    ));
    let orchestrator = orchestrator(&config, &[backend]);
    let mut session = TutorSession::new(curriculum, config.tutor_mode, config.budget);
    orchestrator.opening(&mut session);

    orchestrator.handle_input(&mut session, "hmm").await;
    let outcome = orchestrator.handle_input(&mut session, "no idea").await;

    let decision = outcome.decision.expect("turn decision");
    assert_eq!(decision.action, Action::AdvanceStep);
    assert_eq!(decision.reason, Reason::StepBudgetExhausted);
    assert!(texts(&outcome.events)
        .iter()
        .any(|t| t.contains("Three times, once per lighting condition.")));
    assert_eq!(session.pointer().step, 2);
    assert_eq!(session.budget.step, 0);
    assert_eq!(session.budget.checkpoint, 2);
}

/// A failing first model falls through to the second; when both fail the
/// turn still completes with default messages.
#[tokio::test]
async fn test_backend_failures_degrade_gracefully() {
    let (config, curriculum) = load_fixture();
    let primary = Arc::new(ScriptedBackend::with_replies(
        "primary",
        [
            ScriptedReply::Fail(GenerationErrorKind::RateLimit),
            ScriptedReply::Fail(GenerationErrorKind::Server),
        ],
    ));
    let secondary = Arc::new(ScriptedBackend::with_replies(
        "secondary",
        [understanding(false, true), feedback("Nicely reasoned.")],
    ));
    let orchestrator = orchestrator(&config, &[Arc::clone(&primary), Arc::clone(&secondary)]);
    let mut session = TutorSession::new(curriculum, config.tutor_mode, config.budget);
    orchestrator.opening(&mut session);

    let outcome = orchestrator.handle_input(&mut session, "three times").await;
    assert_eq!(outcome.events[0].text(), "Nicely reasoned.");
    assert_eq!(outcome.warnings.len(), 2);
    assert_eq!(session.pointer().step, 2);

    // Both candidates are now out of replies
    let outcome = orchestrator.handle_input(&mut session, "they depend").await;
    assert_eq!(
        outcome.decision.map(|d| d.action),
        Some(Action::ContinueQuestion)
    );
    assert_eq!(outcome.events.len(), 2);
    assert_eq!(outcome.warnings.len(), 6);
    assert!(!outcome.finished);
}
