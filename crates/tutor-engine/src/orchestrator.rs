//! Turn orchestration.
//!
//! For every learner message the [`TurnOrchestrator`] runs a fixed
//! pipeline: record the input, count the turn, assess understanding, give
//! feedback, decide the transition, then emit whatever content the
//! transition calls for. Only the instructions call is conditional.
//!
//! Generation failures never surface here; the gateway hands back defaults.
//! Structural problems (a bad `/goto` target) become `error` events and
//! leave the session untouched.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::backend::ChatCompletionsBackend;
use crate::config::Config;
use crate::decision::{decide, Action, Decision, TransitionInputs};
use crate::error::{Result, TutorError};
use crate::events::TutorEvent;
use crate::gateway::{GatewayOutcome, GenerationGateway};
use crate::generation::{Feedback, Instructions, Understanding};
use crate::session::{Role, TutorSession};

/// Matches anything starting with `/goto` and captures the rest.
static GOTO_COMMAND: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?s)^/goto(.*)$").ok());

const GOTO_USAGE: &str = "Usage: /goto <checkpoint_number>";

/// Everything one turn produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Events for the learner, in order.
    pub events: Vec<TutorEvent>,
    /// The transition taken, `None` for commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    /// Generation failures recovered from during the turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Whether the exercise is complete after this turn.
    pub finished: bool,
}

/// Runs learner turns against sessions.
#[derive(Debug, Clone)]
pub struct TurnOrchestrator {
    gateway: GenerationGateway,
    history_window: usize,
}

impl TurnOrchestrator {
    /// Creates an orchestrator using `gateway` for all generation calls.
    #[must_use]
    pub const fn new(gateway: GenerationGateway, history_window: usize) -> Self {
        Self {
            gateway,
            history_window,
        }
    }

    /// Creates an orchestrator backed by the configured chat completions models.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let candidates = ChatCompletionsBackend::candidates(&config.generation);
        let gateway = GenerationGateway::new(candidates, config.generation.timeout());
        Self::new(gateway, config.history_window)
    }

    /// The gateway in use.
    #[must_use]
    pub const fn gateway(&self) -> &GenerationGateway {
        &self.gateway
    }

    /// Produces the opening of a fresh session.
    ///
    /// Greets the learner, shows the curriculum's opening message, the first
    /// main question and issues the first guiding question. Call once per
    /// session, before the first turn.
    pub fn opening(&self, session: &mut TutorSession) -> Vec<TutorEvent> {
        let mut events = vec![TutorEvent::message(format!(
            "Hello! I am your tutor for today.\n\n{}\n\nWe will go through a few questions \
             that help you understand the concept. I will give you feedback and guidance so \
             you can work through the tasks yourself. Good luck!",
            session.curriculum().first_message
        ))];

        if let Err(e) = present_checkpoint(session, &mut events) {
            tracing::warn!(session_id = %session.id(), error = %e, "Could not open session");
            events.push(TutorEvent::error(e.to_string()));
        }

        record_events(session, &events);
        events
    }

    /// Handles one learner message.
    pub async fn handle_input(&self, session: &mut TutorSession, input: &str) -> TurnOutcome {
        let input = input.trim();

        if let Some(captures) = GOTO_COMMAND.as_ref().and_then(|re| re.captures(input)) {
            let rest = captures.get(1).map_or("", |m| m.as_str());
            return navigate(session, input, rest);
        }

        self.run_turn(session, input).await
    }

    async fn run_turn(&self, session: &mut TutorSession, input: &str) -> TurnOutcome {
        // The window covers earlier entries only; the input travels as `learner_input`.
        let request = session.generation_request(input, self.history_window);
        session.record(Role::Learner, input);
        session.budget.increment();

        tracing::info!(
            session_id = %session.id(),
            turn = session.budget.total,
            checkpoint = session.progression.current_checkpoint(),
            step = session.progression.current_step(),
            "Turn started"
        );

        let mut events = Vec::new();
        let mut warnings = Vec::new();

        let mut request = match request {
            Ok(request) => request,
            Err(e) => return rejected(session, &e),
        };
        let finished = session.is_finished();

        let understanding: GatewayOutcome<Understanding> =
            self.gateway.invoke(&request, finished).await;
        collect_warnings(&mut warnings, &understanding);
        session.understanding = understanding.value;
        tracing::debug!(
            session_id = %session.id(),
            main_answered = session.understanding.main_question_answered,
            guiding_answered = session.understanding.guiding_question_answered,
            confidence = session.understanding.confidence_score,
            concepts = ?session.understanding.identified_concepts,
            misconceptions = ?session.understanding.misconceptions,
            reasoning = %session.understanding.reasoning,
            "Understanding assessed"
        );

        request.understanding = session.understanding.clone();
        let feedback: GatewayOutcome<Feedback> = self.gateway.invoke(&request, finished).await;
        collect_warnings(&mut warnings, &feedback);
        tracing::debug!(
            session_id = %session.id(),
            reasoning = %feedback.value.reasoning,
            "Feedback generated"
        );
        events.push(TutorEvent::message(feedback.value.feedback));

        let decision = decide(&TransitionInputs::gather(
            &session.understanding,
            &session.budget,
            &session.progression,
        ));
        tracing::info!(
            session_id = %session.id(),
            action = ?decision.action,
            reason = ?decision.reason,
            "Transition decided"
        );

        let transition = match decision.action {
            Action::AdvanceCheckpoint => advance_checkpoint(session, &mut events),
            Action::AdvanceStep => advance_step(session, &mut events),
            Action::ContinueQuestion => {
                let instructions: GatewayOutcome<Instructions> =
                    self.gateway.invoke(&request, finished).await;
                collect_warnings(&mut warnings, &instructions);
                tracing::debug!(
                    session_id = %session.id(),
                    kind = ?instructions.value.instruction_type,
                    follow_ups = instructions.value.follow_up_questions.len(),
                    "Instructions generated"
                );
                events.push(TutorEvent::message(instructions.value.instructions));
                Ok(())
            }
            Action::Finish => {
                finish(session, &mut events);
                Ok(())
            }
        };

        if let Err(e) = transition {
            tracing::warn!(session_id = %session.id(), error = %e, "Transition failed");
            events.push(TutorEvent::error(e.to_string()));
        }

        record_events(session, &events);

        TurnOutcome {
            events,
            decision: Some(decision),
            warnings,
            finished: session.is_finished(),
        }
    }
}

fn collect_warnings<T>(warnings: &mut Vec<String>, outcome: &GatewayOutcome<T>) {
    warnings.extend(outcome.failures.iter().map(ToString::to_string));
}

fn rejected(session: &TutorSession, err: &TutorError) -> TurnOutcome {
    TurnOutcome {
        events: vec![TutorEvent::error(err.to_string())],
        decision: None,
        warnings: Vec::new(),
        finished: session.is_finished(),
    }
}

fn record_events(session: &mut TutorSession, events: &[TutorEvent]) {
    for event in events {
        session.record(Role::Tutor, event.text());
    }
}

/// Handles `/goto`. Rejections leave the session untouched.
///
/// `rest` is whatever followed the command; only whitespace and a
/// checkpoint number are accepted.
fn navigate(session: &mut TutorSession, input: &str, rest: &str) -> TurnOutcome {
    let target = rest
        .strip_prefix(char::is_whitespace)
        .and_then(|argument| argument.trim().parse::<usize>().ok());
    let Some(target) = target else {
        return TurnOutcome {
            events: vec![TutorEvent::error(GOTO_USAGE)],
            decision: None,
            warnings: Vec::new(),
            finished: session.is_finished(),
        };
    };

    if let Err(e) = session.progression.jump_to_checkpoint(target) {
        tracing::debug!(session_id = %session.id(), target, "Rejected navigation");
        return rejected(session, &e);
    }

    session.budget.reset_checkpoint();
    session.understanding = Understanding::default();
    session.record(Role::Learner, input);
    tracing::info!(session_id = %session.id(), checkpoint = target, "Jumped to checkpoint");

    let mut events = vec![TutorEvent::message(format!(
        "Jumping to checkpoint {target}."
    ))];
    if let Err(e) = present_checkpoint(session, &mut events) {
        events.push(TutorEvent::error(e.to_string()));
    }
    record_events(session, &events);

    TurnOutcome {
        events,
        decision: None,
        warnings: Vec::new(),
        finished: session.is_finished(),
    }
}

/// Shows the current main question and issues the first step.
fn present_checkpoint(session: &mut TutorSession, events: &mut Vec<TutorEvent>) -> Result<()> {
    events.push(TutorEvent::message(format!(
        "The main question is:\n{}",
        session.progression.main_question()?
    )));
    issue_next_step(session, events)
}

/// Moves to the next step and shows its guiding question, or the main
/// question again once the steps are exhausted.
fn issue_next_step(session: &mut TutorSession, events: &mut Vec<TutorEvent>) -> Result<()> {
    session.progression.advance_step();
    session.budget.reset_step();
    session.understanding.guiding_question_answered = false;

    let progression = &session.progression;
    if let Some(question) = progression.guiding_question()? {
        let lead = if progression.current_step() == 1 {
            "Let's first think about this question:"
        } else {
            "Now let's think about this question:"
        };
        events.push(TutorEvent::with_side_image(
            format!("{lead}\n{question}"),
            progression.step_image()?,
        ));
    } else {
        events.push(TutorEvent::message(format!(
            "Let's get back to the main question:\n{}",
            progression.main_question()?
        )));
    }
    Ok(())
}

fn advance_checkpoint(session: &mut TutorSession, events: &mut Vec<TutorEvent>) -> Result<()> {
    if session.understanding.main_question_answered {
        events.push(TutorEvent::message(
            "You answered the **main question** correctly!",
        ));
    }
    if let Some(image) = session.progression.checkpoint_solution_image()? {
        events.push(TutorEvent::with_side_image(
            "Here you see a summary of the solution.",
            Some(image),
        ));
    }
    events.push(TutorEvent::message(format!(
        "Here is the sample answer to the main question:\n{}",
        session.progression.main_answer()?
    )));

    session.progression.advance_checkpoint();
    session.understanding = Understanding::default();
    session.budget.reset_checkpoint();

    if session.is_finished() {
        events.push(TutorEvent::exercise_complete(
            session.curriculum().end_message.clone(),
        ));
        return Ok(());
    }

    events.push(TutorEvent::message("Let's continue with the next task."));
    present_checkpoint(session, events)
}

fn advance_step(session: &mut TutorSession, events: &mut Vec<TutorEvent>) -> Result<()> {
    if session.understanding.guiding_question_answered {
        events.push(TutorEvent::message("You answered the question correctly!"));
    }
    if let Some(answer) = session.progression.guiding_answer()? {
        events.push(TutorEvent::message(format!(
            "Here is the sample answer to this question:\n{answer}"
        )));
    }
    issue_next_step(session, events)
}

fn finish(session: &mut TutorSession, events: &mut Vec<TutorEvent>) {
    if !session.is_finished() {
        session.progression.advance_checkpoint();
    }
    events.push(TutorEvent::exercise_complete(
        session.curriculum().end_message.clone(),
    ));
}
