use serde::Serialize;
use tracing::debug;

use crate::chat::events::{ActionChoice, PresentationEvent};
use crate::chat::pacing::{self, SharedPacing};
use crate::chat::resolver::{self, ImageReference};
use crate::transform::{
    SharedBackgroundRemover, SharedImageReformatter, TargetFormat, TransformError, TransformResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    AwaitingAction,
    AwaitingFormat,
    Processing,
}

impl SessionPhase {
    pub fn can_transition_to(self, next: Self) -> bool {
        use SessionPhase::{AwaitingAction, AwaitingFormat, Idle, Processing};

        matches!(
            (self, next),
            (Idle, AwaitingAction)
                | (AwaitingAction, Processing)
                | (AwaitingAction, AwaitingFormat)
                | (AwaitingFormat, Processing)
                | (Processing, Idle)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingAction => "awaiting_action",
            Self::AwaitingFormat => "awaiting_format",
            Self::Processing => "processing",
        }
    }
}

/// A discrete user action. Every command is validated against the current
/// phase before any side effect; commands arriving outside the phase that
/// issued their prompt are dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    SubmitUpload { file_name: String, bytes: Vec<u8> },
    SubmitUrl { url: String },
    ChooseAction(ActionChoice),
    ChooseFormat(TargetFormat),
}

/// The single live conversation. Owns the one pending image reference and is
/// the only mutator of the session phase; each `handle` call runs its full
/// validate → transition → collaborator → settle sequence before returning,
/// so no two collaborator calls are ever outstanding.
pub struct ChatSession {
    phase: SessionPhase,
    pending: Option<ImageReference>,
    remover: SharedBackgroundRemover,
    reformatter: SharedImageReformatter,
    pacing: SharedPacing,
}

impl ChatSession {
    pub fn new(
        remover: SharedBackgroundRemover,
        reformatter: SharedImageReformatter,
        pacing: SharedPacing,
    ) -> Self {
        Self {
            phase: SessionPhase::Idle,
            pending: None,
            remover,
            reformatter,
            pacing,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn pending_stem(&self) -> Option<&str> {
        self.pending
            .as_ref()
            .map(|reference| reference.display_stem.as_str())
    }

    pub fn handle(&mut self, command: SessionCommand) -> Vec<PresentationEvent> {
        match command {
            SessionCommand::SubmitUpload { file_name, bytes } => {
                self.handle_upload(file_name.as_str(), bytes)
            }
            SessionCommand::SubmitUrl { url } => self.handle_url(url.as_str()),
            SessionCommand::ChooseAction(choice) => self.handle_action(choice),
            SessionCommand::ChooseFormat(format) => self.handle_format(format),
        }
    }

    fn handle_upload(&mut self, file_name: &str, bytes: Vec<u8>) -> Vec<PresentationEvent> {
        if self.phase != SessionPhase::Idle {
            debug!(phase = self.phase.as_str(), "ignoring upload while busy");
            return Vec::new();
        }
        self.accept(resolver::resolve_upload(file_name, bytes))
    }

    fn handle_url(&mut self, url: &str) -> Vec<PresentationEvent> {
        if self.phase != SessionPhase::Idle {
            debug!(phase = self.phase.as_str(), "ignoring submission while busy");
            return Vec::new();
        }
        match resolver::resolve_url(url) {
            Ok(reference) => self.accept(reference),
            // Validation failures never transition the session.
            Err(error) => vec![PresentationEvent::message(error.to_string())],
        }
    }

    fn accept(&mut self, reference: ImageReference) -> Vec<PresentationEvent> {
        let stem = reference.display_stem.clone();
        self.pending = Some(reference);
        self.advance(SessionPhase::AwaitingAction);

        let mut events = vec![PresentationEvent::TypingIndicator];
        self.pacing.pause(pacing::IMAGE_RECEIVED_PAUSE);
        events.push(PresentationEvent::message(format!(
            "Nice! I've got {stem}. What would you like me to do?"
        )));
        events.push(PresentationEvent::action_prompt());
        events
    }

    fn handle_action(&mut self, choice: ActionChoice) -> Vec<PresentationEvent> {
        if self.phase != SessionPhase::AwaitingAction {
            debug!(
                phase = self.phase.as_str(),
                choice = choice.as_str(),
                "ignoring stale action choice"
            );
            return Vec::new();
        }
        match choice {
            ActionChoice::RemoveBackground => self.run_remove_background(),
            ActionChoice::ConvertFormat => self.prompt_for_format(),
        }
    }

    fn run_remove_background(&mut self) -> Vec<PresentationEvent> {
        self.advance(SessionPhase::Processing);
        let mut events = vec![PresentationEvent::TypingIndicator];
        self.pacing.pause(pacing::ACKNOWLEDGE_PAUSE);
        events.push(PresentationEvent::message(
            "On it! Removing the background now…",
        ));
        self.pacing.pause(pacing::START_WORK_PAUSE);

        let Some(reference) = self.pending.as_ref() else {
            // The transition table keeps a reference pending outside Idle.
            self.advance(SessionPhase::Idle);
            return events;
        };
        let outcome = self.remover.remove_background(reference);
        self.settle(
            outcome,
            "Done! Here's your image with the background removed:",
            "Hmm, something went wrong: ",
            &mut events,
        );
        events
    }

    fn prompt_for_format(&mut self) -> Vec<PresentationEvent> {
        self.advance(SessionPhase::AwaitingFormat);
        let mut events = vec![PresentationEvent::TypingIndicator];
        self.pacing.pause(pacing::FORMAT_PROMPT_PAUSE);
        events.push(PresentationEvent::message("Sure! Which format do you want?"));
        events.push(PresentationEvent::format_prompt());
        events
    }

    fn handle_format(&mut self, format: TargetFormat) -> Vec<PresentationEvent> {
        if self.phase != SessionPhase::AwaitingFormat {
            debug!(
                phase = self.phase.as_str(),
                format = format.token(),
                "ignoring stale format choice"
            );
            return Vec::new();
        }

        self.advance(SessionPhase::Processing);
        let upper = format.token().to_ascii_uppercase();
        let mut events = vec![PresentationEvent::TypingIndicator];
        self.pacing.pause(pacing::RESULT_PAUSE);
        events.push(PresentationEvent::message(format!("Converting to {upper}…")));

        let Some(reference) = self.pending.as_ref() else {
            self.advance(SessionPhase::Idle);
            return events;
        };
        let outcome = self.reformatter.reformat(reference, format);
        self.settle(
            outcome,
            format!("Converted! Here's your {upper} file:").as_str(),
            "Uh oh: ",
            &mut events,
        );
        events
    }

    fn settle(
        &mut self,
        outcome: Result<TransformResult, TransformError>,
        success_text: &str,
        failure_prefix: &str,
        events: &mut Vec<PresentationEvent>,
    ) {
        match outcome {
            Ok(result) => {
                events.push(PresentationEvent::TypingIndicator);
                self.pacing.pause(pacing::RESULT_PAUSE);
                events.push(PresentationEvent::message(success_text));
                events.push(PresentationEvent::transform_ready(result));
            }
            Err(error) => {
                debug!(stage = error.stage().as_str(), "transform failed");
                events.push(PresentationEvent::message(format!(
                    "{failure_prefix}{error}"
                )));
            }
        }

        // Success or failure, the attempt is over: release the reference and
        // go back to accepting images.
        self.pending = None;
        self.advance(SessionPhase::Idle);
        self.pacing.pause(pacing::OFFER_PAUSE);
        events.push(PresentationEvent::message(
            "Got another image to edit? Drop it in!",
        ));
    }

    fn advance(&mut self, next: SessionPhase) {
        if !self.phase.can_transition_to(next) {
            debug!(
                from = self.phase.as_str(),
                to = next.as_str(),
                "refusing illegal session transition"
            );
            return;
        }
        debug!(from = self.phase.as_str(), to = next.as_str(), "session transition");
        self.phase = next;
    }
}
