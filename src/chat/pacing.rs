use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Conversational pauses, tuned to read like the bot is typing.
pub const IMAGE_RECEIVED_PAUSE: Duration = Duration::from_millis(1000);
pub const ACKNOWLEDGE_PAUSE: Duration = Duration::from_millis(700);
pub const START_WORK_PAUSE: Duration = Duration::from_millis(300);
pub const FORMAT_PROMPT_PAUSE: Duration = Duration::from_millis(800);
pub const RESULT_PAUSE: Duration = Duration::from_millis(600);
pub const OFFER_PAUSE: Duration = Duration::from_millis(800);

/// Injectable delay strategy so tests never depend on real time passing.
pub trait Pacing: Send + Sync {
    fn pause(&self, duration: Duration);
}

pub type SharedPacing = Arc<dyn Pacing>;

/// Production strategy: actually wait out the conversational pauses.
pub struct ConversationalPacing;

impl Pacing for ConversationalPacing {
    fn pause(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Zero-delay strategy for tests.
pub struct NoPacing;

impl Pacing for NoPacing {
    fn pause(&self, _duration: Duration) {}
}
