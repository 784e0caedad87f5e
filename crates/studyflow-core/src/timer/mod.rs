mod engine;
pub mod fanout;

pub use engine::{
    discard_orphan, elapsed, snapshot, start, stop, ActiveSession, SessionMode, StopRequest,
    TimerState,
};
pub use fanout::{post_text, Completion, StoppedSession};
