//! Event tailing: incremental filtering, termination policy, pacing and the poll loop

pub mod filter;
pub mod pacer;
pub mod policy;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use filter::{EventCursor, DEFAULT_INITIAL_COUNT, MAX_INITIAL_COUNT, MIN_INITIAL_COUNT};
pub use pacer::{PollPacer, PollTiming, MIN_POLL_DELAY, TARGET_POLL_INTERVAL};
pub use policy::TailMode;
pub use session::{CycleDecision, TailConfig, TailOutcome, TailSession, TailSummary};
