//! Termination policy for the tail loop

use crate::stack::StackEvent;

/// How long to keep polling, fixed for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TailMode {
    /// One fetch, one render, done
    #[default]
    SingleShot,
    /// Poll until the stack itself reports a completed or failed status
    UntilStackComplete,
    /// Poll forever
    Follow,
}

impl TailMode {
    /// `follow` takes precedence over `die_on_completion`
    pub fn from_flags(follow: bool, die_on_completion: bool) -> Self {
        if follow {
            TailMode::Follow
        } else if die_on_completion {
            TailMode::UntilStackComplete
        } else {
            TailMode::SingleShot
        }
    }

    /// Decide, after a render, whether another poll should happen
    pub fn should_continue(&self, stack_name: &str, cursor: Option<&StackEvent>) -> bool {
        match self {
            TailMode::Follow => true,
            TailMode::SingleShot => false,
            TailMode::UntilStackComplete => {
                !cursor.is_some_and(|event| event.is_stack_event(stack_name) && event.is_settled())
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TailMode::SingleShot => "single-shot",
            TailMode::UntilStackComplete => "until-complete",
            TailMode::Follow => "follow",
        }
    }
}
