//! Incremental event filtering
//!
//! Turns a newest-first page into the events not yet shown, oldest first.

use tracing::{debug, warn};

use crate::stack::StackEvent;

/// Number of events shown on the first page by default
pub const DEFAULT_INITIAL_COUNT: usize = 5;
/// Bounds for the initial page size
pub const MIN_INITIAL_COUNT: usize = 1;
pub const MAX_INITIAL_COUNT: usize = 100;

/// The last rendered event
///
/// Unset until the first page arrives, never cleared afterwards.
#[derive(Debug, Default)]
pub struct EventCursor {
    last: Option<StackEvent>,
}

impl EventCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&StackEvent> {
        self.last.as_ref()
    }

    /// Consume a freshly fetched page and return the unseen events in display order
    ///
    /// A cursor that is missing from the page (scrolled off, or the stack was
    /// recreated) makes the whole page count as new. That can repeat lines
    /// already printed.
    pub fn advance(&mut self, mut page: Vec<StackEvent>, initial_count: usize) -> Vec<StackEvent> {
        match &self.last {
            None => {
                let count = initial_count.clamp(MIN_INITIAL_COUNT, MAX_INITIAL_COUNT);
                page.truncate(count);
            }
            Some(cursor) => match page.iter().position(|e| e.event_id == cursor.event_id) {
                Some(index) => page.truncate(index),
                None => {
                    warn!(
                        "Cursor {} not found in latest page, showing all {} events",
                        cursor.event_id,
                        page.len()
                    );
                }
            },
        }

        if let Some(newest) = page.first() {
            debug!("Cursor moved to {}", newest.event_id);
            self.last = Some(newest.clone());
        }

        page.reverse();
        page
    }
}
