//! Pending-call table: maps an allocated ask-id to the completion waiting
//! on its eventual answer, error, or cancellation.
//!
//! Grounded on the callback-map half of `dispatch.c`
//! (`_amp_new_callback`/`_amp_put_callback`/`_amp_pop_callback`). The
//! original keys this table by the raw ask-id with an identity hash; a
//! plain `HashMap<u32, _>` gives the same semantics without the hand-rolled
//! table.

use crate::callbacks::Completion;
use std::collections::HashMap;

#[derive(Default)]
pub struct PendingCalls {
    entries: HashMap<u32, Box<dyn Completion>>,
}

impl PendingCalls {
    pub fn new() -> Self {
        PendingCalls {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, ask_id: u32, completion: Box<dyn Completion>) {
        self.entries.insert(ask_id, completion);
    }

    /// Remove and return the completion registered for `ask_id`, if any.
    pub fn remove(&mut self, ask_id: u32) -> Option<Box<dyn Completion>> {
        self.entries.remove(&ask_id)
    }

    pub fn contains(&self, ask_id: u32) -> bool {
        self.entries.contains_key(&ask_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
