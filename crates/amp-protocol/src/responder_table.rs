//! Responder registry: maps a command name to the handler registered for
//! it.
//!
//! Grounded on the responder-map half of `dispatch.c`
//! (`_amp_new_responder`/`_amp_put_responder`/`_amp_get_responder`/
//! `_amp_remove_responder`, a string-keyed table with a multiplicative
//! hash). Entries are `Rc<RefCell<dyn Responder>>` rather than a bare
//! `Box` so a responder can be invoked without holding a borrow of the
//! table itself — which is what lets a responder call `add_responder` or
//! `remove_responder` (even for its own command name) during its own
//! invocation without a borrow conflict.

use crate::callbacks::Responder;
use bytes::Bytes;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Default)]
pub struct Responders {
    entries: HashMap<Bytes, Rc<RefCell<dyn Responder>>>,
}

impl Responders {
    pub fn new() -> Self {
        Responders {
            entries: HashMap::new(),
        }
    }

    pub fn add(&mut self, name: impl Into<Bytes>, responder: impl Responder + 'static) {
        self.entries
            .insert(name.into(), Rc::new(RefCell::new(responder)));
    }

    /// Unregister the responder for `name`. Returns `true` if one was
    /// present.
    pub fn remove(&mut self, name: &[u8]) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Clone out a handle to the responder registered for `name`, if any.
    /// The handle can be invoked without borrowing `self`.
    pub fn lookup(&self, name: &[u8]) -> Option<Rc<RefCell<dyn Responder>>> {
        self.entries.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
