//! A single process-wide, nullable logging sink.
//!
//! Grounds `log.c`'s `amp_log_handler_func`/`amp_set_log_handler`/`amp_log`:
//! one global callback, invoked with a formatted message, no levels, no
//! structured fields. This is deliberately narrower than — and independent
//! of — the `tracing` instrumentation the rest of this crate emits on its
//! hot paths; `tracing` is for crate maintainers running with a subscriber
//! installed, this is the protocol-level callback the wire spec describes.

use std::sync::{OnceLock, RwLock};

type Handler = Box<dyn Fn(&str) + Send + Sync + 'static>;

static LOG_HANDLER: OnceLock<RwLock<Option<Handler>>> = OnceLock::new();

fn slot() -> &'static RwLock<Option<Handler>> {
    LOG_HANDLER.get_or_init(|| RwLock::new(None))
}

/// Install the process-wide log handler, replacing any previous one.
pub fn set_log_handler(handler: impl Fn(&str) + Send + Sync + 'static) {
    *slot().write().expect("log handler lock poisoned") = Some(Box::new(handler));
}

/// Remove the process-wide log handler, if any.
pub fn clear_log_handler() {
    *slot().write().expect("log handler lock poisoned") = None;
}

/// Invoke the installed handler with `message`, if one is installed.
pub fn log(message: &str) {
    if let Some(handler) = slot().read().expect("log handler lock poisoned").as_ref() {
        handler(message);
    }
}

/// A handler that writes to stderr, mirroring `amp_stderr_logger`.
pub fn stderr_logger(message: &str) {
    eprintln!("{message}");
}
