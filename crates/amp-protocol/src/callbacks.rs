//! Callback traits standing in for the original library's function-pointer
//! + `void*` argument pairs. A boxed closure captures its own state instead
//! of the caller threading an opaque pointer through the engine.

use crate::engine::Engine;
use crate::request::{CallOutcome, Request};
use bytes::Bytes;
use std::io;

/// Accepts serialized outgoing bytes and transmits them, or fails.
///
/// Boxed as `Box<dyn WriteHandler>` inside [`Engine`]. Grounds
/// `amp_set_write_handler`'s function-pointer-plus-`void*` signature.
pub trait WriteHandler {
    fn write(&mut self, bytes: Bytes) -> io::Result<()>;
}

impl<F> WriteHandler for F
where
    F: FnMut(Bytes) -> io::Result<()>,
{
    fn write(&mut self, bytes: Bytes) -> io::Result<()> {
        self(bytes)
    }
}

/// Handles an incoming [`Request`] for a registered command name.
///
/// Grounds `amp_add_responder`'s function-pointer-plus-arg API.
pub trait Responder {
    fn handle(&mut self, engine: &mut Engine, request: Request);
}

impl<F> Responder for F
where
    F: FnMut(&mut Engine, Request),
{
    fn handle(&mut self, engine: &mut Engine, request: Request) {
        self(engine, request)
    }
}

/// Receives the eventual [`CallOutcome`] of a call issued via
/// [`Engine::call`](crate::engine::Engine::call).
///
/// Grounds `amp_callback_func`.
pub trait Completion {
    fn complete(&mut self, engine: &mut Engine, outcome: CallOutcome);
}

impl<F> Completion for F
where
    F: FnMut(&mut Engine, CallOutcome),
{
    fn complete(&mut self, engine: &mut Engine, outcome: CallOutcome) {
        self(engine, outcome)
    }
}
