//! The synchronous protocol engine: ties the parser, serializer, call
//! table, and responder table together into the public surface described
//! by `amp.c`'s `AMP_Proto_T`.
//!
//! Single-threaded and non-reentrant by requirement, but reentrancy-safe by
//! construction — a responder or completion may call back into `call`,
//! `respond`, or `cancel` during its own invocation.

use crate::amp_box::AmpBox;
use crate::call_table::PendingCalls;
use crate::callbacks::{Completion, Responder, WriteHandler};
use crate::logging;
use crate::parser::{ParseOutcome, Parser};
use crate::request::{CallOutcome, ErrorReply, Request, Response};
use crate::responder_table::Responders;
use amp_core::constants::{
    ANSWER, ASK, COMMAND, ERROR, ERROR_CODE, ERROR_CODE_UNHANDLED, ERROR_DESCRIPTION,
};
use amp_core::error::{Error, Result};
use amp_core::Chunk;
use bytes::Bytes;
use tracing::{debug, trace};

/// One end of an AMP connection. Owns the parser state, the pending-call
/// and responder tables, the ask-id counter, and the write sink.
pub struct Engine {
    parser: Parser,
    write_handler: Option<Box<dyn WriteHandler>>,
    next_ask_id: u32,
    pending: PendingCalls,
    responders: Responders,
    fatal: bool,
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            parser: Parser::new(),
            write_handler: None,
            next_ask_id: 0,
            pending: PendingCalls::new(),
            responders: Responders::new(),
            fatal: false,
        }
    }

    /// Clear parser state and the fatal flag. The pending-call table,
    /// responder table, and write handler are left untouched.
    pub fn reset(&mut self) {
        self.parser.reset();
        self.fatal = false;
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    pub fn set_write_handler(&mut self, handler: impl WriteHandler + 'static) {
        self.write_handler = Some(Box::new(handler));
    }

    pub fn add_responder(&mut self, name: impl Into<Bytes>, responder: impl Responder + 'static) {
        self.responders.add(name, responder);
    }

    pub fn remove_responder(&mut self, name: &[u8]) -> bool {
        self.responders.remove(name)
    }

    pub fn pending_call_count(&self) -> usize {
        self.pending.len()
    }

    fn allocate_ask_id(&mut self) -> u32 {
        self.next_ask_id = self.next_ask_id.wrapping_add(1);
        self.next_ask_id
    }

    fn write(&mut self, bytes: Bytes) -> Result<()> {
        match self.write_handler.as_mut() {
            Some(handler) => handler.write(bytes).map_err(Error::WriteFailed),
            None => {
                logging::log("write() called with no write handler installed; bytes dropped");
                Ok(())
            }
        }
    }

    /// Feed bytes from the transport. May synchronously invoke any number
    /// of responder or completion callbacks, one per fully parsed box, in
    /// wire order.
    ///
    /// # Errors
    /// A malformed wire byte (e.g. a nonzero key-length high byte) poisons
    /// the engine: this and every subsequent call returns
    /// [`Error::ProtocolInFatalState`] until [`Engine::reset`] runs. A
    /// dispatch-local error (e.g. [`Error::RequiredKeyMissing`] on a box
    /// missing every reserved key) is returned but does not poison the
    /// engine, and any further boxes already present in `bytes` are still
    /// processed.
    pub fn consume(&mut self, bytes: &[u8]) -> Result<()> {
        if self.fatal {
            return Err(Error::ProtocolInFatalState);
        }

        let mut offset = 0;
        let mut last_local_error = None;

        while offset < bytes.len() {
            let (consumed, outcome) = match self.parser.feed(&bytes[offset..]) {
                Ok(r) => r,
                Err(e) => {
                    self.fatal = true;
                    return Err(e);
                }
            };
            offset += consumed;
            trace!(consumed, offset, "parser advanced");

            if outcome == ParseOutcome::BoxReady {
                let box_ = self.parser.take_box();
                if let Err(e) = self.dispatch(box_) {
                    debug!(error = %e, "dispatch error");
                    logging::log(&format!("dispatch error: {e}"));
                    last_local_error = Some(e);
                }
            }
        }

        match last_local_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn dispatch(&mut self, box_: AmpBox) -> Result<()> {
        if box_.num_keys() == 0 {
            return Err(Error::BoxEmpty);
        }

        if box_.has_key(COMMAND.as_bytes()) {
            return self.dispatch_command(box_);
        }
        if box_.has_key(ANSWER.as_bytes()) {
            return self.dispatch_answer(box_);
        }
        if box_.has_key(ERROR.as_bytes()) {
            return self.dispatch_error(box_);
        }
        Err(Error::RequiredKeyMissing)
    }

    fn dispatch_command(&mut self, box_: AmpBox) -> Result<()> {
        let request = Request::from_box(box_)?;
        let command_bytes = request.command.as_bytes().to_vec();

        match self.responders.lookup(&command_bytes) {
            Some(handler) => {
                handler.borrow_mut().handle(self, request);
                Ok(())
            }
            None => match request.ask_key.clone() {
                Some(ask_key) => self.send_unhandled_command_error(&request.command, &ask_key),
                None => {
                    logging::log(&format!(
                        "dropping unhandled command with no ask-id: {:?}",
                        request.command
                    ));
                    Ok(())
                }
            },
        }
    }

    fn send_unhandled_command_error(&mut self, command: &Chunk, ask_key: &Chunk) -> Result<()> {
        let description = format!(
            "Unhandled Command: '{}'",
            String::from_utf8_lossy(command.as_bytes())
        );

        let mut box_ = AmpBox::new();
        box_.put_bytes(Bytes::copy_from_slice(ERROR.as_bytes()), Bytes::copy_from_slice(ask_key.as_bytes()))?;
        box_.put_bytes(
            Bytes::copy_from_slice(ERROR_CODE.as_bytes()),
            Bytes::from_static(ERROR_CODE_UNHANDLED.as_bytes()),
        )?;
        box_.put_bytes(
            Bytes::copy_from_slice(ERROR_DESCRIPTION.as_bytes()),
            Bytes::from(description.into_bytes()),
        )?;

        let bytes = box_.serialize()?;
        self.write(bytes)
    }

    fn dispatch_answer(&mut self, box_: AmpBox) -> Result<()> {
        let response = Response::from_box(box_)?;
        match self.pending.remove(response.ask_id) {
            Some(mut completion) => {
                completion.complete(self, CallOutcome::Success(response));
                Ok(())
            }
            None => {
                logging::log(&format!(
                    "dropping unmatched answer for ask-id {}",
                    response.ask_id
                ));
                Ok(())
            }
        }
    }

    fn dispatch_error(&mut self, box_: AmpBox) -> Result<()> {
        let reply = ErrorReply::from_box(box_)?;
        match self.pending.remove(reply.ask_id) {
            Some(mut completion) => {
                completion.complete(self, CallOutcome::Error(reply));
                Ok(())
            }
            None => {
                logging::log(&format!(
                    "dropping unmatched error for ask-id {}",
                    reply.ask_id
                ));
                Ok(())
            }
        }
    }

    /// Issue a call expecting a reply. Injects `_command` and a
    /// decimal-encoded `_ask` into `args`, registers `completion` in the
    /// pending table, then serializes and writes. If any step after the
    /// table insertion fails, the registration is rolled back so a failed
    /// call never leaves a dangling pending entry.
    pub fn call(
        &mut self,
        command: &str,
        mut args: AmpBox,
        completion: impl Completion + 'static,
    ) -> Result<u32> {
        args.put_bytes(
            Bytes::copy_from_slice(COMMAND.as_bytes()),
            Bytes::copy_from_slice(command.as_bytes()),
        )?;

        let ask_id = self.allocate_ask_id();
        self.pending.insert(ask_id, Box::new(completion));

        if let Err(e) = args.put_bytes(
            Bytes::copy_from_slice(ASK.as_bytes()),
            Bytes::from(ask_id.to_string().into_bytes()),
        ) {
            self.pending.remove(ask_id);
            return Err(e);
        }

        let bytes = match args.serialize() {
            Ok(b) => b,
            Err(e) => {
                self.pending.remove(ask_id);
                return Err(e);
            }
        };

        if let Err(e) = self.write(bytes) {
            self.pending.remove(ask_id);
            return Err(e);
        }

        Ok(ask_id)
    }

    /// Fire-and-forget call: injects `_command`, removes any stale `_ask`
    /// key the caller may have left in `args`, and writes without
    /// registering a completion.
    pub fn call_no_answer(&mut self, command: &str, mut args: AmpBox) -> Result<()> {
        args.put_bytes(
            Bytes::copy_from_slice(COMMAND.as_bytes()),
            Bytes::copy_from_slice(command.as_bytes()),
        )?;
        args.del_key(ASK.as_bytes());

        let bytes = args.serialize()?;
        self.write(bytes)
    }

    /// Synchronously deliver [`CallOutcome::Cancelled`] to the completion
    /// registered for `ask_id` and remove it from the pending table.
    /// Sends nothing on the wire; a late-arriving answer or error for this
    /// id will be dropped by dispatch.
    pub fn cancel(&mut self, ask_id: u32) -> Result<()> {
        match self.pending.remove(ask_id) {
            Some(mut completion) => {
                completion.complete(self, CallOutcome::Cancelled);
                Ok(())
            }
            None => Err(Error::NoSuchAskKey),
        }
    }

    /// Reply to `request` with a successful `_answer`, echoing its ask-key
    /// bytes verbatim.
    pub fn respond(&mut self, request: &Request, mut args: AmpBox) -> Result<()> {
        let ask_key = request.ask_key.as_ref().ok_or(Error::RequiredKeyMissing)?;
        args.put_bytes(
            Bytes::copy_from_slice(ANSWER.as_bytes()),
            Bytes::copy_from_slice(ask_key.as_bytes()),
        )?;

        let bytes = args.serialize()?;
        self.write(bytes)
    }

    /// Reply to `request` with an `_error`, echoing its ask-key bytes
    /// verbatim alongside the machine-readable `code` and human-readable
    /// `description`.
    pub fn respond_error(&mut self, request: &Request, code: &str, description: &str) -> Result<()> {
        let ask_key = request.ask_key.as_ref().ok_or(Error::RequiredKeyMissing)?;

        let mut box_ = AmpBox::new();
        box_.put_bytes(Bytes::copy_from_slice(ERROR.as_bytes()), Bytes::copy_from_slice(ask_key.as_bytes()))?;
        box_.put_bytes(
            Bytes::copy_from_slice(ERROR_CODE.as_bytes()),
            Bytes::copy_from_slice(code.as_bytes()),
        )?;
        box_.put_bytes(
            Bytes::copy_from_slice(ERROR_DESCRIPTION.as_bytes()),
            Bytes::copy_from_slice(description.as_bytes()),
        )?;

        let bytes = box_.serialize()?;
        self.write(bytes)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn wire_sink() -> (Rc<RefCell<Vec<u8>>>, impl FnMut(Bytes) -> std::io::Result<()>) {
        let buf = Rc::new(RefCell::new(Vec::new()));
        let sink = buf.clone();
        (buf, move |bytes: Bytes| {
            sink.borrow_mut().extend_from_slice(&bytes);
            Ok(())
        })
    }

    #[test]
    fn ask_id_allocation_preincrements_and_wraps() {
        let mut engine = Engine::new();
        assert_eq!(engine.allocate_ask_id(), 1);
        assert_eq!(engine.allocate_ask_id(), 2);

        engine.next_ask_id = u32::MAX - 1;
        assert_eq!(engine.allocate_ask_id(), u32::MAX);
        assert_eq!(engine.allocate_ask_id(), 0);
    }

    #[test]
    fn call_no_answer_does_not_register_completion() {
        let mut engine = Engine::new();
        let (_, sink) = wire_sink();
        engine.set_write_handler(sink);

        let mut args = AmpBox::new();
        codecs::put_int(&mut args, "a", 5).unwrap();
        engine.call_no_answer("Ping", args).unwrap();

        assert_eq!(engine.pending_call_count(), 0);
    }

    #[test]
    fn call_registers_and_rolls_back_pending_entry_on_failure() {
        let mut engine = Engine::new();
        // no write handler installed; call still succeeds (write() no-ops)
        let mut args = AmpBox::new();
        codecs::put_int(&mut args, "a", 5).unwrap();
        let ask_id = engine.call("Sum", args, |_: &mut Engine, _| {}).unwrap();
        assert_eq!(ask_id, 1);
        assert_eq!(engine.pending_call_count(), 1);
    }

    #[test]
    fn cancel_delivers_cancelled_and_removes_entry() {
        let mut engine = Engine::new();
        let received = Rc::new(RefCell::new(None));
        let sink = received.clone();

        let args = AmpBox::new();
        let ask_id = engine
            .call("Slow", args, move |_: &mut Engine, outcome: CallOutcome| {
                *sink.borrow_mut() = Some(format!("{outcome:?}"));
            })
            .unwrap();

        engine.cancel(ask_id).unwrap();
        assert_eq!(engine.pending_call_count(), 0);
        assert!(received.borrow().as_ref().unwrap().contains("Cancelled"));
    }

    #[test]
    fn cancel_missing_ask_id_is_no_such_ask_key() {
        let mut engine = Engine::new();
        assert_eq!(engine.cancel(12345), Err(Error::NoSuchAskKey));
    }

    #[test]
    fn round_trip_answer_scenario() {
        let (a_out, a_sink) = wire_sink();
        let (b_out, b_sink) = wire_sink();

        let mut engine_a = Engine::new();
        engine_a.set_write_handler(a_sink);
        let mut engine_b = Engine::new();
        engine_b.set_write_handler(b_sink);

        engine_b.add_responder("Sum", |engine: &mut Engine, request: Request| {
            let a = codecs::get_int(&request.args, "a").unwrap();
            let b = codecs::get_int(&request.args, "b").unwrap();
            let mut reply = AmpBox::new();
            codecs::put_int(&mut reply, "total", a + b).unwrap();
            engine.respond(&request, reply).unwrap();
        });

        let received_total = Rc::new(RefCell::new(None));
        let sink = received_total.clone();

        let mut args = AmpBox::new();
        codecs::put_int(&mut args, "a", 5).unwrap();
        codecs::put_int(&mut args, "b", 7).unwrap();
        engine_a
            .call("Sum", args, move |_: &mut Engine, outcome: CallOutcome| {
                if let CallOutcome::Success(response) = outcome {
                    *sink.borrow_mut() = Some(codecs::get_int(&response.args, "total").unwrap());
                }
            })
            .unwrap();

        let wire_to_b = a_out.borrow().clone();
        engine_b.consume(&wire_to_b).unwrap();

        let wire_to_a = b_out.borrow().clone();
        engine_a.consume(&wire_to_a).unwrap();

        assert_eq!(*received_total.borrow(), Some(12));
    }

    #[test]
    fn unhandled_command_scenario() {
        let (a_out, a_sink) = wire_sink();
        let (b_out, b_sink) = wire_sink();

        let mut engine_a = Engine::new();
        engine_a.set_write_handler(a_sink);
        let mut engine_b = Engine::new();
        engine_b.set_write_handler(b_sink);

        let received = Rc::new(RefCell::new(None));
        let sink = received.clone();

        engine_a
            .call(
                "NopeCommand",
                AmpBox::new(),
                move |_: &mut Engine, outcome: CallOutcome| {
                    *sink.borrow_mut() = Some(outcome);
                },
            )
            .unwrap();

        let wire_to_b = a_out.borrow().clone();
        engine_b.consume(&wire_to_b).unwrap();

        let wire_to_a = b_out.borrow().clone();
        engine_a.consume(&wire_to_a).unwrap();

        match received.borrow().as_ref().unwrap() {
            CallOutcome::Error(reply) => {
                assert_eq!(reply.error_code.as_ref().unwrap().as_bytes(), b"UNHANDLED");
                assert_eq!(
                    reply.error_description.as_ref().unwrap().as_bytes(),
                    b"Unhandled Command: 'NopeCommand'"
                );
            }
            other => panic!("expected Error outcome, got {other:?}"),
        }
    }

    #[test]
    fn byte_at_a_time_fragmentation_dispatches_boxes_in_order() {
        let mut engine_b = Engine::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let sink = order.clone();
        engine_b.add_responder("First", move |_: &mut Engine, _: Request| {
            sink.borrow_mut().push("First");
        });
        let sink = order.clone();
        engine_b.add_responder("Second", move |_: &mut Engine, _: Request| {
            sink.borrow_mut().push("Second");
        });

        let mut engine_a = Engine::new();
        let (a_out, a_sink) = wire_sink();
        engine_a.set_write_handler(a_sink);

        engine_a.call_no_answer("First", AmpBox::new()).unwrap();
        engine_a.call_no_answer("Second", AmpBox::new()).unwrap();

        let wire = a_out.borrow().clone();
        for byte in &wire {
            engine_b.consume(std::slice::from_ref(byte)).unwrap();
        }

        assert_eq!(*order.borrow(), vec!["First", "Second"]);
    }

    #[test]
    fn invalid_wire_byte_poisons_engine_until_reset() {
        let mut engine = Engine::new();
        assert_eq!(engine.consume(&[0x04, 0x07]), Err(Error::BadKeySize));
        assert!(engine.is_fatal());
        assert_eq!(engine.consume(&[0x00, 0x00]), Err(Error::ProtocolInFatalState));

        engine.reset();
        assert!(!engine.is_fatal());
    }

    #[test]
    fn required_key_missing_does_not_poison_engine() {
        let mut engine = Engine::new();
        let mut box_ = AmpBox::new();
        box_.put_bytes(Bytes::from_static(b"not_special"), Bytes::from_static(b"x"))
            .unwrap();
        let wire = box_.serialize().unwrap();

        assert_eq!(engine.consume(&wire), Err(Error::RequiredKeyMissing));
        assert!(!engine.is_fatal());

        // engine is still usable afterwards
        engine.add_responder("Ping", |_: &mut Engine, _: Request| {});
        let mut args = AmpBox::new();
        codecs::put_bool(&mut args, "x", true).unwrap();
        engine.call_no_answer("Ping", args).unwrap();
    }

    #[test]
    fn unmatched_answer_is_dropped_without_error() {
        let mut engine = Engine::new();
        let mut box_ = AmpBox::new();
        codecs::put_uint(&mut box_, ANSWER, 999).unwrap();
        let wire = box_.serialize().unwrap();

        assert!(engine.consume(&wire).is_ok());
        assert!(!engine.is_fatal());
    }

    #[test]
    fn wrap_around_ask_id_scenario() {
        let mut engine = Engine::new();
        engine.next_ask_id = u32::MAX - 1;

        let first = engine.call("A", AmpBox::new(), |_: &mut Engine, _| {}).unwrap();
        let second = engine.call("B", AmpBox::new(), |_: &mut Engine, _| {}).unwrap();

        assert_eq!(first, u32::MAX);
        assert_eq!(second, 0);
        assert!(engine.pending_call_count() == 2);
    }
}
