//! The AMP box model, wire codec, and synchronous protocol engine built on
//! top of `amp-core`'s leaf types.

pub mod amp_box;
pub mod call_table;
pub mod callbacks;
pub mod codecs;
pub mod engine;
pub mod logging;
pub mod parser;
pub mod request;
pub mod responder_table;

pub use amp_box::AmpBox;
pub use callbacks::{Completion, Responder, WriteHandler};
pub use engine::Engine;
pub use parser::{ParseOutcome, Parser};
pub use request::{CallOutcome, ErrorReply, Request, Response};
