//! Common test utilities shared across `amp-protocol`'s integration tests.

use amp_protocol::amp_box::AmpBox;
use bytes::Bytes;
use std::cell::RefCell;
use std::io;
use std::rc::Rc;

/// Build a box from a list of raw `(key, value)` byte pairs.
pub fn box_with(pairs: &[(&[u8], &[u8])]) -> AmpBox {
    let mut box_ = AmpBox::new();
    for (key, value) in pairs {
        box_
            .put_bytes(Bytes::copy_from_slice(key), Bytes::copy_from_slice(value))
            .unwrap();
    }
    box_
}

/// Serialize a list of `(key, value)` pairs directly to wire bytes, without
/// going through an `Engine` — useful for feeding hand-built boxes straight
/// into a `Parser` or `Engine::consume`.
pub fn serialize_pairs(pairs: &[(&[u8], &[u8])]) -> Bytes {
    box_with(pairs).serialize().unwrap()
}

/// A `WriteHandler`-compatible closure that appends every write to a shared
/// buffer, plus a handle to read it back. Mirrors the pattern `engine.rs`'s
/// own unit tests use, made reusable across every integration test file.
pub fn wire_sink() -> (Rc<RefCell<Vec<u8>>>, impl FnMut(Bytes) -> io::Result<()>) {
    let buf = Rc::new(RefCell::new(Vec::new()));
    let sink = buf.clone();
    (buf, move |bytes: Bytes| {
        sink.borrow_mut().extend_from_slice(&bytes);
        Ok(())
    })
}

/// Split `bytes` into fragments of alternating sizes 1, 2, 3, 1, 2, 3, ...
/// to exercise arbitrary byte-boundary fragmentation without the degenerate
/// "every boundary is the same size" case.
pub fn uneven_chunks(bytes: &[u8]) -> Vec<&[u8]> {
    let mut chunks = Vec::new();
    let mut offset = 0;
    let mut size = 1;
    while offset < bytes.len() {
        let take = size.min(bytes.len() - offset);
        chunks.push(&bytes[offset..offset + take]);
        offset += take;
        size = if size == 3 { 1 } else { size + 1 };
    }
    chunks
}
