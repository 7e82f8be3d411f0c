//! Codec module - payload representation metadata.
//!
//! Payloads themselves are opaque [`bytes::Bytes`]; the library only carries
//! their declared representation on the wire. [`ContentFormat`] is the closed
//! enumeration of representations the protocol knows about.

mod format;

pub use format::ContentFormat;
