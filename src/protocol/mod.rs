//! Protocol layer: wire format, options and reply classification.
//!
//! Pure functions over byte buffers. No I/O, no concurrency.

mod options;
mod status;
mod wire_format;

pub use options::{
    ZestOption, OPTION_CONTENT_FORMAT, OPTION_HEADER_SIZE, OPTION_OBSERVE_MODE,
    OPTION_ORIGIN_HOST, OPTION_PUBLIC_KEY, OPTION_TIMEOUT, OPTION_URI_PATH,
};
pub use status::Status;
pub use wire_format::{code, Header, FIXED_HEADER_SIZE};
