//! Wire format encoding and decoding.
//!
//! A frame is one complete serialized header + options + payload unit:
//!
//! ```text
//! ┌───────┬──────────────┬──────────────┬───────────┬─────────┬─────────┐
//! │ Code  │ Option count │ Token length │ Token     │ Options │ Payload │
//! │ 1 byte│ 1 byte       │ u16 BE       │ tkl bytes │ TLV...  │ rest    │
//! └───────┴──────────────┴──────────────┴───────────┴─────────┴─────────┘
//! ```
//!
//! All multi-byte integers are big-endian. Historical revisions of the
//! protocol disagreed on whether the token length is byte-swapped before
//! packing; this codec uses plain big-endian in both directions.
//!
//! The payload carries no length prefix: it is whatever remains of the
//! frame after the declared options have been consumed.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, ZestError};
use crate::protocol::options::ZestOption;

/// Size of the fixed prefix: code, option count, token length.
pub const FIXED_HEADER_SIZE: usize = 4;

/// Request codes carried in the code byte.
pub mod code {
    /// Read a resource (also used for the Observe/Notify handshake).
    pub const GET: u8 = 1;
    /// Create a resource.
    pub const POST: u8 = 2;
    /// Delete a resource.
    pub const DELETE: u8 = 4;
}

/// Decoded header of one request or response frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    /// Operation code on a request, status code on a response.
    pub code: u8,
    /// Caller-supplied opaque access credential.
    pub token: Bytes,
    /// Options in wire order.
    pub options: Vec<ZestOption>,
    /// Resource representation or event data.
    pub payload: Bytes,
}

impl Header {
    /// Create a header with the given code and no token, options or payload.
    pub fn new(code: u8) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }

    /// Set the token.
    pub fn with_token(mut self, token: impl Into<Bytes>) -> Self {
        self.token = token.into();
        self
    }

    /// Set the payload.
    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Append an option, preserving insertion order on the wire.
    pub fn push_option(&mut self, option: ZestOption) {
        self.options.push(option);
    }

    /// First option with the given number, if any.
    pub fn option(&self, number: u16) -> Option<&ZestOption> {
        self.options.iter().find(|o| o.number == number)
    }

    /// Encode the header into a frame.
    ///
    /// Deterministic: the same header always produces the same bytes.
    /// Fails with [`ZestError::MalformedFrame`] only when an internal
    /// precondition is violated: more than 255 options, a token longer than
    /// 65535 bytes, or an option value longer than 65535 bytes.
    pub fn encode(&self) -> Result<Bytes> {
        let option_count = u8::try_from(self.options.len()).map_err(|_| {
            ZestError::MalformedFrame(format!(
                "{} options exceed the maximum of {}",
                self.options.len(),
                u8::MAX
            ))
        })?;
        let token_length = u16::try_from(self.token.len()).map_err(|_| {
            ZestError::MalformedFrame(format!(
                "token is {} bytes, maximum is {}",
                self.token.len(),
                u16::MAX
            ))
        })?;

        let options_len: usize = self.options.iter().map(ZestOption::encoded_len).sum();
        let mut buf = BytesMut::with_capacity(
            FIXED_HEADER_SIZE + self.token.len() + options_len + self.payload.len(),
        );

        buf.put_u8(self.code);
        buf.put_u8(option_count);
        buf.put_u16(token_length);
        buf.put_slice(&self.token);
        for option in &self.options {
            option.encode_into(&mut buf)?;
        }
        buf.put_slice(&self.payload);

        Ok(buf.freeze())
    }

    /// Decode a frame back into a header.
    ///
    /// Fails with [`ZestError::MalformedFrame`] when fewer than
    /// [`FIXED_HEADER_SIZE`] bytes are present, when the declared token
    /// length exceeds the remaining bytes, or when any option's declared
    /// length would read past the end of the buffer. Never guesses and
    /// never indexes out of bounds.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        if frame.len() < FIXED_HEADER_SIZE {
            return Err(ZestError::MalformedFrame(format!(
                "frame is {} bytes, fixed header needs {}",
                frame.len(),
                FIXED_HEADER_SIZE
            )));
        }

        let code = frame[0];
        let option_count = frame[1] as usize;
        let token_length = u16::from_be_bytes([frame[2], frame[3]]) as usize;
        let mut rest = &frame[FIXED_HEADER_SIZE..];

        if rest.len() < token_length {
            return Err(ZestError::MalformedFrame(format!(
                "token declares {} bytes, {} remain",
                token_length,
                rest.len()
            )));
        }
        let token = Bytes::copy_from_slice(&rest[..token_length]);
        rest = &rest[token_length..];

        let mut options = Vec::with_capacity(option_count);
        for _ in 0..option_count {
            let (option, remainder) = ZestOption::decode_one(rest)?;
            options.push(option);
            rest = remainder;
        }

        Ok(Self {
            code,
            token,
            options,
            payload: Bytes::copy_from_slice(rest),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::options::{
        OPTION_CONTENT_FORMAT, OPTION_ORIGIN_HOST, OPTION_URI_PATH,
    };

    fn sample_request() -> Header {
        let mut header = Header::new(code::POST)
            .with_token(&b"secret"[..])
            .with_payload(&br#"{"name":"dave","age":30}"#[..]);
        header.push_option(ZestOption::new(OPTION_URI_PATH, &b"/kv/foo"[..]));
        header.push_option(ZestOption::new(OPTION_ORIGIN_HOST, &b"host-a"[..]));
        header.push_option(ZestOption::from_u16(OPTION_CONTENT_FORMAT, 50));
        header
    }

    #[test]
    fn test_roundtrip() {
        let original = sample_request();
        let frame = original.encode().unwrap();
        let decoded = Header::decode(&frame).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_roundtrip_empty_header() {
        let original = Header::new(code::GET);
        let frame = original.encode().unwrap();
        assert_eq!(frame.len(), FIXED_HEADER_SIZE);

        let decoded = Header::decode(&frame).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_roundtrip_binary_payload_and_token() {
        // Length-prefixed fields recover arbitrary binary content, including
        // bytes that look like option prefixes.
        let mut original = Header::new(code::POST)
            .with_token(vec![0x00, 0xFF, 0x00, 0x10])
            .with_payload(vec![0x00, 0x0B, 0x00, 0x02, 0xAB]);
        original.push_option(ZestOption::new(2048, vec![0u8; 40]));

        let frame = original.encode().unwrap();
        assert_eq!(Header::decode(&frame).unwrap(), original);
    }

    #[test]
    fn test_wire_layout() {
        let mut header = Header::new(1).with_token(&b"tk"[..]);
        header.push_option(ZestOption::new(11, &b"/a"[..]));
        let frame = header.with_payload(&b"pp"[..]).encode().unwrap();

        assert_eq!(frame[0], 1); // code
        assert_eq!(frame[1], 1); // option count
        assert_eq!(&frame[2..4], &[0x00, 0x02]); // token length, BE
        assert_eq!(&frame[4..6], b"tk"); // token
        assert_eq!(&frame[6..8], &[0x00, 0x0B]); // option number, BE
        assert_eq!(&frame[8..10], &[0x00, 0x02]); // option length, BE
        assert_eq!(&frame[10..12], b"/a"); // option value
        assert_eq!(&frame[12..], b"pp"); // payload, no length prefix
    }

    #[test]
    fn test_decode_short_buffers_fail() {
        for len in 0..FIXED_HEADER_SIZE {
            let buf = vec![0xFFu8; len];
            let result = Header::decode(&buf);
            assert!(
                matches!(result, Err(ZestError::MalformedFrame(_))),
                "{len}-byte buffer must fail"
            );
        }
    }

    #[test]
    fn test_decode_token_length_exceeds_buffer() {
        // Declares a 16-byte token but carries only 2 bytes after the prefix.
        let buf = [69, 0, 0x00, 0x10, 0xAA, 0xBB];
        assert!(matches!(
            Header::decode(&buf),
            Err(ZestError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_decode_option_count_exceeds_buffer() {
        // Declares one option but no option bytes follow the token.
        let buf = [69, 1, 0x00, 0x00];
        assert!(matches!(
            Header::decode(&buf),
            Err(ZestError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_decode_truncated_option_value() {
        let mut header = Header::new(69);
        header.push_option(ZestOption::new(11, &b"/kv/foo"[..]));
        let frame = header.encode().unwrap();

        // Drop the last value byte; the declared length now overruns.
        let truncated = &frame[..frame.len() - 1];
        assert!(matches!(
            Header::decode(truncated),
            Err(ZestError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_payload_is_rest_of_message() {
        let header = Header::new(69).with_payload(&b"trailing payload bytes"[..]);
        let frame = header.encode().unwrap();

        let decoded = Header::decode(&frame).unwrap();
        assert_eq!(&decoded.payload[..], b"trailing payload bytes");
    }

    #[test]
    fn test_encode_too_many_options_fails() {
        let mut header = Header::new(code::GET);
        for i in 0..256u16 {
            header.push_option(ZestOption::new(i, Bytes::new()));
        }
        assert!(matches!(
            header.encode(),
            Err(ZestError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_encode_oversized_token_fails() {
        let header = Header::new(code::GET).with_token(vec![0u8; u16::MAX as usize + 1]);
        assert!(matches!(
            header.encode(),
            Err(ZestError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_option_lookup_returns_first_match() {
        let mut header = Header::new(69);
        header.push_option(ZestOption::new(11, &b"first"[..]));
        header.push_option(ZestOption::new(11, &b"second"[..]));

        assert_eq!(&header.option(11).unwrap().value[..], b"first");
        assert!(header.option(12).is_none());
    }

    #[test]
    fn test_encode_is_deterministic() {
        let header = sample_request();
        assert_eq!(header.encode().unwrap(), header.encode().unwrap());
    }
}
