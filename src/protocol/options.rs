//! Option TLV sub-codec.
//!
//! Each option is serialized as:
//!
//! ```text
//! ┌──────────┬──────────┬─────────┐
//! │ Number   │ Length   │ Value   │
//! │ 2 bytes  │ 2 bytes  │ N bytes │
//! │ u16 BE   │ u16 BE   │         │
//! └──────────┴──────────┴─────────┘
//! ```
//!
//! The length field is always recomputed from the value on encode, never
//! supplied independently. On decode, a declared length may not exceed the
//! remaining buffer.
//!
//! Known numbers form a closed but extensible registry; unknown numbers are
//! preserved opaquely so protocol evolution stays safe.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, ZestError};

/// Origin host of the request (number 3).
pub const OPTION_ORIGIN_HOST: u16 = 3;

/// Observe mode: data, audit or notification (number 6).
pub const OPTION_OBSERVE_MODE: u16 = 6;

/// Resource path addressed by the request (number 11).
pub const OPTION_URI_PATH: u16 = 11;

/// Content format of the payload, 16-bit big-endian (number 12).
pub const OPTION_CONTENT_FORMAT: u16 = 12;

/// Subscription inactivity budget in seconds, 32-bit big-endian (number 14).
pub const OPTION_TIMEOUT: u16 = 14;

/// Peer security key, echoed only in Observe/Notify handshake replies
/// (number 2048).
pub const OPTION_PUBLIC_KEY: u16 = 2048;

/// Size of the number + length prefix of a serialized option.
pub const OPTION_HEADER_SIZE: usize = 4;

/// A single TLV option attached to a frame.
///
/// Options keep their insertion order on the wire; order matters for the
/// byte layout, not for semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZestOption {
    /// Option number identifying the option's meaning.
    pub number: u16,
    /// Opaque value bytes. Numeric sub-fields are big-endian inside.
    pub value: Bytes,
}

impl ZestOption {
    /// Create an option from raw value bytes.
    pub fn new(number: u16, value: impl Into<Bytes>) -> Self {
        Self {
            number,
            value: value.into(),
        }
    }

    /// Create an option whose value is a 16-bit big-endian integer.
    pub fn from_u16(number: u16, value: u16) -> Self {
        Self {
            number,
            value: Bytes::copy_from_slice(&value.to_be_bytes()),
        }
    }

    /// Create an option whose value is a 32-bit big-endian integer.
    pub fn from_u32(number: u16, value: u32) -> Self {
        Self {
            number,
            value: Bytes::copy_from_slice(&value.to_be_bytes()),
        }
    }

    /// Read the value as a 16-bit big-endian integer.
    ///
    /// Returns `None` if the value is not exactly 2 bytes.
    pub fn value_as_u16(&self) -> Option<u16> {
        let bytes: [u8; 2] = self.value.as_ref().try_into().ok()?;
        Some(u16::from_be_bytes(bytes))
    }

    /// Read the value as a 32-bit big-endian integer.
    ///
    /// Returns `None` if the value is not exactly 4 bytes.
    pub fn value_as_u32(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.value.as_ref().try_into().ok()?;
        Some(u32::from_be_bytes(bytes))
    }

    /// Serialized size of this option (prefix + value).
    #[inline]
    pub fn encoded_len(&self) -> usize {
        OPTION_HEADER_SIZE + self.value.len()
    }

    /// Append the serialized option to `buf`.
    ///
    /// The length field is derived from the value. Fails with
    /// [`ZestError::MalformedFrame`] if the value exceeds 65535 bytes.
    pub fn encode_into(&self, buf: &mut BytesMut) -> Result<()> {
        let len = u16::try_from(self.value.len()).map_err(|_| {
            ZestError::MalformedFrame(format!(
                "option {} value is {} bytes, maximum is {}",
                self.number,
                self.value.len(),
                u16::MAX
            ))
        })?;

        buf.put_u16(self.number);
        buf.put_u16(len);
        buf.put_slice(&self.value);
        Ok(())
    }

    /// Decode one option from the front of `buf`, returning the option and
    /// the unconsumed remainder so the caller can iterate.
    ///
    /// Fails with [`ZestError::MalformedFrame`] if fewer than 4 bytes remain
    /// for the number + length prefix, or if the declared length would read
    /// past the end of the buffer.
    pub fn decode_one(buf: &[u8]) -> Result<(ZestOption, &[u8])> {
        if buf.len() < OPTION_HEADER_SIZE {
            return Err(ZestError::MalformedFrame(format!(
                "option prefix needs {} bytes, {} remain",
                OPTION_HEADER_SIZE,
                buf.len()
            )));
        }

        let number = u16::from_be_bytes([buf[0], buf[1]]);
        let len = u16::from_be_bytes([buf[2], buf[3]]) as usize;
        let rest = &buf[OPTION_HEADER_SIZE..];

        if rest.len() < len {
            return Err(ZestError::MalformedFrame(format!(
                "option {} declares {} value bytes, {} remain",
                number,
                len,
                rest.len()
            )));
        }

        let option = ZestOption {
            number,
            value: Bytes::copy_from_slice(&rest[..len]),
        };

        Ok((option, &rest[len..]))
    }
}
