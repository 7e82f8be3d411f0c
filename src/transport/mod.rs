//! Transport boundary.
//!
//! The secure transport is consumed, never reimplemented: this module only
//! defines the interface the rest of the library programs against, plus the
//! production CurveZMQ backend in [`curve`].
//!
//! Two channel shapes exist:
//!
//! - [`RequestChannel`]: connection-oriented request/reply. Exactly one
//!   outstanding request at a time; callers serialize access.
//! - [`PushChannel`]: identity-addressed asynchronous delivery. Many
//!   independent instances may exist concurrently, each with its own
//!   identity and socket.
//!
//! A [`Transport`] opens channels, generating a fresh local key pair per
//! channel and authenticating against the peer's public key.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

mod curve;

pub use curve::CurveTransport;

/// A connection-oriented, encrypted request/reply channel.
#[async_trait]
pub trait RequestChannel: Send + 'static {
    /// Transmit one request frame.
    async fn send(&mut self, frame: Bytes) -> Result<()>;

    /// Wait for the next inbound frame.
    ///
    /// Returns [`ZestError::Timeout`](crate::ZestError::Timeout) if nothing
    /// arrives within `timeout`.
    async fn recv(&mut self, timeout: Duration) -> Result<Bytes>;

    /// Release the underlying socket. Idempotent.
    async fn close(&mut self) -> Result<()>;
}

/// An identity-addressed, encrypted push channel.
#[async_trait]
pub trait PushChannel: Send + 'static {
    /// Wait for the next inbound frame.
    ///
    /// Returns [`ZestError::Timeout`](crate::ZestError::Timeout) if nothing
    /// arrives within `timeout`; for push channels a timeout is not
    /// terminal, idle subscriptions are normal.
    async fn recv(&mut self, timeout: Duration) -> Result<Bytes>;

    /// Release the underlying socket. Idempotent.
    async fn close(&mut self) -> Result<()>;
}

/// Factory for channels against one remote service.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// The request/reply channel type this transport produces.
    type Request: RequestChannel;
    /// The push channel type this transport produces.
    type Push: PushChannel;

    /// Open a request/reply channel to `endpoint`, authenticated against
    /// the peer's public key with a fresh local key pair.
    async fn connect_request(&self, endpoint: &str, server_key: &str) -> Result<Self::Request>;

    /// Open a push channel to `endpoint` bound to `identity`, authenticated
    /// against `server_key` with a fresh local key pair.
    async fn connect_push(
        &self,
        endpoint: &str,
        server_key: &str,
        identity: Bytes,
    ) -> Result<Self::Push>;
}
