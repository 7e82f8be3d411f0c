//! # zest-client
//!
//! Async Rust client for the Zest binary request/response protocol, layered
//! over an encrypted, message-oriented transport (CurveZMQ).
//!
//! The client performs CRUD-like operations (create, read, delete) against
//! a remote resource addressed by a path, and supports two asynchronous
//! push patterns:
//!
//! - **Observe**: subscribe to ongoing updates of a resource, optionally
//!   filtered by mode (raw data, audit trail, or notifications).
//! - **Notify**: wait for out-of-band events delivered to a path-scoped
//!   mailbox.
//!
//! ## Architecture
//!
//! - **Primary channel** (request/reply): one secured socket owned by the
//!   client, one outstanding exchange at a time.
//! - **Push streams** (Observe/Notify): the handshake reply carries a
//!   routing identity and a peer key; each stream opens its own
//!   identity-bound secondary channel and delivers payloads through a
//!   cancellable sequence.
//!
//! ## Example
//!
//! ```ignore
//! use zest_client::{ClientConfig, ContentFormat, ObserveMode, ZestClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), zest_client::ZestError> {
//!     let client = ZestClient::connect(ClientConfig::new(
//!         "tcp://127.0.0.1:5555",
//!         "tcp://127.0.0.1:5556",
//!         "vl6wu0A@XP?}Or/&BR#LSxn>A+}L)p44/W[wXL3<",
//!     ))
//!     .await?;
//!
//!     let (mut updates, handle) = client
//!         .observe("", "/kv/foo", ContentFormat::Json, ObserveMode::Data, 0)
//!         .await?;
//!
//!     while let Some(payload) = updates.next().await {
//!         println!("{}", String::from_utf8_lossy(&payload));
//!     }
//!     handle.cancel();
//!     client.close().await
//! }
//! ```

pub mod codec;
pub mod error;
pub mod protocol;
pub mod stream;
pub mod transport;

mod client;
mod exchange;

pub use client::{ClientConfig, ZestClient};
pub use codec::ContentFormat;
pub use error::{Result, ZestError};
pub use stream::{ObserveMode, StreamHandle, Subscription};
