//! Client facade and configuration.
//!
//! [`ZestClient`] composes the protocol codec, the exchange engine and the
//! push stream subsystem into the five public operations: create, read,
//! delete, observe and notify. It exclusively owns the primary
//! request/reply channel; each push stream owns its own secondary channel,
//! independent of the primary and of each other.
//!
//! # Example
//!
//! ```ignore
//! use zest_client::{ClientConfig, ContentFormat, ZestClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), zest_client::ZestError> {
//!     let config = ClientConfig::new(
//!         "tcp://127.0.0.1:5555",
//!         "tcp://127.0.0.1:5556",
//!         "vl6wu0A@XP?}Or/&BR#LSxn>A+}L)p44/W[wXL3<",
//!     );
//!     let client = ZestClient::connect(config).await?;
//!
//!     client
//!         .create("", "/kv/foo", &br#"{"name":"dave","age":30}"#[..], ContentFormat::Json)
//!         .await?;
//!     let value = client.read("", "/kv/foo", ContentFormat::Json).await?;
//!     println!("{}", String::from_utf8_lossy(&value));
//!
//!     client.close().await
//! }
//! ```

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::codec::ContentFormat;
use crate::error::{Result, ZestError};
use crate::exchange::{Exchange, RECV_TIMEOUT, REPLY_WINDOW};
use crate::protocol::{
    code, Header, Status, ZestOption, OPTION_CONTENT_FORMAT, OPTION_OBSERVE_MODE,
    OPTION_ORIGIN_HOST, OPTION_TIMEOUT, OPTION_URI_PATH,
};
use crate::stream::{self, ObserveMode, PushStreamSpec, StreamHandle, Subscription};
use crate::transport::{CurveTransport, Transport};

/// Configuration consumed by the facade.
///
/// All diagnostic state is explicit here; there is no process-wide toggle
/// or hostname cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Request/reply endpoint address.
    pub request_endpoint: String,
    /// Push endpoint address for Observe/Notify secondary channels.
    pub push_endpoint: String,
    /// Public key identifying the remote service.
    pub server_key: String,
    /// Origin host attached to every request (option 3).
    pub origin_host: String,
    /// Socket-level receive timeout on every channel.
    pub recv_timeout: Duration,
    /// Outer bound on the reply wait of one exchange.
    pub reply_window: Duration,
    /// Trace frames as hex dumps at debug level.
    pub log_frames: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_endpoint: "tcp://127.0.0.1:5555".to_string(),
            push_endpoint: "tcp://127.0.0.1:5556".to_string(),
            server_key: String::new(),
            origin_host: default_origin_host(),
            recv_timeout: RECV_TIMEOUT,
            reply_window: REPLY_WINDOW,
            log_frames: false,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with the given endpoints and server key.
    pub fn new(
        request_endpoint: impl Into<String>,
        push_endpoint: impl Into<String>,
        server_key: impl Into<String>,
    ) -> Self {
        Self {
            request_endpoint: request_endpoint.into(),
            push_endpoint: push_endpoint.into(),
            server_key: server_key.into(),
            ..Self::default()
        }
    }

    /// Set the origin host attached to every request.
    pub fn origin_host(mut self, host: impl Into<String>) -> Self {
        self.origin_host = host.into();
        self
    }

    /// Enable or disable hex frame dumps.
    pub fn log_frames(mut self, enabled: bool) -> Self {
        self.log_frames = enabled;
        self
    }

    /// Override the socket receive timeout.
    pub fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Override the reply window of one exchange.
    pub fn reply_window(mut self, window: Duration) -> Self {
        self.reply_window = window;
        self
    }
}

fn default_origin_host() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ZestError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// A connected Zest client.
///
/// Cheap operations run over the shared primary channel, serialized so
/// concurrent calls never interleave on the wire. Observe/Notify return a
/// live [`Subscription`] and [`StreamHandle`] immediately after the
/// handshake; their streams run independently of this client's channel.
pub struct ZestClient<T: Transport = CurveTransport> {
    transport: T,
    exchange: Exchange<T::Request>,
    config: ClientConfig,
}

impl ZestClient<CurveTransport> {
    /// Connect over the production CurveZMQ transport.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        Self::connect_with(CurveTransport::new(), config).await
    }
}

impl<T: Transport> ZestClient<T> {
    /// Connect over a caller-provided transport.
    pub async fn connect_with(transport: T, config: ClientConfig) -> Result<Self> {
        let channel = transport
            .connect_request(&config.request_endpoint, &config.server_key)
            .await?;
        let exchange = Exchange::new(
            channel,
            config.recv_timeout,
            config.reply_window,
            config.log_frames,
        );
        Ok(Self {
            transport,
            exchange,
            config,
        })
    }

    /// Create (or update) the resource at `path` with `payload`.
    ///
    /// Returns the reply payload once the server confirms creation.
    pub async fn create(
        &self,
        token: &str,
        path: &str,
        payload: impl Into<Bytes>,
        format: ContentFormat,
    ) -> Result<Bytes> {
        validate_path(path)?;
        tracing::debug!(path, %format, "create");

        let request = self
            .request(code::POST, token, path, format)
            .with_payload(payload);
        let reply = self.expect(Status::Created, &request).await?;
        Ok(reply.payload)
    }

    /// Read the resource at `path`.
    pub async fn read(&self, token: &str, path: &str, format: ContentFormat) -> Result<Bytes> {
        validate_path(path)?;
        tracing::debug!(path, %format, "read");

        let request = self.request(code::GET, token, path, format);
        let reply = self.expect(Status::Content, &request).await?;
        Ok(reply.payload)
    }

    /// Delete the resource at `path`.
    pub async fn delete(&self, token: &str, path: &str, format: ContentFormat) -> Result<()> {
        validate_path(path)?;
        tracing::debug!(path, %format, "delete");

        let request = self.request(code::DELETE, token, path, format);
        self.expect(Status::Deleted, &request).await?;
        Ok(())
    }

    /// Subscribe to ongoing updates of the resource at `path`.
    ///
    /// `timeout_secs` is the server-side inactivity budget; 0 means the
    /// server default. The routing identity of the stream is minted by the
    /// server and carried in the handshake reply payload.
    pub async fn observe(
        &self,
        token: &str,
        path: &str,
        format: ContentFormat,
        mode: ObserveMode,
        timeout_secs: u32,
    ) -> Result<(Subscription, StreamHandle)> {
        validate_path(path)?;
        tracing::debug!(path, %format, %mode, "observe");

        let mut request = Header::new(code::GET).with_token(token.as_bytes().to_vec());
        request.push_option(ZestOption::new(OPTION_URI_PATH, path.as_bytes().to_vec()));
        request.push_option(ZestOption::new(
            OPTION_ORIGIN_HOST,
            self.config.origin_host.as_bytes().to_vec(),
        ));
        request.push_option(ZestOption::new(OPTION_OBSERVE_MODE, mode.wire_value()));
        request.push_option(ZestOption::from_u16(
            OPTION_CONTENT_FORMAT,
            format.wire_value(),
        ));
        request.push_option(ZestOption::from_u32(OPTION_TIMEOUT, timeout_secs));

        let reply = self.expect(Status::Content, &request).await?;
        let spec = PushStreamSpec::for_observe(&reply)?;
        self.open_stream(spec).await
    }

    /// Wait for out-of-band events delivered to the mailbox at `path`.
    ///
    /// Unlike Observe, the stream's routing identity is the path itself.
    pub async fn notify(
        &self,
        token: &str,
        path: &str,
        format: ContentFormat,
        timeout_secs: u32,
    ) -> Result<(Subscription, StreamHandle)> {
        validate_path(path)?;
        tracing::debug!(path, %format, "notify");

        let mut request = Header::new(code::GET).with_token(token.as_bytes().to_vec());
        request.push_option(ZestOption::new(OPTION_URI_PATH, path.as_bytes().to_vec()));
        request.push_option(ZestOption::new(
            OPTION_ORIGIN_HOST,
            self.config.origin_host.as_bytes().to_vec(),
        ));
        request.push_option(ZestOption::from_u16(
            OPTION_CONTENT_FORMAT,
            format.wire_value(),
        ));
        request.push_option(ZestOption::from_u32(OPTION_TIMEOUT, timeout_secs));

        let reply = self.expect(Status::Content, &request).await?;
        let spec = PushStreamSpec::for_notify(&reply, path)?;
        self.open_stream(spec).await
    }

    /// Release the primary channel.
    ///
    /// Call this once you are done with the client; not doing so leaks the
    /// underlying transport connection. Active push streams are unaffected.
    pub async fn close(self) -> Result<()> {
        self.exchange.close().await
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build a plain request with the {path, origin-host, content-format}
    /// option set shared by create/read/delete.
    fn request(&self, code: u8, token: &str, path: &str, format: ContentFormat) -> Header {
        let mut request = Header::new(code).with_token(token.as_bytes().to_vec());
        request.push_option(ZestOption::new(OPTION_URI_PATH, path.as_bytes().to_vec()));
        request.push_option(ZestOption::new(
            OPTION_ORIGIN_HOST,
            self.config.origin_host.as_bytes().to_vec(),
        ));
        request.push_option(ZestOption::from_u16(
            OPTION_CONTENT_FORMAT,
            format.wire_value(),
        ));
        request
    }

    /// Run one exchange and require a specific success status.
    async fn expect(&self, wanted: Status, request: &Header) -> Result<Header> {
        let (status, reply) = self.exchange.round_trip(request).await?;
        if status != wanted {
            return Err(ZestError::Protocol { code: reply.code });
        }
        Ok(reply)
    }

    async fn open_stream(
        &self,
        spec: PushStreamSpec,
    ) -> Result<(Subscription, StreamHandle)> {
        let channel = self
            .transport
            .connect_push(&self.config.push_endpoint, &spec.server_key, spec.identity)
            .await?;
        Ok(stream::spawn_stream(
            channel,
            self.config.recv_timeout,
            self.config.log_frames,
        ))
    }
}
