//! WebSocket transport over `tokio-tungstenite`.
//!
//! The transport is a single task owning the socket. Commands arrive on the
//! command channel; everything that happens on the wire is reported on the
//! event channel. There is no automatic reconnection: a dropped connection
//! stays down until the operator asks for a restart.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use sioscope_core::{
    TransportCommand, TransportConfig, TransportEndpoint, TransportEvent, TransportHandle,
    transport_channel,
};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Failure to establish a connection.
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    #[error("invalid header {name}: {reason}")]
    Header { name: String, reason: String },

    #[error("connect failed: {0}")]
    Connect(#[from] tungstenite::Error),

    #[error("connect timed out after {0}s")]
    Timeout(u64),
}

/// Spawns the transport task and returns the console-side handle.
///
/// The task connects immediately and reports `Connected` or `Error`.
pub fn spawn_transport(config: TransportConfig) -> (TransportHandle, JoinHandle<()>) {
    let (handle, endpoint) = transport_channel();
    let task = tokio::spawn(run(config, endpoint));
    (handle, task)
}

async fn run(config: TransportConfig, endpoint: TransportEndpoint) {
    let TransportEndpoint {
        mut commands,
        events,
    } = endpoint;
    let mut session = Session {
        config,
        events,
        sink: None,
        source: None,
    };

    session.connect().await;

    loop {
        if session.events.is_closed() {
            debug!("Console gone, stopping transport");
            break;
        }

        tokio::select! {
            command = commands.recv() => match command {
                Some(TransportCommand::Send(payload)) => session.send(payload).await,
                Some(TransportCommand::Restart) => session.restart().await,
                Some(TransportCommand::Shutdown) | None => {
                    session.close().await;
                    break;
                }
            },
            frame = next_frame(&mut session.source) => session.on_frame(frame),
        }
    }

    info!("Transport stopped");
}

struct Session {
    config: TransportConfig,
    events: tokio::sync::mpsc::UnboundedSender<TransportEvent>,
    sink: Option<WsSink>,
    source: Option<WsSource>,
}

impl Session {
    fn emit(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            debug!("Transport event dropped, console closed");
        }
    }

    async fn connect(&mut self) {
        match open(&self.config).await {
            Ok(stream) => {
                info!(url = %self.config.url, "WebSocket connected");
                self.install(stream);
                self.emit(TransportEvent::Connected);
            }
            Err(error) => {
                warn!(url = %self.config.url, error = %error, "WebSocket connect failed");
                self.emit(TransportEvent::Error(error.to_string()));
            }
        }
    }

    fn install(&mut self, stream: WsStream) {
        let (sink, source) = stream.split();
        self.sink = Some(sink);
        self.source = Some(source);
    }

    async fn close(&mut self) {
        self.source = None;
        if let Some(mut sink) = self.sink.take() {
            if let Err(error) = sink.close().await {
                debug!(error = %error, "Close handshake failed");
            }
        }
    }

    async fn send(&mut self, payload: Value) {
        let Some(sink) = self.sink.as_mut() else {
            self.emit(TransportEvent::SendFailed {
                payload,
                error: "not connected".to_string(),
            });
            return;
        };

        let frame = Message::Text(payload.to_string().into());
        let secs = self.config.send_timeout_secs;
        let result = if secs == 0 {
            sink.send(frame).await.map_err(|e| e.to_string())
        } else {
            match tokio::time::timeout(Duration::from_secs(secs), sink.send(frame)).await {
                Ok(sent) => sent.map_err(|e| e.to_string()),
                Err(_) => Err(format!("timed out after {secs}s")),
            }
        };

        match result {
            Ok(()) => {
                debug!(payload = %payload, "Frame sent");
                self.emit(TransportEvent::SendCompleted(payload));
            }
            Err(error) => {
                warn!(error = %error, "Send failed");
                self.emit(TransportEvent::SendFailed { payload, error });
            }
        }
    }

    async fn restart(&mut self) {
        let was_connected = self.sink.is_some();
        self.close().await;
        if was_connected {
            self.emit(TransportEvent::Disconnected);
        }

        match open(&self.config).await {
            Ok(stream) => {
                info!(url = %self.config.url, "WebSocket reconnected");
                self.install(stream);
                self.emit(TransportEvent::Connected);
                self.emit(TransportEvent::RestartCompleted);
            }
            Err(error) => {
                warn!(error = %error, "Restart failed");
                self.emit(TransportEvent::RestartFailed(error.to_string()));
            }
        }
    }

    fn on_frame(&mut self, frame: Option<Result<Message, tungstenite::Error>>) {
        match frame {
            Some(Ok(Message::Text(text))) => {
                self.emit(TransportEvent::Frame(text.as_str().to_string()));
            }
            Some(Ok(Message::Binary(data))) => {
                self.emit(TransportEvent::Frame(String::from_utf8_lossy(&data).into_owned()));
            }
            Some(Ok(Message::Close(reason))) => {
                info!(reason = ?reason, "Peer closed the connection");
                self.drop_connection();
            }
            Some(Ok(_)) => {}
            Some(Err(error)) => {
                warn!(error = %error, "WebSocket read failed");
                self.emit(TransportEvent::Error(error.to_string()));
                self.drop_connection();
            }
            None => {
                info!("WebSocket stream ended");
                self.drop_connection();
            }
        }
    }

    fn drop_connection(&mut self) {
        self.sink = None;
        self.source = None;
        self.emit(TransportEvent::Disconnected);
    }
}

async fn open(config: &TransportConfig) -> Result<WsStream, WsError> {
    let mut request = config.url.as_str().into_client_request()?;
    for (name, value) in &config.headers {
        let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| WsError::Header {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| WsError::Header {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        request.headers_mut().insert(header, value);
    }

    let secs = config.connect_timeout_secs;
    let (stream, _response) = if secs == 0 {
        connect_async(request).await?
    } else {
        tokio::time::timeout(Duration::from_secs(secs), connect_async(request))
            .await
            .map_err(|_| WsError::Timeout(secs))??
    };
    Ok(stream)
}

/// Next inbound frame, or never if there is no connection.
async fn next_frame(source: &mut Option<WsSource>) -> Option<Result<Message, tungstenite::Error>> {
    match source {
        Some(source) => source.next().await,
        None => std::future::pending().await,
    }
}
