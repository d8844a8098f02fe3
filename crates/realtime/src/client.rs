use crate::error::RealtimeError;
use crate::listeners::{Callback, ListenerId, ListenerRegistry};
use crate::message::{event_type, EVENT_CONNECTED, EVENT_DISCONNECTED, EVENT_ERROR, EVENT_MESSAGE};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, trace, warn};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// Connection state of the realtime channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Reconnect behaviour of the channel
#[derive(Debug, Clone)]
pub struct RealtimeClientOptions {
    pub max_reconnect_attempts: u32,
    /// Base delay, multiplied by the attempt number before each reconnect
    pub reconnect_delay: Duration,
}

impl Default for RealtimeClientOptions {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_millis(1000),
        }
    }
}

/// Builds the socket URL from an HTTP API base URL: the scheme is swapped for
/// its socket counterpart and `/ws` is appended to the path.
pub fn websocket_url(base_url: &str) -> Result<Url, RealtimeError> {
    let mut url = Url::parse(base_url)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        s => {
            return Err(RealtimeError::ConnectionError(format!(
                "Unsupported URL scheme: {}",
                s
            )))
        }
    };
    url.set_scheme(scheme).map_err(|_| {
        RealtimeError::ConnectionError(format!("Cannot switch {} to {}", base_url, scheme))
    })?;
    let path = format!("{}/ws", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Ok(url)
}

/// State shared between the client and its socket task
struct Shared {
    url: Url,
    options: RealtimeClientOptions,
    listeners: ListenerRegistry,
    state: RwLock<ConnectionState>,
    state_change: broadcast::Sender<ConnectionState>,
    socket: RwLock<Option<mpsc::Sender<Message>>>,
    reconnect_attempts: AtomicU32,
    // Bumped by every connect(); a superseded task must not touch shared state
    generation: AtomicU64,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn set_state(&self, generation: u64, state: ConnectionState) {
        if !self.is_current(generation) {
            return;
        }
        let mut current = self.state.write().await;
        if *current != state {
            trace!("Realtime state changing from {:?} to {:?}", *current, state);
            *current = state;
            // No receivers is fine
            let _ = self.state_change.send(state);
        }
    }

    fn dispatch(&self, text: &str) {
        match serde_json::from_str::<Value>(text) {
            Ok(message) => {
                self.listeners.emit(EVENT_MESSAGE, &message);
                if let Some(kind) = event_type(&message) {
                    trace!("Dispatching typed realtime message '{}'", kind);
                    self.listeners.emit(kind, &message);
                }
            }
            Err(e) => error!("Realtime message parse error: {}. Raw: {}", e, text),
        }
    }
}

/// Reconnecting realtime channel with a publish/subscribe listener registry
#[derive(Clone)]
pub struct RealtimeClient {
    shared: Arc<Shared>,
    current: Arc<Mutex<Option<Arc<watch::Sender<bool>>>>>,
}

impl RealtimeClient {
    /// Create a client for the API at `base_url` with default options
    pub fn new(base_url: &str) -> Result<Self, RealtimeError> {
        Self::new_with_options(base_url, RealtimeClientOptions::default())
    }

    /// Create a client with custom reconnect options
    pub fn new_with_options(
        base_url: &str,
        options: RealtimeClientOptions,
    ) -> Result<Self, RealtimeError> {
        let (state_change, _) = broadcast::channel(16);
        Ok(Self {
            shared: Arc::new(Shared {
                url: websocket_url(base_url)?,
                options,
                listeners: ListenerRegistry::default(),
                state: RwLock::new(ConnectionState::Disconnected),
                state_change,
                socket: RwLock::new(None),
                reconnect_attempts: AtomicU32::new(0),
                generation: AtomicU64::new(0),
            }),
            current: Arc::new(Mutex::new(None)),
        })
    }

    /// The socket URL this client connects to
    pub fn url(&self) -> &Url {
        &self.shared.url
    }

    pub fn options(&self) -> &RealtimeClientOptions {
        &self.shared.options
    }

    pub async fn get_connection_state(&self) -> ConnectionState {
        *self.shared.state.read().await
    }

    pub fn on_state_change(&self) -> broadcast::Receiver<ConnectionState> {
        self.shared.state_change.subscribe()
    }

    /// Number of reconnect attempts since the last successful open
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.reconnect_attempts.load(Ordering::SeqCst)
    }

    /// Register `callback` for `event`
    pub fn on<F>(&self, event: &str, callback: F) -> ListenerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        self.shared.listeners.add(event, callback)
    }

    /// Remove a listener previously registered for `event`
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        self.shared.listeners.remove(event, id)
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.shared.listeners.count(event)
    }

    /// Start the socket task.
    ///
    /// The task keeps reconnecting after closes until the attempt limit is
    /// reached. Dropping the returned handle, or connecting again, cancels it
    /// together with any pending reconnect timer.
    pub fn connect(&self) -> ConnectionHandle {
        info!("connect() called for {}", self.shared.url);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shutdown = Arc::new(shutdown_tx);
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let previous = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(shutdown.clone());
        if let Some(previous) = previous {
            debug!("Cancelling previous realtime task");
            previous.send_replace(true);
        }

        let task = tokio::spawn(run(self.shared.clone(), shutdown_rx, generation));
        ConnectionHandle { shutdown, task }
    }

    /// Serialize `data` and queue it on the socket.
    ///
    /// When the channel is not open the message is dropped with a warning.
    pub async fn send<T: Serialize>(&self, data: &T) -> Result<(), RealtimeError> {
        // Not held across the send, which can wait on a full queue
        let socket = self.shared.socket.read().await.clone();
        match socket {
            Some(tx) => {
                let text = serde_json::to_string(data)?;
                trace!("Queueing realtime message: {}", text);
                tx.send(Message::Text(text)).await?;
            }
            None => warn!("WebSocket not connected, message dropped"),
        }
        Ok(())
    }
}

/// Owns a running socket task
pub struct ConnectionHandle {
    shutdown: Arc<watch::Sender<bool>>,
    task: JoinHandle<()>,
}

impl ConnectionHandle {
    /// Close the socket and cancel any pending reconnect
    pub fn disconnect(&self) {
        info!("disconnect() called");
        self.shutdown.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the socket task has stopped, either because it was
    /// cancelled or because it gave up reconnecting.
    pub async fn finished(&mut self) {
        if let Err(e) = (&mut self.task).await {
            if !e.is_cancelled() {
                error!("Realtime task failed: {}", e);
            }
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender counts as cancellation too
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn run(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>, generation: u64) {
    loop {
        shared.set_state(generation, ConnectionState::Connecting).await;
        tokio::select! {
            _ = cancelled(&mut shutdown) => break,
            _ = session(&shared, generation) => {}
        }
        release_socket(&shared, generation).await;

        shared.set_state(generation, ConnectionState::Disconnected).await;
        shared.listeners.emit(EVENT_DISCONNECTED, &Value::Null);

        let attempts = shared.reconnect_attempts.load(Ordering::SeqCst);
        if attempts >= shared.options.max_reconnect_attempts {
            info!(
                "Max reconnect attempts ({}) reached, giving up",
                shared.options.max_reconnect_attempts
            );
            break;
        }
        let attempt = attempts + 1;
        shared.reconnect_attempts.store(attempt, Ordering::SeqCst);
        shared.set_state(generation, ConnectionState::Reconnecting).await;

        let delay = shared.options.reconnect_delay * attempt;
        tokio::select! {
            _ = cancelled(&mut shutdown) => break,
            _ = sleep(delay) => {
                info!(
                    "Attempting to reconnect... ({}/{})",
                    attempt, shared.options.max_reconnect_attempts
                );
            }
        }
    }

    release_socket(&shared, generation).await;
    shared.set_state(generation, ConnectionState::Disconnected).await;
    debug!("Realtime task finished");
}

async fn release_socket(shared: &Shared, generation: u64) {
    if shared.is_current(generation) {
        *shared.socket.write().await = None;
    }
}

/// One socket lifetime, from connection attempt to close
async fn session(shared: &Shared, generation: u64) {
    let stream = match connect_async(shared.url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            error!("WebSocket connection error: {}", e);
            shared
                .listeners
                .emit(EVENT_ERROR, &json!({ "message": e.to_string() }));
            return;
        }
    };

    info!("WebSocket connected");
    shared.reconnect_attempts.store(0, Ordering::SeqCst);
    let (mut write, mut read) = stream.split();
    let (socket_tx, mut socket_rx) = mpsc::channel::<Message>(100);
    if shared.is_current(generation) {
        *shared.socket.write().await = Some(socket_tx);
    }
    shared.set_state(generation, ConnectionState::Connected).await;
    shared.listeners.emit(EVENT_CONNECTED, &Value::Null);

    loop {
        tokio::select! {
            outgoing = socket_rx.recv() => match outgoing {
                Some(message) => {
                    if let Err(e) = write.send(message).await {
                        error!("WebSocket send error: {}", e);
                        shared.listeners.emit(EVENT_ERROR, &json!({ "message": e.to_string() }));
                        break;
                    }
                }
                None => break,
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => shared.dispatch(&text),
                Some(Ok(Message::Close(frame))) => {
                    debug!("Received close frame: {:?}", frame);
                    break;
                }
                Some(Ok(other)) => trace!("Ignoring non-text frame: {:?}", other),
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    shared.listeners.emit(EVENT_ERROR, &json!({ "message": e.to_string() }));
                    break;
                }
                None => break,
            },
        }
    }
    info!("WebSocket disconnected");
}
