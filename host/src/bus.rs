// Cross-context message routing.
//
// Each context attaches exactly one subscriber. A send enqueues the raw
// envelope on the target's delivery loop and awaits the reply over a
// oneshot channel. The channel stays open for as long as the handler
// future runs, so a suspending handler cannot lose its reply; the only
// remaining loss modes are a missing or torn-down target, and both
// surface as typed errors. Every send carries a deadline.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use webext_protocol::Response;

/// Deadline applied when the caller does not pick one.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// Execution contexts addressable on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextId {
    Background,
    /// The page agent of one tab.
    Tab(u32),
    Popup,
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextId::Background => write!(f, "background"),
            ContextId::Tab(id) => write!(f, "tab {}", id),
            ContextId::Popup => write!(f, "popup"),
        }
    }
}

/// The one message subscriber a context registers.
///
/// Returning the `Response` from an async fn is what keeps the reply
/// channel open across suspension points; there is no separate signal
/// to remember.
#[async_trait]
pub trait Subscriber: Send + Sync {
    async fn on_message(&self, raw: Value) -> Response;
}

struct Delivery {
    raw: Value,
    reply: oneshot::Sender<Response>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum BusError {
    /// No subscriber was ever attached under this id.
    NoSuchContext(ContextId),
    /// The context was attached but its delivery loop is gone.
    ContextGone(ContextId),
    /// No reply arrived inside the deadline; a late reply is discarded.
    DeadlineExceeded(ContextId),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::NoSuchContext(id) => write!(f, "no such context: {}", id),
            BusError::ContextGone(id) => write!(f, "context is gone: {}", id),
            BusError::DeadlineExceeded(id) => write!(f, "no reply from {} within deadline", id),
        }
    }
}

impl std::error::Error for BusError {}

/// Routes envelopes between contexts. Cheap to clone; all clones share
/// one registry.
#[derive(Clone, Default)]
pub struct MessageBus {
    contexts: Arc<Mutex<HashMap<ContextId, mpsc::UnboundedSender<Delivery>>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the context's subscriber and start its delivery loop.
    /// Messages from one sender are handled in arrival order, one at a
    /// time. Attaching over an existing id replaces the subscriber.
    pub fn attach(&self, id: ContextId, subscriber: Arc<dyn Subscriber>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Delivery>();
        self.registry().insert(id, tx);

        tokio::spawn(async move {
            while let Some(Delivery { raw, reply }) = rx.recv().await {
                let response = subscriber.on_message(raw).await;
                // A dropped receiver means the sender gave up on its
                // deadline; the reply is discarded there, not here.
                let _ = reply.send(response);
            }
            tracing::debug!("delivery loop for {} ended", id);
        });
    }

    /// Tear a context down, e.g. when its page navigates away. Already
    /// queued messages are still answered before the loop ends.
    pub fn detach(&self, id: ContextId) -> bool {
        self.registry().remove(&id).is_some()
    }

    pub fn is_attached(&self, id: ContextId) -> bool {
        self.registry().contains_key(&id)
    }

    /// Send with the default deadline.
    pub async fn send(&self, target: ContextId, raw: Value) -> Result<Response, BusError> {
        self.send_with_deadline(target, raw, DEFAULT_DEADLINE).await
    }

    /// Send one envelope and await the single reply.
    pub async fn send_with_deadline(
        &self,
        target: ContextId,
        raw: Value,
        deadline: Duration,
    ) -> Result<Response, BusError> {
        let tx = self
            .registry()
            .get(&target)
            .cloned()
            .ok_or(BusError::NoSuchContext(target))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(Delivery {
            raw,
            reply: reply_tx,
        })
        .map_err(|_| BusError::ContextGone(target))?;

        match tokio::time::timeout(deadline, reply_rx).await {
            Ok(Ok(response)) => Ok(response),
            // Delivery loop dropped the message without replying.
            Ok(Err(_)) => Err(BusError::ContextGone(target)),
            // Dropping reply_rx here is what discards a late reply.
            Err(_) => Err(BusError::DeadlineExceeded(target)),
        }
    }

    fn registry(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<ContextId, mpsc::UnboundedSender<Delivery>>> {
        self.contexts.lock().expect("bus registry poisoned")
    }
}
