//! Shared application state injected into every handler.

use std::sync::Arc;

use beacon_core::SubscriberRegistry;
use beacon_delivery::{BroadcastConfig, Broadcaster, MessagingApi, Responder};
use tokio_util::task::TaskTracker;

/// Secrets and header names used to authenticate inbound requests.
#[derive(Debug, Clone, Default)]
pub struct AuthSettings {
    /// Channel secret keying the webhook signature.
    pub channel_secret: String,
    /// Header carrying the webhook signature.
    pub signature_header: String,
    /// Bearer token required on administrative routes, if any.
    pub admin_token: Option<String>,
}

/// Collaborators shared by all handlers.
///
/// The registry is the only coupling point between the webhook path, which
/// records subscribers, and the broadcast path, which reads them.
#[derive(Clone)]
pub struct AppState {
    /// Subscriber registry
    pub registry: Arc<dyn SubscriberRegistry>,
    /// Outbound messaging capability
    pub messaging: Arc<dyn MessagingApi>,
    /// Broadcast fan-out over `registry` and `messaging`
    pub broadcaster: Arc<Broadcaster>,
    /// Reply generation for inbound text
    pub responder: Arc<Responder>,
    /// Inbound authentication settings
    pub auth: Arc<AuthSettings>,
    /// Work that must finish even if the request that started it is dropped:
    /// webhook replies and broadcast fan-outs. Drained on shutdown.
    pub background: TaskTracker,
}

impl AppState {
    /// Wires the state, building the broadcaster over the same registry and
    /// messaging instances the handlers use.
    pub fn new(
        registry: Arc<dyn SubscriberRegistry>,
        messaging: Arc<dyn MessagingApi>,
        responder: Responder,
        auth: AuthSettings,
        broadcast: BroadcastConfig,
    ) -> Self {
        let broadcaster = Broadcaster::new(registry.clone(), messaging.clone(), broadcast);

        Self {
            registry,
            messaging,
            broadcaster: Arc::new(broadcaster),
            responder: Arc::new(responder),
            auth: Arc::new(auth),
            background: TaskTracker::new(),
        }
    }
}
