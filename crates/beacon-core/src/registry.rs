//! Subscriber registry abstraction.
//!
//! Handlers and the broadcast fan-out depend on the `SubscriberRegistry`
//! trait rather than on PostgreSQL directly. Production wires in
//! `PostgresRegistry`; tests use `mock::MockSubscriberRegistry`.

use std::{future::Future, pin::Pin, sync::Arc};

use crate::{error::Result, models::SubscriberId, storage::Storage};

/// Registry operations required by the webhook and broadcast paths.
pub trait SubscriberRegistry: Send + Sync + 'static {
    /// Ensures the identifier is registered.
    ///
    /// Idempotent: registering an existing identifier succeeds and returns
    /// `false`. Returns `true` when a new entry was created.
    fn register(&self, id: SubscriberId) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>>;

    /// Returns every registered identifier. Order is not significant.
    fn list_all(&self) -> Pin<Box<dyn Future<Output = Result<Vec<SubscriberId>>> + Send + '_>>;

    /// Verifies the backing store is reachable.
    fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production registry backed by PostgreSQL.
pub struct PostgresRegistry {
    storage: Arc<Storage>,
}

impl PostgresRegistry {
    /// Creates a registry over the given storage.
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl SubscriberRegistry for PostgresRegistry {
    fn register(&self, id: SubscriberId) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.subscribers.register(&id).await })
    }

    fn list_all(&self) -> Pin<Box<dyn Future<Output = Result<Vec<SubscriberId>>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.subscribers.list_all().await })
    }

    fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let storage = self.storage.clone();
        Box::pin(async move { storage.health_check().await })
    }
}

/// In-memory registry for tests.
pub mod mock {
    use std::{
        collections::BTreeSet,
        future::Future,
        pin::Pin,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    use tokio::sync::RwLock;

    use super::SubscriberRegistry;
    use crate::{
        error::{CoreError, Result},
        models::SubscriberId,
    };

    /// Registry holding identifiers in a set.
    ///
    /// Can be switched into an unavailable state to exercise the paths that
    /// must tolerate storage outages.
    #[derive(Clone, Default)]
    pub struct MockSubscriberRegistry {
        ids: Arc<RwLock<BTreeSet<SubscriberId>>>,
        unavailable: Arc<RwLock<Option<String>>>,
        list_calls: Arc<AtomicUsize>,
    }

    impl MockSubscriberRegistry {
        /// Creates an empty registry.
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a registry pre-populated with the given identifiers.
        pub async fn with_ids<I, S>(ids: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<SubscriberId>,
        {
            let registry = Self::new();
            {
                let mut set = registry.ids.write().await;
                set.extend(ids.into_iter().map(Into::into));
            }
            registry
        }

        /// Makes every subsequent call fail with `StorageUnavailable`.
        pub async fn make_unavailable(&self, reason: impl Into<String>) {
            *self.unavailable.write().await = Some(reason.into());
        }

        /// Restores normal operation.
        pub async fn make_available(&self) {
            *self.unavailable.write().await = None;
        }

        /// Snapshot of the stored identifiers in sorted order.
        pub async fn snapshot(&self) -> Vec<SubscriberId> {
            self.ids.read().await.iter().cloned().collect()
        }

        /// Number of `list_all` calls served so far.
        pub fn list_calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }

        async fn check_available(&self) -> Result<()> {
            match self.unavailable.read().await.as_ref() {
                Some(reason) => Err(CoreError::StorageUnavailable(reason.clone())),
                None => Ok(()),
            }
        }
    }

    impl SubscriberRegistry for MockSubscriberRegistry {
        fn register(
            &self,
            id: SubscriberId,
        ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + '_>> {
            Box::pin(async move {
                self.check_available().await?;
                Ok(self.ids.write().await.insert(id))
            })
        }

        fn list_all(&self) -> Pin<Box<dyn Future<Output = Result<Vec<SubscriberId>>> + Send + '_>> {
            Box::pin(async move {
                self.list_calls.fetch_add(1, Ordering::SeqCst);
                self.check_available().await?;
                Ok(self.ids.read().await.iter().cloned().collect())
            })
        }

        fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move { self.check_available().await })
        }
    }
}
