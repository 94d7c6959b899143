//! Dependency bundle injected into every workflow.

use std::sync::Arc;

use stagepass_core::ports::{
    BookingStore, Clock, EventCatalog, Notice, Notifier, PaymentGateway, UserDirectory,
};

/// Everything a workflow needs to talk to the outside world.
///
/// Production wires Postgres-backed implementations and a real gateway;
/// tests swap in the in-memory doubles. Cloning is cheap, every field is an
/// `Arc`.
#[derive(Clone)]
pub struct Environment {
    pub(crate) store: Arc<dyn BookingStore>,
    pub(crate) catalog: Arc<dyn EventCatalog>,
    pub(crate) directory: Arc<dyn UserDirectory>,
    pub(crate) gateway: Arc<dyn PaymentGateway>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Environment {
    /// Bundles the collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn BookingStore>,
        catalog: Arc<dyn EventCatalog>,
        directory: Arc<dyn UserDirectory>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            catalog,
            directory,
            gateway,
            notifier,
            clock,
        }
    }

    /// The booking store.
    #[must_use]
    pub fn store(&self) -> &dyn BookingStore {
        self.store.as_ref()
    }

    /// The event catalog.
    #[must_use]
    pub fn catalog(&self) -> &dyn EventCatalog {
        self.catalog.as_ref()
    }

    /// The user directory.
    #[must_use]
    pub fn directory(&self) -> &dyn UserDirectory {
        self.directory.as_ref()
    }

    /// The payment gateway.
    #[must_use]
    pub fn gateway(&self) -> &dyn PaymentGateway {
        self.gateway.as_ref()
    }

    /// The clock.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Delivers a notice off the request path.
    ///
    /// Delivery failures are logged and dropped; they never fail the
    /// operation that produced the notice.
    pub(crate) fn notify_detached(&self, notice: Notice) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(error) = notifier.notify(notice).await {
                tracing::warn!(%error, "notification delivery failed");
            }
        });
    }
}
