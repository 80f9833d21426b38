//! Delivery of completed results to exactly one sink.
//!
//! Every call resolves to a single delivery: an inline handler passed with
//! the call, or the observer registered on the client, in that order of
//! preference. A result with neither sink is dropped with a warning rather
//! than silently discarded.

use std::sync::{Arc, RwLock};

use bytes::Bytes;
use cumulo_core::{Error, Result};
use log::warn;

use crate::model::{Blob, BlobContainer, Page, Queue, QueueMessage, Table, TableEntity};
use crate::operation::OperationKind;

/// Inline completion handler for a single call.
pub type Handler<T> = Box<dyn FnOnce(Result<T>) + Send + 'static>;

/// Receiver for results of calls made without an inline handler.
///
/// All methods default to no-ops so an implementation only overrides the
/// notifications it cares about. Failures of any operation arrive through
/// [`did_fail`](StorageObserver::did_fail); create, delete, and update
/// operations that succeed with no payload arrive through
/// [`did_complete`](StorageObserver::did_complete).
#[allow(unused_variables)]
pub trait StorageObserver: Send + Sync + 'static {
    /// A page of containers was listed.
    fn did_list_containers(&self, page: Page<BlobContainer>) {}

    /// A single container was fetched.
    fn did_get_container(&self, container: BlobContainer) {}

    /// A page of blobs was listed.
    fn did_list_blobs(&self, page: Page<Blob>) {}

    /// Blob content was downloaded.
    fn did_get_blob(&self, data: Bytes) {}

    /// A page of queues was listed.
    fn did_list_queues(&self, page: Page<Queue>) {}

    /// Messages were dequeued.
    fn did_get_messages(&self, messages: Vec<QueueMessage>) {}

    /// Messages were peeked without dequeueing.
    fn did_peek_messages(&self, messages: Vec<QueueMessage>) {}

    /// A page of tables was listed.
    fn did_list_tables(&self, page: Page<Table>) {}

    /// A page of entities was returned by a query.
    fn did_query_entities(&self, page: Page<TableEntity>) {}

    /// An entity was inserted; the value is the service echo.
    fn did_insert_entity(&self, entity: TableEntity) {}

    /// An operation with no result payload succeeded.
    fn did_complete(&self, kind: OperationKind) {}

    /// An operation failed.
    fn did_fail(&self, kind: OperationKind, error: Error) {}
}

/// The client's observer registration point.
#[derive(Clone, Default)]
pub(crate) struct ObserverSlot {
    inner: Arc<RwLock<Option<Arc<dyn StorageObserver>>>>,
}

impl ObserverSlot {
    pub(crate) fn set(&self, observer: Arc<dyn StorageObserver>) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = Some(observer);
    }

    pub(crate) fn clear(&self) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub(crate) fn get(&self) -> Option<Arc<dyn StorageObserver>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Route one finished result to its sink.
pub(crate) fn deliver<T>(
    observers: &ObserverSlot,
    kind: OperationKind,
    handler: Option<Handler<T>>,
    result: Result<T>,
    notify: impl FnOnce(&dyn StorageObserver, T),
) {
    if let Some(handler) = handler {
        handler(result);
        return;
    }

    let Some(observer) = observers.get() else {
        warn!("{kind:?} result dropped: no handler and no observer registered");
        return;
    };

    match result {
        Ok(value) => notify(observer.as_ref(), value),
        Err(err) => observer.did_fail(kind, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingObserver {
        queues: AtomicUsize,
        failures: AtomicUsize,
    }

    impl StorageObserver for CountingObserver {
        fn did_list_queues(&self, _page: Page<Queue>) {
            self.queues.fetch_add(1, Ordering::SeqCst);
        }

        fn did_fail(&self, _kind: OperationKind, _error: Error) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn queue_page() -> Page<Queue> {
        Page::new(
            vec![Queue {
                name: "jobs".to_string(),
                metadata: Default::default(),
            }],
            None,
        )
    }

    #[test]
    fn test_handler_wins_over_observer() {
        let observer = Arc::new(CountingObserver::default());
        let slot = ObserverSlot::default();
        slot.set(observer.clone());

        let handled = Arc::new(AtomicUsize::new(0));
        let seen = handled.clone();
        let handler: Handler<Page<Queue>> = Box::new(move |result| {
            assert!(result.is_ok());
            seen.fetch_add(1, Ordering::SeqCst);
        });

        deliver(
            &slot,
            OperationKind::ListQueues,
            Some(handler),
            Ok(queue_page()),
            |obs, page| obs.did_list_queues(page),
        );

        assert_eq!(handled.load(Ordering::SeqCst), 1);
        assert_eq!(observer.queues.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_observer_receives_without_handler() {
        let observer = Arc::new(CountingObserver::default());
        let slot = ObserverSlot::default();
        slot.set(observer.clone());

        deliver(
            &slot,
            OperationKind::ListQueues,
            None,
            Ok(queue_page()),
            |obs, page| obs.did_list_queues(page),
        );
        deliver(
            &slot,
            OperationKind::ListQueues,
            None,
            Err(Error::transport("connection reset")),
            |obs, page| obs.did_list_queues(page),
        );

        assert_eq!(observer.queues.load(Ordering::SeqCst), 1);
        assert_eq!(observer.failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_sink_drops_without_panic() {
        let slot = ObserverSlot::default();
        deliver(
            &slot,
            OperationKind::ListQueues,
            None,
            Ok(queue_page()),
            |obs, page| obs.did_list_queues(page),
        );
    }

    #[test]
    fn test_cleared_observer_is_not_notified() {
        let observer = Arc::new(CountingObserver::default());
        let slot = ObserverSlot::default();
        slot.set(observer.clone());
        slot.clear();

        deliver(
            &slot,
            OperationKind::ListQueues,
            None,
            Ok(queue_page()),
            |obs, page| obs.did_list_queues(page),
        );
        assert_eq!(observer.queues.load(Ordering::SeqCst), 0);
    }
}
