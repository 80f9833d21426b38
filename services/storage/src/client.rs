//! The client facade: one fire-and-forget method per operation.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use cumulo_core::{Error, HttpSend, Result};
use log::{debug, warn};
use tokio::runtime::Handle;

use crate::build::RequestBuilder;
use crate::credential::{Credential, Endpoints};
use crate::dispatch::{deliver, Handler, ObserverSlot, StorageObserver};
use crate::model::{
    Blob, BlobContainer, BlobFetchRequest, ContainerFetchRequest, Page, Queue, QueueFetchRequest,
    QueueMessage, QueueMessageFetchRequest, Table, TableEntity, TableFetchRequest,
};
use crate::operation::Operation;
use crate::parse;
use crate::sign_request::RequestSigner;
use crate::transport::Transport;

/// Asynchronous client for the blob, queue, and table services.
///
/// Every method is fire-and-forget: it validates and signs the request on
/// the calling thread, spawns the exchange onto the ambient tokio runtime,
/// and returns `bool` meaning "accepted for sending". Results and errors
/// arrive through the per-call handler when one is given, otherwise through
/// the registered [`StorageObserver`]. A request that fails local
/// validation returns `false` and delivers the error through the same path
/// without touching the network. Once a request is accepted it cannot be
/// cancelled.
#[derive(Clone)]
pub struct CloudStorageClient {
    credential: Credential,
    builder: RequestBuilder,
    signer: RequestSigner,
    transport: Transport,
    observers: ObserverSlot,
}

impl fmt::Debug for CloudStorageClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudStorageClient")
            .field("credential", &self.credential)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl CloudStorageClient {
    /// Create a client for the credential's account, sending over `sender`.
    pub fn new(credential: Credential, sender: Arc<dyn HttpSend>) -> Self {
        let endpoints = Endpoints::for_account(credential.account_name());
        Self {
            credential,
            builder: RequestBuilder::new(endpoints),
            signer: RequestSigner::new(),
            transport: Transport::new(sender),
            observers: ObserverSlot::default(),
        }
    }

    /// Replace the default per-account endpoints, e.g. for an emulator.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.builder = RequestBuilder::new(endpoints);
        self
    }

    /// Register the observer that receives results of handler-less calls.
    ///
    /// Replaces any previously registered observer; calls already in flight
    /// deliver to whichever observer is registered when they finish.
    pub fn set_observer(&self, observer: Arc<dyn StorageObserver>) {
        self.observers.set(observer);
    }

    /// Remove the registered observer.
    pub fn clear_observer(&self) {
        self.observers.clear();
    }

    // ---- blob service ----

    /// List containers, one page per call.
    pub fn list_containers(
        &self,
        request: ContainerFetchRequest,
        handler: Option<Handler<Page<BlobContainer>>>,
    ) -> bool {
        self.submit(
            Operation::ListContainers(request),
            handler,
            |resp| parse::parse_container_list(resp.body()),
            |obs, page| obs.did_list_containers(page),
        )
    }

    /// Fetch a single container by name.
    pub fn get_container(&self, name: &str, handler: Option<Handler<BlobContainer>>) -> bool {
        let wanted = name.to_string();
        self.submit(
            Operation::GetContainer {
                name: name.to_string(),
            },
            handler,
            move |resp| parse::parse_single_container(resp.body(), &wanted),
            |obs, container| obs.did_get_container(container),
        )
    }

    /// Create a container.
    pub fn create_container(&self, name: &str, handler: Option<Handler<()>>) -> bool {
        self.accept(Operation::CreateContainer {
            name: name.to_string(),
        }, handler)
    }

    /// Delete a container.
    pub fn delete_container(&self, name: &str, handler: Option<Handler<()>>) -> bool {
        self.accept(Operation::DeleteContainer {
            name: name.to_string(),
        }, handler)
    }

    /// List blobs in a container, one page per call.
    pub fn list_blobs(
        &self,
        request: BlobFetchRequest,
        handler: Option<Handler<Page<Blob>>>,
    ) -> bool {
        let container = request.container.clone();
        self.submit(
            Operation::ListBlobs(request),
            handler,
            move |resp| parse::parse_blob_list(&container, resp.body()),
            |obs, page| obs.did_list_blobs(page),
        )
    }

    /// Download the content of a blob.
    pub fn get_blob(&self, container: &str, blob: &str, handler: Option<Handler<Bytes>>) -> bool {
        self.submit(
            Operation::GetBlob {
                container: container.to_string(),
                blob: blob.to_string(),
            },
            handler,
            |resp| Ok(resp.into_body()),
            |obs, data| obs.did_get_blob(data),
        )
    }

    /// Download blob content addressed by a full URL.
    ///
    /// The URL is used as-is and must authorize itself, either because the
    /// blob is public or because the URL embeds a SAS. The account
    /// credential is not applied.
    pub fn get_blob_at_url(&self, url: &str, handler: Option<Handler<Bytes>>) -> bool {
        self.submit(
            Operation::GetBlobAtUrl {
                url: url.to_string(),
            },
            handler,
            |resp| Ok(resp.into_body()),
            |obs, data| obs.did_get_blob(data),
        )
    }

    /// Upload a blob, replacing any existing content.
    pub fn put_blob(
        &self,
        container: &str,
        blob: &str,
        content_type: &str,
        data: Bytes,
        handler: Option<Handler<()>>,
    ) -> bool {
        self.accept(
            Operation::PutBlob {
                container: container.to_string(),
                blob: blob.to_string(),
                content_type: content_type.to_string(),
                data,
            },
            handler,
        )
    }

    /// Delete a blob.
    pub fn delete_blob(&self, container: &str, blob: &str, handler: Option<Handler<()>>) -> bool {
        self.accept(
            Operation::DeleteBlob {
                container: container.to_string(),
                blob: blob.to_string(),
            },
            handler,
        )
    }

    // ---- queue service ----

    /// List queues, one page per call.
    pub fn list_queues(
        &self,
        request: QueueFetchRequest,
        handler: Option<Handler<Page<Queue>>>,
    ) -> bool {
        self.submit(
            Operation::ListQueues(request),
            handler,
            |resp| parse::parse_queue_list(resp.body()),
            |obs, page| obs.did_list_queues(page),
        )
    }

    /// Create a queue.
    pub fn create_queue(&self, name: &str, handler: Option<Handler<()>>) -> bool {
        self.accept(Operation::CreateQueue {
            name: name.to_string(),
        }, handler)
    }

    /// Delete a queue.
    pub fn delete_queue(&self, name: &str, handler: Option<Handler<()>>) -> bool {
        self.accept(Operation::DeleteQueue {
            name: name.to_string(),
        }, handler)
    }

    /// Dequeue up to `request.count` messages.
    ///
    /// Fetched messages become invisible for the visibility timeout and
    /// carry the pop receipt needed to delete them.
    pub fn get_messages(
        &self,
        request: QueueMessageFetchRequest,
        handler: Option<Handler<Vec<QueueMessage>>>,
    ) -> bool {
        self.submit(
            Operation::GetMessages(request),
            handler,
            |resp| parse::parse_message_list(resp.body()),
            |obs, messages| obs.did_get_messages(messages),
        )
    }

    /// Read messages without dequeueing them. Peeked messages carry no pop
    /// receipt.
    pub fn peek_messages(
        &self,
        request: QueueMessageFetchRequest,
        handler: Option<Handler<Vec<QueueMessage>>>,
    ) -> bool {
        self.submit(
            Operation::PeekMessages(request),
            handler,
            |resp| parse::parse_message_list(resp.body()),
            |obs, messages| obs.did_peek_messages(messages),
        )
    }

    /// Enqueue a message.
    pub fn put_message(&self, queue: &str, text: &str, handler: Option<Handler<()>>) -> bool {
        self.accept(
            Operation::PutMessage {
                queue: queue.to_string(),
                text: text.to_string(),
            },
            handler,
        )
    }

    /// Delete a message using the pop receipt from a previous
    /// [`get_messages`](Self::get_messages).
    pub fn delete_message(
        &self,
        queue: &str,
        message: &QueueMessage,
        handler: Option<Handler<()>>,
    ) -> bool {
        self.accept(
            Operation::DeleteMessage {
                queue: queue.to_string(),
                message_id: message.message_id.clone(),
                pop_receipt: message.pop_receipt.clone().unwrap_or_default(),
            },
            handler,
        )
    }

    // ---- table service ----

    /// List tables, one page per call.
    pub fn list_tables(
        &self,
        continuation: Option<crate::model::ResultContinuation>,
        handler: Option<Handler<Page<Table>>>,
    ) -> bool {
        self.submit(
            Operation::ListTables { continuation },
            handler,
            |resp| {
                let (parts, body) = resp.into_parts();
                parse::parse_table_list(&body, &parts.headers)
            },
            |obs, page| obs.did_list_tables(page),
        )
    }

    /// Create a table.
    pub fn create_table(&self, name: &str, handler: Option<Handler<()>>) -> bool {
        self.accept(Operation::CreateTable {
            name: name.to_string(),
        }, handler)
    }

    /// Delete a table.
    pub fn delete_table(&self, name: &str, handler: Option<Handler<()>>) -> bool {
        self.accept(Operation::DeleteTable {
            name: name.to_string(),
        }, handler)
    }

    /// Query entities, one page per call.
    pub fn query_entities(
        &self,
        request: TableFetchRequest,
        handler: Option<Handler<Page<TableEntity>>>,
    ) -> bool {
        let table = request.table.clone();
        self.submit(
            Operation::QueryEntities(request),
            handler,
            move |resp| {
                let (parts, body) = resp.into_parts();
                parse::parse_entity_query(&table, &body, &parts.headers)
            },
            |obs, page| obs.did_query_entities(page),
        )
    }

    /// Insert a new entity; delivers the service echo of the stored entity.
    pub fn insert_entity(
        &self,
        entity: TableEntity,
        handler: Option<Handler<TableEntity>>,
    ) -> bool {
        let table = entity.table.clone();
        self.submit(
            Operation::InsertEntity(entity),
            handler,
            move |resp| parse::parse_entity(&table, resp.body()),
            |obs, entity| obs.did_insert_entity(entity),
        )
    }

    /// Replace an existing entity. The entity must carry its partition key,
    /// row key, and the etag from a previous fetch.
    pub fn update_entity(&self, entity: TableEntity, handler: Option<Handler<()>>) -> bool {
        self.accept(Operation::UpdateEntity(entity), handler)
    }

    /// Merge properties into an existing entity; unnamed properties keep
    /// their stored values.
    pub fn merge_entity(&self, entity: TableEntity, handler: Option<Handler<()>>) -> bool {
        self.accept(Operation::MergeEntity(entity), handler)
    }

    /// Delete an existing entity.
    pub fn delete_entity(&self, entity: TableEntity, handler: Option<Handler<()>>) -> bool {
        self.accept(Operation::DeleteEntity(entity), handler)
    }

    // ---- plumbing ----

    /// Submit an operation whose success carries no payload.
    fn accept(&self, op: Operation, handler: Option<Handler<()>>) -> bool {
        let kind = op.kind();
        self.submit(op, handler, |_resp| Ok(()), move |obs, ()| {
            obs.did_complete(kind)
        })
    }

    fn submit<T, D, N>(&self, op: Operation, handler: Option<Handler<T>>, decode: D, notify: N) -> bool
    where
        T: Send + 'static,
        D: FnOnce(http::Response<Bytes>) -> cumulo_core::Result<T> + Send + 'static,
        N: FnOnce(&dyn StorageObserver, T) + Send + 'static,
    {
        let kind = op.kind();
        let Ok(runtime) = Handle::try_current() else {
            warn!("{kind} rejected: no async runtime on the calling thread");
            // An inline handler does not need a runtime; it runs right here
            // so the call still gets its one delivery. Observer delivery has
            // nowhere to run and is skipped.
            if let Some(handler) = handler {
                handler(Err(Error::auth("no async runtime on the calling thread")));
            }
            return false;
        };

        match self.prepare(&op) {
            Ok(request) => {
                debug!("{kind} signed, sending");
                let transport = self.transport.clone();
                let observers = self.observers.clone();
                runtime.spawn(async move {
                    let result = transport.send(request).await.and_then(decode);
                    match &result {
                        Ok(_) => debug!("{kind} completed"),
                        Err(err) => debug!("{kind} failed: {err}"),
                    }
                    deliver(&observers, kind, handler, result, notify);
                });
                true
            }
            Err(err) => {
                debug!("{kind} rejected before sending: {err}");
                let observers = self.observers.clone();
                runtime.spawn(async move {
                    deliver(&observers, kind, handler, Err(err), notify);
                });
                false
            }
        }
    }

    /// Build and sign, entirely local. Any failure here is an auth error
    /// and no bytes have left the process.
    fn prepare(&self, op: &Operation) -> Result<http::Request<Bytes>> {
        let request = self.builder.build(op)?;
        debug!("{} built for {:?} service", op.kind(), op.service());

        // A direct-URL fetch is authorized by the URL itself; nothing to
        // sign and no credential required.
        if matches!(op, Operation::GetBlobAtUrl { .. }) {
            return Ok(request);
        }

        if !self.credential.is_valid() {
            return Err(Error::auth("credential is missing the account key or token"));
        }

        let (mut parts, body) = request.into_parts();
        self.signer.sign(&mut parts, &self.credential, op.service())?;
        Ok(http::Request::from_parts(parts, body))
    }
}
