use std::fmt;

use bytes::Bytes;

use crate::credential::Service;
use crate::model::{
    BlobFetchRequest, ContainerFetchRequest, QueueFetchRequest, QueueMessageFetchRequest,
    ResultContinuation, TableEntity, TableFetchRequest,
};

/// A typed operation descriptor.
///
/// One variant per resource action. The request builder turns one of these
/// into a transport request; nothing here touches the network.
#[derive(Debug, Clone)]
pub enum Operation {
    /// List blob containers.
    ListContainers(ContainerFetchRequest),
    /// Fetch a single container by name.
    GetContainer {
        /// Container name.
        name: String,
    },
    /// Create a container.
    CreateContainer {
        /// Container name.
        name: String,
    },
    /// Delete a container.
    DeleteContainer {
        /// Container name.
        name: String,
    },
    /// List blobs in a container.
    ListBlobs(BlobFetchRequest),
    /// Fetch the content of a blob.
    GetBlob {
        /// Owning container.
        container: String,
        /// Blob name.
        blob: String,
    },
    /// Fetch blob content addressed by a full URL, bypassing the account
    /// endpoints. The URL must authorize itself.
    GetBlobAtUrl {
        /// Absolute blob URL, public or SAS-addressed.
        url: String,
    },
    /// Upload a blob.
    PutBlob {
        /// Owning container.
        container: String,
        /// Blob name.
        blob: String,
        /// MIME content type.
        content_type: String,
        /// Blob content.
        data: Bytes,
    },
    /// Delete a blob.
    DeleteBlob {
        /// Owning container.
        container: String,
        /// Blob name.
        blob: String,
    },
    /// List queues.
    ListQueues(QueueFetchRequest),
    /// Create a queue.
    CreateQueue {
        /// Queue name.
        name: String,
    },
    /// Delete a queue.
    DeleteQueue {
        /// Queue name.
        name: String,
    },
    /// Destructively fetch messages from a queue.
    GetMessages(QueueMessageFetchRequest),
    /// Fetch messages without marking them invisible.
    PeekMessages(QueueMessageFetchRequest),
    /// Add a message to a queue.
    PutMessage {
        /// Queue name.
        queue: String,
        /// Message text; encoded for the wire by the builder.
        text: String,
    },
    /// Delete a previously fetched message.
    DeleteMessage {
        /// Queue name.
        queue: String,
        /// Message id from the fetch.
        message_id: String,
        /// Pop receipt from the fetch.
        pop_receipt: String,
    },
    /// List tables.
    ListTables {
        /// Marker from a previous page.
        continuation: Option<ResultContinuation>,
    },
    /// Create a table.
    CreateTable {
        /// Table name.
        name: String,
    },
    /// Delete a table.
    DeleteTable {
        /// Table name.
        name: String,
    },
    /// Query entities of a table.
    QueryEntities(TableFetchRequest),
    /// Insert a new entity.
    InsertEntity(TableEntity),
    /// Replace an existing entity.
    UpdateEntity(TableEntity),
    /// Merge properties into an existing entity.
    MergeEntity(TableEntity),
    /// Delete an existing entity.
    DeleteEntity(TableEntity),
}

impl Operation {
    /// The resource family this operation belongs to, which decides both
    /// the endpoint host and the signing scheme.
    pub fn service(&self) -> Service {
        use Operation::*;
        match self {
            ListContainers(_) | GetContainer { .. } | CreateContainer { .. }
            | DeleteContainer { .. } | ListBlobs(_) | GetBlob { .. } | GetBlobAtUrl { .. }
            | PutBlob { .. } | DeleteBlob { .. } => Service::Blob,
            ListQueues(_) | CreateQueue { .. } | DeleteQueue { .. } | GetMessages(_)
            | PeekMessages(_) | PutMessage { .. } | DeleteMessage { .. } => Service::Queue,
            ListTables { .. } | CreateTable { .. } | DeleteTable { .. } | QueryEntities(_)
            | InsertEntity(_) | UpdateEntity(_) | MergeEntity(_) | DeleteEntity(_) => {
                Service::Table
            }
        }
    }

    /// Lightweight kind tag, used in failure notifications and logs.
    pub fn kind(&self) -> OperationKind {
        use Operation::*;
        match self {
            ListContainers(_) => OperationKind::ListContainers,
            GetContainer { .. } => OperationKind::GetContainer,
            CreateContainer { .. } => OperationKind::CreateContainer,
            DeleteContainer { .. } => OperationKind::DeleteContainer,
            ListBlobs(_) => OperationKind::ListBlobs,
            GetBlob { .. } => OperationKind::GetBlob,
            GetBlobAtUrl { .. } => OperationKind::GetBlobAtUrl,
            PutBlob { .. } => OperationKind::PutBlob,
            DeleteBlob { .. } => OperationKind::DeleteBlob,
            ListQueues(_) => OperationKind::ListQueues,
            CreateQueue { .. } => OperationKind::CreateQueue,
            DeleteQueue { .. } => OperationKind::DeleteQueue,
            GetMessages(_) => OperationKind::GetMessages,
            PeekMessages(_) => OperationKind::PeekMessages,
            PutMessage { .. } => OperationKind::PutMessage,
            DeleteMessage { .. } => OperationKind::DeleteMessage,
            ListTables { .. } => OperationKind::ListTables,
            CreateTable { .. } => OperationKind::CreateTable,
            DeleteTable { .. } => OperationKind::DeleteTable,
            QueryEntities(_) => OperationKind::QueryEntities,
            InsertEntity(_) => OperationKind::InsertEntity,
            UpdateEntity(_) => OperationKind::UpdateEntity,
            MergeEntity(_) => OperationKind::MergeEntity,
            DeleteEntity(_) => OperationKind::DeleteEntity,
        }
    }
}

/// Tag identifying an operation without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum OperationKind {
    ListContainers,
    GetContainer,
    CreateContainer,
    DeleteContainer,
    ListBlobs,
    GetBlob,
    GetBlobAtUrl,
    PutBlob,
    DeleteBlob,
    ListQueues,
    CreateQueue,
    DeleteQueue,
    GetMessages,
    PeekMessages,
    PutMessage,
    DeleteMessage,
    ListTables,
    CreateTable,
    DeleteTable,
    QueryEntities,
    InsertEntity,
    UpdateEntity,
    MergeEntity,
    DeleteEntity,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
