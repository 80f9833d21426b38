use crate::model::ResultContinuation;

/// Fetch request for listing blob containers.
#[derive(Debug, Clone, Default)]
pub struct ContainerFetchRequest {
    /// Only containers whose name starts with this prefix.
    pub prefix: Option<String>,
    /// Page size bound. Clamped to the provider maximum, never rejected.
    pub max_results: Option<u32>,
    /// Marker from a previous page.
    pub continuation: Option<ResultContinuation>,
}

/// Fetch request for listing blobs in a container.
#[derive(Debug, Clone, Default)]
pub struct BlobFetchRequest {
    /// The container to list.
    pub container: String,
    /// Only blobs whose name starts with this prefix.
    pub prefix: Option<String>,
    /// Page size bound. Clamped to the provider maximum, never rejected.
    pub max_results: Option<u32>,
    /// Marker from a previous page.
    pub continuation: Option<ResultContinuation>,
}

impl BlobFetchRequest {
    /// List all blobs in `container`.
    pub fn all(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            ..Default::default()
        }
    }
}

/// Fetch request for listing queues.
#[derive(Debug, Clone, Default)]
pub struct QueueFetchRequest {
    /// Only queues whose name starts with this prefix.
    pub prefix: Option<String>,
    /// Page size bound. Clamped to the provider maximum, never rejected.
    pub max_results: Option<u32>,
    /// Marker from a previous page.
    pub continuation: Option<ResultContinuation>,
}

/// Fetch request for reading queue messages.
#[derive(Debug, Clone, Default)]
pub struct QueueMessageFetchRequest {
    /// The queue to read from.
    pub queue: String,
    /// Number of messages, defaulting to the provider maximum of 32.
    pub count: Option<u32>,
    /// Visibility timeout in seconds for a destructive get.
    pub visibility_timeout: Option<u32>,
}

impl QueueMessageFetchRequest {
    /// Fetch up to `count` messages from `queue`.
    pub fn new(queue: impl Into<String>, count: u32) -> Self {
        Self {
            queue: queue.into(),
            count: Some(count),
            visibility_timeout: None,
        }
    }

    /// Fetch a single message from `queue`.
    pub fn single(queue: impl Into<String>) -> Self {
        Self::new(queue, 1)
    }
}

/// Fetch request for querying entities in a table.
#[derive(Debug, Clone, Default)]
pub struct TableFetchRequest {
    /// The table to query.
    pub table: String,
    /// OData `$filter` predicate.
    pub filter: Option<String>,
    /// Page size bound. Clamped to the provider maximum, never rejected.
    pub top: Option<u32>,
    /// Marker pair from a previous page.
    pub continuation: Option<ResultContinuation>,
}

impl TableFetchRequest {
    /// Query all entities of `table`.
    pub fn all(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Restrict the query with an OData `$filter` predicate.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}
