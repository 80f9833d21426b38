/// Opaque marker for resuming a paginated listing.
///
/// A listing either returns the full result set and no continuation, or a
/// partial set together with one of these. Resubmit it verbatim on the next
/// fetch; the variants exist only so the request builder knows which wire
/// location the marker goes back into. Callers never construct or inspect
/// one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultContinuation(pub(crate) Token);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// `NextMarker` from a container, blob, or queue listing body.
    Marker(String),
    /// `x-ms-continuation-NextTableName` from a table listing.
    TableName(String),
    /// `x-ms-continuation-NextPartitionKey` / `NextRowKey` from an entity
    /// query.
    Entity {
        next_partition_key: String,
        next_row_key: String,
    },
}

impl ResultContinuation {
    pub(crate) fn marker(marker: impl Into<String>) -> Self {
        Self(Token::Marker(marker.into()))
    }

    pub(crate) fn table_name(name: impl Into<String>) -> Self {
        Self(Token::TableName(name.into()))
    }

    pub(crate) fn entity(
        next_partition_key: impl Into<String>,
        next_row_key: impl Into<String>,
    ) -> Self {
        Self(Token::Entity {
            next_partition_key: next_partition_key.into(),
            next_row_key: next_row_key.into(),
        })
    }
}

/// One page of a paginated listing.
#[derive(Debug)]
pub struct Page<T> {
    /// The records in this page.
    pub items: Vec<T>,
    /// Marker for the next page; absent means the listing is complete.
    pub continuation: Option<ResultContinuation>,
}

impl<T> Page<T> {
    pub(crate) fn new(items: Vec<T>, continuation: Option<ResultContinuation>) -> Self {
        Self {
            items,
            continuation,
        }
    }
}
