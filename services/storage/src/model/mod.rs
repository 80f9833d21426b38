//! Resource records, fetch requests, and pagination markers.

mod blob;
pub use blob::{Blob, BlobContainer};
mod queue;
pub use queue::{Queue, QueueMessage};
mod table;
pub use table::{PropertyValue, Table, TableEntity};
mod continuation;
pub use continuation::{Page, ResultContinuation};
pub(crate) use continuation::Token;
mod fetch;
pub use fetch::{
    BlobFetchRequest, ContainerFetchRequest, QueueFetchRequest, QueueMessageFetchRequest,
    TableFetchRequest,
};
