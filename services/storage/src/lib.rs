//! Asynchronous client for cloud blob, queue, and table storage
//!
//! This crate covers the three REST surfaces of an account:
//! - Blob: containers and their blobs
//! - Queue: queues and base64-encoded messages
//! - Table: tables and OData JSON entities
//!
//! Calls are fire-and-forget: each method signs the request locally, spawns
//! the exchange onto the ambient tokio runtime, and returns whether the
//! request was accepted for sending. Results arrive through a per-call
//! handler or the registered [`StorageObserver`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cumulo_storage::{CloudStorageClient, ContainerFetchRequest, Credential};
//!
//! #[tokio::main]
//! async fn main() {
//!     let credential = Credential::with_shared_key("myaccount", "bXkta2V5");
//!     let sender = Arc::new(cumulo_http_send_reqwest::ReqwestHttpSend::default());
//!     let client = CloudStorageClient::new(credential, sender);
//!
//!     let accepted = client.list_containers(
//!         ContainerFetchRequest::default(),
//!         Some(Box::new(|result| match result {
//!             Ok(page) => {
//!                 for container in &page.items {
//!                     println!("{}", container.name);
//!                 }
//!             }
//!             Err(err) => eprintln!("listing failed: {err}"),
//!         })),
//!     );
//!     assert!(accepted);
//! }
//! ```

#![warn(missing_docs)]

pub use cumulo_core::{Error, ErrorKind, HttpSend, Result};

mod constants;

mod credential;
pub use credential::{Credential, Endpoints, Service};

mod model;
pub use model::{
    Blob, BlobContainer, BlobFetchRequest, ContainerFetchRequest, Page, PropertyValue, Queue,
    QueueFetchRequest, QueueMessage, QueueMessageFetchRequest, ResultContinuation, Table,
    TableEntity, TableFetchRequest,
};

mod operation;
pub use operation::{Operation, OperationKind};

mod sign_request;
pub use sign_request::RequestSigner;

mod build;
pub use build::RequestBuilder;

mod transport;
pub use transport::Transport;

mod parse;

mod dispatch;
pub use dispatch::{Handler, StorageObserver};

mod client;
pub use client::CloudStorageClient;
