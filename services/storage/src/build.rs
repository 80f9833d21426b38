use bytes::Bytes;
use cumulo_core::hash::base64_encode;
use cumulo_core::{Error, Result};
use http::header;
use http::Method;
use http::Request;

use crate::constants::*;
use crate::credential::{Endpoints, Service};
use crate::model::{ResultContinuation, TableEntity, Token};
use crate::operation::Operation;

/// Pure translation from an [`Operation`] to a transport request.
///
/// No side effects and no network access: given the same operation and
/// endpoints, the same request comes out. Page size bounds are clamped to
/// the provider maximums here, never rejected.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    endpoints: Endpoints,
}

impl RequestBuilder {
    /// Create a builder over the given endpoint roots.
    pub fn new(endpoints: Endpoints) -> Self {
        Self { endpoints }
    }

    /// Build the transport request for an operation.
    pub fn build(&self, op: &Operation) -> Result<Request<Bytes>> {
        match op {
            Operation::ListContainers(req) => {
                let mut query = vec![q("comp", "list"), q("include", "metadata")];
                push_prefix(&mut query, req.prefix.as_deref());
                push_max_results(&mut query, req.max_results);
                push_marker(&mut query, req.continuation.as_ref())?;
                self.request(Method::GET, Service::Blob, "/", &query, Body::None)
            }
            Operation::GetContainer { name } => {
                // The service has no single-container fetch; list with the
                // name as prefix and let the parser pick the exact match.
                let query = vec![q("comp", "list"), q("include", "metadata"), q("prefix", name)];
                self.request(Method::GET, Service::Blob, "/", &query, Body::None)
            }
            Operation::CreateContainer { name } => self.request(
                Method::PUT,
                Service::Blob,
                &format!("/{}", encode_path(name)),
                &[q("restype", "container")],
                Body::None,
            ),
            Operation::DeleteContainer { name } => self.request(
                Method::DELETE,
                Service::Blob,
                &format!("/{}", encode_path(name)),
                &[q("restype", "container")],
                Body::None,
            ),
            Operation::ListBlobs(req) => {
                let mut query = vec![q("restype", "container"), q("comp", "list")];
                push_prefix(&mut query, req.prefix.as_deref());
                push_max_results(&mut query, req.max_results);
                push_marker(&mut query, req.continuation.as_ref())?;
                self.request(
                    Method::GET,
                    Service::Blob,
                    &format!("/{}", encode_path(&req.container)),
                    &query,
                    Body::None,
                )
            }
            Operation::GetBlob { container, blob } => self.request(
                Method::GET,
                Service::Blob,
                &format!("/{}/{}", encode_path(container), encode_path(blob)),
                &[],
                Body::None,
            ),
            Operation::GetBlobAtUrl { url } => {
                let uri: http::Uri = url.parse()?;
                if uri.scheme().is_none() || uri.authority().is_none() {
                    return Err(Error::auth(format!("blob URL must be absolute: {url}")));
                }
                Ok(Request::builder()
                    .method(Method::GET)
                    .uri(uri)
                    .header(X_MS_VERSION, SERVICE_VERSION)
                    .body(Bytes::new())?)
            }
            Operation::PutBlob {
                container,
                blob,
                content_type,
                data,
            } => {
                let mut req = self.request(
                    Method::PUT,
                    Service::Blob,
                    &format!("/{}/{}", encode_path(container), encode_path(blob)),
                    &[],
                    Body::Raw(data.clone(), content_type.clone()),
                )?;
                req.headers_mut()
                    .insert(X_MS_BLOB_TYPE, "BlockBlob".parse()?);
                Ok(req)
            }
            Operation::DeleteBlob { container, blob } => self.request(
                Method::DELETE,
                Service::Blob,
                &format!("/{}/{}", encode_path(container), encode_path(blob)),
                &[],
                Body::None,
            ),
            Operation::ListQueues(req) => {
                let mut query = vec![q("comp", "list")];
                push_prefix(&mut query, req.prefix.as_deref());
                push_max_results(&mut query, req.max_results);
                push_marker(&mut query, req.continuation.as_ref())?;
                self.request(Method::GET, Service::Queue, "/", &query, Body::None)
            }
            Operation::CreateQueue { name } => self.request(
                Method::PUT,
                Service::Queue,
                &format!("/{}", encode_path(name)),
                &[],
                Body::None,
            ),
            Operation::DeleteQueue { name } => self.request(
                Method::DELETE,
                Service::Queue,
                &format!("/{}", encode_path(name)),
                &[],
                Body::None,
            ),
            Operation::GetMessages(req) => {
                let mut query = vec![q("numofmessages", clamp_message_count(req.count))];
                if let Some(t) = req.visibility_timeout {
                    query.push(q("visibilitytimeout", t.to_string()));
                }
                self.request(
                    Method::GET,
                    Service::Queue,
                    &format!("/{}/messages", encode_path(&req.queue)),
                    &query,
                    Body::None,
                )
            }
            Operation::PeekMessages(req) => {
                let query = vec![
                    q("peekonly", "true"),
                    q("numofmessages", clamp_message_count(req.count)),
                ];
                self.request(
                    Method::GET,
                    Service::Queue,
                    &format!("/{}/messages", encode_path(&req.queue)),
                    &query,
                    Body::None,
                )
            }
            Operation::PutMessage { queue, text } => {
                // Message text is base64 on the wire.
                let body = format!(
                    "<QueueMessage><MessageText>{}</MessageText></QueueMessage>",
                    base64_encode(text.as_bytes())
                );
                self.request(
                    Method::POST,
                    Service::Queue,
                    &format!("/{}/messages", encode_path(queue)),
                    &[],
                    Body::Raw(Bytes::from(body), "application/xml".to_string()),
                )
            }
            Operation::DeleteMessage {
                queue,
                message_id,
                pop_receipt,
            } => {
                if message_id.is_empty() || pop_receipt.is_empty() {
                    return Err(Error::auth(
                        "deleting a queue message requires the message id and pop receipt \
                         from a previous fetch",
                    ));
                }
                self.request(
                    Method::DELETE,
                    Service::Queue,
                    &format!(
                        "/{}/messages/{}",
                        encode_path(queue),
                        encode_path(message_id)
                    ),
                    &[q("popreceipt", pop_receipt)],
                    Body::None,
                )
            }
            Operation::ListTables { continuation } => {
                let mut query = vec![];
                match continuation.as_ref().map(|c| &c.0) {
                    None => {}
                    Some(Token::TableName(name)) => query.push(q("NextTableName", name)),
                    Some(_) => return Err(continuation_mismatch()),
                }
                self.request(Method::GET, Service::Table, "/Tables", &query, Body::None)
            }
            Operation::CreateTable { name } => {
                let body = serde_json::json!({ "TableName": name }).to_string();
                self.request(
                    Method::POST,
                    Service::Table,
                    "/Tables",
                    &[],
                    Body::Json(Bytes::from(body)),
                )
            }
            Operation::DeleteTable { name } => self.request(
                Method::DELETE,
                Service::Table,
                &format!("/Tables('{}')", escape_odata_key(name)),
                &[],
                Body::None,
            ),
            Operation::QueryEntities(req) => {
                let mut query = vec![];
                if let Some(filter) = &req.filter {
                    query.push(q("$filter", filter));
                }
                if let Some(top) = req.top {
                    query.push(q("$top", top.min(MAX_ENTITY_TOP).to_string()));
                }
                match req.continuation.as_ref().map(|c| &c.0) {
                    None => {}
                    Some(Token::Entity {
                        next_partition_key,
                        next_row_key,
                    }) => {
                        query.push(q("NextPartitionKey", next_partition_key));
                        query.push(q("NextRowKey", next_row_key));
                    }
                    Some(_) => return Err(continuation_mismatch()),
                }
                self.request(
                    Method::GET,
                    Service::Table,
                    &format!("/{}()", encode_path(&req.table)),
                    &query,
                    Body::None,
                )
            }
            Operation::InsertEntity(entity) => {
                require_insert_identity(entity)?;
                let body = entity.to_json().to_string();
                self.request(
                    Method::POST,
                    Service::Table,
                    &format!("/{}", encode_path(&entity.table)),
                    &[],
                    Body::Json(Bytes::from(body)),
                )
            }
            Operation::UpdateEntity(entity) => {
                self.entity_write(Method::PUT, entity, true)
            }
            Operation::MergeEntity(entity) => {
                // MERGE is a provider extension method.
                let merge = Method::from_bytes(b"MERGE")
                    .map_err(|e| Error::auth("invalid method").with_source(e))?;
                self.entity_write(merge, entity, true)
            }
            Operation::DeleteEntity(entity) => self.entity_write(Method::DELETE, entity, false),
        }
    }

    /// Build an update, merge, or delete request addressing one entity.
    ///
    /// All three require the partition key, row key, and etag from a
    /// previously fetched or inserted instance; this is validated before
    /// any transport request exists.
    fn entity_write(
        &self,
        method: Method,
        entity: &TableEntity,
        with_body: bool,
    ) -> Result<Request<Bytes>> {
        let Some(etag) = entity.etag.as_deref() else {
            return Err(entity_identity_error());
        };
        if entity.table.is_empty() || entity.partition_key.is_empty() || entity.row_key.is_empty() {
            return Err(entity_identity_error());
        }

        let path = format!(
            "/{}(PartitionKey='{}',RowKey='{}')",
            encode_path(&entity.table),
            encode_path(&escape_odata_key(&entity.partition_key)),
            encode_path(&escape_odata_key(&entity.row_key)),
        );
        let body = if with_body {
            Body::Json(Bytes::from(entity.to_json().to_string()))
        } else {
            Body::None
        };

        let mut req = self.request(method, Service::Table, &path, &[], body)?;
        req.headers_mut().insert(header::IF_MATCH, etag.parse()?);
        Ok(req)
    }

    fn request(
        &self,
        method: Method,
        service: Service,
        path: &str,
        query: &[(String, String)],
        body: Body,
    ) -> Result<Request<Bytes>> {
        let url = self.endpoints.url(service, path, query)?;

        let mut builder = Request::builder()
            .method(method)
            .uri(url.as_str())
            .header(X_MS_VERSION, SERVICE_VERSION);

        if service == Service::Table {
            builder = builder
                .header(header::ACCEPT, "application/json;odata=minimalmetadata")
                .header("DataServiceVersion", "3.0;NetFx");
        }

        let data = match body {
            Body::None => Bytes::new(),
            Body::Raw(data, content_type) => {
                builder = builder
                    .header(header::CONTENT_TYPE, content_type)
                    .header(header::CONTENT_LENGTH, data.len());
                data
            }
            Body::Json(data) => {
                builder = builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::CONTENT_LENGTH, data.len());
                data
            }
        };

        Ok(builder.body(data)?)
    }
}

enum Body {
    None,
    Raw(Bytes, String),
    Json(Bytes),
}

fn q(key: impl Into<String>, value: impl Into<String>) -> (String, String) {
    (key.into(), value.into())
}

fn push_prefix(query: &mut Vec<(String, String)>, prefix: Option<&str>) {
    if let Some(prefix) = prefix {
        query.push(q("prefix", prefix));
    }
}

fn push_max_results(query: &mut Vec<(String, String)>, max_results: Option<u32>) {
    if let Some(n) = max_results {
        query.push(q("maxresults", n.min(MAX_LIST_RESULTS).to_string()));
    }
}

fn push_marker(
    query: &mut Vec<(String, String)>,
    continuation: Option<&ResultContinuation>,
) -> Result<()> {
    match continuation.map(|c| &c.0) {
        None => Ok(()),
        Some(Token::Marker(marker)) => {
            query.push(q("marker", marker));
            Ok(())
        }
        Some(_) => Err(continuation_mismatch()),
    }
}

fn clamp_message_count(count: Option<u32>) -> String {
    count
        .unwrap_or(MAX_MESSAGE_COUNT)
        .clamp(1, MAX_MESSAGE_COUNT)
        .to_string()
}

fn require_insert_identity(entity: &TableEntity) -> Result<()> {
    if entity.table.is_empty() || entity.partition_key.is_empty() || entity.row_key.is_empty() {
        return Err(Error::auth(
            "inserting an entity requires a table name, partition key, and row key",
        ));
    }
    Ok(())
}

fn entity_identity_error() -> Error {
    Error::auth(
        "entity update, merge, and delete require the partition key, row key, and etag \
         of a previously fetched or inserted entity",
    )
}

fn continuation_mismatch() -> Error {
    Error::auth("continuation token does not belong to this kind of listing")
}

/// Percent encode one path segment, leaving `/` separators alone.
fn encode_path(path: &str) -> String {
    percent_encoding::percent_encode(path.as_bytes(), &PATH_ENCODE_SET).to_string()
}

/// Single quotes in OData key literals are escaped by doubling.
fn escape_odata_key(key: &str) -> String {
    key.replace('\'', "''")
}
