//! Decoding of provider response bodies into domain records.
//!
//! Listing bodies for blobs and queues are XML; the table service speaks
//! OData JSON. All functions here are pure: bytes (plus response headers
//! where the continuation lives there) in, domain values out. A body that
//! does not match the expected schema for the operation is a parse error,
//! surfaced as non-retryable.

use std::collections::HashMap;

use cumulo_core::time::{parse_http_date, DateTime};
use cumulo_core::{Error, Result};
use http::HeaderMap;
use serde::Deserialize;

use crate::constants::*;
use crate::model::{
    Blob, BlobContainer, Page, Queue, QueueMessage, ResultContinuation, Table, TableEntity,
};

fn xml<'a, T: Deserialize<'a>>(body: &'a [u8], what: &str) -> Result<T> {
    let text = std::str::from_utf8(body)
        .map_err(|e| Error::parse(format!("{what} body is not utf-8")).with_source(e))?;
    quick_xml::de::from_str(text)
        .map_err(|e| Error::parse(format!("{what} body does not match schema")).with_source(e))
}

fn json(body: &[u8], what: &str) -> Result<serde_json::Value> {
    serde_json::from_slice(body)
        .map_err(|e| Error::parse(format!("{what} body does not match schema")).with_source(e))
}

/// `<NextMarker/>` is emitted even on the last page; empty means done.
fn marker_continuation(marker: Option<String>) -> Option<ResultContinuation> {
    marker
        .filter(|m| !m.is_empty())
        .map(ResultContinuation::marker)
}

fn opt_date(s: Option<String>) -> Result<Option<DateTime>> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_http_date(&s)?)),
        _ => Ok(None),
    }
}

// ---- blob service ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerEnumerationResults {
    containers: ContainerList,
    next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContainerList {
    #[serde(rename = "Container", default)]
    items: Vec<ContainerXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerXml {
    name: String,
    #[serde(default)]
    url: Option<String>,
    properties: Option<ContainerProperties>,
    metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct ContainerProperties {
    #[serde(rename = "Last-Modified")]
    last_modified: Option<String>,
    #[serde(rename = "Etag")]
    etag: Option<String>,
}

impl ContainerXml {
    fn into_domain(self) -> Result<BlobContainer> {
        let (etag, last_modified) = match self.properties {
            Some(p) => (p.etag, opt_date(p.last_modified)?),
            None => (None, None),
        };
        Ok(BlobContainer {
            name: self.name,
            url: self.url.unwrap_or_default(),
            etag,
            last_modified,
            metadata: self.metadata.unwrap_or_default(),
        })
    }
}

/// Parse a container listing.
pub fn parse_container_list(body: &[u8]) -> Result<Page<BlobContainer>> {
    let raw: ContainerEnumerationResults = xml(body, "container listing")?;
    let items = raw
        .containers
        .items
        .into_iter()
        .map(ContainerXml::into_domain)
        .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(items, marker_continuation(raw.next_marker)))
}

/// Parse a prefix listing issued for a single-container fetch and pick the
/// exact match.
pub fn parse_single_container(body: &[u8], name: &str) -> Result<BlobContainer> {
    let page = parse_container_list(body)?;
    page.items
        .into_iter()
        .find(|c| c.name == name)
        .ok_or_else(|| {
            Error::service(format!("container {name} does not exist"))
                .with_reason_code("ContainerNotFound")
        })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlobEnumerationResults {
    blobs: BlobList,
    next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlobList {
    #[serde(rename = "Blob", default)]
    items: Vec<BlobXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlobXml {
    name: String,
    properties: Option<BlobProperties>,
}

#[derive(Debug, Deserialize)]
struct BlobProperties {
    #[serde(rename = "Last-Modified")]
    last_modified: Option<String>,
    #[serde(rename = "Etag")]
    etag: Option<String>,
    #[serde(rename = "Content-Length")]
    content_length: Option<u64>,
    #[serde(rename = "Content-Type")]
    content_type: Option<String>,
}

/// Parse a blob listing for `container`.
pub fn parse_blob_list(container: &str, body: &[u8]) -> Result<Page<Blob>> {
    let raw: BlobEnumerationResults = xml(body, "blob listing")?;
    let items = raw
        .blobs
        .items
        .into_iter()
        .map(|b| {
            let (etag, last_modified, content_length, content_type) = match b.properties {
                Some(p) => (
                    p.etag,
                    opt_date(p.last_modified)?,
                    p.content_length,
                    p.content_type,
                ),
                None => (None, None, None, None),
            };
            Ok(Blob {
                name: b.name,
                container: container.to_string(),
                content_type,
                content_length,
                etag,
                last_modified,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(items, marker_continuation(raw.next_marker)))
}

// ---- queue service ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueueEnumerationResults {
    queues: QueueList,
    next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueueList {
    #[serde(rename = "Queue", default)]
    items: Vec<QueueXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueueXml {
    name: String,
    metadata: Option<HashMap<String, String>>,
}

/// Parse a queue listing.
pub fn parse_queue_list(body: &[u8]) -> Result<Page<Queue>> {
    let raw: QueueEnumerationResults = xml(body, "queue listing")?;
    let items = raw
        .queues
        .items
        .into_iter()
        .map(|q| Queue {
            name: q.name,
            metadata: q.metadata.unwrap_or_default(),
        })
        .collect();
    Ok(Page::new(items, marker_continuation(raw.next_marker)))
}

#[derive(Debug, Deserialize)]
struct QueueMessagesList {
    #[serde(rename = "QueueMessage", default)]
    items: Vec<QueueMessageXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueueMessageXml {
    message_id: String,
    insertion_time: Option<String>,
    expiration_time: Option<String>,
    pop_receipt: Option<String>,
    time_next_visible: Option<String>,
    #[serde(default)]
    dequeue_count: Option<u32>,
    message_text: Option<String>,
}

/// Parse a message listing from a get or peek.
///
/// Message text travels base64 encoded; it is decoded here.
pub fn parse_message_list(body: &[u8]) -> Result<Vec<QueueMessage>> {
    let raw: QueueMessagesList = xml(body, "message listing")?;
    raw.items
        .into_iter()
        .map(|m| {
            let text = match m.message_text {
                Some(encoded) => {
                    let bytes = cumulo_core::hash::base64_decode(&encoded)
                        .map_err(|_| Error::parse("message text is not valid base64"))?;
                    String::from_utf8(bytes)
                        .map_err(|e| Error::parse("message text is not utf-8").with_source(e))?
                }
                None => String::new(),
            };
            Ok(QueueMessage {
                message_id: m.message_id,
                pop_receipt: m.pop_receipt,
                text,
                insertion_time: opt_date(m.insertion_time)?,
                expiration_time: opt_date(m.expiration_time)?,
                time_next_visible: opt_date(m.time_next_visible)?,
                dequeue_count: m.dequeue_count.unwrap_or_default(),
            })
        })
        .collect()
}

// ---- table service ----

fn header_str<'a>(headers: &'a HeaderMap, name: &http::header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Parse a table listing; the continuation lives in a response header.
pub fn parse_table_list(body: &[u8], headers: &HeaderMap) -> Result<Page<Table>> {
    let raw = json(body, "table listing")?;
    let values = raw
        .get("value")
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::parse("table listing body has no value array"))?;

    let items = values
        .iter()
        .map(|v| {
            v.get("TableName")
                .and_then(|n| n.as_str())
                .map(|name| Table {
                    name: name.to_string(),
                })
                .ok_or_else(|| Error::parse("table record has no TableName"))
        })
        .collect::<Result<Vec<_>>>()?;

    let continuation = header_str(headers, &X_MS_CONTINUATION_NEXT_TABLE_NAME)
        .filter(|v| !v.is_empty())
        .map(ResultContinuation::table_name);
    Ok(Page::new(items, continuation))
}

/// Parse an entity query; the continuation pair lives in response headers.
pub fn parse_entity_query(table: &str, body: &[u8], headers: &HeaderMap) -> Result<Page<TableEntity>> {
    let raw = json(body, "entity query")?;
    let values = raw
        .get("value")
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::parse("entity query body has no value array"))?;

    let items = values
        .iter()
        .map(|v| TableEntity::from_json(table, v))
        .collect::<Result<Vec<_>>>()?;

    let continuation = match (
        header_str(headers, &X_MS_CONTINUATION_NEXT_PARTITION_KEY).filter(|v| !v.is_empty()),
        header_str(headers, &X_MS_CONTINUATION_NEXT_ROW_KEY).filter(|v| !v.is_empty()),
    ) {
        (Some(pk), Some(rk)) => Some(ResultContinuation::entity(pk, rk)),
        _ => None,
    };
    Ok(Page::new(items, continuation))
}

/// Parse the echoed entity from an insert response.
pub fn parse_entity(table: &str, body: &[u8]) -> Result<TableEntity> {
    let raw = json(body, "entity")?;
    TableEntity::from_json(table, &raw)
}

// ---- error bodies ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorXml {
    code: Option<String>,
    message: Option<String>,
}

/// Extract the provider reason code and message from a failure response.
///
/// The reason code comes from the `x-ms-error-code` header when present,
/// otherwise from the XML `<Error><Code>` or OData JSON error body. The
/// body message is used either way. A missing or unreadable body still
/// yields a usable service error, just without a reason code.
pub fn parse_error_response(
    status: http::StatusCode,
    headers: &HeaderMap,
    body: &[u8],
) -> Error {
    let header_code = header_str(headers, &X_MS_ERROR_CODE).map(str::to_string);

    let mut body_code = None;
    let mut message = None;
    if !body.is_empty() {
        if let Ok(xml_err) = quick_xml::de::from_str::<ErrorXml>(
            std::str::from_utf8(body).unwrap_or_default(),
        ) {
            body_code = xml_err.code;
            message = xml_err.message;
        } else if let Ok(v) = serde_json::from_slice::<serde_json::Value>(body) {
            let err = v.get("odata.error");
            body_code = err
                .and_then(|e| e.get("code"))
                .and_then(|c| c.as_str())
                .map(str::to_string);
            message = err
                .and_then(|e| e.get("message"))
                .and_then(|m| m.get("value"))
                .and_then(|m| m.as_str())
                .map(str::to_string);
        }
    }

    let mut err = Error::service(
        message.unwrap_or_else(|| format!("service returned {status}")),
    )
    .with_status(status);
    if let Some(code) = header_code.or(body_code) {
        err = err.with_reason_code(code);
    }
    err
}
