//! End-to-end client behavior against a scripted transport.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use pretty_assertions::assert_eq;
use tokio::sync::oneshot;

use cumulo_storage::{
    Blob, CloudStorageClient, ContainerFetchRequest, Credential, ErrorKind, Handler, HttpSend,
    OperationKind, Page, PropertyValue, Queue, QueueMessage, QueueMessageFetchRequest, Result,
    StorageObserver, TableEntity,
};

/// Serves scripted responses in order and records every request it sees.
#[derive(Debug, Default)]
struct ScriptedSend {
    responses: Mutex<VecDeque<http::Response<Bytes>>>,
    requests: Mutex<Vec<http::Request<Bytes>>>,
}

impl ScriptedSend {
    fn push(&self, status: u16, headers: &[(&str, &str)], body: &str) {
        let mut builder = http::Response::builder().status(status);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let resp = builder.body(Bytes::from(body.to_string())).unwrap();
        self.responses.lock().unwrap().push_back(resp);
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, i: usize) -> http::Request<Bytes> {
        let requests = self.requests.lock().unwrap();
        let req = &requests[i];
        let mut copy = http::Request::builder()
            .method(req.method())
            .uri(req.uri().clone());
        for (name, value) in req.headers() {
            copy = copy.header(name, value);
        }
        copy.body(req.body().clone()).unwrap()
    }
}

#[async_trait::async_trait]
impl HttpSend for ScriptedSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> anyhow::Result<http::Response<Bytes>> {
        let resp = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted response left"))?;
        self.requests.lock().unwrap().push(req);
        Ok(resp)
    }
}

fn client(sender: Arc<ScriptedSend>) -> CloudStorageClient {
    let _ = env_logger::builder().is_test(true).try_init();

    // A random-looking but stable test key, base64 of nothing meaningful.
    let credential = Credential::with_shared_key("myacct", "dGVzdC1rZXktYnl0ZXM=");
    CloudStorageClient::new(credential, sender)
}

fn completion<T: Send + 'static>() -> (Handler<T>, oneshot::Receiver<Result<T>>) {
    let (tx, rx) = oneshot::channel();
    let handler: Handler<T> = Box::new(move |result| {
        let _ = tx.send(result);
    });
    (handler, rx)
}

fn container_page(names: &[&str], next_marker: &str) -> String {
    let containers: String = names
        .iter()
        .map(|n| format!("<Container><Name>{n}</Name></Container>"))
        .collect();
    format!(
        "<EnumerationResults><Containers>{containers}</Containers>\
         <NextMarker>{next_marker}</NextMarker></EnumerationResults>"
    )
}

#[tokio::test]
async fn test_container_pagination_terminates_without_duplicates() {
    let sender = Arc::new(ScriptedSend::default());
    sender.push(200, &[], &container_page(&["alpha", "beta"], "beta2"));
    sender.push(200, &[], &container_page(&["gamma"], ""));
    let client = client(sender.clone());

    let mut seen = Vec::new();
    let mut continuation = None;
    loop {
        let (handler, rx) = completion::<Page<_>>();
        let accepted = client.list_containers(
            ContainerFetchRequest {
                continuation,
                ..Default::default()
            },
            Some(handler),
        );
        assert!(accepted);

        let page = rx.await.unwrap().unwrap();
        seen.extend(page.items.into_iter().map(|c| c.name));
        match page.continuation {
            Some(token) => continuation = Some(token),
            None => break,
        }
    }

    assert_eq!(seen, vec!["alpha", "beta", "gamma"]);
    assert_eq!(seen.iter().collect::<HashSet<_>>().len(), seen.len());
    assert_eq!(sender.calls(), 2);

    // The second request resubmits the marker verbatim.
    let second = sender.request(1);
    assert!(second.uri().query().unwrap().contains("marker=beta2"));
}

#[tokio::test]
async fn test_requests_are_signed_and_versioned() {
    let sender = Arc::new(ScriptedSend::default());
    sender.push(200, &[], &container_page(&[], ""));
    let client = client(sender.clone());

    let (handler, rx) = completion();
    client.list_containers(ContainerFetchRequest::default(), Some(handler));
    rx.await.unwrap().unwrap();

    let req = sender.request(0);
    let auth = req.headers()["authorization"].to_str().unwrap();
    assert!(auth.starts_with("SharedKey myacct:"));
    assert_eq!(req.headers()["x-ms-version"], "2021-08-06");
    assert!(req.headers().contains_key("x-ms-date"));
    assert_eq!(req.uri().host(), Some("myacct.blob.core.windows.net"));
}

#[tokio::test]
async fn test_local_validation_sends_nothing() {
    let sender = Arc::new(ScriptedSend::default());
    let client = client(sender.clone());

    // Peeked messages carry no pop receipt, so this delete must be refused.
    let peeked = QueueMessage {
        message_id: "id-1".to_string(),
        pop_receipt: None,
        text: String::new(),
        insertion_time: None,
        expiration_time: None,
        time_next_visible: None,
        dequeue_count: 0,
    };

    let (handler, rx) = completion::<()>();
    let accepted = client.delete_message("jobs", &peeked, Some(handler));
    assert!(!accepted);

    let err = rx.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(sender.calls(), 0);
}

#[tokio::test]
async fn test_entity_without_etag_is_refused_locally() {
    let sender = Arc::new(ScriptedSend::default());
    let client = client(sender.clone());

    let mut entity = TableEntity::new("people", "p1", "r1");
    entity.set("Age", PropertyValue::Int32(30));

    let (handler, rx) = completion::<()>();
    let accepted = client.update_entity(entity, Some(handler));
    assert!(!accepted);

    let err = rx.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(sender.calls(), 0);
}

#[derive(Debug, Default)]
struct CountingObserver {
    containers: AtomicUsize,
    completions: AtomicUsize,
    failures: AtomicUsize,
    notified: Mutex<Option<oneshot::Sender<()>>>,
}

impl CountingObserver {
    fn arm(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        *self.notified.lock().unwrap() = Some(tx);
        rx
    }

    fn fire(&self) {
        if let Some(tx) = self.notified.lock().unwrap().take() {
            let _ = tx.send(());
        }
    }
}

impl StorageObserver for CountingObserver {
    fn did_list_containers(&self, _page: Page<cumulo_storage::BlobContainer>) {
        self.containers.fetch_add(1, Ordering::SeqCst);
        self.fire();
    }

    fn did_complete(&self, _kind: OperationKind) {
        self.completions.fetch_add(1, Ordering::SeqCst);
        self.fire();
    }

    fn did_fail(&self, _kind: OperationKind, _error: cumulo_storage::Error) {
        self.failures.fetch_add(1, Ordering::SeqCst);
        self.fire();
    }
}

#[tokio::test]
async fn test_inline_handler_wins_over_observer() {
    let sender = Arc::new(ScriptedSend::default());
    sender.push(200, &[], &container_page(&["alpha"], ""));
    sender.push(200, &[], &container_page(&["alpha"], ""));
    let client = client(sender.clone());

    let observer = Arc::new(CountingObserver::default());
    client.set_observer(observer.clone());

    // With a handler the observer stays silent.
    let (handler, rx) = completion::<Page<_>>();
    client.list_containers(ContainerFetchRequest::default(), Some(handler));
    rx.await.unwrap().unwrap();
    assert_eq!(observer.containers.load(Ordering::SeqCst), 0);

    // Without one the observer is the sink, exactly once.
    let armed = observer.arm();
    client.list_containers(ContainerFetchRequest::default(), None);
    armed.await.unwrap();
    assert_eq!(observer.containers.load(Ordering::SeqCst), 1);
    assert_eq!(observer.failures.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_observer_sees_failures_with_reason_code() {
    let sender = Arc::new(ScriptedSend::default());
    sender.push(
        404,
        &[("x-ms-error-code", "ContainerNotFound")],
        "",
    );
    let client = client(sender.clone());

    let (handler, rx) = completion::<()>();
    client.delete_container("missing", Some(handler));

    let err = rx.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Service);
    assert_eq!(err.reason_code(), Some("ContainerNotFound"));
    assert_eq!(err.status(), Some(http::StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_message_count_is_clamped_on_the_wire() {
    let sender = Arc::new(ScriptedSend::default());
    sender.push(200, &[], "<QueueMessagesList></QueueMessagesList>");
    let client = client(sender.clone());

    let (handler, rx) = completion::<Vec<QueueMessage>>();
    client.get_messages(QueueMessageFetchRequest::new("jobs", 99), Some(handler));
    let messages = rx.await.unwrap().unwrap();
    assert!(messages.is_empty());

    let req = sender.request(0);
    assert!(req.uri().query().unwrap().contains("numofmessages=32"));
    assert_eq!(req.uri().host(), Some("myacct.queue.core.windows.net"));
}

#[tokio::test]
async fn test_put_message_is_base64_on_the_wire() {
    let sender = Arc::new(ScriptedSend::default());
    sender.push(201, &[], "");
    let client = client(sender.clone());

    let (handler, rx) = completion::<()>();
    client.put_message("jobs", "hello queue", Some(handler));
    rx.await.unwrap().unwrap();

    let req = sender.request(0);
    let body = std::str::from_utf8(req.body()).unwrap();
    assert!(body.contains("<MessageText>aGVsbG8gcXVldWU=</MessageText>"));
}

#[tokio::test]
async fn test_empty_body_delete_succeeds() {
    let sender = Arc::new(ScriptedSend::default());
    sender.push(204, &[], "");
    let client = client(sender.clone());

    let observer = Arc::new(CountingObserver::default());
    client.set_observer(observer.clone());

    let armed = observer.arm();
    assert!(client.delete_queue("jobs", None));
    armed.await.unwrap();
    assert_eq!(observer.completions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_entity_round_trip_on_the_wire() {
    let sender = Arc::new(ScriptedSend::default());
    sender.push(
        201,
        &[],
        r#"{"odata.etag":"W/\"1\"","PartitionKey":"p1","RowKey":"r1","Age":30,"Score@odata.type":"Edm.Int64","Score":"900"}"#,
    );
    let client = client(sender.clone());

    let mut entity = TableEntity::new("people", "p1", "r1");
    entity.set("Age", PropertyValue::Int32(30));
    entity.set("Score", PropertyValue::Int64(900));

    let (handler, rx) = completion::<TableEntity>();
    assert!(client.insert_entity(entity, Some(handler)));

    let echoed = rx.await.unwrap().unwrap();
    assert_eq!(echoed.etag.as_deref(), Some("W/\"1\""));
    assert_eq!(echoed.get("Score"), Some(&PropertyValue::Int64(900)));

    let req = sender.request(0);
    assert_eq!(req.uri().host(), Some("myacct.table.core.windows.net"));
    assert_eq!(req.uri().path(), "/people");
    assert_eq!(req.method(), http::Method::POST);

    let body: serde_json::Value = serde_json::from_slice(req.body()).unwrap();
    assert_eq!(body["Score@odata.type"], "Edm.Int64");
    assert_eq!(body["Score"], "900");
}

#[test]
fn test_inline_handler_still_fires_without_runtime() {
    let sender = Arc::new(ScriptedSend::default());
    let client = client(sender.clone());

    let delivered = Arc::new(AtomicUsize::new(0));
    let seen = delivered.clone();
    let handler: Handler<Page<Queue>> = Box::new(move |result| {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Auth);
        seen.fetch_add(1, Ordering::SeqCst);
    });

    // No tokio runtime on this thread: the call is refused, but the inline
    // handler still gets its one delivery, synchronously.
    let accepted = client.list_queues(Default::default(), Some(handler));
    assert!(!accepted);
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
    assert_eq!(sender.calls(), 0);
}

#[tokio::test]
async fn test_get_blob_at_url_is_sent_unsigned() {
    let sender = Arc::new(ScriptedSend::default());
    sender.push(200, &[], "blob bytes");
    let client = client(sender.clone());

    let url = "https://other.blob.core.windows.net/c/b.txt?sv=2021&sig=abc";
    let (handler, rx) = completion::<bytes::Bytes>();
    assert!(client.get_blob_at_url(url, Some(handler)));

    let data = rx.await.unwrap().unwrap();
    assert_eq!(data, "blob bytes");

    // The URL authorizes itself; the account credential must not leak in.
    let req = sender.request(0);
    assert_eq!(req.uri().to_string(), url);
    assert!(!req.headers().contains_key("authorization"));
    assert!(!req.headers().contains_key("x-ms-date"));
}

fn entity_page(rows: &[&str]) -> String {
    let values: Vec<String> = rows
        .iter()
        .map(|r| format!(r#"{{"PartitionKey":"p1","RowKey":"{r}","Age":3}}"#))
        .collect();
    format!(r#"{{"value":[{}]}}"#, values.join(","))
}

#[tokio::test]
async fn test_entity_pagination_resubmits_header_continuation() {
    let sender = Arc::new(ScriptedSend::default());
    sender.push(
        200,
        &[
            ("x-ms-continuation-NextPartitionKey", "p1"),
            ("x-ms-continuation-NextRowKey", "r3"),
        ],
        &entity_page(&["r1", "r2"]),
    );
    sender.push(200, &[], &entity_page(&["r3"]));
    let client = client(sender.clone());

    let mut seen = Vec::new();
    let mut continuation = None;
    loop {
        let (handler, rx) = completion::<Page<TableEntity>>();
        let accepted = client.query_entities(
            cumulo_storage::TableFetchRequest {
                continuation,
                ..cumulo_storage::TableFetchRequest::all("people")
            },
            Some(handler),
        );
        assert!(accepted);

        let page = rx.await.unwrap().unwrap();
        seen.extend(page.items.into_iter().map(|e| e.row_key));
        match page.continuation {
            Some(token) => continuation = Some(token),
            None => break,
        }
    }

    assert_eq!(seen, vec!["r1", "r2", "r3"]);
    assert_eq!(seen.iter().collect::<HashSet<_>>().len(), seen.len());
    assert_eq!(sender.calls(), 2);

    // The header pair comes back as query parameters, verbatim.
    let second = sender.request(1);
    let query = second.uri().query().unwrap();
    assert!(query.contains("NextPartitionKey=p1"));
    assert!(query.contains("NextRowKey=r3"));
}

#[tokio::test]
async fn test_transport_failure_reaches_handler() {
    // An empty script makes the sender fail, standing in for a dead network.
    let sender = Arc::new(ScriptedSend::default());
    let client = client(sender.clone());

    let (handler, rx) = completion::<Page<Queue>>();
    assert!(client.list_queues(Default::default(), Some(handler)));

    let err = rx.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_blob_listing_maps_properties() {
    let sender = Arc::new(ScriptedSend::default());
    sender.push(
        200,
        &[],
        r#"<EnumerationResults><Blobs><Blob><Name>cat.png</Name><Properties>
           <Content-Length>2048</Content-Length><Content-Type>image/png</Content-Type>
           </Properties></Blob></Blobs><NextMarker/></EnumerationResults>"#,
    );
    let client = client(sender.clone());

    let (handler, rx) = completion::<Page<Blob>>();
    client.list_blobs(cumulo_storage::BlobFetchRequest::all("images"), Some(handler));

    let page = rx.await.unwrap().unwrap();
    assert_eq!(page.items[0].container, "images");
    assert_eq!(page.items[0].content_length, Some(2048));
    assert!(page.continuation.is_none());
}
