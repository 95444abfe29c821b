use async_trait::async_trait;
use receiver::config::{Config, Listener, Pipelines};
use receiver::errors::ExportError;
use receiver::handler::{ExportRequest, ExportResponse, Handler, Signal};
use receiver::{Receiver, ReceiverAddrs};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio::time::{sleep, timeout};

/// Answers with its tag once the test lets it through.
struct HeldHandler {
    tag: &'static str,
    started: Notify,
    release: Semaphore,
}

impl HeldHandler {
    fn new(tag: &'static str, permits: usize) -> Arc<Self> {
        Arc::new(Self {
            tag,
            started: Notify::new(),
            release: Semaphore::new(permits),
        })
    }
}

#[async_trait]
impl Handler for HeldHandler {
    fn name(&self) -> &'static str {
        self.tag
    }

    async fn call(&self, _request: ExportRequest) -> Result<ExportResponse, ExportError> {
        self.started.notify_one();
        self.release
            .acquire()
            .await
            .map_err(ExportError::backend)?
            .forget();
        Ok(ExportResponse::partial(0, self.tag))
    }
}

fn local_config() -> Config {
    let local = Listener {
        host: "127.0.0.1".into(),
        port: 0,
    };
    Config {
        id: "reload-test".into(),
        listener: local.clone(),
        admin_listener: local,
        pipelines: Pipelines::default(),
    }
}

async fn export(addrs: ReceiverAddrs, signal: &str) -> (StatusCode, String) {
    let response = reqwest::Client::new()
        .post(format!("http://{}/v1/{signal}", addrs.data))
        .header("content-type", "application/x-protobuf")
        .body(vec![0x0a, 0x00])
        .send()
        .await
        .expect("send export");
    let status = response.status();
    (status, response.text().await.expect("read body"))
}

fn tagged_body(tag: &str) -> String {
    format!(r#"{{"partial_success":{{"rejected":0,"error_message":"{tag}"}}}}"#)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reload_over_http() {
    let receiver = Arc::new(Receiver::new(local_config()));
    let addrs = receiver.start().await.expect("start receiver");

    // Nothing installed yet.
    let (status, _) = export(addrs, "traces").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let a = HeldHandler::new("a", 0);
    receiver.register(Signal::Traces, a.clone());
    receiver.disable(Signal::Metrics);
    receiver.disable(Signal::Logs);

    let (status, _) = export(addrs, "metrics").await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);

    // Start a call that stays inside handler A.
    let long_call = tokio::spawn(export(addrs, "traces"));
    timeout(Duration::from_secs(5), a.started.notified())
        .await
        .expect("call should reach handler a");

    let retiring = {
        let receiver = receiver.clone();
        tokio::spawn(async move {
            receiver
                .dispatcher()
                .endpoint(Signal::Traces)
                .retire_and_clear()
                .await
        })
    };
    sleep(Duration::from_millis(100)).await;
    assert!(!retiring.is_finished(), "retire must wait for the call on a");

    // Arrivals during the drain are told to retry.
    let (status, body) = export(addrs, "traces").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("temporarily unavailable"));

    a.release.add_permits(1);
    let (status, body) = long_call.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, tagged_body("a"));
    timeout(Duration::from_secs(5), retiring)
        .await
        .expect("retire should finish after the drain")
        .unwrap();

    let b = HeldHandler::new("b", 16);
    receiver.register(Signal::Traces, b);
    for _ in 0..3 {
        let (status, body) = export(addrs, "traces").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, tagged_body("b"));
    }

    receiver.shutdown().await;
}
