//! HTTP transport integration tests against a served router.

use std::sync::Arc;

use puppet_server::http::{self, HttpState};
use puppet_shared::command::{RemoteCommand, Transport};
use puppet_shared::queue::CommandQueue;
use puppet_shared::status::StatusBoard;
use serde_json::{json, Value};
use tokio::sync::watch;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn control_page_and_command_roundtrip() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();

    let queue = Arc::new(CommandQueue::new());
    let status = Arc::new(StatusBoard::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = HttpState {
        queue: Arc::clone(&queue),
        status: Arc::clone(&status),
    };
    let server = tokio::spawn(http::serve(listener, state, shutdown_rx));

    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    // The control page is served at the root.
    let page = client.get(&base).send().await?;
    assert_eq!(page.status(), 200);
    assert!(page.text().await?.contains("joystickX"));

    // A pressed interact yields Move then Interact.
    let res = client
        .post(format!("{base}/control"))
        .json(&json!({"joystickX": 0.5, "joystickY": -0.5, "interact": true}))
        .send()
        .await?;
    assert_eq!(res.status(), 200);
    assert_eq!(res.json::<Value>().await?["status"], "success");

    let drained = queue.drain();
    assert_eq!(drained.len(), 2);
    assert_eq!(drained[0].source, Transport::Http);
    assert_eq!(drained[0].command, RemoteCommand::Move { x: 0.5, y: -0.5 });
    assert_eq!(drained[1].command, RemoteCommand::Interact);

    // Sub-dead-zone values are still forwarded untouched.
    let res = client
        .post(format!("{base}/control"))
        .json(&json!({"joystickX": 0.05, "joystickY": 0.02, "interact": false}))
        .send()
        .await?;
    assert_eq!(res.status(), 200);
    let drained = queue.drain();
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].command, RemoteCommand::Move { x: 0.05, y: 0.02 });

    // A body missing joystickY is rejected and queues nothing.
    let res = client
        .post(format!("{base}/control"))
        .json(&json!({"joystickX": 0.5, "interact": false}))
        .send()
        .await?;
    assert_eq!(res.status(), 400);
    assert_eq!(res.json::<Value>().await?["status"], "error");
    assert!(queue.is_empty());

    // Unknown paths answer a JSON 404.
    let res = client.get(format!("{base}/nope")).send().await?;
    assert_eq!(res.status(), 404);
    assert_eq!(res.json::<Value>().await?["status"], "error");

    // The command channel is POST-only.
    let res = client.get(format!("{base}/control")).send().await?;
    assert_eq!(res.status(), 405);

    assert_eq!(status.transport(Transport::Http).commands(), 2);

    shutdown_tx.send(true)?;
    server.await??;
    Ok(())
}
