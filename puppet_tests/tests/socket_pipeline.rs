//! Full socket-based integration tests: text protocol → queue → merge.

use std::sync::Arc;
use std::time::Duration;

use puppet_server::socket::SocketListener;
use puppet_shared::math::Vec2;
use puppet_shared::merge::{InputMergeState, KeyboardSample};
use puppet_shared::queue::CommandQueue;
use puppet_shared::status::StatusBoard;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::watch;

const DT: f32 = 1.0 / 60.0;

async fn wait_for_queue(queue: &CommandQueue, len: usize) {
    for _ in 0..200 {
        if queue.len() >= len {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn socket_commands_flow_into_merge_state() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();

    let queue = Arc::new(CommandQueue::new());
    let status = Arc::new(StatusBoard::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener = SocketListener::bind("127.0.0.1:0".parse()?).await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(listener.run(Arc::clone(&queue), Arc::clone(&status), shutdown_rx));

    let mut stream = TcpStream::connect(addr).await?;
    stream
        .write_all(b"move,1,0\nmove,0,1\nmov,not,a,command\ninteract\n")
        .await?;
    stream.flush().await?;

    // Three valid commands; the malformed line is dropped by the decoder.
    wait_for_queue(&queue, 3).await;
    assert_eq!(queue.len(), 3);

    let mut state = InputMergeState::default();
    for queued in queue.drain() {
        state.apply(queued.command);
    }
    state.tick(KeyboardSample::default(), DT);

    // Last move wins, and the interact pulse fires exactly once.
    assert_eq!(state.mobile_input(), Vec2::new(0.0, 1.0));
    assert_eq!(state.final_input(), Vec2::new(0.0, 1.0));
    assert!(state.consume_interact_pulse());
    assert!(!state.consume_interact_pulse());

    // The malformed line did not end the connection.
    stream.write_all(b"move,0.5,0.5\n").await?;
    stream.flush().await?;
    wait_for_queue(&queue, 1).await;
    assert_eq!(queue.drain().len(), 1);

    let socket_status = status.transport(puppet_shared::command::Transport::Socket);
    assert_eq!(socket_status.clients(), 1);
    assert_eq!(socket_status.commands(), 4);

    shutdown_tx.send(true)?;
    server.await??;
    Ok(())
}
