
use std::sync::Arc;
use std::time::Duration;

use hashq::config::{ServerConfig, ShutdownMode};
use hashq::digest::Sha256Digest;
use hashq::protocol::Request;
use hashq::server::Server;
use tempfile::tempdir;
use test_harness::{next_response, write_file, MemoryReplies};

/// Drain mode: every queued job is answered before shutdown returns.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_drain_finishes_queued_jobs() {
    let dir = tempdir().unwrap();
    let (replies, mut rx) = MemoryReplies::new();
    let config = ServerConfig::new(dir.path().join("server.fifo"))
        .with_workers(2)
        .with_shutdown_mode(ShutdownMode::Drain);
    let mut server = Server::with_components(config, Arc::new(Sha256Digest), replies);

    for i in 0..10 {
        let file = write_file(dir.path(), &format!("f{i}"), format!("{i}").as_bytes());
        server.submit(Request::compute(&file, format!("/reply/{i}"), i));
    }
    let scheduler = server.scheduler().clone();
    server.start_workers().unwrap();

    tokio::time::timeout(Duration::from_secs(5), server.shutdown())
        .await
        .expect("drain should finish");

    assert!(scheduler.is_empty());
    assert!(scheduler.is_closed());
    for _ in 0..10 {
        assert!(next_response(&mut rx, Duration::ZERO).is_some());
    }
}

/// Immediate mode: queued work is abandoned and nobody is told.
#[tokio::test]
async fn test_immediate_shutdown_abandons_queue() {
    let dir = tempdir().unwrap();
    let (replies, mut rx) = MemoryReplies::new();
    let config = ServerConfig::new(dir.path().join("server.fifo"))
        .with_shutdown_mode(ShutdownMode::Immediate);
    let server = Server::with_components(config, Arc::new(Sha256Digest), replies);

    for i in 0..3 {
        server.submit(Request::compute(format!("/data/{i}"), format!("/reply/{i}"), i));
    }
    let scheduler = server.scheduler().clone();

    server.shutdown().await;

    assert_eq!(scheduler.len(), 3);
    assert!(!scheduler.is_closed());
    assert!(next_response(&mut rx, Duration::from_millis(50)).is_none());
}

/// Shutdown removes the public channel whichever mode is configured.
#[tokio::test]
async fn test_shutdown_removes_channel() {
    for mode in [ShutdownMode::Immediate, ShutdownMode::Drain] {
        let dir = tempdir().unwrap();
        let channel = dir.path().join("server.fifo");
        hashq::transport::create_channel(&channel).unwrap();
        assert!(channel.exists());

        let (replies, _rx) = MemoryReplies::new();
        let config = ServerConfig::new(&channel).with_shutdown_mode(mode);
        Server::with_components(config, Arc::new(Sha256Digest), replies)
            .shutdown()
            .await;

        assert!(!channel.exists(), "{mode:?} should remove the channel");
    }
}
