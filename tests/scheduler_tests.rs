use std::sync::Arc;
use std::time::Duration;

use hashq::protocol::Request;
use hashq::scheduler::{Job, Scheduler};
use tokio::sync::mpsc::unbounded_channel;

fn job(path: &str, size: i64) -> Job {
    Job::new(Request::compute(path, "/tmp/reply", size))
}

fn dequeue_paths(scheduler: &Scheduler, n: usize) -> Vec<String> {
    (0..n)
        .map(|_| {
            scheduler
                .dequeue_blocking()
                .expect("job should be queued")
                .path()
                .display()
                .to_string()
        })
        .collect()
}

#[test]
fn test_shortest_job_first() {
    let scheduler = Scheduler::new();
    scheduler.enqueue(job("/50", 50));
    scheduler.enqueue(job("/10", 10));
    scheduler.enqueue(job("/30", 30));

    assert_eq!(scheduler.len(), 3);
    assert_eq!(dequeue_paths(&scheduler, 3), vec!["/10", "/30", "/50"]);
    assert!(scheduler.is_empty());
}

#[test]
fn test_equal_sizes_are_fifo() {
    let scheduler = Scheduler::new();
    scheduler.enqueue(job("/a", 100));
    scheduler.enqueue(job("/b", 100));
    scheduler.enqueue(job("/small", 1));
    scheduler.enqueue(job("/c", 100));

    assert_eq!(
        dequeue_paths(&scheduler, 4),
        vec!["/small", "/a", "/b", "/c"]
    );
}

#[test]
fn test_small_jobs_keep_overtaking_a_large_one() {
    let scheduler = Scheduler::new();
    scheduler.enqueue(job("/large", 1_000_000));

    // No aging: each round a fresh small job beats the large one.
    for round in 0..5 {
        let name = format!("/small{round}");
        scheduler.enqueue(job(&name, 1));
        assert_eq!(dequeue_paths(&scheduler, 1), vec![name]);
    }
    assert_eq!(dequeue_paths(&scheduler, 1), vec!["/large"]);
}

#[test]
fn test_enqueue_wakes_one_waiter() {
    let scheduler = Arc::new(Scheduler::new());
    let (tx, mut rx) = unbounded_channel();

    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let scheduler = scheduler.clone();
            let tx = tx.clone();
            std::thread::spawn(move || {
                let got = scheduler.dequeue_blocking();
                let _ = tx.send(got.map(|j| j.path().display().to_string()));
            })
        })
        .collect();

    // Let every waiter block before anything is queued.
    std::thread::sleep(Duration::from_millis(100));
    scheduler.enqueue(job("/only", 5));
    std::thread::sleep(Duration::from_millis(100));

    assert_eq!(rx.try_recv().unwrap(), Some("/only".to_string()));
    assert!(rx.try_recv().is_err(), "only one waiter should have woken");

    scheduler.close();
    for waiter in waiters {
        waiter.join().unwrap();
    }
    assert_eq!(rx.try_recv().unwrap(), None);
    assert_eq!(rx.try_recv().unwrap(), None);
}

#[test]
fn test_concurrent_producers_lose_nothing() {
    let scheduler = Arc::new(Scheduler::new());

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let scheduler = scheduler.clone();
            std::thread::spawn(move || {
                for i in 0..250 {
                    scheduler.enqueue(job(&format!("/p{p}/{i}"), i));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    assert_eq!(scheduler.len(), 1000);
    let mut last = i64::MIN;
    while let Some(job) = scheduler.try_dequeue() {
        assert!(job.declared_size() >= last);
        last = job.declared_size();
    }
    assert!(scheduler.is_empty());
}

#[test]
fn test_job_metadata() {
    let job = job("/data/file", 42);
    assert_eq!(job.declared_size(), 42);
    assert_eq!(job.reply_channel().to_str(), Some("/tmp/reply"));
    assert!(job.wait_ms() >= 0);
}
