//! Multi-Producer Multi-Consumer Stress Test
//!
//! Producers hammer one device with tagged messages while consumers drain
//! it. Every message must arrive exactly once with its bytes intact.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;
use venom_mq::{DeviceConfig, MessageDevice, MqError};

const MESSAGES_PER_PRODUCER: u64 = 100_000;

#[derive(Default)]
struct Stats {
    sent: AtomicU64,
    full_retries: AtomicU64,
    received: AtomicU64,
    empty_polls: AtomicU64,
    corrupted: AtomicU64,
}

/// Payload: producer id, sequence number, then `pad` bytes derived from both.
fn encode(producer: u64, seq: u64, pad: usize) -> Vec<u8> {
    let mut msg = Vec::with_capacity(16 + pad);
    msg.extend_from_slice(&producer.to_le_bytes());
    msg.extend_from_slice(&seq.to_le_bytes());
    msg.extend((0..pad).map(|i| (producer as usize + seq as usize + i) as u8));
    msg
}

fn verify(msg: &[u8]) -> bool {
    if msg.len() < 16 {
        return false;
    }
    let (head, pad) = msg.split_at(16);
    let producer = u64::from_le_bytes(head[..8].try_into().unwrap_or_default());
    let seq = u64::from_le_bytes(head[8..].try_into().unwrap_or_default());
    encode(producer, seq, pad.len()) == msg
}

fn run_test(producers: u64, consumers: usize, pad: usize) {
    let device = MessageDevice::register(DeviceConfig::default()).expect("register device");
    let stats = Arc::new(Stats::default());
    let done = Arc::new(AtomicBool::new(false));
    let start = Arc::new(Barrier::new(producers as usize + consumers + 1));

    info!(producers, consumers, payload = pad + 16, "starting run");

    let producer_handles: Vec<_> = (0..producers)
        .map(|p| {
            let handle = device.open().expect("open device");
            let stats = Arc::clone(&stats);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for seq in 0..MESSAGES_PER_PRODUCER {
                    let msg = encode(p, seq, pad);
                    loop {
                        match handle.write(&msg) {
                            Ok(_) => break,
                            Err(MqError::QueueFull) => {
                                stats.full_retries.fetch_add(1, Ordering::Relaxed);
                                thread::yield_now();
                            }
                            Err(e) => panic!("write failed: {}", e),
                        }
                    }
                    stats.sent.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    let consumer_handles: Vec<_> = (0..consumers)
        .map(|_| {
            let handle = device.open().expect("open device");
            let stats = Arc::clone(&stats);
            let start = Arc::clone(&start);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut buf = vec![0u8; venom_mq::MAX_MESSAGE_SIZE];
                start.wait();
                loop {
                    match handle.read(&mut buf) {
                        Ok(n) => {
                            if !verify(&buf[..n]) {
                                stats.corrupted.fetch_add(1, Ordering::Relaxed);
                            }
                            stats.received.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(MqError::QueueEmpty) => {
                            if done.load(Ordering::Acquire) {
                                break;
                            }
                            stats.empty_polls.fetch_add(1, Ordering::Relaxed);
                            thread::yield_now();
                        }
                        Err(e) => panic!("read failed: {}", e),
                    }
                }
            })
        })
        .collect();

    let started = Instant::now();
    start.wait();

    for h in producer_handles {
        h.join().expect("producer thread");
    }
    done.store(true, Ordering::Release);
    for h in consumer_handles {
        h.join().expect("consumer thread");
    }

    let elapsed = started.elapsed().as_secs_f64();
    let received = stats.received.load(Ordering::Relaxed);

    println!("\n📊 RESULTS ({} producers, {} consumers, {} byte messages)", producers, consumers, pad + 16);
    println!("   Sent:          {}", stats.sent.load(Ordering::Relaxed));
    println!("   Received:      {}", received);
    println!("   Corrupted:     {}", stats.corrupted.load(Ordering::Relaxed));
    println!("   Full retries:  {}", stats.full_retries.load(Ordering::Relaxed));
    println!("   Empty polls:   {}", stats.empty_polls.load(Ordering::Relaxed));
    println!("   Duration:      {:.2} s", elapsed);
    println!("   ⚡ Throughput:  {:.0} msg/s", received as f64 / elapsed);

    assert_eq!(received, producers * MESSAGES_PER_PRODUCER);
    assert_eq!(stats.corrupted.load(Ordering::Relaxed), 0);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("venom_mq=info")),
        )
        .init();

    let cpus = thread::available_parallelism().map(|p| p.get()).unwrap_or(1);
    println!("VenomMQ stress test, {} CPUs available", cpus);

    // (producers, consumers, pad bytes)
    let configs = [(1, 1, 16), (4, 4, 240), (8, 2, 4080)];
    for (producers, consumers, pad) in configs {
        run_test(producers, consumers, pad);
    }
}
