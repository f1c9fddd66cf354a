// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Demo runtime exercising the publisher/subscriber ports end-to-end.
// Structured like the teacher's demo_send_recv.rs (two polling loops, one
// sender one receiver) but driven by a single in-process DaemonContext
// rather than two OS processes attaching a named channel.
//
// Usage: demo_pub_sub <message_count> <interval_ms>

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use iceshim::capro::ServiceDescription;
use iceshim::config::RouterConfig;
use iceshim::mem::{ChunkSettings, QueueFullPolicy};
use iceshim::port::publisher::{PublisherPortData, PublisherPortUser};
use iceshim::port::subscriber::{SubscriberFlavor, SubscriberPortData, SubscriberPortUser};
use iceshim::router::DaemonContext;

fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args: Vec<String> = std::env::args().collect();
    let message_count: u32 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(10);
    let interval_ms: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);

    let ctx = Arc::new(DaemonContext::new(RouterConfig::default_standalone()));
    let desc = ServiceDescription::new("demo", "counter", "tick");

    let publisher = PublisherPortData::new(
        ctx.allocate_port_id(),
        desc.clone(),
        "demo_pub_sub/producer".into(),
        Arc::clone(&ctx.memory),
        4,
        4,
        8,
        QueueFullPolicy::DiscardOldestData,
    );
    ctx.ports
        .register_publisher(Arc::clone(&publisher))
        .expect("register publisher");

    let subscriber = SubscriberPortData::new(
        ctx.allocate_port_id(),
        desc,
        "demo_pub_sub/consumer".into(),
        SubscriberFlavor::SingleProducer,
        1,
        8,
        8,
        2,
        QueueFullPolicy::DiscardOldestData,
    );
    ctx.ports
        .register_subscriber(Arc::clone(&subscriber))
        .expect("register subscriber");

    let stop = Arc::new(AtomicBool::new(false));

    let discovery_ctx = Arc::clone(&ctx);
    let discovery_stop = Arc::clone(&stop);
    let discovery = thread::spawn(move || {
        while !discovery_stop.load(Ordering::Acquire) {
            discovery_ctx.ports.run_discovery_tick();
            thread::sleep(Duration::from_millis(5));
        }
    });

    let sub_user = SubscriberPortUser(Arc::clone(&subscriber));
    sub_user.subscribe();

    let pub_user = PublisherPortUser(publisher);
    pub_user.offer();

    let receiver = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut received = 0u32;
            while received < message_count && !stop.load(Ordering::Acquire) {
                if let Ok(chunk) = sub_user.try_get_chunk() {
                    let value = u64::from_ne_bytes(chunk.payload().try_into().unwrap());
                    println!("recv: tick {value}");
                    sub_user.release_chunk(&chunk);
                    received += 1;
                } else {
                    thread::sleep(Duration::from_millis(5));
                }
            }
        })
    };

    thread::sleep(Duration::from_millis(50));
    for i in 0..message_count as u64 {
        let mut chunk = pub_user
            .try_allocate_chunk(ChunkSettings::new(8, 8))
            .expect("allocate tick chunk");
        unsafe {
            chunk.payload_mut().copy_from_slice(&i.to_ne_bytes());
        }
        pub_user.send_chunk(chunk);
        println!("send: tick {i}");
        thread::sleep(Duration::from_millis(interval_ms));
    }

    receiver.join().expect("receiver thread");
    stop.store(true, Ordering::Release);
    discovery.join().expect("discovery thread");
}
