// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Demo runtime exercising the client/server request-response ports,
// mirroring demo_pub_sub.rs's single-process DaemonContext harness.
//
// Usage: demo_client_server <request_count>

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use iceshim::capro::ServiceDescription;
use iceshim::config::RouterConfig;
use iceshim::mem::QueueFullPolicy;
use iceshim::port::client::{ClientPortData, ClientPortUser};
use iceshim::port::request_response::{request_header_settings, response_header_settings};
use iceshim::port::server::{ServerPortData, ServerPortUser};
use iceshim::router::DaemonContext;

fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args: Vec<String> = std::env::args().collect();
    let request_count: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(5);

    let ctx = Arc::new(DaemonContext::new(RouterConfig::default_standalone()));
    let desc = ServiceDescription::new("demo", "calculator", "square");

    let server = ServerPortData::new(
        ctx.allocate_port_id(),
        desc.clone(),
        "demo_client_server/server".into(),
        Arc::clone(&ctx.memory),
        1,
        8,
        4,
        8,
        QueueFullPolicy::DiscardOldestData,
    );
    ctx.ports
        .register_server(Arc::clone(&server))
        .expect("register server");

    let client = ClientPortData::new(
        ctx.allocate_port_id(),
        desc,
        "demo_client_server/client".into(),
        Arc::clone(&ctx.memory),
        2,
        8,
        8,
        QueueFullPolicy::DiscardOldestData,
    );
    ctx.ports
        .register_client(Arc::clone(&client))
        .expect("register client");

    let stop = Arc::new(AtomicBool::new(false));

    let discovery_ctx = Arc::clone(&ctx);
    let discovery_stop = Arc::clone(&stop);
    let discovery = thread::spawn(move || {
        while !discovery_stop.load(Ordering::Acquire) {
            discovery_ctx.ports.run_discovery_tick();
            thread::sleep(Duration::from_millis(5));
        }
    });

    let server_user = ServerPortUser(Arc::clone(&server));
    server_user.offer();

    let server_stop = Arc::clone(&stop);
    let server_thread = thread::spawn(move || {
        let mut handled = 0u64;
        while handled < request_count && !server_stop.load(Ordering::Acquire) {
            match server_user.try_get_request() {
                Ok(request) => {
                    let n = u64::from_ne_bytes(request.payload().try_into().unwrap());
                    let mut response = server_user
                        .try_allocate_response(response_header_settings(8, 8))
                        .expect("allocate response");
                    unsafe {
                        response.payload_mut().copy_from_slice(&(n * n).to_ne_bytes());
                    }
                    server_user
                        .send_response(&request, response)
                        .expect("send response");
                    server_user.release_request(&request);
                    handled += 1;
                }
                Err(_) => thread::sleep(Duration::from_millis(5)),
            }
        }
    });

    thread::sleep(Duration::from_millis(50));
    let client_user = ClientPortUser(client);
    client_user.connect();
    while client_user.connection_state() != iceshim::port::client::ClientConnectionState::Connected {
        thread::sleep(Duration::from_millis(5));
    }

    for n in 1..=request_count {
        let mut request = client_user
            .try_allocate_request(request_header_settings(8, 8))
            .expect("allocate request");
        unsafe {
            request.payload_mut().copy_from_slice(&n.to_ne_bytes());
        }
        client_user.send_request(request).expect("send request");

        loop {
            match client_user.try_get_response() {
                Ok(response) => {
                    let square = u64::from_ne_bytes(response.payload().try_into().unwrap());
                    println!("square({n}) = {square}");
                    client_user.release_response(&response);
                    break;
                }
                Err(_) => thread::sleep(Duration::from_millis(5)),
            }
        }
    }

    server_thread.join().expect("server thread");
    stop.store(true, Ordering::Release);
    discovery.join().expect("discovery thread");
}
