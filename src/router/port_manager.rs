// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Discovery dispatch: matches publishers to subscribers and servers to
// clients by ServiceDescription, and relays CaPro messages between them.
// Grounded on the teacher's Route/Channel pairing logic in channel.rs,
// generalized from "one named channel" to "match by descriptor, many
// pairs".

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::capro::CaProMessage;
use crate::error::PortPoolError;
use crate::port::client::{ClientPortData, ClientPortRouDi};
use crate::port::publisher::{PublisherPortData, PublisherPortRouDi};
use crate::port::server::{ServerPortData, ServerPortRouDi};
use crate::port::subscriber::{SubscriberPortData, SubscriberPortRouDi};
use crate::router::registry::RuntimeRegistry;

/// Router-wide cap on how many ports of a single kind may be registered
/// at once, mirroring `ChunkDistributor::add_queue`'s fixed-capacity
/// check. Overridable via `RouterConfig::max_ports_per_kind`.
pub const DEFAULT_MAX_PORTS_PER_KIND: usize = 256;

fn remove_by_id<T>(list: &Mutex<Vec<Arc<T>>>, id: u64, get_id: impl Fn(&T) -> u64) -> Option<Arc<T>> {
    let mut guard = list.lock().unwrap();
    let pos = guard.iter().position(|p| get_id(p) == id)?;
    Some(guard.remove(pos))
}

pub struct PortManager {
    publishers: Mutex<Vec<Arc<PublisherPortData>>>,
    subscribers: Mutex<Vec<Arc<SubscriberPortData>>>,
    servers: Mutex<Vec<Arc<ServerPortData>>>,
    clients: Mutex<Vec<Arc<ClientPortData>>>,
    max_ports: usize,
    runtimes: Arc<Mutex<RuntimeRegistry>>,
}

impl PortManager {
    pub fn new(max_ports: usize, runtimes: Arc<Mutex<RuntimeRegistry>>) -> Self {
        Self {
            publishers: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            servers: Mutex::new(Vec::new()),
            clients: Mutex::new(Vec::new()),
            max_ports,
            runtimes,
        }
    }

    pub fn register_publisher(&self, port: Arc<PublisherPortData>) -> Result<(), PortPoolError> {
        let mut publishers = self.publishers.lock().unwrap();
        if publishers.len() >= self.max_ports {
            return Err(PortPoolError::PublisherPortListFull);
        }
        self.runtimes.lock().unwrap().attach_port(&port.runtime_name, port.id);
        publishers.push(port);
        Ok(())
    }

    pub fn register_subscriber(&self, port: Arc<SubscriberPortData>) -> Result<(), PortPoolError> {
        let mut subscribers = self.subscribers.lock().unwrap();
        if subscribers.len() >= self.max_ports {
            return Err(PortPoolError::SubscriberPortListFull);
        }
        self.runtimes.lock().unwrap().attach_port(&port.runtime_name, port.id);
        subscribers.push(port);
        Ok(())
    }

    pub fn register_server(&self, port: Arc<ServerPortData>) -> Result<(), PortPoolError> {
        let mut servers = self.servers.lock().unwrap();
        if servers.len() >= self.max_ports {
            return Err(PortPoolError::ServerPortListFull);
        }
        self.runtimes.lock().unwrap().attach_port(&port.runtime_name, port.id);
        servers.push(port);
        Ok(())
    }

    pub fn register_client(&self, port: Arc<ClientPortData>) -> Result<(), PortPoolError> {
        let mut clients = self.clients.lock().unwrap();
        if clients.len() >= self.max_ports {
            return Err(PortPoolError::ClientPortListFull);
        }
        self.runtimes.lock().unwrap().attach_port(&port.runtime_name, port.id);
        clients.push(port);
        Ok(())
    }

    pub fn publisher_count(&self) -> usize {
        self.publishers.lock().unwrap().len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    /// Removes a reclaimed port from whichever list it belongs to and
    /// detaches it from any distributor it was attached to, either as the
    /// distributing side (publisher/server) or as an attached consumer
    /// (subscriber/client). Called by the router's runtime reaper.
    pub fn detach_port(&self, port_id: u64) {
        if let Some(p) = remove_by_id(&self.publishers, port_id, |p| p.id) {
            crate::port::publisher::PublisherPortUser(p).force_detach();
            debug!(port_id, "detached reclaimed publisher");
            return;
        }
        if let Some(s) = remove_by_id(&self.subscribers, port_id, |s| s.id) {
            let queue_id = s.queue_id.0;
            for p in self.publishers.lock().unwrap().iter() {
                crate::port::publisher::PublisherPortUser(Arc::clone(p)).detach_queue(queue_id);
            }
            debug!(port_id, "detached reclaimed subscriber");
            return;
        }
        if let Some(srv) = remove_by_id(&self.servers, port_id, |s| s.id) {
            crate::port::server::ServerPortUser(srv).force_detach();
            debug!(port_id, "detached reclaimed server");
            return;
        }
        if let Some(c) = remove_by_id(&self.clients, port_id, |c| c.id) {
            let queue_id = crate::port::client::ClientPortUser(Arc::clone(&c)).response_queue_id();
            for s in self.servers.lock().unwrap().iter() {
                crate::port::server::ServerPortUser(Arc::clone(s)).detach_queue(queue_id);
            }
            debug!(port_id, "detached reclaimed client");
        }
    }

    /// One pass over every port's pending state transitions. Called in a
    /// loop by the router's discovery thread.
    pub fn run_discovery_tick(&self) {
        self.drive_publishers();
        self.drive_subscribers();
        self.drive_servers();
        self.drive_clients();
    }

    fn drive_publishers(&self) {
        let publishers = self.publishers.lock().unwrap().clone();
        for pub_data in publishers {
            let roudi = PublisherPortRouDi(Arc::clone(&pub_data));
            let Some(msg) = roudi.try_get_capro_message() else { continue };
            debug!(port = pub_data.id, ?msg, "publisher emitted discovery message");
            if let CaProMessage::Offer(desc) = &msg {
                let subscribers = self.subscribers.lock().unwrap().clone();
                for sub_data in subscribers {
                    if sub_data.desc != *desc {
                        continue;
                    }
                    let sub_roudi = SubscriberPortRouDi(Arc::clone(&sub_data));
                    if let Some(sub_msg) = sub_roudi.dispatch_capro_message(CaProMessage::Offer(desc.clone())) {
                        if let Some(reply) = roudi.dispatch_capro_message(sub_msg) {
                            sub_roudi.dispatch_capro_message(reply);
                        }
                    }
                }
            }
        }
    }

    fn drive_subscribers(&self) {
        let subscribers = self.subscribers.lock().unwrap().clone();
        for sub_data in subscribers {
            let roudi = SubscriberPortRouDi(Arc::clone(&sub_data));
            let Some(msg) = roudi.try_get_capro_message() else { continue };
            debug!(port = sub_data.id, ?msg, "subscriber emitted discovery message");
            let desc = msg.service_description().clone();
            // Sub must only match an offered publisher; Unsub must reach its
            // publisher (if it still exists) regardless of offer state, so the
            // distributor's queue is detached instead of leaking.
            let require_offered = matches!(msg, CaProMessage::Sub { .. });
            let publisher = self
                .publishers
                .lock()
                .unwrap()
                .iter()
                .find(|p| {
                    p.desc == desc
                        && (!require_offered
                            || crate::port::publisher::PublisherPortUser(Arc::clone(p)).is_offered())
                })
                .cloned();
            let reply = match publisher {
                Some(p) => PublisherPortRouDi(p).dispatch_capro_message(msg),
                None => Some(CaProMessage::Nack(desc)),
            };
            if let Some(reply) = reply {
                roudi.dispatch_capro_message(reply);
            }
        }
    }

    fn drive_servers(&self) {
        let servers = self.servers.lock().unwrap().clone();
        for server_data in servers {
            let roudi = ServerPortRouDi(Arc::clone(&server_data));
            let Some(msg) = roudi.try_get_capro_message() else { continue };
            debug!(port = server_data.id, ?msg, "server emitted discovery message");
            if let CaProMessage::Offer(desc) = &msg {
                let clients = self.clients.lock().unwrap().clone();
                for client_data in clients {
                    if client_data.desc != *desc {
                        continue;
                    }
                    let client_roudi = ClientPortRouDi(Arc::clone(&client_data));
                    if let Some(client_msg) =
                        client_roudi.dispatch_capro_message(CaProMessage::Offer(desc.clone()))
                    {
                        if let Some(reply) = roudi.dispatch_capro_message(client_msg) {
                            client_roudi.dispatch_capro_message(reply);
                        }
                    }
                }
            }
        }
    }

    fn drive_clients(&self) {
        let clients = self.clients.lock().unwrap().clone();
        for client_data in clients {
            let roudi = ClientPortRouDi(Arc::clone(&client_data));
            let Some(msg) = roudi.try_get_capro_message() else { continue };
            debug!(port = client_data.id, ?msg, "client emitted discovery message");
            let desc = msg.service_description().clone();
            let server = self
                .servers
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.desc == desc && crate::port::server::ServerPortUser(Arc::clone(s)).is_offered())
                .cloned();
            let reply = match server {
                Some(s) => ServerPortRouDi(s).dispatch_capro_message(msg),
                None => Some(CaProMessage::Nack(desc)),
            };
            if let Some(reply) = reply {
                roudi.dispatch_capro_message(reply);
            }
        }
    }
}
