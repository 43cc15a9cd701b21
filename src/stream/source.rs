// Stream source: one publisher fanning out to N subscribers

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::av::MediaPacket;
use crate::rtmp::RtmpError;

use super::{StreamCache, StreamSubscriber};

/// A live stream: the state shared between the publisher ingress
/// task and the egress task of every subscriber
pub struct RtmpStreamSource {
    /// Stream key (vhost/app/stream)
    pub key: String,

    /// Session ID of the publisher, if any
    publisher: Mutex<Option<u64>>,

    /// Subscribers, by remote address
    subscribers: Mutex<HashMap<String, Arc<StreamSubscriber>>>,

    /// Cache-on-join state
    cache: Mutex<StreamCache>,
}

impl RtmpStreamSource {
    /// Creates a source owned by a publisher
    pub fn new(key: String, publisher_session_id: u64) -> RtmpStreamSource {
        RtmpStreamSource {
            key,
            publisher: Mutex::new(Some(publisher_session_id)),
            subscribers: Mutex::new(HashMap::new()),
            cache: Mutex::new(StreamCache::new()),
        }
    }

    /// Installs a publisher into an existing source
    ///
    /// Fails with StreamBusy if another publisher holds the source.
    /// On success the stale cache is cleared and every attached
    /// subscriber is rebased for the restarting stream clock.
    pub fn set_publisher(&self, session_id: u64) -> Result<(), RtmpError> {
        let mut publisher = self.publisher.lock().unwrap();

        if publisher.is_some() {
            return Err(RtmpError::StreamBusy);
        }

        *publisher = Some(session_id);

        drop(publisher);

        self.cache.lock().unwrap().clear();

        let subscribers = self.subscribers.lock().unwrap();

        for subscriber in subscribers.values() {
            subscriber.rebase();
        }

        Ok(())
    }

    /// Detaches the publisher, only if it still is the given session
    pub fn clear_publisher(&self, session_id: u64) {
        let mut publisher = self.publisher.lock().unwrap();

        if *publisher == Some(session_id) {
            *publisher = None;
        }
    }

    /// Returns true while a publisher holds the source
    pub fn has_publisher(&self) -> bool {
        self.publisher.lock().unwrap().is_some()
    }

    /// Adds a subscriber
    ///
    /// # Return value
    ///
    /// Returns false if the remote address is already subscribed
    pub fn add_subscriber(&self, subscriber: Arc<StreamSubscriber>) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap();

        if subscribers.contains_key(&subscriber.addr) {
            return false;
        }

        subscribers.insert(subscriber.addr.clone(), subscriber);

        true
    }

    /// Removes a subscriber by remote address
    pub fn remove_subscriber(&self, addr: &str) {
        let removed = self.subscribers.lock().unwrap().remove(addr);

        if let Some(subscriber) = removed {
            subscriber.stop();
        }
    }

    /// Number of attached subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    /// Relays a packet from the publisher to every subscriber
    ///
    /// Subscribers that have not been bootstrapped yet first receive
    /// the cached metadata and sequence headers, then the packet.
    /// The cache is updated afterwards, so a packet that belongs in
    /// the cache is never delivered twice to a joining subscriber.
    pub fn broadcast(&self, packet: &MediaPacket) {
        // Handles are copied out so no lock is held while enqueuing
        let subscribers: Vec<Arc<StreamSubscriber>> = self
            .subscribers
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect();

        let mut stopped_addrs: Vec<String> = Vec::new();
        let mut bootstrap: Option<Vec<MediaPacket>> = None;

        for subscriber in &subscribers {
            if subscriber.is_stopped() {
                stopped_addrs.push(subscriber.addr.clone());
                continue;
            }

            if !subscriber.cache_sent() {
                let packets = bootstrap
                    .get_or_insert_with(|| self.cache.lock().unwrap().bootstrap_packets());

                for cached in packets.iter() {
                    subscriber.queue.push(cached.clone());
                }

                subscriber.mark_cache_sent();
            }

            subscriber.queue.push(packet.clone());
        }

        self.cache.lock().unwrap().write(packet);

        if !stopped_addrs.is_empty() {
            let mut subscribers = self.subscribers.lock().unwrap();

            for addr in stopped_addrs {
                subscribers.remove(&addr);
            }
        }
    }

    /// Stops every subscriber and empties the set (source removal)
    pub fn close_all_subscribers(&self) {
        let mut subscribers = self.subscribers.lock().unwrap();

        for subscriber in subscribers.values() {
            subscriber.stop();
        }

        subscribers.clear();
    }
}

// Tests
