// Subscriber of a stream source

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::av::MediaPacketKind;

use super::PacketQueue;

/// One subscriber of a stream: its packet queue plus the
/// timestamp bookkeeping the egress task needs
pub struct StreamSubscriber {
    /// Session ID of the playing connection
    pub session_id: u64,

    /// Remote address, identifies the subscriber within its source
    pub addr: String,

    /// Queue the publisher task feeds and the egress task drains
    pub queue: PacketQueue,

    stopped: AtomicBool,
    cache_sent: AtomicBool,

    base_ts: AtomicU32,
    last_audio_ts: AtomicU32,
    last_video_ts: AtomicU32,
}

impl StreamSubscriber {
    /// Creates a subscriber
    pub fn new(session_id: u64, addr: String, queue_capacity: usize) -> StreamSubscriber {
        StreamSubscriber {
            session_id,
            addr,
            queue: PacketQueue::new(queue_capacity),
            stopped: AtomicBool::new(false),
            cache_sent: AtomicBool::new(false),
            base_ts: AtomicU32::new(0),
            last_audio_ts: AtomicU32::new(0),
            last_video_ts: AtomicU32::new(0),
        }
    }

    /// Returns true once the subscriber stopped (write error or teardown)
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Marks the subscriber as stopped and closes its queue
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
        self.queue.close();
    }

    /// Returns true once the cache bootstrap was enqueued
    pub fn cache_sent(&self) -> bool {
        self.cache_sent.load(Ordering::Relaxed)
    }

    /// Marks the cache bootstrap as enqueued
    pub fn mark_cache_sent(&self) {
        self.cache_sent.store(true, Ordering::Relaxed);
    }

    /// Timestamp base added to every outgoing packet
    pub fn base_timestamp(&self) -> u32 {
        self.base_ts.load(Ordering::Relaxed)
    }

    /// Records the timestamp of a delivered packet
    pub fn rec_timestamp(&self, timestamp: u32, kind: MediaPacketKind) {
        match kind {
            MediaPacketKind::Audio => {
                self.last_audio_ts.store(timestamp, Ordering::Relaxed);
            }
            MediaPacketKind::Video => {
                self.last_video_ts.store(timestamp, Ordering::Relaxed);
            }
            MediaPacketKind::Metadata => {}
        }
    }

    /// Rebases the subscriber clock so timestamps stay monotone when
    /// the stream it is attached to restarts from zero
    pub fn rebase(&self) {
        let last_audio = self.last_audio_ts.load(Ordering::Relaxed);
        let last_video = self.last_video_ts.load(Ordering::Relaxed);

        self.base_ts
            .store(std::cmp::max(last_audio, last_video), Ordering::Relaxed);

        self.cache_sent.store(false, Ordering::Relaxed);
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_rebase() {
        let sub = StreamSubscriber::new(1, "127.0.0.1:5000".to_string(), 128);

        assert_eq!(sub.base_timestamp(), 0);

        sub.rec_timestamp(3000, MediaPacketKind::Audio);
        sub.rec_timestamp(3040, MediaPacketKind::Video);
        sub.mark_cache_sent();

        sub.rebase();

        // A restarting publisher begins at zero, the subscriber
        // keeps seeing a non decreasing clock
        assert_eq!(sub.base_timestamp(), 3040);

        // The new stream needs a fresh bootstrap
        assert!(!sub.cache_sent());
    }
}
