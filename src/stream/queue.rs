// Bounded packet queue with a producer side drop policy

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::av::{MediaPacket, MediaPacketKind};

/// Default capacity of a subscriber queue
pub const PACKET_QUEUE_CAPACITY_DEFAULT: usize = 1024;

// The drop policy thresholds only make sense with some room
const PACKET_QUEUE_CAPACITY_MIN: usize = 128;

// Queue length that triggers a drop pass
const DROP_TRIGGER_MARGIN: usize = 24;

// Number of dequeues a single drop pass performs
const DROP_PASS_MARGIN: usize = 84;

// Over this length even audio packets are dropped
const DROP_AUDIO_MARGIN: usize = 2;

// Over this length an extra video packet is dropped
const DROP_VIDEO_MARGIN: usize = 10;

struct PacketQueueState {
    items: VecDeque<MediaPacket>,
    closed: bool,
}

/// Single producer, single consumer packet queue
///
/// The producer never blocks: when the queue grows past its
/// threshold a drop pass discards packets, preferring to keep
/// metadata, sequence headers and key frames so the stream stays
/// decodable after a burst.
pub struct PacketQueue {
    capacity: usize,
    state: Mutex<PacketQueueState>,
    notify: Notify,
}

impl PacketQueue {
    /// Creates a queue with the given capacity
    pub fn new(capacity: usize) -> PacketQueue {
        PacketQueue {
            capacity: capacity.max(PACKET_QUEUE_CAPACITY_MIN),
            state: Mutex::new(PacketQueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    /// Number of packets currently queued
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    /// Returns true if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once the queue was closed
    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    /// Enqueues a packet, running the drop policy if the queue is congested
    /// Never blocks the producer
    pub fn push(&self, packet: MediaPacket) {
        let mut state = self.state.lock().unwrap();

        if state.closed {
            return;
        }

        if state.items.len() > self.capacity - DROP_TRIGGER_MARGIN {
            Self::run_drop_pass(&mut state.items, self.capacity);
        }

        if state.items.len() >= self.capacity {
            // Still full after the pass, the incoming packet loses
            return;
        }

        state.items.push_back(packet);

        drop(state);

        self.notify.notify_one();
    }

    /// Dequeues a packet, waiting for one to arrive
    ///
    /// # Return value
    ///
    /// Returns None once the queue is closed and drained
    pub async fn pop(&self) -> Option<MediaPacket> {
        loop {
            let notified = self.notify.notified();

            {
                let mut state = self.state.lock().unwrap();

                if let Some(packet) = state.items.pop_front() {
                    return Some(packet);
                }

                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Closes the queue, waking the consumer
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        drop(state);

        self.notify.notify_one();
    }

    /// Discards packets to relieve congestion
    /// Audio survives while there is room, video survives only for
    /// sequence headers and key frames, metadata always survives
    fn run_drop_pass(items: &mut VecDeque<MediaPacket>, capacity: usize) {
        for _ in 0..(capacity - DROP_PASS_MARGIN) {
            let packet = match items.pop_front() {
                Some(p) => p,
                None => break,
            };

            match packet.kind {
                MediaPacketKind::Audio => {
                    if items.len() <= capacity - DROP_AUDIO_MARGIN {
                        items.push_back(packet);
                    }
                }
                MediaPacketKind::Video => {
                    if packet.is_video_sequence_header() || packet.is_key_frame() {
                        items.push_back(packet);
                    }

                    if items.len() > capacity - DROP_VIDEO_MARGIN {
                        items.pop_front();
                    }
                }
                MediaPacketKind::Metadata => {
                    items.push_back(packet);
                }
            }
        }
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flv::{parse_video_tag_header, MediaTagHeader};
    use std::sync::Arc;

    fn video_packet(timestamp: u32, key_frame: bool) -> MediaPacket {
        let body: Vec<u8> = if key_frame {
            vec![0x17, 0x01, 0x00, 0x00, 0x00, 0xaa]
        } else {
            vec![0x27, 0x01, 0x00, 0x00, 0x00, 0xaa]
        };

        let header = parse_video_tag_header(&body).unwrap();

        MediaPacket {
            kind: MediaPacketKind::Video,
            timestamp,
            stream_id: 1,
            data: Arc::new(body),
            header: Some(MediaTagHeader::Video(header)),
        }
    }

    fn audio_packet(timestamp: u32) -> MediaPacket {
        let body = vec![0xaf, 0x01, 0x21];
        let header = crate::flv::parse_audio_tag_header(&body).unwrap();

        MediaPacket {
            kind: MediaPacketKind::Audio,
            timestamp,
            stream_id: 1,
            data: Arc::new(body),
            header: Some(MediaTagHeader::Audio(header)),
        }
    }

    fn metadata_packet() -> MediaPacket {
        MediaPacket {
            kind: MediaPacketKind::Metadata,
            timestamp: 0,
            stream_id: 1,
            data: Arc::new(vec![0x02]),
            header: None,
        }
    }

    #[tokio::test]
    async fn test_queue_fifo_order() {
        let queue = PacketQueue::new(128);

        for i in 0..10 {
            queue.push(video_packet(i, false));
        }

        for i in 0..10 {
            let packet = queue.pop().await.unwrap();
            assert_eq!(packet.timestamp, i);
        }

        queue.close();
        assert!(queue.pop().await.is_none());
    }

    #[tokio::test]
    async fn test_queue_close_drains_first() {
        let queue = PacketQueue::new(128);

        queue.push(audio_packet(1));
        queue.push(audio_packet(2));
        queue.close();

        assert!(queue.pop().await.is_some());
        assert!(queue.pop().await.is_some());
        assert!(queue.pop().await.is_none());

        // Pushes after close are ignored
        queue.push(audio_packet(3));
        assert!(queue.pop().await.is_none());
    }

    #[tokio::test]
    async fn test_drop_pass_keeps_key_frames_and_metadata() {
        let capacity = 128;
        let queue = PacketQueue::new(capacity);

        queue.push(metadata_packet());

        // Every 10th video packet is a key frame
        let mut pushed_keys = 0;
        for i in 0..(capacity as u32) {
            let key = i % 10 == 0;
            if key {
                pushed_keys += 1;
            }
            queue.push(video_packet(i, key));
        }

        // The drop policy must have run, the queue is not past capacity
        assert!(queue.len() < capacity);

        let mut metadata_seen = 0;
        let mut keys_seen = 0;

        queue.close();
        while let Some(packet) = queue.pop().await {
            match packet.kind {
                MediaPacketKind::Metadata => metadata_seen += 1,
                MediaPacketKind::Video => {
                    if packet.is_key_frame() {
                        keys_seen += 1;
                    }
                }
                MediaPacketKind::Audio => {}
            }
        }

        assert_eq!(metadata_seen, 1);
        assert_eq!(keys_seen, pushed_keys);
    }

    #[tokio::test]
    async fn test_producer_never_blocks() {
        let queue = PacketQueue::new(128);

        // Far past capacity without a consumer
        for i in 0..4096 {
            queue.push(video_packet(i, false));
        }

        assert!(queue.len() <= 128);
    }
}
