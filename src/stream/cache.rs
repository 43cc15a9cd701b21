// Cache-on-join state of a stream

use crate::av::{MediaPacket, MediaPacketKind};

/// Packets a subscriber needs before it can decode mid-stream:
/// the last metadata and the audio / video sequence headers
pub struct StreamCache {
    /// Last metadata packet
    pub metadata: Option<MediaPacket>,

    /// Last video sequence header
    pub video_seq: Option<MediaPacket>,

    /// Last audio sequence header (AAC)
    pub audio_seq: Option<MediaPacket>,
}

impl StreamCache {
    /// Creates an empty cache
    pub fn new() -> StreamCache {
        StreamCache {
            metadata: None,
            video_seq: None,
            audio_seq: None,
        }
    }

    /// Stores a packet if it belongs in the cache
    pub fn write(&mut self, packet: &MediaPacket) {
        match packet.kind {
            MediaPacketKind::Metadata => {
                self.metadata = Some(packet.clone());
            }
            MediaPacketKind::Audio => {
                if packet.is_aac_sequence_header() {
                    self.audio_seq = Some(packet.clone());
                }
            }
            MediaPacketKind::Video => {
                if packet.is_video_sequence_header() {
                    self.video_seq = Some(packet.clone());
                }
            }
        }
    }

    /// Packets for the bootstrap of a joining subscriber,
    /// in the order they must be delivered
    pub fn bootstrap_packets(&self) -> Vec<MediaPacket> {
        let mut packets: Vec<MediaPacket> = Vec::with_capacity(3);

        if let Some(metadata) = &self.metadata {
            packets.push(metadata.clone());
        }

        if let Some(video_seq) = &self.video_seq {
            packets.push(video_seq.clone());
        }

        if let Some(audio_seq) = &self.audio_seq {
            packets.push(audio_seq.clone());
        }

        packets
    }

    /// Clears the cache (publisher replaced)
    pub fn clear(&mut self) {
        self.metadata = None;
        self.video_seq = None;
        self.audio_seq = None;
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flv::{
        parse_audio_tag_header, parse_video_tag_header, MediaTagHeader,
    };
    use std::sync::Arc;

    fn packet(kind: MediaPacketKind, body: Vec<u8>) -> MediaPacket {
        let header = match kind {
            MediaPacketKind::Audio => Some(MediaTagHeader::Audio(
                parse_audio_tag_header(&body).unwrap(),
            )),
            MediaPacketKind::Video => Some(MediaTagHeader::Video(
                parse_video_tag_header(&body).unwrap(),
            )),
            MediaPacketKind::Metadata => None,
        };

        MediaPacket {
            kind,
            timestamp: 0,
            stream_id: 1,
            data: Arc::new(body),
            header,
        }
    }

    #[test]
    fn test_cache_write_and_bootstrap_order() {
        let mut cache = StreamCache::new();

        // Regular frames are not cached
        cache.write(&packet(
            MediaPacketKind::Video,
            vec![0x27, 0x01, 0x00, 0x00, 0x00, 0x01],
        ));
        cache.write(&packet(MediaPacketKind::Audio, vec![0xaf, 0x01, 0x21]));

        assert!(cache.bootstrap_packets().is_empty());

        // Sequence headers and metadata are
        cache.write(&packet(MediaPacketKind::Audio, vec![0xaf, 0x00, 0x12]));
        cache.write(&packet(
            MediaPacketKind::Video,
            vec![0x17, 0x00, 0x00, 0x00, 0x00, 0x01],
        ));
        cache.write(&packet(MediaPacketKind::Metadata, vec![0x02, 0x00, 0x00]));

        let bootstrap = cache.bootstrap_packets();

        assert_eq!(bootstrap.len(), 3);
        assert!(matches!(bootstrap[0].kind, MediaPacketKind::Metadata));
        assert!(matches!(bootstrap[1].kind, MediaPacketKind::Video));
        assert!(matches!(bootstrap[2].kind, MediaPacketKind::Audio));

        cache.clear();
        assert!(cache.bootstrap_packets().is_empty());
    }
}
