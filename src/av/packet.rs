// Media packet

use std::sync::Arc;

use crate::flv::{MediaTagHeader, AAC_PACKET_TYPE_SEQUENCE_HEADER, SOUND_FORMAT_AAC};

/// Kind of media packet
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum MediaPacketKind {
    Audio,
    Video,
    Metadata,
}

/// Media packet relayed from a publisher to the subscribers of a stream
#[derive(Clone)]
pub struct MediaPacket {
    /// Packet kind
    pub kind: MediaPacketKind,

    /// Decoding timestamp (milliseconds)
    pub timestamp: u32,

    /// RTMP message stream ID the packet was received on
    pub stream_id: u32,

    /// Packet payload (shared between subscriber queues)
    pub data: Arc<Vec<u8>>,

    /// Parsed media tag header (audio and video packets)
    pub header: Option<MediaTagHeader>,
}

impl MediaPacket {
    /// Returns true for an AAC audio sequence header
    pub fn is_aac_sequence_header(&self) -> bool {
        match &self.header {
            Some(MediaTagHeader::Audio(h)) => {
                h.sound_format == SOUND_FORMAT_AAC
                    && h.aac_packet_type == AAC_PACKET_TYPE_SEQUENCE_HEADER
            }
            _ => false,
        }
    }

    /// Returns true for a video sequence header
    pub fn is_video_sequence_header(&self) -> bool {
        match &self.header {
            Some(MediaTagHeader::Video(h)) => h.is_sequence_header(),
            _ => false,
        }
    }

    /// Returns true for a video key frame
    pub fn is_key_frame(&self) -> bool {
        match &self.header {
            Some(MediaTagHeader::Video(h)) => h.is_key_frame(),
            _ => false,
        }
    }
}
