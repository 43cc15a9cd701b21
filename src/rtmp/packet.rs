// RTMP packet model

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::{RTMP_CHUNK_TYPE_0, RTMP_CHUNK_TYPE_1, RTMP_CHUNK_TYPE_2, RTMP_CHUNK_TYPE_3};

/// Header of an outgoing RTMP packet
#[derive(Clone)]
pub struct RtmpPacketHeader {
    /// Timestamp
    pub timestamp: u32,

    /// Packet format
    pub format: u32,

    /// Channel ID (chunk stream ID)
    pub channel_id: u32,

    /// Packet type
    pub packet_type: u32,

    /// Message stream ID
    pub stream_id: u32,

    // Payload length
    pub length: usize,
}

/// Outgoing RTMP packet
#[derive(Clone)]
pub struct RtmpPacket {
    /// Packet header
    pub header: RtmpPacketHeader,

    /// Packet payload
    pub payload: Vec<u8>,
}

impl RtmpPacket {
    /// Creates new blank RTMP packet
    pub fn new_blank() -> RtmpPacket {
        RtmpPacket {
            header: RtmpPacketHeader {
                timestamp: 0,
                format: 0,
                channel_id: 0,
                packet_type: 0,
                stream_id: 0,
                length: 0,
            },
            payload: Vec::new(),
        }
    }

    /// Serializes a basic header for a RTMP packet
    ///
    /// # Arguments
    ///
    /// * `format` - Packet format
    /// * `channel_id` - Packet channel ID
    ///
    /// # Return value
    ///
    /// Returns the serialized bytes
    pub fn serialize_basic_header(format: u32, channel_id: u32) -> Vec<u8> {
        if channel_id >= 64 + 256 {
            vec![
                ((format << 6) as u8) | 1,
                ((channel_id - 64) & 0xff) as u8,
                (((channel_id - 64) >> 8) & 0xff) as u8,
            ]
        } else if channel_id >= 64 {
            vec![(format << 6) as u8, (channel_id - 64) as u8]
        } else {
            vec![((format << 6) as u8) | (channel_id as u8)]
        }
    }

    /// Serializes the message header of a RTMP packet
    ///
    /// # Arguments
    ///
    /// * `stream_id` - Message stream ID to write for format 0
    ///
    /// # Return value
    ///
    /// Returns the serialized bytes
    pub fn serialize_chunk_message_header(&self, stream_id: u32) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();

        if self.header.format <= RTMP_CHUNK_TYPE_2 {
            let mut b: Vec<u8> = vec![0; 4];

            if self.header.timestamp >= 0xffffff {
                BigEndian::write_u32(&mut b, 0xffffff);
            } else {
                BigEndian::write_u32(&mut b, self.header.timestamp);
            }

            out.extend(&b[1..]);
        }

        if self.header.format <= RTMP_CHUNK_TYPE_1 {
            let mut b: Vec<u8> = vec![0; 4];

            BigEndian::write_u32(&mut b, self.header.length as u32);

            out.extend(&b[1..]);
            out.push(self.header.packet_type as u8);
        }

        if self.header.format == RTMP_CHUNK_TYPE_0 {
            let mut b: Vec<u8> = vec![0; 4];

            LittleEndian::write_u32(&mut b, stream_id);

            out.extend(b);
        }

        out
    }

    /// Creates the chunks for an RTMP packet
    ///
    /// # Arguments
    ///
    /// * `out_chunk_size` - Size of the output chunks
    pub fn create_chunks(&self, out_chunk_size: usize) -> Vec<u8> {
        self.create_chunks_for_stream(self.header.stream_id, out_chunk_size)
    }

    /// Creates the chunks for an RTMP packet
    ///
    /// # Arguments
    ///
    /// * `stream_id` - Message stream ID to write
    /// * `out_chunk_size` - Size of the output chunks
    pub fn create_chunks_for_stream(&self, stream_id: u32, out_chunk_size: usize) -> Vec<u8> {
        let chunk_basic_header =
            Self::serialize_basic_header(self.header.format, self.header.channel_id);

        let chunk_basic_header_3 =
            Self::serialize_basic_header(RTMP_CHUNK_TYPE_3, self.header.channel_id);

        let chunk_message_header = self.serialize_chunk_message_header(stream_id);

        let use_extended_timestamp = self.header.timestamp >= 0xffffff;

        let payload_size = std::cmp::min(self.header.length, self.payload.len());

        let mut chunks: Vec<u8> =
            Vec::with_capacity(chunk_basic_header.len() + chunk_message_header.len() + payload_size);

        chunks.extend(&chunk_basic_header);
        chunks.extend(&chunk_message_header);

        if use_extended_timestamp {
            let mut b: Vec<u8> = vec![0; 4];
            BigEndian::write_u32(&mut b, self.header.timestamp);
            chunks.extend(&b);
        }

        let mut payload_offset: usize = 0;

        loop {
            let run = std::cmp::min(out_chunk_size, payload_size - payload_offset);

            chunks.extend(&self.payload[payload_offset..payload_offset + run]);
            payload_offset += run;

            if payload_offset >= payload_size {
                break;
            }

            // Continuation chunk
            chunks.extend(&chunk_basic_header_3);

            if use_extended_timestamp {
                let mut b: Vec<u8> = vec![0; 4];
                BigEndian::write_u32(&mut b, self.header.timestamp);
                chunks.extend(&b);
            }
        }

        chunks
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_basic_header() {
        // 1-byte form
        assert_eq!(RtmpPacket::serialize_basic_header(0, 3), vec![0x03]);
        assert_eq!(RtmpPacket::serialize_basic_header(3, 4), vec![0xc4]);

        // 2-byte form
        assert_eq!(RtmpPacket::serialize_basic_header(0, 64), vec![0x00, 0x00]);
        assert_eq!(RtmpPacket::serialize_basic_header(1, 319), vec![0x40, 0xff]);

        // 3-byte form
        assert_eq!(
            RtmpPacket::serialize_basic_header(0, 320),
            vec![0x01, 0x00, 0x01]
        );
        assert_eq!(
            RtmpPacket::serialize_basic_header(0, 65599),
            vec![0x01, 0xff, 0xff]
        );
    }

    #[test]
    fn test_create_chunks_single() {
        let mut packet = RtmpPacket::new_blank();

        packet.header.format = RTMP_CHUNK_TYPE_0;
        packet.header.channel_id = 3;
        packet.header.packet_type = 20;
        packet.header.stream_id = 0;
        packet.header.timestamp = 0;
        packet.payload = vec![0xaa; 100];
        packet.header.length = 100;

        let chunks = packet.create_chunks(128);

        // 1 basic header byte + 11 message header bytes + 100 payload bytes
        assert_eq!(chunks.len(), 112);
        assert_eq!(chunks[0], 0x03);
        assert_eq!(&chunks[4..7], &[0x00, 0x00, 0x64]);
        assert_eq!(chunks[7], 20);
    }

    #[test]
    fn test_create_chunks_zero_length() {
        let mut packet = RtmpPacket::new_blank();

        packet.header.format = RTMP_CHUNK_TYPE_0;
        packet.header.channel_id = 3;
        packet.header.packet_type = 20;

        let chunks = packet.create_chunks(128);

        // A zero length message still takes exactly one chunk, with no body
        assert_eq!(chunks.len(), 12);
    }

    #[test]
    fn test_create_chunks_split() {
        let mut packet = RtmpPacket::new_blank();

        packet.header.format = RTMP_CHUNK_TYPE_0;
        packet.header.channel_id = 4;
        packet.header.packet_type = 8;
        packet.header.stream_id = 1;
        packet.payload = vec![0x11; 300];
        packet.header.length = 300;

        let chunks = packet.create_chunks(128);

        // ceil(300 / 128) = 3 chunks, 2 continuation basic headers
        assert_eq!(chunks.len(), 1 + 11 + 300 + 2);

        // Continuation header after the first 128 payload bytes
        assert_eq!(chunks[1 + 11 + 128], 0xc4);
    }
}
