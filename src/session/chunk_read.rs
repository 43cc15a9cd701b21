// Chunk read logic

use byteorder::{BigEndian, ByteOrder};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    rtmp::{
        is_protocol_control_type, rtmp_make_ack, RtmpChunkStream, RtmpError, RtmpMessage,
        RTMP_CHUNK_TYPE_0, RTMP_CHUNK_TYPE_1, RTMP_CHUNK_TYPE_2, RTMP_CHUNK_TYPE_3,
        RTMP_MAX_CHUNK_SIZE, RTMP_MAX_CHUNK_STREAMS, RTMP_MIN_CHUNK_SIZE,
        RTMP_TYPE_SET_CHUNK_SIZE, RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE,
    },
};

use super::{session_write_bytes, RtmpSessionReadStatus};

/// Reads one complete RTMP message from the stream
///
/// Iterates over chunks, possibly interleaved across chunk streams,
/// until one message is fully reassembled. Chunk size and window
/// acknowledgement updates take effect before the next chunk is read,
/// and acknowledgements are emitted as the window threshold crosses.
///
/// # Arguments
///
/// * `read_stream` - IO stream to read bytes
/// * `write_stream` - IO stream to write bytes (acknowledgements)
/// * `read_status` - Status for the read task
/// * `logger` - Session logger
pub async fn read_rtmp_message<
    TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin,
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin,
>(
    read_stream: &mut TR,
    write_stream: &Mutex<TW>,
    read_status: &mut RtmpSessionReadStatus,
    logger: &Logger,
) -> Result<RtmpMessage, RtmpError> {
    loop {
        // Basic header

        let header_byte = read_u8(read_stream).await?;

        let tmp_format = ((header_byte >> 6) & 0x03) as u32;
        let mut csid = (header_byte & 0x3f) as u32;

        if csid == 0 {
            csid = 64 + read_u8(read_stream).await? as u32;
        } else if csid == 1 {
            let b0 = read_u8(read_stream).await? as u32;
            let b1 = read_u8(read_stream).await? as u32;
            csid = 64 + b0 + (b1 << 8);
        }

        // Reassembly state for the chunk stream

        if !read_status.chunk_streams.contains_key(&csid) {
            if read_status.chunk_streams.len() >= RTMP_MAX_CHUNK_STREAMS {
                return Err(RtmpError::ResourceExhausted(format!(
                    "too many chunk streams: {}",
                    read_status.chunk_streams.len()
                )));
            }

            read_status
                .chunk_streams
                .insert(csid, RtmpChunkStream::new(csid));
        }

        let remote_chunk_size = read_status.remote_chunk_size;

        let chunk_stream = read_status.chunk_streams.get_mut(&csid).unwrap();

        read_chunk(read_stream, chunk_stream, tmp_format, remote_chunk_size).await?;

        if !chunk_stream.got_full {
            continue;
        }

        let message = chunk_stream.take_message();

        // Chunk size and window updates apply to the very next chunk

        match message.packet_type {
            RTMP_TYPE_SET_CHUNK_SIZE => {
                if message.payload.len() >= 4 {
                    let size = BigEndian::read_u32(&message.payload[0..4]);
                    read_status.remote_chunk_size =
                        size.clamp(RTMP_MIN_CHUNK_SIZE, RTMP_MAX_CHUNK_SIZE);
                }
            }
            RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE => {
                if message.payload.len() >= 4 {
                    read_status.remote_window_ack = BigEndian::read_u32(&message.payload[0..4]);
                }
            }
            _ => {}
        }

        // Acknowledgement accounting

        if !is_protocol_control_type(message.packet_type) {
            let (total, wrapped) = read_status.bytes_received.overflowing_add(message.length);

            read_status.bytes_received = total;

            if wrapped {
                read_status.bytes_received_wraps = read_status.bytes_received_wraps.wrapping_add(1);
            }

            read_status.ack_counter = read_status.ack_counter.wrapping_add(message.length);

            if read_status.remote_window_ack > 0
                && read_status.ack_counter >= read_status.remote_window_ack
            {
                let ack_bytes = rtmp_make_ack(read_status.bytes_received);

                session_write_bytes(write_stream, &ack_bytes)
                    .await
                    .map_err(RtmpError::from_io)?;

                read_status.ack_counter = 0;

                if logger.config.trace_enabled {
                    logger.log_trace(&format!("Sent ACK: {}", read_status.bytes_received));
                }
            }
        }

        return Ok(message);
    }
}

/// Reads one chunk into the reassembly state of its chunk stream
async fn read_chunk<TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin>(
    read_stream: &mut TR,
    chunk_stream: &mut RtmpChunkStream,
    tmp_format: u32,
    remote_chunk_size: u32,
) -> Result<(), RtmpError> {
    if chunk_stream.remain > 0 && tmp_format != RTMP_CHUNK_TYPE_3 {
        return Err(RtmpError::protocol(&format!(
            "format {} chunk in the middle of a message ({} bytes remaining)",
            tmp_format, chunk_stream.remain
        )));
    }

    match tmp_format {
        RTMP_CHUNK_TYPE_0 => {
            chunk_stream.format = RTMP_CHUNK_TYPE_0;
            chunk_stream.initialized = true;

            let mut timestamp = read_u24_be(read_stream).await?;
            chunk_stream.msg_length = read_u24_be(read_stream).await?;
            chunk_stream.packet_type = read_u8(read_stream).await? as u32;
            chunk_stream.stream_id = read_u32_le(read_stream).await?;

            chunk_stream.time_extended = false;

            if timestamp == 0xffffff {
                timestamp = read_u32_be(read_stream).await?;
                chunk_stream.time_extended = true;
            }

            chunk_stream.timestamp = timestamp;
            chunk_stream.timestamp_delta = 0;

            chunk_stream.start_message();
        }
        RTMP_CHUNK_TYPE_1 => {
            chunk_stream.format = RTMP_CHUNK_TYPE_1;
            chunk_stream.initialized = true;

            let mut delta = read_u24_be(read_stream).await?;
            chunk_stream.msg_length = read_u24_be(read_stream).await?;
            chunk_stream.packet_type = read_u8(read_stream).await? as u32;

            chunk_stream.time_extended = false;

            if delta == 0xffffff {
                delta = read_u32_be(read_stream).await?;
                chunk_stream.time_extended = true;
            }

            chunk_stream.timestamp_delta = delta;
            chunk_stream.timestamp = chunk_stream.timestamp.wrapping_add(delta);

            chunk_stream.start_message();
        }
        RTMP_CHUNK_TYPE_2 => {
            chunk_stream.format = RTMP_CHUNK_TYPE_2;
            chunk_stream.initialized = true;

            let mut delta = read_u24_be(read_stream).await?;

            chunk_stream.time_extended = false;

            if delta == 0xffffff {
                delta = read_u32_be(read_stream).await?;
                chunk_stream.time_extended = true;
            }

            chunk_stream.timestamp_delta = delta;
            chunk_stream.timestamp = chunk_stream.timestamp.wrapping_add(delta);

            chunk_stream.start_message();
        }
        RTMP_CHUNK_TYPE_3 => {
            if !chunk_stream.initialized {
                return Err(RtmpError::protocol(
                    "format 3 chunk without a previous header",
                ));
            }

            if chunk_stream.remain == 0 {
                // A new message starts, inheriting the previous header

                match chunk_stream.format {
                    RTMP_CHUNK_TYPE_0 => {
                        if chunk_stream.time_extended {
                            chunk_stream.timestamp = read_u32_be(read_stream).await?;
                        }
                    }
                    _ => {
                        let delta = if chunk_stream.time_extended {
                            read_u32_be(read_stream).await?
                        } else {
                            chunk_stream.timestamp_delta
                        };

                        chunk_stream.timestamp = chunk_stream.timestamp.wrapping_add(delta);
                    }
                }

                chunk_stream.start_message();
            } else if chunk_stream.time_extended {
                // Continuation: the peer may or may not re-emit the
                // extended timestamp. Peek 4 bytes; on a mismatch they
                // belong to the payload and must be kept.

                let mut peek = [0u8; 4];

                read_stream
                    .read_exact(&mut peek)
                    .await
                    .map_err(RtmpError::from_io)?;

                let peeked_timestamp = u32::from_be_bytes(peek);

                if peeked_timestamp != chunk_stream.timestamp {
                    if chunk_stream.remain < 4 {
                        return Err(RtmpError::protocol("chunk continuation overflows message"));
                    }

                    let index = chunk_stream.index;
                    chunk_stream.data[index..index + 4].copy_from_slice(&peek);
                    chunk_stream.index += 4;
                    chunk_stream.remain -= 4;
                }
            }
        }
        _ => {
            return Err(RtmpError::protocol(&format!(
                "invalid chunk format: {}",
                tmp_format
            )));
        }
    }

    // Payload run: min(remote chunk size, remaining)

    let size = std::cmp::min(chunk_stream.remain, remote_chunk_size) as usize;

    if size > 0 {
        let index = chunk_stream.index;

        read_stream
            .read_exact(&mut chunk_stream.data[index..index + size])
            .await
            .map_err(RtmpError::from_io)?;

        chunk_stream.index += size;
        chunk_stream.remain -= size as u32;
    }

    if chunk_stream.remain == 0 {
        chunk_stream.got_full = true;
    }

    Ok(())
}

async fn read_u8<TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin>(
    read_stream: &mut TR,
) -> Result<u8, RtmpError> {
    read_stream.read_u8().await.map_err(RtmpError::from_io)
}

async fn read_u24_be<TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin>(
    read_stream: &mut TR,
) -> Result<u32, RtmpError> {
    let mut b = [0u8; 3];

    read_stream
        .read_exact(&mut b)
        .await
        .map_err(RtmpError::from_io)?;

    Ok(((b[0] as u32) << 16) | ((b[1] as u32) << 8) | (b[2] as u32))
}

async fn read_u32_be<TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin>(
    read_stream: &mut TR,
) -> Result<u32, RtmpError> {
    read_stream.read_u32().await.map_err(RtmpError::from_io)
}

async fn read_u32_le<TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin>(
    read_stream: &mut TR,
) -> Result<u32, RtmpError> {
    read_stream.read_u32_le().await.map_err(RtmpError::from_io)
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtmp::{
        rtmp_make_chunk_size_set_message, RtmpPacket, RTMP_TYPE_AUDIO, RTMP_TYPE_INVOKE,
    };
    use tokio::io::AsyncWriteExt;

    fn make_packet(
        csid: u32,
        packet_type: u32,
        stream_id: u32,
        timestamp: u32,
        payload: Vec<u8>,
    ) -> RtmpPacket {
        let mut packet = RtmpPacket::new_blank();

        packet.header.format = RTMP_CHUNK_TYPE_0;
        packet.header.channel_id = csid;
        packet.header.packet_type = packet_type;
        packet.header.stream_id = stream_id;
        packet.header.timestamp = timestamp;
        packet.header.length = payload.len();
        packet.payload = payload;

        packet
    }

    async fn round_trip(timestamp: u32, payload_len: usize, chunk_size: usize) -> RtmpMessage {
        let logger = Logger::new_disabled();

        let payload: Vec<u8> = (0..payload_len).map(|i| (i % 251) as u8).collect();
        let packet = make_packet(4, RTMP_TYPE_AUDIO, 1, timestamp, payload);
        let bytes = packet.create_chunks(chunk_size);

        let (mut client, server) = tokio::io::duplex(1 << 20);
        let (mut server_read, server_write) = tokio::io::split(server);
        let write_stream = Mutex::new(server_write);

        client.write_all(&bytes).await.unwrap();

        let mut read_status = RtmpSessionReadStatus::new();
        read_status.remote_chunk_size = chunk_size as u32;

        read_rtmp_message(&mut server_read, &write_stream, &mut read_status, &logger)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_chunk_splits() {
        for chunk_size in [128, 4096, 60000] {
            let message = round_trip(1000, 150000, chunk_size).await;

            assert_eq!(message.csid, 4);
            assert_eq!(message.packet_type, RTMP_TYPE_AUDIO);
            assert_eq!(message.stream_id, 1);
            assert_eq!(message.timestamp, 1000);
            assert_eq!(message.length, 150000);

            let expected: Vec<u8> = (0..150000).map(|i| (i % 251) as u8).collect();
            assert_eq!(message.payload, expected);
        }
    }

    #[tokio::test]
    async fn test_round_trip_extended_timestamps() {
        for timestamp in [0xfffffeu32, 0xffffff, u32::MAX] {
            let message = round_trip(timestamp, 300, 128).await;

            assert_eq!(message.timestamp, timestamp);
            assert_eq!(message.length, 300);
        }
    }

    #[tokio::test]
    async fn test_round_trip_zero_length_message() {
        let message = round_trip(0, 0, 128).await;

        assert_eq!(message.length, 0);
        assert!(message.payload.is_empty());
    }

    #[tokio::test]
    async fn test_format_3_first_is_protocol_error() {
        let logger = Logger::new_disabled();

        let (mut client, server) = tokio::io::duplex(4096);
        let (mut server_read, server_write) = tokio::io::split(server);
        let write_stream = Mutex::new(server_write);

        // fmt=3, csid=4, on a fresh connection
        client.write_all(&[0xc4]).await.unwrap();

        let mut read_status = RtmpSessionReadStatus::new();

        let result =
            read_rtmp_message(&mut server_read, &write_stream, &mut read_status, &logger).await;

        assert!(matches!(result, Err(RtmpError::ProtocolError(_))));
    }

    #[tokio::test]
    async fn test_mid_message_format_change_is_protocol_error() {
        let logger = Logger::new_disabled();

        let payload: Vec<u8> = vec![0xaa; 200];
        let packet = make_packet(4, RTMP_TYPE_AUDIO, 1, 0, payload);
        let bytes = packet.create_chunks(128);

        // Truncate to the first chunk, then start a new fmt=0 header on the same csid
        let first_chunk = &bytes[..1 + 11 + 128];

        let (mut client, server) = tokio::io::duplex(4096);
        let (mut server_read, server_write) = tokio::io::split(server);
        let write_stream = Mutex::new(server_write);

        let mut stream_bytes = first_chunk.to_vec();
        stream_bytes.extend(packet.create_chunks(128));

        client.write_all(&stream_bytes).await.unwrap();

        let mut read_status = RtmpSessionReadStatus::new();

        let result =
            read_rtmp_message(&mut server_read, &write_stream, &mut read_status, &logger).await;

        assert!(matches!(result, Err(RtmpError::ProtocolError(_))));
    }

    #[tokio::test]
    async fn test_set_chunk_size_applies_to_next_chunk() {
        let logger = Logger::new_disabled();

        let (mut client, server) = tokio::io::duplex(1 << 16);
        let (mut server_read, server_write) = tokio::io::split(server);
        let write_stream = Mutex::new(server_write);

        // SetChunkSize(1), then a message chunked at size 1
        client
            .write_all(&rtmp_make_chunk_size_set_message(1))
            .await
            .unwrap();

        let packet = make_packet(3, RTMP_TYPE_INVOKE, 0, 0, vec![0x01, 0x02, 0x03]);
        client.write_all(&packet.create_chunks(1)).await.unwrap();

        let mut read_status = RtmpSessionReadStatus::new();

        let first =
            read_rtmp_message(&mut server_read, &write_stream, &mut read_status, &logger)
                .await
                .unwrap();

        assert_eq!(first.packet_type, RTMP_TYPE_SET_CHUNK_SIZE);
        assert_eq!(read_status.remote_chunk_size, 1);

        let second =
            read_rtmp_message(&mut server_read, &write_stream, &mut read_status, &logger)
                .await
                .unwrap();

        assert_eq!(second.payload, vec![0x01, 0x02, 0x03]);
    }

    #[tokio::test]
    async fn test_interleaved_chunk_streams() {
        let logger = Logger::new_disabled();

        let packet_a = make_packet(4, RTMP_TYPE_AUDIO, 1, 10, vec![0xaa; 300]);
        let bytes_a = packet_a.create_chunks(128);

        let packet_b = make_packet(5, RTMP_TYPE_AUDIO, 1, 20, vec![0xbb; 50]);
        let bytes_b = packet_b.create_chunks(128);

        // First chunk of A, all of B, the rest of A
        let first_chunk_len = 1 + 11 + 128;

        let mut stream_bytes = bytes_a[..first_chunk_len].to_vec();
        stream_bytes.extend(&bytes_b);
        stream_bytes.extend(&bytes_a[first_chunk_len..]);

        let (mut client, server) = tokio::io::duplex(1 << 16);
        let (mut server_read, server_write) = tokio::io::split(server);
        let write_stream = Mutex::new(server_write);

        client.write_all(&stream_bytes).await.unwrap();

        let mut read_status = RtmpSessionReadStatus::new();

        // B completes first
        let first =
            read_rtmp_message(&mut server_read, &write_stream, &mut read_status, &logger)
                .await
                .unwrap();

        assert_eq!(first.csid, 5);
        assert_eq!(first.payload, vec![0xbb; 50]);

        let second =
            read_rtmp_message(&mut server_read, &write_stream, &mut read_status, &logger)
                .await
                .unwrap();

        assert_eq!(second.csid, 4);
        assert_eq!(second.payload, vec![0xaa; 300]);
    }

    #[tokio::test]
    async fn test_format_1_and_3_deltas() {
        let logger = Logger::new_disabled();

        // fmt=0 message at ts=1000, then fmt=1 with delta 40,
        // then fmt=3 re-applying the latched delta
        let mut stream_bytes: Vec<u8> = Vec::new();

        // fmt=0, csid=4: ts 1000, len 2, type 8, stream 1
        stream_bytes.extend(&[0x04]);
        stream_bytes.extend(&[0x00, 0x03, 0xe8]);
        stream_bytes.extend(&[0x00, 0x00, 0x02]);
        stream_bytes.push(0x08);
        stream_bytes.extend(&[0x01, 0x00, 0x00, 0x00]);
        stream_bytes.extend(&[0x11, 0x22]);

        // fmt=1, csid=4: delta 40, len 2, type 8
        stream_bytes.extend(&[0x44]);
        stream_bytes.extend(&[0x00, 0x00, 0x28]);
        stream_bytes.extend(&[0x00, 0x00, 0x02]);
        stream_bytes.push(0x08);
        stream_bytes.extend(&[0x33, 0x44]);

        // fmt=3, csid=4: new message, latched delta re-applied
        stream_bytes.extend(&[0xc4]);
        stream_bytes.extend(&[0x55, 0x66]);

        let (mut client, server) = tokio::io::duplex(4096);
        let (mut server_read, server_write) = tokio::io::split(server);
        let write_stream = Mutex::new(server_write);

        client.write_all(&stream_bytes).await.unwrap();

        let mut read_status = RtmpSessionReadStatus::new();

        let first =
            read_rtmp_message(&mut server_read, &write_stream, &mut read_status, &logger)
                .await
                .unwrap();

        assert_eq!(first.timestamp, 1000);
        assert_eq!(first.stream_id, 1);
        assert_eq!(first.payload, vec![0x11, 0x22]);

        let second =
            read_rtmp_message(&mut server_read, &write_stream, &mut read_status, &logger)
                .await
                .unwrap();

        assert_eq!(second.timestamp, 1040);
        assert_eq!(second.stream_id, 1);
        assert_eq!(second.payload, vec![0x33, 0x44]);

        let third =
            read_rtmp_message(&mut server_read, &write_stream, &mut read_status, &logger)
                .await
                .unwrap();

        assert_eq!(third.timestamp, 1080);
        assert_eq!(third.payload, vec![0x55, 0x66]);
    }

    #[tokio::test]
    async fn test_continuation_without_extended_timestamp_re_emission() {
        let logger = Logger::new_disabled();

        // The message timestamp needs the extended field, but the peer
        // does not re-emit it on the continuation chunk: the peeked
        // bytes are payload and must be kept
        let timestamp: u32 = 0x01000000;

        let mut stream_bytes: Vec<u8> = Vec::new();

        // fmt=0, csid=4: ts 0xffffff marker, len 8, type 8, stream 1, extended ts
        stream_bytes.extend(&[0x04]);
        stream_bytes.extend(&[0xff, 0xff, 0xff]);
        stream_bytes.extend(&[0x00, 0x00, 0x08]);
        stream_bytes.push(0x08);
        stream_bytes.extend(&[0x01, 0x00, 0x00, 0x00]);
        stream_bytes.extend(&timestamp.to_be_bytes());
        stream_bytes.extend(&[0x01, 0x02, 0x03, 0x04]);

        // Continuation with no extended timestamp prefix
        stream_bytes.extend(&[0xc4]);
        stream_bytes.extend(&[0x05, 0x06, 0x07, 0x08]);

        let (mut client, server) = tokio::io::duplex(4096);
        let (mut server_read, server_write) = tokio::io::split(server);
        let write_stream = Mutex::new(server_write);

        client.write_all(&stream_bytes).await.unwrap();

        let mut read_status = RtmpSessionReadStatus::new();
        read_status.remote_chunk_size = 4;

        let message =
            read_rtmp_message(&mut server_read, &write_stream, &mut read_status, &logger)
                .await
                .unwrap();

        assert_eq!(message.timestamp, timestamp);
        assert_eq!(
            message.payload,
            vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
        );
    }

    #[tokio::test]
    async fn test_ack_emission() {
        let logger = Logger::new_disabled();

        let (mut client, server) = tokio::io::duplex(1 << 16);
        let (mut server_read, server_write) = tokio::io::split(server);
        let write_stream = Mutex::new(server_write);

        // Five 50 byte messages with a 100 byte window
        for i in 0..5u32 {
            let packet = make_packet(4, RTMP_TYPE_AUDIO, 1, i * 40, vec![i as u8; 50]);
            client.write_all(&packet.create_chunks(128)).await.unwrap();
        }

        let mut read_status = RtmpSessionReadStatus::new();
        read_status.remote_window_ack = 100;

        for _ in 0..5 {
            read_rtmp_message(&mut server_read, &write_stream, &mut read_status, &logger)
                .await
                .unwrap();
        }

        assert_eq!(read_status.bytes_received, 250);
        assert_eq!(read_status.ack_counter, 50);

        // Exactly two acknowledgements were written, carrying 100 and 200
        let mut ack_bytes = [0u8; 32];
        client.read_exact(&mut ack_bytes).await.unwrap();

        assert_eq!(ack_bytes[7], 0x03);
        assert_eq!(BigEndian::read_u32(&ack_bytes[12..16]), 100);

        assert_eq!(ack_bytes[16 + 7], 0x03);
        assert_eq!(BigEndian::read_u32(&ack_bytes[16 + 12..16 + 16]), 200);
    }
}
