// Protocol control message handling

use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};

use crate::{
    log::Logger,
    rtmp::{
        RtmpError, RtmpMessage, RTMP_TYPE_ABORT, RTMP_TYPE_ACKNOWLEDGEMENT, RTMP_TYPE_EVENT,
        RTMP_TYPE_SET_CHUNK_SIZE, RTMP_TYPE_SET_PEER_BANDWIDTH,
        RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE, STREAM_BEGIN, STREAM_IS_RECORDED,
    },
    server::RtmpServerContext,
};

use super::RtmpSessionReadStatus;

/// Handles a protocol control message
///
/// The chunk size and window acknowledgement values were already
/// applied by the chunk reader; this handles the rest and logging.
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - The server context
/// * `message` - The message to handle
/// * `read_status` - Status for the read task
pub fn handle_rtmp_message_protocol(
    logger: &Arc<Logger>,
    server_context: &RtmpServerContext,
    message: &RtmpMessage,
    read_status: &mut RtmpSessionReadStatus,
) -> Result<(), RtmpError> {
    let log_debug = server_context.config.log_requests && logger.config.debug_enabled;

    match message.packet_type {
        RTMP_TYPE_SET_CHUNK_SIZE => {
            if message.payload.len() < 4 {
                return Err(RtmpError::protocol("SetChunkSize body too short"));
            }

            if log_debug {
                logger.log_debug(&format!(
                    "Peer chunk size: {}",
                    read_status.remote_chunk_size
                ));
            }
        }
        RTMP_TYPE_ABORT => {
            if message.payload.len() < 4 {
                return Err(RtmpError::protocol("Abort body too short"));
            }

            let csid = BigEndian::read_u32(&message.payload[0..4]);

            if let Some(chunk_stream) = read_status.chunk_streams.get_mut(&csid) {
                chunk_stream.discard();
            }

            if log_debug {
                logger.log_debug(&format!("Peer aborted chunk stream: {}", csid));
            }
        }
        RTMP_TYPE_ACKNOWLEDGEMENT => {
            if server_context.config.log_requests && logger.config.trace_enabled {
                let sequence = if message.payload.len() >= 4 {
                    BigEndian::read_u32(&message.payload[0..4])
                } else {
                    0
                };

                logger.log_trace(&format!("Peer ACK: {}", sequence));
            }
        }
        RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE => {
            if message.payload.len() < 4 {
                return Err(RtmpError::protocol("WindowAckSize body too short"));
            }

            if log_debug {
                logger.log_debug(&format!(
                    "Peer window ack size: {}",
                    read_status.remote_window_ack
                ));
            }
        }
        RTMP_TYPE_SET_PEER_BANDWIDTH => {
            if message.payload.len() < 4 {
                return Err(RtmpError::protocol("SetPeerBandwidth body too short"));
            }

            // Recorded, the send rate is not adjusted
            read_status.remote_peer_bandwidth = BigEndian::read_u32(&message.payload[0..4]);

            if log_debug {
                logger.log_debug(&format!(
                    "Peer bandwidth: {}",
                    read_status.remote_peer_bandwidth
                ));
            }
        }
        RTMP_TYPE_EVENT => {
            if message.payload.len() < 2 {
                return Err(RtmpError::protocol("UserControl body too short"));
            }

            let event = BigEndian::read_u16(&message.payload[0..2]);

            if log_debug {
                let event_name = match event {
                    STREAM_BEGIN => "StreamBegin",
                    STREAM_IS_RECORDED => "StreamIsRecorded",
                    _ => "Other",
                };

                logger.log_debug(&format!("User control event: {} ({})", event_name, event));
            }
        }
        _ => {}
    }

    Ok(())
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtmp::{RtmpChunkStream, RTMP_TYPE_AUDIO};
    use crate::server::{RtmpServerConfiguration, RtmpServerStatus};
    use tokio::sync::Mutex;

    fn test_context() -> RtmpServerContext {
        let logger = Logger::new_disabled();

        RtmpServerContext {
            config: Arc::new(RtmpServerConfiguration::load_from_env(&logger).unwrap()),
            status: Arc::new(Mutex::new(RtmpServerStatus::new())),
        }
    }

    #[test]
    fn test_abort_discards_partial_body() {
        let logger = Arc::new(Logger::new_disabled());
        let server_context = test_context();

        let mut read_status = RtmpSessionReadStatus::new();

        let mut chunk_stream = RtmpChunkStream::new(4);
        chunk_stream.msg_length = 100;
        chunk_stream.packet_type = RTMP_TYPE_AUDIO;
        chunk_stream.initialized = true;
        chunk_stream.start_message();
        chunk_stream.index = 50;
        chunk_stream.remain = 50;

        read_status.chunk_streams.insert(4, chunk_stream);

        let message = RtmpMessage {
            csid: 2,
            timestamp: 0,
            packet_type: RTMP_TYPE_ABORT,
            stream_id: 0,
            length: 4,
            payload: vec![0x00, 0x00, 0x00, 0x04],
        };

        handle_rtmp_message_protocol(&logger, &server_context, &message, &mut read_status)
            .unwrap();

        let chunk_stream = read_status.chunk_streams.get(&4).unwrap();

        assert_eq!(chunk_stream.remain, 0);
        assert_eq!(chunk_stream.index, 0);
        assert!(chunk_stream.data.is_empty());
    }

    #[test]
    fn test_short_control_bodies_are_protocol_errors() {
        let logger = Arc::new(Logger::new_disabled());
        let server_context = test_context();

        let mut read_status = RtmpSessionReadStatus::new();

        let message = RtmpMessage {
            csid: 2,
            timestamp: 0,
            packet_type: RTMP_TYPE_ABORT,
            stream_id: 0,
            length: 2,
            payload: vec![0x00, 0x00],
        };

        assert!(handle_rtmp_message_protocol(
            &logger,
            &server_context,
            &message,
            &mut read_status
        )
        .is_err());
    }
}
