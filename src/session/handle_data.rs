// Logic to handle data packets

use std::sync::Arc;

use crate::{
    av::{MediaPacket, MediaPacketKind},
    log::Logger,
    rtmp::{rtmp_build_metadata, CodecKind, RtmpData, RtmpError, RtmpMessage, RTMP_TYPE_FLEX_STREAM},
    server::RtmpServerContext,
};

use super::{RtmpSessionStatus, SessionContext};

/// Handles DATA RTMP message
///
/// Metadata sent by the publisher is reformed (the @setDataFrame
/// wrapper is stripped) before it is cached and relayed.
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `message` - The message to handle
pub async fn handle_rtmp_message_data(
    logger: &Arc<Logger>,
    server_context: &RtmpServerContext,
    session_context: &SessionContext,
    message: RtmpMessage,
) -> Result<(), RtmpError> {
    let source = match RtmpSessionStatus::get_publishing_source(&session_context.status).await {
        Some(s) => s,
        None => {
            if server_context.config.log_requests && logger.config.debug_enabled {
                logger.log_debug("Data packet ignored since the session is not publishing");
            }

            return Ok(());
        }
    };

    // AMF3 data carries a leading marker byte to skip
    let offset: usize = if message.packet_type == RTMP_TYPE_FLEX_STREAM {
        1
    } else {
        0
    };

    if message.payload.len() <= offset {
        return Err(RtmpError::protocol("data payload too short"));
    }

    let data = match RtmpData::decode(&message.payload[offset..]) {
        Ok(d) => d,
        Err(_) => {
            if server_context.config.log_requests && logger.config.debug_enabled {
                logger.log_debug("Packet error: Could not decode RTMP data");
            }

            return Err(RtmpError::CodecError(CodecKind::Amf));
        }
    };

    if server_context.config.log_requests && logger.config.trace_enabled {
        logger.log_trace(&format!("DATA: {}", data.to_debug_string()));
    }

    match data.tag.as_str() {
        "@setDataFrame" | "onMetaData" => {
            let metadata = rtmp_build_metadata(&data);

            let packet = MediaPacket {
                kind: MediaPacketKind::Metadata,
                timestamp: message.timestamp,
                stream_id: message.stream_id,
                data: Arc::new(metadata),
                header: None,
            };

            source.broadcast(&packet);
        }
        _ => {
            if server_context.config.log_requests && logger.config.debug_enabled {
                logger.log_debug(&format!("Data message ignored: {}", data.tag));
            }
        }
    }

    Ok(())
}
