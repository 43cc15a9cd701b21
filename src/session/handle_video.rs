// Logic to handle video packets

use std::sync::Arc;

use crate::{
    av::{MediaPacket, MediaPacketKind},
    flv::{parse_video_tag_header, MediaTagHeader},
    log::Logger,
    rtmp::{CodecKind, RtmpError, RtmpMessage},
    server::RtmpServerContext,
};

use super::{RtmpSessionStatus, SessionContext};

/// Handles VIDEO RTMP message
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `message` - The message to handle
pub async fn handle_rtmp_message_video(
    logger: &Arc<Logger>,
    server_context: &RtmpServerContext,
    session_context: &SessionContext,
    message: RtmpMessage,
) -> Result<(), RtmpError> {
    let source = match RtmpSessionStatus::get_publishing_source(&session_context.status).await {
        Some(s) => s,
        None => {
            if server_context.config.log_requests && logger.config.debug_enabled {
                logger.log_debug("Video packet ignored since the session is not publishing");
            }

            return Ok(());
        }
    };

    let header = match parse_video_tag_header(&message.payload) {
        Ok(h) => h,
        Err(_) => {
            if server_context.config.log_requests && logger.config.debug_enabled {
                logger.log_debug("Packet error: Could not parse video tag header");
            }

            return Err(RtmpError::CodecError(CodecKind::Flv));
        }
    };

    if server_context.config.log_requests && logger.config.trace_enabled {
        logger.log_trace(&format!(
            "VIDEO PACKET: {} bytes, key frame: {}",
            message.payload.len(),
            header.is_key_frame()
        ));
    }

    let packet = MediaPacket {
        kind: MediaPacketKind::Video,
        timestamp: message.timestamp,
        stream_id: message.stream_id,
        data: Arc::new(message.payload),
        header: Some(MediaTagHeader::Video(header)),
    };

    source.broadcast(&packet);

    Ok(())
}
