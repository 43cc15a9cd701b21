// Message dispatch logic

use std::sync::Arc;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    rtmp::{
        RtmpMessage, RTMP_TYPE_ABORT, RTMP_TYPE_ACKNOWLEDGEMENT, RTMP_TYPE_AGGREGATE,
        RTMP_TYPE_AUDIO, RTMP_TYPE_DATA, RTMP_TYPE_EVENT, RTMP_TYPE_FLEX_MESSAGE,
        RTMP_TYPE_FLEX_STREAM, RTMP_TYPE_INVOKE, RTMP_TYPE_SET_CHUNK_SIZE,
        RTMP_TYPE_SET_PEER_BANDWIDTH, RTMP_TYPE_VIDEO,
        RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE, RtmpError,
    },
    server::RtmpServerContext,
};

use super::{
    handle_rtmp_message_audio, handle_rtmp_message_data, handle_rtmp_message_invoke,
    handle_rtmp_message_protocol, handle_rtmp_message_video, RtmpSessionReadStatus, SessionContext,
};

/// Handles a complete RTMP message
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `message` - The message to handle
/// * `read_status` - Status for the read task
/// * `write_stream` - IO stream to write bytes
pub async fn handle_rtmp_message<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static>(
    logger: &Arc<Logger>,
    server_context: &RtmpServerContext,
    session_context: &SessionContext,
    message: RtmpMessage,
    read_status: &mut RtmpSessionReadStatus,
    write_stream: &Arc<Mutex<TW>>,
) -> Result<(), RtmpError> {
    match message.packet_type {
        RTMP_TYPE_SET_CHUNK_SIZE
        | RTMP_TYPE_ABORT
        | RTMP_TYPE_ACKNOWLEDGEMENT
        | RTMP_TYPE_EVENT
        | RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE
        | RTMP_TYPE_SET_PEER_BANDWIDTH => {
            handle_rtmp_message_protocol(logger, server_context, &message, read_status)
        }
        RTMP_TYPE_INVOKE | RTMP_TYPE_FLEX_MESSAGE => {
            handle_rtmp_message_invoke(
                logger,
                server_context,
                session_context,
                &message,
                write_stream,
            )
            .await
        }
        RTMP_TYPE_AUDIO => {
            handle_rtmp_message_audio(logger, server_context, session_context, message).await
        }
        RTMP_TYPE_VIDEO => {
            handle_rtmp_message_video(logger, server_context, session_context, message).await
        }
        RTMP_TYPE_DATA | RTMP_TYPE_FLEX_STREAM => {
            handle_rtmp_message_data(logger, server_context, session_context, message).await
        }
        RTMP_TYPE_AGGREGATE => {
            // Identified, not demultiplexed
            if server_context.config.log_requests && logger.config.trace_enabled {
                logger.log_trace(&format!(
                    "Aggregate message ignored: {} bytes",
                    message.length
                ));
            }

            Ok(())
        }
        _ => {
            if server_context.config.log_requests && logger.config.debug_enabled {
                logger.log_debug(&format!(
                    "Message with unknown type ignored: {}",
                    message.packet_type
                ));
            }

            Ok(())
        }
    }
}
