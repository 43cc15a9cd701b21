// Invoke message handling logic

use std::sync::Arc;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    rtmp::{CodecKind, RtmpCommand, RtmpError, RtmpMessage, RTMP_TYPE_FLEX_MESSAGE},
    server::RtmpServerContext,
};

use super::{
    handle_rtmp_command_connect, handle_rtmp_command_create_stream,
    handle_rtmp_command_delete_stream, handle_rtmp_command_play, handle_rtmp_command_publish,
    SessionContext,
};

/// Handles an RTMP command message (INVOKE)
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `message` - The message to handle
/// * `write_stream` - IO stream to write bytes
pub async fn handle_rtmp_message_invoke<
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static,
>(
    logger: &Arc<Logger>,
    server_context: &RtmpServerContext,
    session_context: &SessionContext,
    message: &RtmpMessage,
    write_stream: &Arc<Mutex<TW>>,
) -> Result<(), RtmpError> {
    // AMF3 commands carry a leading marker byte to skip
    let offset: usize = if message.packet_type == RTMP_TYPE_FLEX_MESSAGE {
        1
    } else {
        0
    };

    if message.payload.len() <= offset {
        return Err(RtmpError::protocol("command payload too short"));
    }

    let cmd = match RtmpCommand::decode(&message.payload[offset..]) {
        Ok(c) => c,
        Err(_) => {
            if server_context.config.log_requests && logger.config.debug_enabled {
                logger.log_debug("Could not decode RTMP command");
            }

            return Err(RtmpError::CodecError(CodecKind::Amf));
        }
    };

    if server_context.config.log_requests && logger.config.trace_enabled {
        logger.log_trace(&format!("COMMAND: {}", cmd.to_debug_string()));
    }

    match cmd.cmd.as_str() {
        "connect" => {
            handle_rtmp_command_connect(logger, server_context, session_context, &cmd, write_stream)
                .await
        }
        "createStream" => {
            handle_rtmp_command_create_stream(
                logger,
                server_context,
                session_context,
                &cmd,
                write_stream,
            )
            .await
        }
        "publish" => {
            handle_rtmp_command_publish(
                logger,
                server_context,
                session_context,
                &cmd,
                message,
                write_stream,
            )
            .await
        }
        "play" => {
            handle_rtmp_command_play(
                logger,
                server_context,
                session_context,
                &cmd,
                message,
                write_stream,
            )
            .await
        }
        "deleteStream" | "closeStream" => {
            handle_rtmp_command_delete_stream(logger, server_context, session_context, &cmd).await
        }
        "releaseStream" | "FCPublish" | "FCUnpublish" => {
            // Accepted silently, no response required
            let mut status = session_context.status.lock().await;
            status.transaction_id = cmd.get_trans_id();

            Ok(())
        }
        _ => {
            if server_context.config.log_requests && logger.config.debug_enabled {
                logger.log_debug(&format!("Unrecognized command: {}", cmd.cmd));
            }

            Ok(())
        }
    }
}
