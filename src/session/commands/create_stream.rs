// createStream command

use std::sync::Arc;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    rtmp::{rtmp_make_create_stream_response, RtmpCommand, RtmpError, RTMP_STREAM_INDEX},
    server::RtmpServerContext,
};

use super::super::{session_write_bytes, SessionContext};

/// Handles RTMP command (createStream)
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `cmd` - The command to handle
/// * `write_stream` - IO stream to write bytes
pub async fn handle_rtmp_command_create_stream<
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin,
>(
    logger: &Arc<Logger>,
    server_context: &RtmpServerContext,
    session_context: &SessionContext,
    cmd: &RtmpCommand,
    write_stream: &Arc<Mutex<TW>>,
) -> Result<(), RtmpError> {
    let trans_id = cmd.get_trans_id();

    // Record the transaction and hand out the message stream ID

    let mut session_status_v = session_context.status.lock().await;

    if session_status_v.app.is_none() {
        drop(session_status_v);

        if server_context.config.log_requests && logger.config.debug_enabled {
            logger.log_debug("Protocol error: createStream received before connect");
        }

        return Err(RtmpError::protocol("createStream before connect"));
    }

    session_status_v.transaction_id = trans_id;

    let out_chunk_size = session_status_v.out_chunk_size;

    drop(session_status_v);

    // Respond

    let response_bytes =
        rtmp_make_create_stream_response(trans_id, RTMP_STREAM_INDEX, out_chunk_size);

    session_write_bytes(write_stream, &response_bytes)
        .await
        .map_err(RtmpError::from_io)?;

    // Done

    Ok(())
}
