// deleteStream / closeStream commands

use std::sync::Arc;

use crate::{log::Logger, rtmp::{RtmpCommand, RtmpError}, server::RtmpServerContext};

use super::super::{release_session_streams, SessionContext};

/// Handles RTMP command (deleteStream, closeStream)
///
/// Detaches a publishing session from its stream source and removes
/// a playing session from its source. The connection stays open.
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `cmd` - The command to handle
pub async fn handle_rtmp_command_delete_stream(
    logger: &Arc<Logger>,
    server_context: &RtmpServerContext,
    session_context: &SessionContext,
    cmd: &RtmpCommand,
) -> Result<(), RtmpError> {
    {
        let mut session_status_v = session_context.status.lock().await;
        session_status_v.transaction_id = cmd.get_trans_id();
    }

    if server_context.config.log_requests && logger.config.debug_enabled {
        logger.log_debug(&format!("Stream deletion requested: {}", cmd.cmd));
    }

    release_session_streams(logger, server_context, session_context).await;

    Ok(())
}
