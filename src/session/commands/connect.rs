// Connect command

use std::sync::Arc;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    rtmp::{
        parse_tc_url, rtmp_make_chunk_size_set_message, rtmp_make_connect_response,
        rtmp_make_peer_bandwidth_set_message, rtmp_make_window_ack, RtmpCommand, RtmpError,
        RTMP_PEER_BANDWIDTH_LIMIT_DYNAMIC,
    },
    server::RtmpServerContext,
    utils::validate_id_string,
};

use super::super::{session_write_bytes, SessionContext};

/// Handles RTMP command (connect)
///
/// Stores the connection parameters, derives the vhost from the
/// tcUrl, and replies with the flow control trio followed by the
/// connect _result.
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `cmd` - The command to handle
/// * `write_stream` - IO stream to write bytes
pub async fn handle_rtmp_command_connect<
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin,
>(
    logger: &Arc<Logger>,
    server_context: &RtmpServerContext,
    session_context: &SessionContext,
    cmd: &RtmpCommand,
    write_stream: &Arc<Mutex<TW>>,
) -> Result<(), RtmpError> {
    let config = &server_context.config;
    let log_debug = config.log_requests && logger.config.debug_enabled;

    // Load and validate parameters

    let trans_id = cmd.get_trans_id();

    if trans_id != 1 {
        if log_debug {
            logger.log_debug(&format!(
                "Command error: connect with transaction id {}",
                trans_id
            ));
        }

        return Err(RtmpError::CommandRejected(
            "connect: unexpected transaction id".to_string(),
        ));
    }

    let cmd_obj = match cmd.get_argument("cmdObj") {
        Some(o) => o,
        None => {
            if log_debug {
                logger.log_debug("Command error: cmdObj argument not provided");
            }

            return Err(RtmpError::CommandRejected(
                "connect: cmdObj argument not provided".to_string(),
            ));
        }
    };

    let app = match cmd_obj.get_object_property("app") {
        Some(app) => {
            // Strip any query suffix from the app
            let app_str = app.get_string();
            let app_str = app_str.split('?').next().unwrap_or("");

            if !validate_id_string(app_str, config.id_max_length) {
                if log_debug {
                    logger.log_debug(&format!("Command error: Invalid app value: {}", app_str));
                }

                return Err(RtmpError::CommandRejected(
                    "connect: invalid app".to_string(),
                ));
            }

            app_str.to_string()
        }
        None => {
            if log_debug {
                logger.log_debug("Command error: app property not provided");
            }

            return Err(RtmpError::CommandRejected(
                "connect: app property not provided".to_string(),
            ));
        }
    };

    let tc_url = match cmd_obj.get_object_property("tcUrl") {
        Some(u) => u.get_string().to_string(),
        None => {
            if log_debug {
                logger.log_debug("Command error: tcUrl property not provided");
            }

            return Err(RtmpError::CommandRejected(
                "connect: tcUrl property not provided".to_string(),
            ));
        }
    };

    let tc_url_info = parse_tc_url(&tc_url)?;

    let flash_ver = match cmd_obj.get_object_property("flashVer") {
        Some(v) => v.get_string().to_string(),
        None => "".to_string(),
    };

    let swf_url = match cmd_obj.get_object_property("swfUrl") {
        Some(v) => v.get_string().to_string(),
        None => "".to_string(),
    };

    let object_encoding: Option<u32> = match cmd_obj.get_object_property("objectEncoding") {
        Some(oe) => {
            if !oe.is_undefined() {
                Some(oe.get_integer() as u32)
            } else {
                None
            }
        }
        None => None,
    };

    // Update the session status

    let mut session_status_v = session_context.status.lock().await;

    if session_status_v.app.is_some() {
        // Already connected. This command is invalid
        drop(session_status_v);

        if log_debug {
            logger.log_debug("Protocol error: Connect received, but already connected");
        }

        return Err(RtmpError::protocol("connect received twice"));
    }

    session_status_v.transaction_id = trans_id;
    session_status_v.app = Some(app.clone());
    session_status_v.flash_ver = flash_ver;
    session_status_v.swf_url = swf_url;
    session_status_v.tc_url = tc_url;
    session_status_v.object_encoding = object_encoding;
    session_status_v.vhost = Some(tc_url_info.vhost.clone());
    session_status_v.host = tc_url_info.host;
    session_status_v.port = tc_url_info.port;

    drop(session_status_v);

    if config.log_requests {
        logger.log_info(&format!(
            "CONNECT: app={} vhost={}",
            app, tc_url_info.vhost
        ));
    }

    // Send window ACK

    let window_ack_bytes = rtmp_make_window_ack(config.window_ack_size);
    session_write_bytes(write_stream, &window_ack_bytes)
        .await
        .map_err(RtmpError::from_io)?;

    // Set peer bandwidth

    let peer_bandwidth_bytes = rtmp_make_peer_bandwidth_set_message(
        config.peer_bandwidth,
        RTMP_PEER_BANDWIDTH_LIMIT_DYNAMIC,
    );
    session_write_bytes(write_stream, &peer_bandwidth_bytes)
        .await
        .map_err(RtmpError::from_io)?;

    // Set chunk size

    let chunk_size_bytes = rtmp_make_chunk_size_set_message(config.chunk_size as u32);
    session_write_bytes(write_stream, &chunk_size_bytes)
        .await
        .map_err(RtmpError::from_io)?;

    // The announced chunk size applies to every message from here on

    let mut session_status_v = session_context.status.lock().await;
    session_status_v.out_chunk_size = config.chunk_size;
    drop(session_status_v);

    // Respond

    let connect_response_bytes =
        rtmp_make_connect_response(trans_id, object_encoding, config.chunk_size);
    session_write_bytes(write_stream, &connect_response_bytes)
        .await
        .map_err(RtmpError::from_io)?;

    // Done

    Ok(())
}
