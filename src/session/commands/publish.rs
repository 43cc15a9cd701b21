// Publish command

use std::sync::Arc;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    rtmp::{rtmp_make_status_message, RtmpCommand, RtmpError, RtmpMessage},
    server::{RtmpServerContext, RtmpServerStatus},
    stream::gen_stream_key,
    utils::validate_id_string,
};

use super::super::{session_write_bytes, RtmpSessionStatus, SessionContext};

/// Handles RTMP command (publish)
///
/// Admits the session as the publisher of its stream key, or closes
/// the connection with StreamBusy when the key is taken.
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `cmd` - The command to handle
/// * `message` - The message carrying the command
/// * `write_stream` - IO stream to write bytes
pub async fn handle_rtmp_command_publish<
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin,
>(
    logger: &Arc<Logger>,
    server_context: &RtmpServerContext,
    session_context: &SessionContext,
    cmd: &RtmpCommand,
    message: &RtmpMessage,
    write_stream: &Arc<Mutex<TW>>,
) -> Result<(), RtmpError> {
    let config = &server_context.config;
    let log_debug = config.log_requests && logger.config.debug_enabled;

    let publish_stream_id = message.stream_id;
    let out_chunk_size = RtmpSessionStatus::get_out_chunk_size(&session_context.status).await;

    // The session must have connected first

    let (vhost, app) = match RtmpSessionStatus::get_vhost_and_app(&session_context.status).await {
        Some(v) => v,
        None => {
            if log_debug {
                logger.log_debug("Protocol error: Received publish before connect");
            }

            let status_bytes = rtmp_make_status_message(
                publish_stream_id,
                "error",
                "NetStream.Publish.BadConnection",
                Some("Not connected"),
                out_chunk_size,
            );
            let _ = session_write_bytes(write_stream, &status_bytes).await;

            return Err(RtmpError::protocol("publish before connect"));
        }
    };

    // Load and validate the stream name

    let stream_name_raw = match cmd.get_argument("streamName") {
        Some(k) => k.get_string().to_string(),
        None => {
            if log_debug {
                logger.log_debug("Command error: streamName property not provided");
            }

            let status_bytes = rtmp_make_status_message(
                publish_stream_id,
                "error",
                "NetStream.Publish.BadName",
                Some("No stream name provided"),
                out_chunk_size,
            );
            let _ = session_write_bytes(write_stream, &status_bytes).await;

            return Err(RtmpError::CommandRejected(
                "publish: no stream name".to_string(),
            ));
        }
    };

    // Strip the query suffix from the stream name

    let (stream_name, raw_query) = match stream_name_raw.split_once('?') {
        Some((name, query)) => (name.to_string(), query.to_string()),
        None => (stream_name_raw, "".to_string()),
    };

    if !validate_id_string(&stream_name, config.id_max_length) {
        if log_debug {
            logger.log_debug(&format!(
                "Command error: Invalid streamName value: {}",
                stream_name
            ));
        }

        let status_bytes = rtmp_make_status_message(
            publish_stream_id,
            "error",
            "NetStream.Publish.BadName",
            Some("Invalid stream name provided"),
            out_chunk_size,
        );
        let _ = session_write_bytes(write_stream, &status_bytes).await;

        return Err(RtmpError::CommandRejected(
            "publish: invalid stream name".to_string(),
        ));
    }

    // The session must not have a role yet

    {
        let session_status_v = session_context.status.lock().await;

        if session_status_v.is_publisher || session_status_v.is_player {
            drop(session_status_v);

            if log_debug {
                logger.log_debug("Protocol error: publish received, but already publishing or playing");
            }

            return Err(RtmpError::protocol("publish on a busy session"));
        }
    }

    // Admission into the registry

    let stream_key = gen_stream_key(&vhost, &app, &stream_name);

    let source = match RtmpServerStatus::get_or_create_for_publisher(
        &server_context.status,
        &stream_key,
        session_context.id,
    )
    .await
    {
        Ok(source) => source,
        Err(e) => {
            if config.log_requests {
                logger.log_info(&format!(
                    "Cannot publish: Another session is already publishing on {}",
                    stream_key
                ));
            }

            let status_bytes = rtmp_make_status_message(
                publish_stream_id,
                "error",
                "NetStream.Publish.BadName",
                Some("Stream already publishing"),
                out_chunk_size,
            );
            let _ = session_write_bytes(write_stream, &status_bytes).await;

            return Err(e);
        }
    };

    // Update the session status

    let mut session_status_v = session_context.status.lock().await;

    session_status_v.transaction_id = cmd.get_trans_id();
    session_status_v.is_publisher = true;
    session_status_v.publish_stream_id = publish_stream_id;
    session_status_v.stream_name = Some(stream_name);
    session_status_v.raw_query = raw_query;
    session_status_v.stream_key = Some(stream_key.clone());
    session_status_v.source = Some(source);
    session_status_v.command_phase_done = true;

    drop(session_status_v);

    // Log

    if config.log_requests {
        logger.log_info(&format!("PUBLISH ({}): {}", publish_stream_id, stream_key));
    }

    // Respond with status message

    let status_bytes = rtmp_make_status_message(
        publish_stream_id,
        "status",
        "NetStream.Publish.Start",
        Some(&format!("{} is now published.", stream_key)),
        out_chunk_size,
    );

    session_write_bytes(write_stream, &status_bytes)
        .await
        .map_err(RtmpError::from_io)?;

    // Done

    Ok(())
}
