// Play command

use std::sync::Arc;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    rtmp::{
        rtmp_make_status_message, rtmp_make_stream_status_message, RtmpCommand, RtmpError,
        RtmpMessage, STREAM_BEGIN, STREAM_IS_RECORDED,
    },
    server::{RtmpServerContext, RtmpServerStatus},
    stream::{gen_stream_key, StreamSubscriber},
    utils::validate_id_string,
};

use super::super::{
    session_write_bytes, spawn_task_subscriber_egress, RtmpSessionStatus, SessionContext,
};

/// Handles RTMP command (play)
///
/// Replies with the play status sequence, then attaches the session
/// as a subscriber of its stream key and spawns the egress task.
/// Closes the connection with StreamNotFound when nobody publishes
/// on the key.
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `cmd` - The command to handle
/// * `message` - The message carrying the command
/// * `write_stream` - IO stream to write bytes
pub async fn handle_rtmp_command_play<
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static,
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

    let play_stream_id = message.stream_id;
    let out_chunk_size = RtmpSessionStatus::get_out_chunk_size(&session_context.status).await;

    // The session must have connected first

    let (vhost, app) = match RtmpSessionStatus::get_vhost_and_app(&session_context.status).await {
        Some(v) => v,
        None => {
            if log_debug {
                logger.log_debug("Protocol error: Received play before connect");
            }

            return Err(RtmpError::protocol("play before connect"));
        }
    };

    // Load and validate the stream name

    let stream_name_raw = match cmd.get_argument("streamName") {
        Some(k) => k.get_string().to_string(),
        None => {
            if log_debug {
                logger.log_debug("Command error: streamName property not provided");
            }

            return Err(RtmpError::CommandRejected(
                "play: no stream name".to_string(),
            ));
        }
    };

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

        return Err(RtmpError::CommandRejected(
            "play: invalid stream name".to_string(),
        ));
    }

    // The session must not have a role yet

    {
        let session_status_v = session_context.status.lock().await;

        if session_status_v.is_publisher || session_status_v.is_player {
            drop(session_status_v);

            if log_debug {
                logger.log_debug("Protocol error: play received, but already publishing or playing");
            }

            return Err(RtmpError::protocol("play on a busy session"));
        }
    }

    // Stream status events

    let recorded_bytes = rtmp_make_stream_status_message(STREAM_IS_RECORDED, play_stream_id);
    session_write_bytes(write_stream, &recorded_bytes)
        .await
        .map_err(RtmpError::from_io)?;

    let begin_bytes = rtmp_make_stream_status_message(STREAM_BEGIN, play_stream_id);
    session_write_bytes(write_stream, &begin_bytes)
        .await
        .map_err(RtmpError::from_io)?;

    // Status messages indicating play

    let play_statuses: [(&str, Option<&str>); 4] = [
        ("NetStream.Play.Reset", Some("Playing and resetting stream.")),
        ("NetStream.Play.Start", Some("Started playing stream.")),
        ("NetStream.Data.Start", None),
        ("NetStream.Play.PublishNotify", Some("Stream is now published.")),
    ];

    for (code, description) in play_statuses {
        let status_bytes = rtmp_make_status_message(
            play_stream_id,
            "status",
            code,
            description,
            out_chunk_size,
        );

        session_write_bytes(write_stream, &status_bytes)
            .await
            .map_err(RtmpError::from_io)?;
    }

    // Find the source

    let stream_key = gen_stream_key(&vhost, &app, &stream_name);

    let source =
        match RtmpServerStatus::get_for_subscriber(&server_context.status, &stream_key).await {
            Ok(source) => source,
            Err(e) => {
                if config.log_requests {
                    logger.log_info(&format!("Cannot play: No stream found for {}", stream_key));
                }

                return Err(e);
            }
        };

    // Attach the subscriber

    let subscriber = Arc::new(StreamSubscriber::new(
        session_context.id,
        session_context.addr.to_string(),
        config.queue_capacity,
    ));

    if !source.add_subscriber(subscriber.clone()) {
        if log_debug {
            logger.log_debug("Protocol error: remote address already subscribed");
        }

        return Err(RtmpError::protocol("already subscribed"));
    }

    // Update the session status

    let mut session_status_v = session_context.status.lock().await;

    session_status_v.transaction_id = cmd.get_trans_id();
    session_status_v.is_player = true;
    session_status_v.play_stream_id = play_stream_id;
    session_status_v.stream_name = Some(stream_name);
    session_status_v.raw_query = raw_query;
    session_status_v.stream_key = Some(stream_key.clone());
    session_status_v.source = Some(source.clone());
    session_status_v.subscriber = Some(subscriber.clone());
    session_status_v.command_phase_done = true;

    drop(session_status_v);

    // Log

    if config.log_requests {
        logger.log_info(&format!("PLAY ({}): {}", play_stream_id, stream_key));
    }

    // Spawn the egress task

    spawn_task_subscriber_egress(
        logger.clone(),
        session_context.clone(),
        source,
        subscriber,
        write_stream.clone(),
    );

    // Done

    Ok(())
}
