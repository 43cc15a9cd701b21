// Session cleanup logic

use std::sync::Arc;

use crate::{
    log::Logger,
    server::{RtmpServerContext, RtmpServerStatus},
    stream::{RtmpStreamSource, StreamSubscriber},
};

use super::SessionContext;

/// Releases the stream resources held by a session
///
/// Publishers are detached from their source (the registry schedules
/// the delayed removal); players are removed from their source and
/// their egress queue is closed. Called on stream deletion and on
/// session teardown.
///
/// # Arguments
///
/// * `logger` - The session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
pub async fn release_session_streams(
    logger: &Arc<Logger>,
    server_context: &RtmpServerContext,
    session_context: &SessionContext,
) {
    let mut session_status_v = session_context.status.lock().await;

    let was_publisher = session_status_v.is_publisher;
    let was_player = session_status_v.is_player;
    let stream_key = session_status_v.stream_key.take();
    let source: Option<Arc<RtmpStreamSource>> = session_status_v.source.take();
    let subscriber: Option<Arc<StreamSubscriber>> = session_status_v.subscriber.take();

    session_status_v.is_publisher = false;
    session_status_v.is_player = false;
    session_status_v.command_phase_done = false;
    session_status_v.stream_name = None;

    drop(session_status_v);

    if was_publisher {
        if let Some(key) = &stream_key {
            RtmpServerStatus::detach_publisher(
                logger,
                &server_context.status,
                key,
                session_context.id,
            )
            .await;

            if server_context.config.log_requests {
                logger.log_info(&format!("PUBLISH END: {}", key));
            }
        }
    }

    if was_player {
        if let (Some(source), Some(subscriber)) = (source, subscriber) {
            source.remove_subscriber(&subscriber.addr);

            if server_context.config.log_requests {
                if let Some(key) = &stream_key {
                    logger.log_info(&format!("PLAY END: {}", key));
                }
            }
        }
    }
}

/// Performs session cleanup after the read loop ends
///
/// # Arguments
///
/// * `logger` - The session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
pub async fn do_session_cleanup(
    logger: &Arc<Logger>,
    server_context: &RtmpServerContext,
    session_context: &SessionContext,
) {
    if server_context.config.log_requests && logger.config.debug_enabled {
        logger.log_debug("Performing session cleanup...");
    }

    release_session_streams(logger, server_context, session_context).await;

    if server_context.config.log_requests {
        logger.log_info("Connection closed");
    }
}
