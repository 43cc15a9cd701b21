// Subscriber egress task

use std::sync::Arc;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    av::MediaPacketKind,
    log::Logger,
    rtmp::{
        RtmpPacket, RTMP_CHANNEL_AUDIO, RTMP_CHANNEL_DATA, RTMP_CHANNEL_VIDEO, RTMP_CHUNK_TYPE_0,
        RTMP_TYPE_AUDIO, RTMP_TYPE_DATA, RTMP_TYPE_VIDEO,
    },
    stream::{RtmpStreamSource, StreamSubscriber},
};

use super::{session_write_bytes, SessionContext};

/// Creates a task to drain the subscriber queue into the socket
///
/// The task ends when the queue closes (source removed) or a write
/// fails; either way the subscriber is detached from its source.
///
/// # Arguments
///
/// * `logger` - Session logger
/// * `session_context` - The session context
/// * `source` - The stream source the subscriber is attached to
/// * `subscriber` - The subscriber handle
/// * `write_stream` - IO stream to write bytes
pub fn spawn_task_subscriber_egress<
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static,
>(
    logger: Arc<Logger>,
    session_context: SessionContext,
    source: Arc<RtmpStreamSource>,
    subscriber: Arc<StreamSubscriber>,
    write_stream: Arc<Mutex<TW>>,
) {
    tokio::spawn(async move {
        loop {
            let packet = match subscriber.queue.pop().await {
                Some(p) => p,
                None => break,
            };

            let (play_stream_id, out_chunk_size) = {
                let session_status_v = session_context.status.lock().await;
                (
                    session_status_v.play_stream_id,
                    session_status_v.out_chunk_size,
                )
            };

            let mut out = RtmpPacket::new_blank();

            out.header.format = RTMP_CHUNK_TYPE_0;

            match packet.kind {
                MediaPacketKind::Audio => {
                    out.header.channel_id = RTMP_CHANNEL_AUDIO;
                    out.header.packet_type = RTMP_TYPE_AUDIO;
                }
                MediaPacketKind::Video => {
                    out.header.channel_id = RTMP_CHANNEL_VIDEO;
                    out.header.packet_type = RTMP_TYPE_VIDEO;
                }
                MediaPacketKind::Metadata => {
                    out.header.channel_id = RTMP_CHANNEL_DATA;
                    out.header.packet_type = RTMP_TYPE_DATA;
                }
            }

            let timestamp = packet.timestamp.wrapping_add(subscriber.base_timestamp());

            out.header.timestamp = timestamp;
            out.payload = packet.data.as_ref().clone();
            out.header.length = out.payload.len();

            let packet_bytes = out.create_chunks_for_stream(play_stream_id, out_chunk_size);

            if let Err(e) = session_write_bytes(&write_stream, &packet_bytes).await {
                if logger.config.debug_enabled {
                    logger.log_debug(&format!("Send error: Could not send packet: {}", e));
                }

                break;
            }

            subscriber.rec_timestamp(timestamp, packet.kind);
        }

        // Teardown

        subscriber.stop();
        source.remove_subscriber(&subscriber.addr);

        if logger.config.debug_enabled {
            logger.log_debug("Completed subscriber egress task");
        }
    });
}
