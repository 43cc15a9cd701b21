// RTMP session status models

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::rtmp::{
    RtmpChunkStream, RTMP_CHUNK_SIZE_DEFAULT, RTMP_WINDOW_ACK_DEFAULT,
};
use crate::stream::{RtmpStreamSource, StreamSubscriber};

/// RTMP session status
/// Owned by the session, shared with the egress task of players
pub struct RtmpSessionStatus {
    /// Transaction ID of the last command
    pub transaction_id: i64,

    /// App name from the connect command
    pub app: Option<String>,

    /// Client flash version
    pub flash_ver: String,

    /// Client SWF url
    pub swf_url: String,

    /// Raw tcUrl from the connect command
    pub tc_url: String,

    /// Object encoding requested by the client
    pub object_encoding: Option<u32>,

    /// Vhost derived from the tcUrl
    pub vhost: Option<String>,

    /// Host part of the tcUrl
    pub host: String,

    /// Port part of the tcUrl
    pub port: u16,

    /// Stream name from publish / play
    pub stream_name: Option<String>,

    /// Query suffix stripped from the stream name
    pub raw_query: String,

    /// True once the session publishes
    pub is_publisher: bool,

    /// True once the session plays
    pub is_player: bool,

    /// True once publish or play was accepted
    pub command_phase_done: bool,

    /// Message stream ID used for publishing
    pub publish_stream_id: u32,

    /// Message stream ID used for playing
    pub play_stream_id: u32,

    /// Chunk size for outgoing messages
    pub out_chunk_size: usize,

    /// Stream key of the session (vhost/app/stream)
    pub stream_key: Option<String>,

    /// Stream source the session publishes to or plays from
    pub source: Option<Arc<RtmpStreamSource>>,

    /// Subscriber handle (players)
    pub subscriber: Option<Arc<StreamSubscriber>>,
}

impl RtmpSessionStatus {
    /// Creates the status for a fresh session
    pub fn new() -> RtmpSessionStatus {
        RtmpSessionStatus {
            transaction_id: 0,
            app: None,
            flash_ver: "".to_string(),
            swf_url: "".to_string(),
            tc_url: "".to_string(),
            object_encoding: None,
            vhost: None,
            host: "".to_string(),
            port: 0,
            stream_name: None,
            raw_query: "".to_string(),
            is_publisher: false,
            is_player: false,
            command_phase_done: false,
            publish_stream_id: 0,
            play_stream_id: 0,
            out_chunk_size: RTMP_CHUNK_SIZE_DEFAULT as usize,
            stream_key: None,
            source: None,
            subscriber: None,
        }
    }

    /// Gets the chunk size for outgoing messages
    pub async fn get_out_chunk_size(status: &Mutex<RtmpSessionStatus>) -> usize {
        let status_v = status.lock().await;
        status_v.out_chunk_size
    }

    /// Gets the vhost and app, once connected
    pub async fn get_vhost_and_app(status: &Mutex<RtmpSessionStatus>) -> Option<(String, String)> {
        let status_v = status.lock().await;

        match (&status_v.vhost, &status_v.app) {
            (Some(vhost), Some(app)) => Some((vhost.clone(), app.clone())),
            _ => None,
        }
    }

    /// Gets the source the session publishes to, if it is a publisher
    pub async fn get_publishing_source(
        status: &Mutex<RtmpSessionStatus>,
    ) -> Option<Arc<RtmpStreamSource>> {
        let status_v = status.lock().await;

        if !status_v.is_publisher {
            return None;
        }

        status_v.source.clone()
    }
}

/// Status of the chunk read side of a session
/// Owned exclusively by the ingress task
pub struct RtmpSessionReadStatus {
    /// Reassembly state, by chunk stream ID
    pub chunk_streams: HashMap<u32, RtmpChunkStream>,

    /// Chunk size announced by the peer
    pub remote_chunk_size: u32,

    /// Window acknowledgement size announced by the peer
    pub remote_window_ack: u32,

    /// Peer bandwidth announced by the peer (recorded only)
    pub remote_peer_bandwidth: u32,

    /// Bytes received since the last acknowledgement
    pub ack_counter: u32,

    /// Total bytes received (mod 2^32)
    pub bytes_received: u32,

    /// Times the received byte counter wrapped
    pub bytes_received_wraps: u32,
}

impl RtmpSessionReadStatus {
    /// Creates the read status for a fresh session
    pub fn new() -> RtmpSessionReadStatus {
        RtmpSessionReadStatus {
            chunk_streams: HashMap::new(),
            remote_chunk_size: RTMP_CHUNK_SIZE_DEFAULT,
            remote_window_ack: RTMP_WINDOW_ACK_DEFAULT,
            remote_peer_bandwidth: 0,
            ack_counter: 0,
            bytes_received: 0,
            bytes_received_wraps: 0,
        }
    }
}
