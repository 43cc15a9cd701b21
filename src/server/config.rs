// RTMP server configuration

use crate::{
    log::Logger,
    rtmp::{
        RTMP_CHUNK_SIZE_DEFAULT, RTMP_MAX_CHUNK_SIZE, RTMP_PEER_BANDWIDTH_DEFAULT,
        RTMP_WINDOW_ACK_DEFAULT,
    },
    stream::PACKET_QUEUE_CAPACITY_DEFAULT,
    utils::{get_env_bool, get_env_string, get_env_u32, get_env_usize, DEFAULT_MAX_ID_LENGTH},
};

const RTMP_PORT_DEFAULT: u32 = 1935;

const MAX_PORT: u32 = 65535;

const RTMP_CHUNK_SIZE_ANNOUNCED_DEFAULT: u32 = 60000;

const HANDSHAKE_TIMEOUT_SECONDS_DEFAULT: u32 = 10;

/// RTMP server configuration
#[derive(Clone)]
pub struct RtmpServerConfiguration {
    /// Port
    pub port: u32,

    /// Bind address
    pub bind_address: String,

    /// Max length for app and stream names
    pub id_max_length: usize,

    /// RTMP chunk size announced to peers after connect
    pub chunk_size: usize,

    /// Window acknowledgement size announced to peers
    pub window_ack_size: u32,

    /// Peer bandwidth announced to peers
    pub peer_bandwidth: u32,

    /// Seconds the handshake may take before the connection is dropped
    pub handshake_timeout_seconds: u32,

    /// Capacity of the per-subscriber packet queue
    pub queue_capacity: usize,

    /// True to log requests
    pub log_requests: bool,
}

impl RtmpServerConfiguration {
    /// Loads configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `logger` - The logger
    pub fn load_from_env(logger: &Logger) -> Result<RtmpServerConfiguration, ()> {
        let port = get_env_u32("RTMP_PORT", RTMP_PORT_DEFAULT);

        if port == 0 || port > MAX_PORT {
            logger.log_error(&format!("RTMP_PORT has an invalid value: {}", port));
            return Err(());
        }

        let bind_address = get_env_string("BIND_ADDRESS", "0.0.0.0");

        let mut chunk_size = get_env_u32("RTMP_CHUNK_SIZE", RTMP_CHUNK_SIZE_ANNOUNCED_DEFAULT);

        if chunk_size < RTMP_CHUNK_SIZE_DEFAULT {
            logger.log_warning(&format!(
                "RTMP_CHUNK_SIZE too small ({}), using {}",
                chunk_size, RTMP_CHUNK_SIZE_DEFAULT
            ));
            chunk_size = RTMP_CHUNK_SIZE_DEFAULT;
        }

        if chunk_size > RTMP_MAX_CHUNK_SIZE {
            logger.log_warning(&format!(
                "RTMP_CHUNK_SIZE too big ({}), using {}",
                chunk_size, RTMP_MAX_CHUNK_SIZE
            ));
            chunk_size = RTMP_MAX_CHUNK_SIZE;
        }

        let window_ack_size = get_env_u32("RTMP_WINDOW_ACK", RTMP_WINDOW_ACK_DEFAULT);

        let peer_bandwidth = get_env_u32("RTMP_PEER_BANDWIDTH", RTMP_PEER_BANDWIDTH_DEFAULT);

        let handshake_timeout_seconds =
            get_env_u32("HANDSHAKE_TIMEOUT_SECONDS", HANDSHAKE_TIMEOUT_SECONDS_DEFAULT);

        let queue_capacity = get_env_usize("QUEUE_CAPACITY", PACKET_QUEUE_CAPACITY_DEFAULT);

        let id_max_length = get_env_usize("ID_MAX_LENGTH", DEFAULT_MAX_ID_LENGTH);

        let log_requests = get_env_bool("LOG_REQUESTS", true);

        Ok(RtmpServerConfiguration {
            port,
            bind_address,
            id_max_length,
            chunk_size: chunk_size as usize,
            window_ack_size,
            peer_bandwidth,
            handshake_timeout_seconds,
            queue_capacity,
            log_requests,
        })
    }

    /// Gets TCP address for listening
    pub fn get_tcp_listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
