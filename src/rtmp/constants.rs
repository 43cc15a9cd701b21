// RTMP constants

// Chunk types
pub const RTMP_CHUNK_TYPE_0: u32 = 0; // 11-bytes: timestamp(3) + length(3) + stream type(1) + stream id(4)
pub const RTMP_CHUNK_TYPE_1: u32 = 1; // 7-bytes: delta(3) + length(3) + stream type(1)
pub const RTMP_CHUNK_TYPE_2: u32 = 2; // 3-bytes: delta(3)
pub const RTMP_CHUNK_TYPE_3: u32 = 3; // 0-byte

// RTMP channel types (chunk stream IDs used for outgoing messages)
pub const RTMP_CHANNEL_PROTOCOL: u32 = 2;
pub const RTMP_CHANNEL_INVOKE: u32 = 3;
pub const RTMP_CHANNEL_AUDIO: u32 = 4;
pub const RTMP_CHANNEL_VIDEO: u32 = 6;
pub const RTMP_CHANNEL_DATA: u32 = 6;

// Packet types

/* Protocol Control Messages */
pub const RTMP_TYPE_SET_CHUNK_SIZE: u32 = 1;
pub const RTMP_TYPE_ABORT: u32 = 2;
pub const RTMP_TYPE_ACKNOWLEDGEMENT: u32 = 3; // bytes read report
pub const RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE: u32 = 5; // server bandwidth
pub const RTMP_TYPE_SET_PEER_BANDWIDTH: u32 = 6; // client bandwidth

/* User Control Messages Event (4) */
pub const RTMP_TYPE_EVENT: u32 = 4;

pub const RTMP_TYPE_AUDIO: u32 = 8;
pub const RTMP_TYPE_VIDEO: u32 = 9;

/* Data Message */
pub const RTMP_TYPE_FLEX_STREAM: u32 = 15; // AMF3
pub const RTMP_TYPE_DATA: u32 = 18; // AMF0

/* Command Message */
pub const RTMP_TYPE_FLEX_MESSAGE: u32 = 17; // AMF3
pub const RTMP_TYPE_INVOKE: u32 = 20; // AMF0

/* Aggregate Message */
pub const RTMP_TYPE_AGGREGATE: u32 = 22;

/// Returns true for the protocol control message types
pub fn is_protocol_control_type(packet_type: u32) -> bool {
    matches!(
        packet_type,
        RTMP_TYPE_SET_CHUNK_SIZE
            | RTMP_TYPE_ABORT
            | RTMP_TYPE_ACKNOWLEDGEMENT
            | RTMP_TYPE_EVENT
            | RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE
            | RTMP_TYPE_SET_PEER_BANDWIDTH
    )
}

// User control event types

pub const STREAM_BEGIN: u16 = 0x00;
pub const STREAM_EOF: u16 = 0x01;
pub const STREAM_DRY: u16 = 0x02;
pub const STREAM_IS_RECORDED: u16 = 0x04;

// Chunk sizes

pub const RTMP_CHUNK_SIZE_DEFAULT: u32 = 128;
pub const RTMP_MIN_CHUNK_SIZE: u32 = 1;
pub const RTMP_MAX_CHUNK_SIZE: u32 = 0xffffff;

// Flow control defaults

pub const RTMP_WINDOW_ACK_DEFAULT: u32 = 2500000;
pub const RTMP_PEER_BANDWIDTH_DEFAULT: u32 = 2500000;

// Peer bandwidth limit types
pub const RTMP_PEER_BANDWIDTH_LIMIT_DYNAMIC: u8 = 2;

// Message stream ID handed out by createStream
pub const RTMP_STREAM_INDEX: u32 = 1;

// Limit of chunk stream states tracked per connection
pub const RTMP_MAX_CHUNK_STREAMS: usize = 4096;

// Handshake

pub const RTMP_VERSION: u8 = 3;
pub const RTMP_SIG_SIZE: usize = 1536;
pub const RTMP_SERVER_VERSION: u32 = 0x0d0e0a0d;

// Length of a SHA-256 digest
pub const SHA256DL: usize = 32;

pub const GENUINE_FP: &str = "Genuine Adobe Flash Player 001"; // 30 bytes
pub const GENUINE_FMS: &str = "Genuine Adobe Flash Media Server 001"; // 36 bytes

pub const RANDOM_CRUD: &[u8] = &[
    0xf0, 0xee, 0xc2, 0x4a, 0x80, 0x68, 0xbe, 0xe8, 0x2e, 0x00, 0xd0, 0xd1, 0x02, 0x9e, 0x7e,
    0x57, 0x6e, 0xec, 0x5d, 0x2d, 0x29, 0x80, 0x6f, 0xab, 0x93, 0xb8, 0xe6, 0x36, 0xcf, 0xeb,
    0x31, 0xae,
];

// Seconds a stream source stays registered after its publisher detaches
pub const SOURCE_CLEANUP_DELAY_SECONDS: u64 = 60;
