// RTMP chunk stream reassembly state

/// Complete RTMP message, reassembled from one or more chunks
pub struct RtmpMessage {
    /// Chunk stream ID the message arrived on
    pub csid: u32,

    /// Absolute timestamp
    pub timestamp: u32,

    /// Message type ID
    pub packet_type: u32,

    /// Message stream ID
    pub stream_id: u32,

    /// Declared message length
    pub length: u32,

    /// Message body
    pub payload: Vec<u8>,
}

/// Reassembly state of a single chunk stream (per csid)
pub struct RtmpChunkStream {
    /// Chunk stream ID
    pub csid: u32,

    /// Format of the last header chunk (0, 1 or 2)
    pub format: u32,

    /// Absolute timestamp of the current message
    pub timestamp: u32,

    /// Latched timestamp delta (formats 1 and 2)
    pub timestamp_delta: u32,

    /// Message length
    pub msg_length: u32,

    /// Message type ID
    pub packet_type: u32,

    /// Message stream ID
    pub stream_id: u32,

    /// True when the last header carried an extended timestamp
    pub time_extended: bool,

    /// True once at least one header chunk was seen on this csid
    pub initialized: bool,

    /// True when the current message is fully reassembled
    pub got_full: bool,

    /// Write index into the body buffer
    pub index: usize,

    /// Bytes remaining to complete the message
    pub remain: u32,

    /// Body buffer
    pub data: Vec<u8>,
}

impl RtmpChunkStream {
    /// Creates the state for a chunk stream
    pub fn new(csid: u32) -> RtmpChunkStream {
        RtmpChunkStream {
            csid,
            format: 0,
            timestamp: 0,
            timestamp_delta: 0,
            msg_length: 0,
            packet_type: 0,
            stream_id: 0,
            time_extended: false,
            initialized: false,
            got_full: false,
            index: 0,
            remain: 0,
            data: Vec::new(),
        }
    }

    /// Starts the reassembly of a new message,
    /// allocating the body buffer from the current header
    pub fn start_message(&mut self) {
        self.got_full = false;
        self.index = 0;
        self.remain = self.msg_length;
        self.data = vec![0; self.msg_length as usize];
    }

    /// Discards any partially reassembled body (Abort message)
    pub fn discard(&mut self) {
        self.got_full = false;
        self.index = 0;
        self.remain = 0;
        self.data = Vec::new();
    }

    /// Takes the reassembled message out of the state
    pub fn take_message(&mut self) -> RtmpMessage {
        self.got_full = false;

        RtmpMessage {
            csid: self.csid,
            timestamp: self.timestamp,
            packet_type: self.packet_type,
            stream_id: self.stream_id,
            length: self.msg_length,
            payload: std::mem::take(&mut self.data),
        }
    }
}
