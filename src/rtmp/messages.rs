// RTMP message generators

use std::collections::HashMap;

use byteorder::{BigEndian, ByteOrder};

use crate::amf::AMF0Value;

use super::{
    RtmpCommand, RtmpData, RtmpPacket, RTMP_CHANNEL_INVOKE, RTMP_CHUNK_TYPE_0, RTMP_TYPE_INVOKE,
};

/// Makes RTMP ACK message
pub fn rtmp_make_ack(size: u32) -> Vec<u8> {
    let mut b = vec![
        0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00,
    ];

    BigEndian::write_u32(&mut b[12..16], size);

    b
}

/// Makes RTMP window ACK
pub fn rtmp_make_window_ack(size: u32) -> Vec<u8> {
    let mut b = vec![
        0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00,
    ];

    BigEndian::write_u32(&mut b[12..16], size);

    b
}

/// Makes RTMP control message to indicate peer bandwidth
pub fn rtmp_make_peer_bandwidth_set_message(size: u32, limit_type: u8) -> Vec<u8> {
    let mut b = vec![
        0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
    ];

    BigEndian::write_u32(&mut b[12..16], size);
    b[16] = limit_type;

    b
}

/// Makes RTMP control message to indicate chunk size
pub fn rtmp_make_chunk_size_set_message(size: u32) -> Vec<u8> {
    let mut b = vec![
        0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00,
    ];

    BigEndian::write_u32(&mut b[12..16], size);

    b
}

/// Makes RTMP user control message to indicate stream status
/// Use one of these for the event: STREAM_BEGIN, STREAM_EOF, STREAM_DRY, STREAM_IS_RECORDED
pub fn rtmp_make_stream_status_message(event: u16, stream_id: u32) -> Vec<u8> {
    let mut b = vec![
        0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x06, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00,
    ];

    BigEndian::write_u16(&mut b[12..14], event);
    BigEndian::write_u32(&mut b[14..18], stream_id);

    b
}

/// Makes RTMP invoke command message
pub fn rtmp_make_invoke_message(
    cmd: &RtmpCommand,
    stream_id: u32,
    out_chunk_size: usize,
) -> Vec<u8> {
    let mut packet = RtmpPacket::new_blank();

    packet.header.format = RTMP_CHUNK_TYPE_0;
    packet.header.channel_id = RTMP_CHANNEL_INVOKE;
    packet.header.packet_type = RTMP_TYPE_INVOKE;
    packet.header.stream_id = stream_id;
    packet.payload = cmd.encode();
    packet.header.length = packet.payload.len();

    packet.create_chunks(out_chunk_size)
}

/// Makes RTMP status message
pub fn rtmp_make_status_message(
    stream_id: u32,
    level: &str,
    code: &str,
    description: Option<&str>,
    out_chunk_size: usize,
) -> Vec<u8> {
    let mut cmd = RtmpCommand::new("onStatus".to_string());

    cmd.set_argument("transId".to_string(), AMF0Value::Number { value: 0.0 });
    cmd.set_argument("cmdObj".to_string(), AMF0Value::Null);

    let mut info: HashMap<String, AMF0Value> = HashMap::new();

    info.insert(
        "level".to_string(),
        AMF0Value::String {
            value: level.to_string(),
        },
    );
    info.insert(
        "code".to_string(),
        AMF0Value::String {
            value: code.to_string(),
        },
    );

    if let Some(d) = description {
        info.insert(
            "description".to_string(),
            AMF0Value::String {
                value: d.to_string(),
            },
        );
    }

    cmd.set_argument("info".to_string(), AMF0Value::Object { properties: info });

    rtmp_make_invoke_message(&cmd, stream_id, out_chunk_size)
}

/// Makes message to respond to a connect message
pub fn rtmp_make_connect_response(
    trans_id: i64,
    object_encoding: Option<u32>,
    out_chunk_size: usize,
) -> Vec<u8> {
    let mut cmd = RtmpCommand::new("_result".to_string());

    cmd.set_argument(
        "transId".to_string(),
        AMF0Value::Number {
            value: trans_id as f64,
        },
    );

    let mut cmd_obj: HashMap<String, AMF0Value> = HashMap::new();

    cmd_obj.insert(
        "fmsVer".to_string(),
        AMF0Value::String {
            value: "FMS/3,0,1,123".to_string(),
        },
    );
    cmd_obj.insert("capabilities".to_string(), AMF0Value::Number { value: 31.0 });

    cmd.set_argument(
        "cmdObj".to_string(),
        AMF0Value::Object {
            properties: cmd_obj,
        },
    );

    let mut info: HashMap<String, AMF0Value> = HashMap::new();

    info.insert(
        "level".to_string(),
        AMF0Value::String {
            value: "status".to_string(),
        },
    );
    info.insert(
        "code".to_string(),
        AMF0Value::String {
            value: "NetConnection.Connect.Success".to_string(),
        },
    );
    info.insert(
        "description".to_string(),
        AMF0Value::String {
            value: "Connection succeeded.".to_string(),
        },
    );

    match object_encoding {
        Some(oe) => {
            info.insert(
                "objectEncoding".to_string(),
                AMF0Value::Number { value: oe as f64 },
            );
        }
        None => {
            info.insert("objectEncoding".to_string(), AMF0Value::Undefined);
        }
    }

    cmd.set_argument("info".to_string(), AMF0Value::Object { properties: info });

    rtmp_make_invoke_message(&cmd, 0, out_chunk_size)
}

/// Makes message to respond to a createStream message
pub fn rtmp_make_create_stream_response(
    trans_id: i64,
    stream_index: u32,
    out_chunk_size: usize,
) -> Vec<u8> {
    let mut cmd = RtmpCommand::new("_result".to_string());

    cmd.set_argument(
        "transId".to_string(),
        AMF0Value::Number {
            value: trans_id as f64,
        },
    );

    cmd.set_argument("cmdObj".to_string(), AMF0Value::Null);

    cmd.set_argument(
        "info".to_string(),
        AMF0Value::Number {
            value: stream_index as f64,
        },
    );

    rtmp_make_invoke_message(&cmd, 0, out_chunk_size)
}

/// Build RTMP metadata to be stored in order to send to players
/// Strips the @setDataFrame wrapper the publisher sends
pub fn rtmp_build_metadata(data: &RtmpData) -> Vec<u8> {
    let mut res = RtmpData::new("onMetaData".to_string());

    let arg_res = data.get_argument("dataObj");

    match arg_res {
        Some(arg) => {
            res.set_argument("dataObj".to_string(), arg.clone());
        }
        None => {
            res.set_argument("dataObj".to_string(), AMF0Value::Null);
        }
    }

    res.encode()
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtmp::{
        RTMP_PEER_BANDWIDTH_LIMIT_DYNAMIC, RTMP_TYPE_ACKNOWLEDGEMENT, RTMP_TYPE_SET_CHUNK_SIZE,
        RTMP_TYPE_SET_PEER_BANDWIDTH, RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE,
    };

    #[test]
    fn test_control_message_layout() {
        let ack = rtmp_make_ack(100);

        assert_eq!(ack.len(), 16);
        assert_eq!(ack[0], 0x02); // csid 2, fmt 0
        assert_eq!(ack[7] as u32, RTMP_TYPE_ACKNOWLEDGEMENT);
        assert_eq!(BigEndian::read_u32(&ack[12..16]), 100);

        let window_ack = rtmp_make_window_ack(2500000);

        assert_eq!(window_ack[7] as u32, RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE);
        assert_eq!(BigEndian::read_u32(&window_ack[12..16]), 2500000);

        let peer_bw =
            rtmp_make_peer_bandwidth_set_message(2500000, RTMP_PEER_BANDWIDTH_LIMIT_DYNAMIC);

        assert_eq!(peer_bw.len(), 17);
        assert_eq!(peer_bw[7] as u32, RTMP_TYPE_SET_PEER_BANDWIDTH);
        assert_eq!(BigEndian::read_u32(&peer_bw[12..16]), 2500000);
        assert_eq!(peer_bw[16], RTMP_PEER_BANDWIDTH_LIMIT_DYNAMIC);

        let chunk_size = rtmp_make_chunk_size_set_message(60000);

        assert_eq!(chunk_size[7] as u32, RTMP_TYPE_SET_CHUNK_SIZE);
        assert_eq!(BigEndian::read_u32(&chunk_size[12..16]), 60000);
    }

    #[test]
    fn test_stream_status_message_layout() {
        let begin = rtmp_make_stream_status_message(0x00, 1);

        assert_eq!(begin.len(), 18);
        assert_eq!(begin[7], 0x04);
        assert_eq!(BigEndian::read_u16(&begin[12..14]), 0x00);
        assert_eq!(BigEndian::read_u32(&begin[14..18]), 1);

        let recorded = rtmp_make_stream_status_message(0x04, 1);

        assert_eq!(BigEndian::read_u16(&recorded[12..14]), 0x04);
    }

    #[test]
    fn test_status_message_decodes_back() {
        let bytes = rtmp_make_status_message(
            1,
            "status",
            "NetStream.Publish.Start",
            Some("Stream is now published."),
            4096,
        );

        // Strip the chunk header (1 basic + 11 message header bytes)
        let cmd = RtmpCommand::decode(&bytes[12..]).unwrap();

        assert_eq!(cmd.cmd, "onStatus");
        assert_eq!(
            cmd.get_argument("info")
                .unwrap()
                .get_object_property("code")
                .unwrap()
                .get_string(),
            "NetStream.Publish.Start"
        );
    }
}
