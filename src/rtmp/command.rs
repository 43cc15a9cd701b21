// RTMP command

use std::{collections::HashMap, sync::LazyLock};

use crate::amf::{AMF0Value, AMFDecodingCursor};

/// RTMP command
pub struct RtmpCommand {
    /// Command
    pub cmd: String,

    /// Arguments
    pub arguments: HashMap<String, AMF0Value>,
}

// Positional argument names for each known command
static RTMP_COMMAND_CODES: LazyLock<HashMap<String, Vec<String>>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    m.insert(
        "_result".to_string(),
        vec![
            "transId".to_string(),
            "cmdObj".to_string(),
            "info".to_string(),
        ],
    );

    m.insert(
        "_error".to_string(),
        vec![
            "transId".to_string(),
            "cmdObj".to_string(),
            "info".to_string(),
            "streamId".to_string(),
        ],
    );

    m.insert(
        "onStatus".to_string(),
        vec![
            "transId".to_string(),
            "cmdObj".to_string(),
            "info".to_string(),
        ],
    );

    m.insert(
        "connect".to_string(),
        vec![
            "transId".to_string(),
            "cmdObj".to_string(),
            "args".to_string(),
        ],
    );

    m.insert(
        "call".to_string(),
        vec![
            "transId".to_string(),
            "cmdObj".to_string(),
            "args".to_string(),
        ],
    );

    m.insert(
        "createStream".to_string(),
        vec!["transId".to_string(), "cmdObj".to_string()],
    );

    m.insert(
        "releaseStream".to_string(),
        vec![
            "transId".to_string(),
            "cmdObj".to_string(),
            "streamName".to_string(),
        ],
    );

    m.insert(
        "FCPublish".to_string(),
        vec![
            "transId".to_string(),
            "cmdObj".to_string(),
            "streamName".to_string(),
        ],
    );

    m.insert(
        "FCUnpublish".to_string(),
        vec![
            "transId".to_string(),
            "cmdObj".to_string(),
            "streamName".to_string(),
        ],
    );

    m.insert(
        "publish".to_string(),
        vec![
            "transId".to_string(),
            "cmdObj".to_string(),
            "streamName".to_string(),
            "type".to_string(),
        ],
    );

    m.insert(
        "play".to_string(),
        vec![
            "transId".to_string(),
            "cmdObj".to_string(),
            "streamName".to_string(),
            "start".to_string(),
            "duration".to_string(),
            "reset".to_string(),
        ],
    );

    m.insert(
        "deleteStream".to_string(),
        vec![
            "transId".to_string(),
            "cmdObj".to_string(),
            "streamId".to_string(),
        ],
    );

    m.insert(
        "closeStream".to_string(),
        vec!["transId".to_string(), "cmdObj".to_string()],
    );

    m
});

impl RtmpCommand {
    /// Creates RtmpCommand
    pub fn new(cmd: String) -> RtmpCommand {
        RtmpCommand {
            cmd,
            arguments: HashMap::new(),
        }
    }

    /// Sets argument
    pub fn set_argument(&mut self, arg_name: String, value: AMF0Value) {
        self.arguments.insert(arg_name, value);
    }

    /// Gets argument
    pub fn get_argument(&self, arg_name: &str) -> Option<&AMF0Value> {
        self.arguments.get(arg_name)
    }

    /// Gets the transaction ID argument
    pub fn get_trans_id(&self) -> i64 {
        match self.get_argument("transId") {
            Some(t) => t.get_integer(),
            None => 0,
        }
    }

    /// Gets string representation of the command for debug logging
    pub fn to_debug_string(&self) -> String {
        let mut s = format!("{} {}\n", self.cmd, "{");

        for (arg_name, arg_val) in &self.arguments {
            s.push_str(&format!(
                "    '{}' = {}\n",
                arg_name,
                arg_val.to_debug_string("    ")
            ));
        }

        s.push('}');

        s
    }

    /// Encodes command
    pub fn encode(&self) -> Vec<u8> {
        let x = AMF0Value::String {
            value: self.cmd.clone(),
        };

        let mut buf = x.encode();

        let arg_list_res = RTMP_COMMAND_CODES.get(&self.cmd);

        if let Some(arg_list) = arg_list_res {
            for arg_name in arg_list {
                let val_res = self.arguments.get(arg_name);

                match val_res {
                    Some(val) => {
                        buf.extend(val.encode());
                    }
                    None => {
                        buf.extend(AMF0Value::Undefined.encode());
                    }
                }
            }
        }

        buf
    }

    /// Decodes command from bytes
    pub fn decode(data: &[u8]) -> Result<RtmpCommand, ()> {
        let mut cursor = AMFDecodingCursor::new(data);

        let cmd_amf = AMF0Value::read(&mut cursor, data)?;
        let cmd = cmd_amf.get_string();

        let mut c = RtmpCommand::new(cmd.to_string());

        let arg_list_res = RTMP_COMMAND_CODES.get(cmd);

        if let Some(arg_list) = arg_list_res {
            let mut i: usize = 0;

            while i < arg_list.len() && !cursor.ended() {
                let val = AMF0Value::read(&mut cursor, data)?;

                c.set_argument(arg_list[i].clone(), val);

                i += 1;
            }
        }

        Ok(c)
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_encode_decode() {
        let mut cmd = RtmpCommand::new("connect".to_string());

        cmd.set_argument("transId".to_string(), AMF0Value::Number { value: 1.0 });

        let mut cmd_obj: HashMap<String, AMF0Value> = HashMap::new();
        cmd_obj.insert(
            "app".to_string(),
            AMF0Value::String {
                value: "live".to_string(),
            },
        );
        cmd_obj.insert(
            "tcUrl".to_string(),
            AMF0Value::String {
                value: "rtmp://host/live".to_string(),
            },
        );

        cmd.set_argument(
            "cmdObj".to_string(),
            AMF0Value::Object {
                properties: cmd_obj,
            },
        );

        let bytes = cmd.encode();
        let decoded = RtmpCommand::decode(&bytes).unwrap();

        assert_eq!(decoded.cmd, "connect");
        assert_eq!(decoded.get_trans_id(), 1);
        assert_eq!(
            decoded
                .get_argument("cmdObj")
                .unwrap()
                .get_object_property("app")
                .unwrap()
                .get_string(),
            "live"
        );
    }

    #[test]
    fn test_publish_command_decode() {
        // publish(5.0, null, "cam1", "live")
        let mut bytes = AMF0Value::String {
            value: "publish".to_string(),
        }
        .encode();
        bytes.extend(AMF0Value::Number { value: 5.0 }.encode());
        bytes.extend(AMF0Value::Null.encode());
        bytes.extend(
            AMF0Value::String {
                value: "cam1".to_string(),
            }
            .encode(),
        );
        bytes.extend(
            AMF0Value::String {
                value: "live".to_string(),
            }
            .encode(),
        );

        let decoded = RtmpCommand::decode(&bytes).unwrap();

        assert_eq!(decoded.cmd, "publish");
        assert_eq!(decoded.get_trans_id(), 5);
        assert_eq!(
            decoded.get_argument("streamName").unwrap().get_string(),
            "cam1"
        );
        assert_eq!(decoded.get_argument("type").unwrap().get_string(), "live");
    }

    #[test]
    fn test_unknown_command_decode() {
        let bytes = AMF0Value::String {
            value: "somethingElse".to_string(),
        }
        .encode();

        let decoded = RtmpCommand::decode(&bytes).unwrap();

        assert_eq!(decoded.cmd, "somethingElse");
        assert!(decoded.arguments.is_empty());
    }
}
