// AMF3 value

use byteorder::{BigEndian, ByteOrder};

use super::AMFDecodingCursor;

const AMF3_TYPE_UNDEFINED: u8 = 0x00;
const AMF3_TYPE_NULL: u8 = 0x01;
const AMF3_TYPE_FALSE: u8 = 0x02;
const AMF3_TYPE_TRUE: u8 = 0x03;
const AMF3_TYPE_INTEGER: u8 = 0x04;
const AMF3_TYPE_DOUBLE: u8 = 0x05;
const AMF3_TYPE_STRING: u8 = 0x06;
const AMF3_TYPE_XML_DOC: u8 = 0x07;
const AMF3_TYPE_DATE: u8 = 0x08;
const AMF3_TYPE_BYTE_ARRAY: u8 = 0x0C;

/// AMF3 compatible value
/// Only the scalar subset command messages actually carry is supported
#[derive(Clone)]
pub enum AMF3Value {
    Undefined,
    Null,
    False,
    True,
    Integer { value: i32 },
    Double { value: f64 },
    String { value: String },
    XmlDocument { content: String },
    Date { timestamp: f64 },
    ByteArray { value: Vec<u8> },
}

impl AMF3Value {
    /// Obtains a string representation of the value
    /// Used for debug logging purposes
    pub fn to_debug_string(&self, _tabs: &str) -> String {
        match self {
            AMF3Value::Undefined => "Undefined".to_string(),
            AMF3Value::Null => "Null".to_string(),
            AMF3Value::False => "False".to_string(),
            AMF3Value::True => "True".to_string(),
            AMF3Value::Integer { value } => format!("Integer({})", value),
            AMF3Value::Double { value } => format!("Double({})", value),
            AMF3Value::String { value } => format!("'{}'", value),
            AMF3Value::XmlDocument { content } => format!("XML_DOC'{}'", content),
            AMF3Value::Date { timestamp } => format!("DATE({})", timestamp),
            AMF3Value::ByteArray { value } => format!("Bytes({})", hex::encode(value)),
        }
    }

    /// Turns the AMF3 value into a boolean
    pub fn get_bool(&self) -> bool {
        matches!(self, AMF3Value::True)
    }

    /// Returns true if the value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, AMF3Value::Undefined)
    }

    /// Returns true if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, AMF3Value::Null)
    }

    /// Returns the value as integer
    pub fn get_integer(&self) -> i64 {
        match self {
            AMF3Value::Integer { value } => *value as i64,
            AMF3Value::Double { value } => *value as i64,
            _ => 0,
        }
    }

    /// Returns the value as float
    pub fn get_float(&self) -> f64 {
        match self {
            AMF3Value::Integer { value } => *value as f64,
            AMF3Value::Double { value } => *value,
            _ => 0.0,
        }
    }

    /// Returns the value as string
    pub fn get_string(&self) -> &str {
        match self {
            AMF3Value::String { value } => value.as_str(),
            AMF3Value::XmlDocument { content } => content.as_str(),
            _ => "",
        }
    }

    /// Returns the value as byte array
    pub fn get_byte_array(&self) -> Option<&Vec<u8>> {
        match self {
            AMF3Value::ByteArray { value } => Some(value),
            _ => None,
        }
    }

    /// Encodes value into bytes
    pub fn encode(&self) -> Vec<u8> {
        match self {
            AMF3Value::Undefined => vec![AMF3_TYPE_UNDEFINED],
            AMF3Value::Null => vec![AMF3_TYPE_NULL],
            AMF3Value::False => vec![AMF3_TYPE_FALSE],
            AMF3Value::True => vec![AMF3_TYPE_TRUE],
            AMF3Value::Integer { value } => {
                let mut buf = vec![AMF3_TYPE_INTEGER];
                Self::encode_u29(&mut buf, (*value as u32) & 0x1fffffff);
                buf
            }
            AMF3Value::Double { value } => {
                let mut buf = vec![AMF3_TYPE_DOUBLE, 0, 0, 0, 0, 0, 0, 0, 0];
                BigEndian::write_f64(&mut buf[1..], *value);
                buf
            }
            AMF3Value::String { value } => {
                let mut buf = vec![AMF3_TYPE_STRING];
                Self::encode_utf8_vr(&mut buf, value);
                buf
            }
            AMF3Value::XmlDocument { content } => {
                let mut buf = vec![AMF3_TYPE_XML_DOC];
                Self::encode_utf8_vr(&mut buf, content);
                buf
            }
            AMF3Value::Date { timestamp } => {
                let mut buf = vec![AMF3_TYPE_DATE, 0x01, 0, 0, 0, 0, 0, 0, 0, 0];
                BigEndian::write_f64(&mut buf[2..], *timestamp);
                buf
            }
            AMF3Value::ByteArray { value } => {
                let mut buf = vec![AMF3_TYPE_BYTE_ARRAY];
                Self::encode_u29(&mut buf, ((value.len() as u32) << 1) | 1);
                buf.extend(value);
                buf
            }
        }
    }

    /// Encodes an U29 variable length integer
    fn encode_u29(buf: &mut Vec<u8>, val: u32) {
        if val < 0x80 {
            buf.push(val as u8);
        } else if val < 0x4000 {
            buf.push((((val >> 7) & 0x7f) | 0x80) as u8);
            buf.push((val & 0x7f) as u8);
        } else if val < 0x200000 {
            buf.push((((val >> 14) & 0x7f) | 0x80) as u8);
            buf.push((((val >> 7) & 0x7f) | 0x80) as u8);
            buf.push((val & 0x7f) as u8);
        } else {
            buf.push((((val >> 22) & 0x7f) | 0x80) as u8);
            buf.push((((val >> 15) & 0x7f) | 0x80) as u8);
            buf.push((((val >> 8) & 0x7f) | 0x80) as u8);
            buf.push((val & 0xff) as u8);
        }
    }

    /// Encodes an inline UTF-8 string
    fn encode_utf8_vr(buf: &mut Vec<u8>, s: &str) {
        Self::encode_u29(buf, ((s.len() as u32) << 1) | 1);
        buf.extend(s.bytes());
    }

    /// Reads a value from a buffer, advancing the cursor
    pub fn read(cursor: &mut AMFDecodingCursor, buffer: &[u8]) -> Result<AMF3Value, ()> {
        let type_byte = cursor.read(buffer, 1)?[0];

        match type_byte {
            AMF3_TYPE_UNDEFINED => Ok(AMF3Value::Undefined),
            AMF3_TYPE_NULL => Ok(AMF3Value::Null),
            AMF3_TYPE_FALSE => Ok(AMF3Value::False),
            AMF3_TYPE_TRUE => Ok(AMF3Value::True),
            AMF3_TYPE_INTEGER => {
                let raw = Self::read_u29(cursor, buffer)?;

                // Sign-extend the 29 bit integer
                let value = if raw & 0x10000000 != 0 {
                    (raw | 0xe0000000) as i32
                } else {
                    raw as i32
                };

                Ok(AMF3Value::Integer { value })
            }
            AMF3_TYPE_DOUBLE => {
                let b = cursor.read(buffer, 8)?;
                Ok(AMF3Value::Double {
                    value: BigEndian::read_f64(b),
                })
            }
            AMF3_TYPE_STRING => Ok(AMF3Value::String {
                value: Self::read_utf8_vr(cursor, buffer)?,
            }),
            AMF3_TYPE_XML_DOC => Ok(AMF3Value::XmlDocument {
                content: Self::read_utf8_vr(cursor, buffer)?,
            }),
            AMF3_TYPE_DATE => {
                Self::read_u29(cursor, buffer)?;
                let b = cursor.read(buffer, 8)?;
                Ok(AMF3Value::Date {
                    timestamp: BigEndian::read_f64(b),
                })
            }
            AMF3_TYPE_BYTE_ARRAY => {
                let header = Self::read_u29(cursor, buffer)?;

                if header & 0x01 == 0 {
                    // References require a value table, not supported
                    return Err(());
                }

                let len = (header >> 1) as usize;
                let bytes = cursor.read(buffer, len)?;

                Ok(AMF3Value::ByteArray {
                    value: bytes.to_vec(),
                })
            }
            _ => Err(()),
        }
    }

    /// Reads an U29 variable length integer
    fn read_u29(cursor: &mut AMFDecodingCursor, buffer: &[u8]) -> Result<u32, ()> {
        let mut val: u32 = 0;

        for i in 0..4 {
            let b = cursor.read(buffer, 1)?[0];

            if i == 3 {
                val = (val << 8) | (b as u32);
                break;
            }

            val = (val << 7) | ((b & 0x7f) as u32);

            if b & 0x80 == 0 {
                break;
            }
        }

        Ok(val)
    }

    /// Reads an inline UTF-8 string
    fn read_utf8_vr(cursor: &mut AMFDecodingCursor, buffer: &[u8]) -> Result<String, ()> {
        let header = Self::read_u29(cursor, buffer)?;

        if header & 0x01 == 0 {
            // String references require a reference table, not supported
            return Err(());
        }

        let len = (header >> 1) as usize;
        let str_bytes = cursor.read(buffer, len)?;

        Ok(String::from_utf8_lossy(str_bytes).to_string())
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_decode(val: &AMF3Value) -> AMF3Value {
        let bytes = val.encode();
        let mut cursor = AMFDecodingCursor::new(&bytes);
        AMF3Value::read(&mut cursor, &bytes).expect("decode failed")
    }

    #[test]
    fn test_amf3_scalar_round_trip() {
        assert!(encode_decode(&AMF3Value::Null).is_null());
        assert!(encode_decode(&AMF3Value::True).get_bool());
        assert_eq!(encode_decode(&AMF3Value::Integer { value: 300 }).get_integer(), 300);
        assert_eq!(encode_decode(&AMF3Value::Double { value: 0.5 }).get_float(), 0.5);
        assert_eq!(
            encode_decode(&AMF3Value::String {
                value: "stream".to_string()
            })
            .get_string(),
            "stream"
        );
    }
}
