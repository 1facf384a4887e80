//! The message frame and its wire codec.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::DecodeError;

const MAGIC: u32 = 0x504D_5347; // "PMSG"
const VERSION: u8 = 1;

/// One unit of delivery: a topic, a byte payload, optional string headers,
/// and an id that is unique within this process (see [`Message::new`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub timestamp: u64,
    pub topic: String,
    pub content: Vec<u8>,
    pub headers: BTreeMap<String, String>,
}

impl Message {
    /// Builds a new message, minting its id and timestamp now.
    pub fn new(topic: impl Into<String>, content: Vec<u8>, headers: BTreeMap<String, String>) -> Self {
        let timestamp = now_micros();
        Self {
            id: next_id(timestamp),
            timestamp,
            topic: topic.into(),
            content,
            headers,
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let topic_bytes = self.topic.as_bytes();
        let headers_json = serde_json::to_vec(&self.headers).expect("map of strings always serializes");

        writer.write_all(&MAGIC.to_be_bytes())?;
        writer.write_all(&[VERSION])?;
        writer.write_all(&self.id.to_be_bytes())?;
        writer.write_all(&self.timestamp.to_be_bytes())?;
        writer.write_all(&(topic_bytes.len() as u32).to_be_bytes())?;
        writer.write_all(topic_bytes)?;
        writer.write_all(&(headers_json.len() as u32).to_be_bytes())?;
        writer.write_all(&headers_json)?;
        writer.write_all(&(self.content.len() as u32).to_be_bytes())?;
        writer.write_all(&self.content)?;
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let magic = read_u32(reader)?;
        if magic != MAGIC {
            return Err(DecodeError::BadMagic);
        }

        let version = read_u8(reader)?;
        if version != VERSION {
            return Err(DecodeError::BadVersion(version));
        }

        let id = read_u64(reader)?;
        let timestamp = read_u64(reader)?;

        let topic_len = read_u32(reader)? as usize;
        let topic_bytes = read_exact_vec(reader, topic_len)?;
        let topic = String::from_utf8(topic_bytes).map_err(|_| DecodeError::BadUtf8)?;

        let headers_len = read_u32(reader)? as usize;
        let headers_bytes = read_exact_vec(reader, headers_len)?;
        let headers: BTreeMap<String, String> = if headers_bytes.is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_slice(&headers_bytes).map_err(|_| DecodeError::BadHeaders)?
        };

        let content_len = read_u32(reader)? as usize;
        let content = read_exact_vec(reader, content_len)?;

        Ok(Self {
            id,
            timestamp,
            topic,
            content,
            headers,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write(&mut buf).expect("writing to a Vec never fails");
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = bytes;
        Self::read(&mut cursor)
    }
}

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_micros() as u64
}

/// Time-based id with the low 16 bits replaced by random bits, so ids minted
/// within the same microsecond in this process still disambiguate.
fn next_id(timestamp: u64) -> u64 {
    use rand::Rng;
    let high_bits = (timestamp >> 16) << 16;
    high_bits | u64::from(rand::thread_rng().gen::<u16>())
}

fn read_exact_vec<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>, DecodeError> {
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .map_err(|_| DecodeError::TruncatedFrame)?;
    Ok(buf)
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8, DecodeError> {
    let mut buf = [0u8; 1];
    reader
        .read_exact(&mut buf)
        .map_err(|_| DecodeError::TruncatedFrame)?;
    Ok(buf[0])
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32, DecodeError> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|_| DecodeError::TruncatedFrame)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64, DecodeError> {
    let mut buf = [0u8; 8];
    reader
        .read_exact(&mut buf)
        .map_err(|_| DecodeError::TruncatedFrame)?;
    Ok(u64::from_be_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_topic_content_and_headers() {
        let mut headers = BTreeMap::new();
        headers.insert("trace-id".to_string(), "abc123".to_string());
        let msg = Message::new("test.a", b"hello".to_vec(), headers);

        let bytes = msg.to_bytes();
        let decoded = Message::from_bytes(&bytes).unwrap();

        assert_eq!(decoded, msg);
    }

    #[test]
    fn empty_content_round_trips() {
        let msg = Message::new("test.empty", Vec::new(), BTreeMap::new());
        let decoded = Message::from_bytes(&msg.to_bytes()).unwrap();
        assert_eq!(decoded.content, Vec::<u8>::new());
    }

    #[test]
    fn large_payload_round_trips() {
        let content = vec![0xABu8; 1024 * 1024];
        let msg = Message::new("test.large", content.clone(), BTreeMap::new());
        let decoded = Message::from_bytes(&msg.to_bytes()).unwrap();
        assert_eq!(decoded.content, content);
    }

    #[test]
    fn unicode_topic_round_trips() {
        let msg = Message::new("test.\u{e9}v\u{e9}nement", b"x".to_vec(), BTreeMap::new());
        let decoded = Message::from_bytes(&msg.to_bytes()).unwrap();
        assert_eq!(decoded.topic, msg.topic);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = Message::new("t", b"x".to_vec(), BTreeMap::new()).to_bytes();
        bytes[0] = 0x00;
        assert!(matches!(
            Message::from_bytes(&bytes),
            Err(DecodeError::BadMagic)
        ));
    }

    #[test]
    fn rejects_truncated_frame() {
        let bytes = Message::new("t", b"hello".to_vec(), BTreeMap::new()).to_bytes();
        let truncated = &bytes[..bytes.len() - 3];
        assert!(matches!(
            Message::from_bytes(truncated),
            Err(DecodeError::TruncatedFrame)
        ));
    }

    #[test]
    fn encode_length_matches_declared_fields() {
        let msg = Message::new("topic", vec![1, 2, 3, 4], BTreeMap::new());
        let bytes = msg.to_bytes();
        let expected = 33 + msg.topic.len() + 2 /* "{}" */ + msg.content.len();
        assert_eq!(bytes.len(), expected);
    }
}
