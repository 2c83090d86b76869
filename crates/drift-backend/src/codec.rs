use std::io::{Read, Write};

use crate::error::{BackendError, BackendResult};
use crate::message::{BackendMessage, MAX_MESSAGE_SIZE};

/// Codec for backend messages.
///
/// Frame layout: `[4 bytes BE length][1 byte type tag][bincode payload]`,
/// where the length counts the tag and the payload.
pub struct BackendCodec;

impl BackendCodec {
    /// Encode a message with framing.
    pub fn encode(msg: &BackendMessage) -> BackendResult<Vec<u8>> {
        let payload =
            bincode::serialize(msg).map_err(|e| BackendError::Serialization(e.to_string()))?;
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(BackendError::MessageTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        let len = (payload.len() + 1) as u32;
        let mut buf = Vec::with_capacity(4 + 1 + payload.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.push(msg.type_tag());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decode a framed message. Returns (message, bytes_consumed).
    pub fn decode(data: &[u8]) -> BackendResult<(BackendMessage, usize)> {
        if data.len() < 5 {
            return Err(BackendError::Framing("too short".into()));
        }
        let len = Self::frame_len(&[data[0], data[1], data[2], data[3]])?;
        let total = 4 + len;
        if data.len() < total {
            return Err(BackendError::Framing(format!(
                "incomplete: have {}, need {}",
                data.len(),
                total
            )));
        }
        let msg = Self::decode_body(data[4], &data[5..total])?;
        Ok((msg, total))
    }

    /// Write one framed message to a stream.
    pub fn write_to<W: Write>(writer: &mut W, msg: &BackendMessage) -> BackendResult<()> {
        writer.write_all(&Self::encode(msg)?)?;
        writer.flush()?;
        Ok(())
    }

    /// Read exactly one framed message from a stream.
    pub fn read_from<R: Read>(reader: &mut R) -> BackendResult<BackendMessage> {
        let mut header = [0u8; 4];
        reader.read_exact(&mut header)?;
        let len = Self::frame_len(&header)?;
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body)?;
        Self::decode_body(body[0], &body[1..])
    }

    fn frame_len(header: &[u8; 4]) -> BackendResult<usize> {
        let len = u32::from_be_bytes(*header) as usize;
        if len < 1 {
            return Err(BackendError::Framing("zero-length frame".into()));
        }
        if len - 1 > MAX_MESSAGE_SIZE {
            return Err(BackendError::MessageTooLarge {
                size: len - 1,
                max: MAX_MESSAGE_SIZE,
            });
        }
        Ok(len)
    }

    fn decode_body(tag: u8, payload: &[u8]) -> BackendResult<BackendMessage> {
        let msg: BackendMessage = bincode::deserialize(payload)
            .map_err(|e| BackendError::Deserialization(e.to_string()))?;
        if msg.type_tag() != tag {
            return Err(BackendError::InvalidMessageType(tag));
        }
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_types::Candidate;

    fn candidate() -> Candidate {
        Candidate::new("a quiet harbor", "image/png", vec![9, 8, 7])
    }

    macro_rules! roundtrip_test {
        ($name:ident, $msg:expr) => {
            #[test]
            fn $name() {
                let msg = $msg;
                let encoded = BackendCodec::encode(&msg).unwrap();
                let (decoded, consumed) = BackendCodec::decode(&encoded).unwrap();
                assert_eq!(consumed, encoded.len());
                assert_eq!(decoded, msg);
            }
        };
    }

    roundtrip_test!(query_roundtrip, BackendMessage::Query {
        text: "a quiet harbor".into(),
        num_candidates: 8,
    });

    roundtrip_test!(diffuse_roundtrip, BackendMessage::Diffuse {
        source: candidate(),
        candidate_index: 3,
        skip_rate: 0.6,
        num_candidates: 10,
    });

    roundtrip_test!(upscale_roundtrip, BackendMessage::Upscale {
        source: candidate(),
        candidate_index: 1,
    });

    roundtrip_test!(candidates_roundtrip, BackendMessage::Candidates {
        items: vec![candidate(), candidate()],
    });

    roundtrip_test!(error_roundtrip, BackendMessage::Error {
        code: 500,
        message: "model offline".into(),
    });

    #[test]
    fn type_tags_unique() {
        let msgs = vec![
            BackendMessage::Query { text: String::new(), num_candidates: 0 },
            BackendMessage::Diffuse {
                source: candidate(),
                candidate_index: 0,
                skip_rate: 0.0,
                num_candidates: 0,
            },
            BackendMessage::Upscale { source: candidate(), candidate_index: 0 },
            BackendMessage::Candidates { items: vec![] },
            BackendMessage::Error { code: 0, message: String::new() },
        ];
        let mut tags: Vec<u8> = msgs.iter().map(|m| m.type_tag()).collect();
        let len = tags.len();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), len, "type tags should be unique");
        assert_eq!(msgs.iter().filter(|m| m.is_request()).count(), 3);
    }

    #[test]
    fn decode_truncated() {
        let err = BackendCodec::decode(&[0, 0, 0]).unwrap_err();
        assert!(matches!(err, BackendError::Framing(_)));
    }

    #[test]
    fn decode_zero_length() {
        let data = [0u8, 0, 0, 0, 0];
        let err = BackendCodec::decode(&data).unwrap_err();
        assert!(matches!(err, BackendError::Framing(_)));
    }

    #[test]
    fn decode_oversized_header() {
        let data = [0xffu8, 0xff, 0xff, 0xff, 1];
        let err = BackendCodec::decode(&data).unwrap_err();
        assert!(matches!(err, BackendError::MessageTooLarge { .. }));
    }

    #[test]
    fn mismatched_tag_is_rejected() {
        let mut encoded = BackendCodec::encode(&BackendMessage::Candidates { items: vec![] }).unwrap();
        encoded[4] = 1;
        let err = BackendCodec::decode(&encoded).unwrap_err();
        assert!(matches!(err, BackendError::InvalidMessageType(1)));
    }

    #[test]
    fn stream_roundtrip() {
        let first = BackendMessage::Query { text: "fox".into(), num_candidates: 2 };
        let second = BackendMessage::Error { code: 400, message: "bad".into() };
        let mut wire = Vec::new();
        BackendCodec::write_to(&mut wire, &first).unwrap();
        BackendCodec::write_to(&mut wire, &second).unwrap();

        let mut reader = wire.as_slice();
        assert_eq!(BackendCodec::read_from(&mut reader).unwrap(), first);
        assert_eq!(BackendCodec::read_from(&mut reader).unwrap(), second);
        assert!(matches!(
            BackendCodec::read_from(&mut reader),
            Err(BackendError::Io(_))
        ));
    }
}
