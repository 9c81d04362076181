use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{Command, Reply, MAX_FRAME_SIZE};

/// A message that can travel in a frame.
pub trait Frame: Serialize + DeserializeOwned {
    fn opcode(&self) -> u8;
    fn is_known_opcode(opcode: u8) -> bool;
}

impl Frame for Command {
    fn opcode(&self) -> u8 {
        Command::opcode(self)
    }

    fn is_known_opcode(opcode: u8) -> bool {
        Command::is_known_opcode(opcode)
    }
}

impl Frame for Reply {
    fn opcode(&self) -> u8 {
        Reply::opcode(self)
    }

    fn is_known_opcode(opcode: u8) -> bool {
        Reply::is_known_opcode(opcode)
    }
}

/// Codec for tvault frames: `[4 bytes BE len][1 byte opcode][bincode payload]`.
///
/// `len` counts the opcode byte plus the payload.
pub struct FrameCodec;

impl FrameCodec {
    pub fn encode<F: Frame>(msg: &F) -> ProtocolResult<Vec<u8>> {
        let payload =
            bincode::serialize(msg).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        if payload.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: payload.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        let len = (payload.len() + 1) as u32;
        let mut buf = Vec::with_capacity(4 + 1 + payload.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.push(msg.opcode());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decode one frame from the front of `data`. Returns (message, bytes_consumed).
    ///
    /// An opcode outside `F`'s set is reported as
    /// [`ProtocolError::UnknownOpcode`] before the payload is looked at.
    pub fn decode<F: Frame>(data: &[u8]) -> ProtocolResult<(F, usize)> {
        if data.len() < 5 {
            return Err(ProtocolError::FramingError("too short".into()));
        }
        let len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if len < 1 {
            return Err(ProtocolError::FramingError("zero-length frame".into()));
        }
        if len - 1 > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: len - 1,
                max: MAX_FRAME_SIZE,
            });
        }
        let total = 4 + len;
        if data.len() < total {
            return Err(ProtocolError::FramingError(format!(
                "incomplete: have {}, need {}",
                data.len(),
                total
            )));
        }
        let opcode = data[4];
        if !F::is_known_opcode(opcode) {
            return Err(ProtocolError::UnknownOpcode(opcode));
        }
        let msg = Self::decode_payload::<F>(&data[5..total])?;
        if msg.opcode() != opcode {
            return Err(ProtocolError::FramingError(format!(
                "opcode {opcode:#04x} does not match payload {:#04x}",
                msg.opcode()
            )));
        }
        Ok((msg, total))
    }

    /// Encode payload only (no framing).
    pub fn encode_payload<F: Frame>(msg: &F) -> ProtocolResult<Vec<u8>> {
        bincode::serialize(msg).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Decode payload only (no framing).
    pub fn decode_payload<F: Frame>(data: &[u8]) -> ProtocolResult<F> {
        bincode::deserialize(data).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::opcodes;
    use proptest::prelude::*;
    use tvault_types::{ObjectId, StatusCode};

    fn id() -> ObjectId {
        ObjectId::try_from("obj1").unwrap()
    }

    macro_rules! roundtrip_test {
        ($name:ident, $ty:ty, $msg:expr) => {
            #[test]
            fn $name() {
                let msg: $ty = $msg;
                let encoded = FrameCodec::encode(&msg).unwrap();
                let (decoded, consumed) = FrameCodec::decode::<$ty>(&encoded).unwrap();
                assert_eq!(consumed, encoded.len());
                assert_eq!(decoded, msg);
            }
        };
    }

    roundtrip_test!(write_chunk_roundtrip, Command, Command::WriteChunk {
        id: id(),
        chunk: vec![0xAB; 300],
        is_first: true,
    });

    roundtrip_test!(read_roundtrip, Command, Command::Read { id: id(), capacity: 1 });

    roundtrip_test!(encrypt_roundtrip, Command, Command::EncryptChunk {
        data: vec![7; 32],
        is_first: false,
    });

    roundtrip_test!(reset_roundtrip, Command, Command::Reset);

    roundtrip_test!(short_buffer_roundtrip, Reply, Reply::ShortBuffer { required: 1_048_576 });

    roundtrip_test!(timing_roundtrip, Reply, Reply::Timing {
        encrypt_ms: 12,
        decrypt_ms: 9,
        total_bytes: u64::MAX,
    });

    roundtrip_test!(status_roundtrip, Reply, Reply::Status(StatusCode::StorageNoSpace));

    #[test]
    fn decode_truncated() {
        let err = FrameCodec::decode::<Command>(&[0, 0, 0]).unwrap_err();
        assert!(matches!(err, ProtocolError::FramingError(_)));
    }

    #[test]
    fn decode_zero_length() {
        let data = [0u8, 0, 0, 0, 0];
        let err = FrameCodec::decode::<Command>(&data).unwrap_err();
        assert!(matches!(err, ProtocolError::FramingError(_)));
    }

    #[test]
    fn decode_incomplete() {
        let encoded = FrameCodec::encode(&Command::Delete { id: id() }).unwrap();
        let err = FrameCodec::decode::<Command>(&encoded[..encoded.len() - 1]).unwrap_err();
        assert!(matches!(err, ProtocolError::FramingError(_)));
    }

    #[test]
    fn unknown_opcode_not_supported() {
        let mut frame = FrameCodec::encode(&Command::Reset).unwrap();
        frame[4] = 0x42;
        let err = FrameCodec::decode::<Command>(&frame).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownOpcode(0x42)));
        assert_eq!(err.status(), StatusCode::NotSupported);
    }

    #[test]
    fn reply_opcode_is_not_a_command() {
        let frame = FrameCodec::encode(&Reply::Done).unwrap();
        let err = FrameCodec::decode::<Command>(&frame).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownOpcode(opcodes::DONE)));
    }

    #[test]
    fn opcode_payload_mismatch() {
        let mut frame = FrameCodec::encode(&Command::Reset).unwrap();
        frame[4] = opcodes::WRITE_FINALIZE;
        let err = FrameCodec::decode::<Command>(&frame).unwrap_err();
        assert!(matches!(err, ProtocolError::FramingError(_)));
        assert_eq!(err.status(), StatusCode::BadParameters);
    }

    #[test]
    fn garbage_payload_bad_parameters() {
        let frame = [0u8, 0, 0, 3, opcodes::DELETE, 0xFF, 0xFF];
        let err = FrameCodec::decode::<Command>(&frame).unwrap_err();
        assert!(matches!(err, ProtocolError::Deserialization(_)));
        assert_eq!(err.status(), StatusCode::BadParameters);
    }

    #[test]
    fn payload_roundtrip() {
        let msg = Reply::Data(b"payload".to_vec());
        let bytes = FrameCodec::encode_payload(&msg).unwrap();
        assert_eq!(FrameCodec::decode_payload::<Reply>(&bytes).unwrap(), msg);
    }

    #[test]
    fn data_reply_overhead_matches_encoding() {
        let bytes = FrameCodec::encode_payload(&Reply::Data(vec![1, 2, 3])).unwrap();
        assert_eq!(bytes.len(), 3 + crate::message::DATA_REPLY_OVERHEAD);
    }

    #[test]
    fn largest_object_fits_one_frame() {
        let max = crate::message::MAX_OBJECT_SIZE as usize;
        let frame = FrameCodec::encode(&Reply::Data(vec![0; max])).unwrap();
        assert_eq!(frame.len(), 4 + 1 + MAX_FRAME_SIZE);
        drop(frame);

        let err = FrameCodec::encode(&Reply::Data(vec![0; max + 1])).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { .. }));
    }

    proptest! {
        #[test]
        fn decode_never_panics(data in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = FrameCodec::decode::<Command>(&data);
        }
    }
}
