//! Wire protocol for tvault.
//!
//! Defines the closed set of commands a caller may send across the trust
//! boundary, the replies the trusted side returns, and the frame format
//! both sides use when the boundary is a byte stream.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{Frame, FrameCodec};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{
    opcodes, Command, Reply, DATA_REPLY_OVERHEAD, MAX_FRAME_SIZE, MAX_OBJECT_SIZE,
};
