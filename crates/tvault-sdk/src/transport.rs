use tvault_protocol::{Command, FrameCodec, Reply};
use tvault_trusted::Connection;

use crate::error::SdkResult;

/// Synchronous request/response channel to the trusted side.
pub trait Transport {
    fn call(&mut self, command: Command) -> SdkResult<Reply>;
}

/// Calls straight into an in-process [`Connection`].
#[derive(Debug)]
pub struct LocalTransport {
    conn: Connection,
}

impl LocalTransport {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Transport for LocalTransport {
    fn call(&mut self, command: Command) -> SdkResult<Reply> {
        Ok(self.conn.dispatch(command))
    }
}

/// Encodes every command to a frame and decodes the reply frame, exercising
/// the wire format end to end.
#[derive(Debug)]
pub struct FramedTransport {
    conn: Connection,
    bytes_sent: u64,
    bytes_received: u64,
}

impl FramedTransport {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    /// Frame bytes sent and received so far.
    pub fn traffic(&self) -> (u64, u64) {
        (self.bytes_sent, self.bytes_received)
    }
}

impl Transport for FramedTransport {
    fn call(&mut self, command: Command) -> SdkResult<Reply> {
        let frame = FrameCodec::encode(&command)?;
        let response = self.conn.handle_frame(&frame)?;
        let (reply, _) = FrameCodec::decode::<Reply>(&response)?;
        self.bytes_sent += frame.len() as u64;
        self.bytes_received += response.len() as u64;
        Ok(reply)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn call(&mut self, command: Command) -> SdkResult<Reply> {
        (**self).call(command)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn call(&mut self, command: Command) -> SdkResult<Reply> {
        (**self).call(command)
    }
}
