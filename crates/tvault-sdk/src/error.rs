use thiserror::Error;
use tvault_protocol::ProtocolError;
use tvault_types::StatusCode;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("{command} failed: {status}")]
    Status {
        command: &'static str,
        status: StatusCode,
    },

    #[error("unexpected {reply} reply to {command}")]
    UnexpectedReply {
        command: &'static str,
        reply: &'static str,
    },

    #[error("{operation} aborted after {offset} bytes: {source}")]
    Aborted {
        operation: &'static str,
        /// Bytes accepted by the trusted side before the failure.
        offset: u64,
        #[source]
        source: Box<SdkError>,
    },

    #[error("invalid container: {0}")]
    Container(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SdkError {
    /// Status code reported by the trusted side, if the failure came from there.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Aborted { source, .. } => source.status(),
            _ => None,
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_seen_through_abort() {
        let err = SdkError::Aborted {
            operation: "write",
            offset: 32_768,
            source: Box::new(SdkError::Status {
                command: "WriteChunk",
                status: StatusCode::StorageNoSpace,
            }),
        };
        assert_eq!(err.status(), Some(StatusCode::StorageNoSpace));
        assert!(err.to_string().contains("32768"));
    }

    #[test]
    fn local_errors_have_no_status() {
        assert_eq!(SdkError::Container("short".into()).status(), None);
    }
}
