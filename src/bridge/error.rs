use std::{fmt, io};

/// Failure classes of a bridge exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind
{
    /// The worker could not be started or its streams failed
    Transport,
    /// No complete response frame was seen
    Framing,
    /// A frame arrived but is not a valid response
    Decode,
    /// The session was closed
    Closed,
}

#[derive(Debug)]
pub enum BridgeError
{
    Spawn { program: String, source: io::Error },
    Io(io::Error),
    NoResponse,
    IncompleteFrame { partial: String },
    Decode { text: String, source: serde_json::Error },
    Encode(serde_json::Error),
    Closed,
}

impl BridgeError
{
    pub fn kind(&self) -> ErrorKind
    {
        match self
        {
            BridgeError::Spawn { .. } | BridgeError::Io(_) => ErrorKind::Transport,
            BridgeError::NoResponse | BridgeError::IncompleteFrame { .. } => ErrorKind::Framing,
            BridgeError::Decode { .. } | BridgeError::Encode(_) => ErrorKind::Decode,
            BridgeError::Closed => ErrorKind::Closed,
        }
    }
}

impl fmt::Display for BridgeError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self
        {
            BridgeError::Spawn { program, source } => write!(f, "failed to start worker {}: {}", program, source),
            BridgeError::Io(e) => write!(f, "{}", e),
            BridgeError::NoResponse => write!(f, "no response from worker"),
            BridgeError::IncompleteFrame { partial } =>
                write!(f, "worker output ended inside a response ({} bytes read)", partial.len()),
            BridgeError::Decode { source, .. } => write!(f, "JSON parse error: {}", source),
            BridgeError::Encode(e) => write!(f, "failed to encode request: {}", e),
            BridgeError::Closed => write!(f, "editor session is closed"),
        }
    }
}

impl std::error::Error for BridgeError
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)>
    {
        match self
        {
            BridgeError::Spawn { source, .. } => Some(source),
            BridgeError::Io(e) => Some(e),
            BridgeError::Decode { source, .. } => Some(source),
            BridgeError::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BridgeError
{
    fn from(e: io::Error) -> Self
    {
        BridgeError::Io(e)
    }
}
