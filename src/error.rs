use thiserror::Error;

use crate::data::container::ContainerError;
use crate::data::cursor::CursorError;
use crate::graph::GraphError;
use crate::models::CodecError;

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
}

#[derive(Error, Debug)]
pub enum ErrorKind {
    /// Header/container failures: bad magic, unknown version, truncated
    /// tables. These reject the whole file.
    #[error("container error: {0}")]
    Container(#[from] ContainerError),
    /// A primitive read ran past the buffer or hit an unterminated string.
    #[error("read error: {0}")]
    Cursor(#[from] CursorError),
    /// The object graph was structurally unusable (cycle depth, bad
    /// primitive type).
    #[error("object graph error: {0}")]
    Graph(#[from] GraphError),
    /// A vertex/edge decode failed outside the per-attribute degrade paths.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("I/O error")]
    IoError(#[from] std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl std::convert::From<ContainerError> for Error {
    fn from(x: ContainerError) -> Error {
        Error { kind: x.into() }
    }
}

impl std::convert::From<CursorError> for Error {
    fn from(x: CursorError) -> Error {
        Error { kind: x.into() }
    }
}

impl std::convert::From<GraphError> for Error {
    fn from(x: GraphError) -> Error {
        Error { kind: x.into() }
    }
}

impl std::convert::From<CodecError> for Error {
    fn from(x: CodecError) -> Error {
        Error { kind: x.into() }
    }
}

impl std::convert::From<std::io::Error> for Error {
    fn from(x: std::io::Error) -> Error {
        Error { kind: x.into() }
    }
}

pub type IgzResult<T> = Result<T, Error>;

pub fn failure_from_kind(kind: ErrorKind) -> Error {
    Error { kind }
}
