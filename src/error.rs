use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
pub enum PrefetchError {
    NoHandler(String),
    Request,
    Response(u16),
    ResponseChunk,
    OpenOrCreateFile,
    FileWrite,
    FileFlush,
    DeleteFile,
    CreateDirectory,
    Cancelled,
}

pub type Result<T> = core::result::Result<T, PrefetchError>;

impl Display for PrefetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PrefetchError::NoHandler(mod_name) => {
                write!(f, "NoHandler {}", mod_name)
            }
            PrefetchError::Request => { write!(f, "Request") }
            PrefetchError::Response(status) => {
                write!(f, "Response {}", status)
            }
            PrefetchError::ResponseChunk => { write!(f, "ResponseChunk") }
            PrefetchError::OpenOrCreateFile => { write!(f, "OpenOrCreateFile") }
            PrefetchError::FileWrite => { write!(f, "FileWrite") }
            PrefetchError::FileFlush => { write!(f, "FileFlush") }
            PrefetchError::DeleteFile => { write!(f, "DeleteFile") }
            PrefetchError::CreateDirectory => { write!(f, "CreateDirectory") }
            PrefetchError::Cancelled => { write!(f, "Cancelled") }
        }
    }
}
