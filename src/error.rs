use crate::ContentKind;
use java_string::Utf8Error;
use thiserror::Error;

/// A fatal decode error, carrying the buffer offset it was detected at.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at offset {offset}")]
pub struct StreamError {
    pub kind: ErrorKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    #[error("read past the end of the stream, wanted {wanted} more bytes, len {len}")]
    PrematureEndOfInput { wanted: usize, len: usize },
    #[error("bad stream magic: {0:#06x}")]
    BadMagic(u16),
    #[error("unsupported stream version: {0}")]
    UnsupportedVersion(u16),
    #[error("unknown content type code: {0:#04x}")]
    UnknownTypeCode(u8),
    #[error("content kind {kind} not allowed here, expected one of {allowed:?}")]
    DisallowedContent {
        kind: ContentKind,
        allowed: &'static [ContentKind],
    },
    #[error("unsupported content kind: {0}")]
    Unsupported(ContentKind),
    #[error("externalizable class data without block framing")]
    ExternalizableUnsupported,
    #[error("unknown class descriptor flags: {0:#04x}")]
    UnknownClassFlags(u8),
    #[error("unknown field type code: {0:#04x}")]
    UnknownFieldType(u8),
    #[error("long string length exceeds 32 bits")]
    LongStringOverflow,
    #[error("reference to unallocated handle {0:#010x}")]
    InvalidHandle(u32),
    #[error("expected {0}")]
    InvalidReference(&'static str),
    #[error("class descriptor super chain does not terminate in null")]
    CyclicSuperChain,
    #[error("negative array length: {0}")]
    InvalidArrayLength(i32),
    #[error("end-of-block marker outside an annotation block")]
    UnexpectedEndBlock,
    #[error("utf8 error: {0}")]
    Utf8(#[from] Utf8Error),
}

pub type StreamResult<T> = Result<T, StreamError>;
