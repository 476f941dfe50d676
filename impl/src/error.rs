//! The error taxonomy shared by every descriptor kind.

use thiserror::Error;

/// Everything that can go wrong packing or unpacking a descriptor.
#[derive(Debug, Error)]
pub enum Error {
    #[error("value does not satisfy the constraints of this type")]
    ConstraintViolation,

    #[error("unknown key `{0}`")]
    UnknownKey(String),

    #[error("unknown member `{0}`")]
    UnknownMember(String),

    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("need {need} more byte(s) than are available")]
    MissingBytes { need: usize },

    #[error("terminator not found in input")]
    TerminatorNotFound,

    #[error("multiple members given for a union pack")]
    ConflictingMembers,

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    #[error("invalid layout: {0}")]
    BuildError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
