use std::fmt;

use crate::TypeDesc;

/// Errors raised while measuring, encoding or decoding a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Decoding needed more bytes than remain in the input.
    BufferUnderrun { needed: usize, remaining: usize },
    /// Encoding tried to write past the end of the output buffer.
    BufferOverrun { needed: usize, available: usize },
    /// A type-erased value was handed to a codec for a different type.
    TypeMismatch { expected: &'static str },
    /// A codec wrote a different number of bytes than it reported.
    SizeMismatch { declared: usize, written: usize },
    /// The input bytes do not form a valid value.
    Invalid(String),
    /// The postcard serializer rejected the value.
    #[cfg(feature = "postcard")]
    Postcard(postcard::Error),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::BufferUnderrun { needed, remaining } => {
                write!(f, "buffer underrun: needed {} bytes, {} remaining", needed, remaining)
            }
            CodecError::BufferOverrun { needed, available } => {
                write!(f, "buffer overrun: writing {} bytes, {} available", needed, available)
            }
            CodecError::TypeMismatch { expected } => {
                write!(f, "value type mismatch: codec expects `{}`", expected)
            }
            CodecError::SizeMismatch { declared, written } => {
                write!(f, "codec declared {} bytes but wrote {}", declared, written)
            }
            CodecError::Invalid(reason) => write!(f, "invalid encoded value: {}", reason),
            #[cfg(feature = "postcard")]
            CodecError::Postcard(err) => write!(f, "postcard: {}", err),
        }
    }
}

impl std::error::Error for CodecError {}

#[cfg(feature = "postcard")]
impl From<postcard::Error> for CodecError {
    fn from(err: postcard::Error) -> Self {
        CodecError::Postcard(err)
    }
}

/// Why a codec container could not provide a codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Nothing is registered for this resolved type.
    NotRegistered(TypeDesc),
    /// The descriptor still mentions a generic parameter.
    UnresolvedGeneric(TypeDesc),
    /// `void` and pending operations have no wire representation of their own.
    NotEncodable(TypeDesc),
    /// A generic codec factory was given the wrong number of type arguments.
    Arity {
        ty: TypeDesc,
        expected: usize,
        supplied: usize,
    },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::NotRegistered(ty) => write!(f, "no codec registered for `{}`", ty),
            LookupError::UnresolvedGeneric(ty) => {
                write!(f, "cannot pick a codec for unresolved generic type `{}`", ty)
            }
            LookupError::NotEncodable(ty) => write!(f, "`{}` has no codec", ty),
            LookupError::Arity {
                ty,
                expected,
                supplied,
            } => write!(
                f,
                "codec for `{}` takes {} type arguments, {} supplied",
                ty, expected, supplied
            ),
        }
    }
}

impl std::error::Error for LookupError {}
