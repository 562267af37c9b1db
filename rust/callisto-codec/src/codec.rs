use std::any::Any;
use std::fmt;
#[cfg(feature = "postcard")]
use std::marker::PhantomData;

use crate::{CodecError, ReadCursor, WriteCursor};

/// A type-erased value travelling between codecs and service methods.
pub type Value = Box<dyn Any + Send>;

/// Codec trait for a single value type.
///
/// Implementations measure, write and read one value against a byte cursor.
/// `encode` must write exactly `size_of(value)` bytes.
pub trait Codec: Send + Sync + 'static {
    /// The Rust type this codec reads and writes.
    type Value: Any + Send;

    /// Encoded size of `value` in bytes.
    fn size_of(&self, value: &Self::Value) -> Result<usize, CodecError>;

    /// Write `value` at the cursor, advancing it by `size_of(value)`.
    fn encode(&self, cursor: &mut WriteCursor<'_>, value: &Self::Value) -> Result<(), CodecError>;

    /// Read one value at the cursor, advancing it past the consumed bytes.
    fn decode(&self, cursor: &mut ReadCursor<'_>) -> Result<Self::Value, CodecError>;
}

/// Object-safe codec interface used by the codec registry and the dispatch
/// compiler.
///
/// Values cross this boundary as [`Value`]; a value of the wrong concrete
/// type is reported as [`CodecError::TypeMismatch`].
pub trait DynCodec: Send + Sync + 'static {
    /// Name of the Rust type this codec handles (for diagnostics).
    fn value_type_name(&self) -> &'static str;

    fn size_of(&self, value: &(dyn Any + Send)) -> Result<usize, CodecError>;

    fn encode(&self, cursor: &mut WriteCursor<'_>, value: &(dyn Any + Send)) -> Result<(), CodecError>;

    fn decode(&self, cursor: &mut ReadCursor<'_>) -> Result<Value, CodecError>;
}

impl fmt::Debug for dyn DynCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynCodec")
            .field("value", &self.value_type_name())
            .finish()
    }
}

/// Wraps a typed [`Codec`] so it can be stored as a `dyn DynCodec`.
pub struct TypedCodec<C: Codec> {
    inner: C,
}

impl<C: Codec> TypedCodec<C> {
    pub fn new(inner: C) -> Self {
        TypedCodec { inner }
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    fn downcast<'v>(&self, value: &'v (dyn Any + Send)) -> Result<&'v C::Value, CodecError> {
        value
            .downcast_ref::<C::Value>()
            .ok_or(CodecError::TypeMismatch {
                expected: std::any::type_name::<C::Value>(),
            })
    }
}

impl<C: Codec> DynCodec for TypedCodec<C> {
    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<C::Value>()
    }

    fn size_of(&self, value: &(dyn Any + Send)) -> Result<usize, CodecError> {
        self.inner.size_of(self.downcast(value)?)
    }

    fn encode(&self, cursor: &mut WriteCursor<'_>, value: &(dyn Any + Send)) -> Result<(), CodecError> {
        self.inner.encode(cursor, self.downcast(value)?)
    }

    fn decode(&self, cursor: &mut ReadCursor<'_>) -> Result<Value, CodecError> {
        Ok(Box::new(self.inner.decode(cursor)?))
    }
}

/// Postcard codec: compact binary format using postcard serialization.
///
/// Useful for message structs that have no dedicated codec. Sizing
/// serializes the value once; prefer a hand-written codec on hot paths.
#[cfg(feature = "postcard")]
pub struct PostcardCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

#[cfg(feature = "postcard")]
impl<T> PostcardCodec<T> {
    pub fn new() -> Self {
        PostcardCodec {
            _marker: PhantomData,
        }
    }
}

#[cfg(feature = "postcard")]
impl<T> Default for PostcardCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "postcard")]
impl<T> Codec for PostcardCodec<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned + Send + 'static,
{
    type Value = T;

    fn size_of(&self, value: &T) -> Result<usize, CodecError> {
        Ok(postcard::to_allocvec(value)?.len())
    }

    fn encode(&self, cursor: &mut WriteCursor<'_>, value: &T) -> Result<(), CodecError> {
        let bytes = postcard::to_allocvec(value)?;
        cursor.put(&bytes)
    }

    fn decode(&self, cursor: &mut ReadCursor<'_>) -> Result<T, CodecError> {
        let input = cursor.rest();
        let (value, tail) = postcard::take_from_bytes::<T>(input).map_err(|err| match err {
            postcard::Error::DeserializeUnexpectedEnd => CodecError::BufferUnderrun {
                needed: input.len() + 1,
                remaining: input.len(),
            },
            other => CodecError::Postcard(other),
        })?;
        cursor.advance(input.len() - tail.len())?;
        Ok(value)
    }
}
