//! Default codec set.
//!
//! Fixed-width numbers are little-endian. Variable-length values carry a
//! `u32` little-endian length (or element count) prefix.
//!
//! | type      | wire                         |
//! |-----------|------------------------------|
//! | `u8`      | 1 byte                       |
//! | `bool`    | 1 byte, `0` or `1`           |
//! | `i32/u32` | 4 bytes                      |
//! | `i64/u64` | 8 bytes                      |
//! | `f64`     | 8 bytes, IEEE 754            |
//! | `String`  | `u32` length + UTF-8         |
//! | `bytes`   | `u32` length + raw bytes     |
//! | `Vec<T>`  | `u32` count + elements       |

use std::sync::Arc;

use crate::{
    Codec, CodecError, CodecRegistry, DynCodec, ReadCursor, TypeDesc, TypedCodec, Value,
    WriteCursor,
};

macro_rules! fixed_width_codec {
    ($codec:ident, $ty:ty, $width:expr) => {
        #[doc = concat!("Little-endian `", stringify!($ty), "`.")]
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $codec;

        impl Codec for $codec {
            type Value = $ty;

            fn size_of(&self, _value: &$ty) -> Result<usize, CodecError> {
                Ok($width)
            }

            fn encode(&self, cursor: &mut WriteCursor<'_>, value: &$ty) -> Result<(), CodecError> {
                cursor.put(&value.to_le_bytes())
            }

            fn decode(&self, cursor: &mut ReadCursor<'_>) -> Result<$ty, CodecError> {
                Ok(<$ty>::from_le_bytes(cursor.take_array()?))
            }
        }
    };
}

fixed_width_codec!(U8Codec, u8, 1);
fixed_width_codec!(I32Codec, i32, 4);
fixed_width_codec!(U32Codec, u32, 4);
fixed_width_codec!(I64Codec, i64, 8);
fixed_width_codec!(U64Codec, u64, 8);
fixed_width_codec!(F64Codec, f64, 8);

#[derive(Debug, Clone, Copy, Default)]
pub struct BoolCodec;

impl Codec for BoolCodec {
    type Value = bool;

    fn size_of(&self, _value: &bool) -> Result<usize, CodecError> {
        Ok(1)
    }

    fn encode(&self, cursor: &mut WriteCursor<'_>, value: &bool) -> Result<(), CodecError> {
        cursor.put_u8(u8::from(*value))
    }

    fn decode(&self, cursor: &mut ReadCursor<'_>) -> Result<bool, CodecError> {
        match cursor.take(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::Invalid(format!("bool byte {:#04x}", other))),
        }
    }
}

fn put_len(cursor: &mut WriteCursor<'_>, len: usize) -> Result<(), CodecError> {
    let len = u32::try_from(len)
        .map_err(|_| CodecError::Invalid(format!("length {} does not fit in u32", len)))?;
    cursor.put(&len.to_le_bytes())
}

fn take_len(cursor: &mut ReadCursor<'_>) -> Result<usize, CodecError> {
    Ok(u32::from_le_bytes(cursor.take_array()?) as usize)
}

/// Length-prefixed UTF-8 string.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl Codec for StringCodec {
    type Value = String;

    fn size_of(&self, value: &String) -> Result<usize, CodecError> {
        Ok(4 + value.len())
    }

    fn encode(&self, cursor: &mut WriteCursor<'_>, value: &String) -> Result<(), CodecError> {
        put_len(cursor, value.len())?;
        cursor.put(value.as_bytes())
    }

    fn decode(&self, cursor: &mut ReadCursor<'_>) -> Result<String, CodecError> {
        let len = take_len(cursor)?;
        let bytes = cursor.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|err| CodecError::Invalid(err.to_string()))
    }
}

/// Length-prefixed opaque byte blob.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl Codec for BytesCodec {
    type Value = Vec<u8>;

    fn size_of(&self, value: &Vec<u8>) -> Result<usize, CodecError> {
        Ok(4 + value.len())
    }

    fn encode(&self, cursor: &mut WriteCursor<'_>, value: &Vec<u8>) -> Result<(), CodecError> {
        put_len(cursor, value.len())?;
        cursor.put(value)
    }

    fn decode(&self, cursor: &mut ReadCursor<'_>) -> Result<Vec<u8>, CodecError> {
        let len = take_len(cursor)?;
        Ok(cursor.take(len)?.to_vec())
    }
}

/// `Vec<T>` for any element type with a codec.
///
/// Elements are carried type-erased, so the decoded value is a `Vec<Value>`
/// whose entries downcast to the element type.
pub struct ListCodec {
    element: Arc<dyn DynCodec>,
}

impl ListCodec {
    pub fn new(element: Arc<dyn DynCodec>) -> Self {
        ListCodec { element }
    }
}

impl Codec for ListCodec {
    type Value = Vec<Value>;

    fn size_of(&self, value: &Vec<Value>) -> Result<usize, CodecError> {
        value
            .iter()
            .try_fold(4usize, |total, item| -> Result<usize, CodecError> {
                Ok(total + self.element.size_of(item.as_ref())?)
            })
    }

    fn encode(&self, cursor: &mut WriteCursor<'_>, value: &Vec<Value>) -> Result<(), CodecError> {
        put_len(cursor, value.len())?;
        for item in value {
            self.element.encode(cursor, item.as_ref())?;
        }
        Ok(())
    }

    fn decode(&self, cursor: &mut ReadCursor<'_>) -> Result<Vec<Value>, CodecError> {
        let count = take_len(cursor)?;
        // the count is untrusted; elements may also be zero-width
        let mut items = Vec::with_capacity(count.min(cursor.remaining()));
        for _ in 0..count {
            items.push(self.element.decode(cursor)?);
        }
        Ok(items)
    }
}

/// Register every default codec under its conventional type name.
pub fn register_all(registry: &mut CodecRegistry) {
    registry
        .register(TypeDesc::named("u8"), U8Codec)
        .register(TypeDesc::named("bool"), BoolCodec)
        .register(TypeDesc::named("i32"), I32Codec)
        .register(TypeDesc::named("u32"), U32Codec)
        .register(TypeDesc::named("i64"), I64Codec)
        .register(TypeDesc::named("u64"), U64Codec)
        .register(TypeDesc::named("f64"), F64Codec)
        .register(TypeDesc::named("String"), StringCodec)
        .register(TypeDesc::named("bytes"), BytesCodec)
        .register_generic("Vec", 1, |mut args: Vec<Arc<dyn DynCodec>>| {
            let element = args.remove(0);
            Arc::new(TypedCodec::new(ListCodec::new(element))) as Arc<dyn DynCodec>
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CodecContainer;

    fn encode_to_vec<C: Codec>(codec: &C, value: &C::Value) -> Vec<u8> {
        let mut buf = vec![0u8; codec.size_of(value).unwrap()];
        let mut cursor = WriteCursor::new(&mut buf);
        codec.encode(&mut cursor, value).unwrap();
        assert_eq!(cursor.remaining(), 0);
        buf
    }

    #[test]
    fn i32_is_little_endian() {
        assert_eq!(encode_to_vec(&I32Codec, &7), vec![7, 0, 0, 0]);
        assert_eq!(encode_to_vec(&I32Codec, &-2), vec![0xfe, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn bool_rejects_other_bytes() {
        let mut cursor = ReadCursor::new(&[2]);
        assert!(matches!(BoolCodec.decode(&mut cursor), Err(CodecError::Invalid(_))));
    }

    #[test]
    fn string_layout() {
        assert_eq!(
            encode_to_vec(&StringCodec, &"hi".to_string()),
            vec![2, 0, 0, 0, b'h', b'i']
        );

        let mut cursor = ReadCursor::new(&[3, 0, 0, 0, b'h', b'i']);
        assert_eq!(
            StringCodec.decode(&mut cursor),
            Err(CodecError::BufferUnderrun {
                needed: 3,
                remaining: 2
            })
        );
    }

    #[test]
    fn string_rejects_invalid_utf8() {
        let mut cursor = ReadCursor::new(&[1, 0, 0, 0, 0xff]);
        assert!(matches!(StringCodec.decode(&mut cursor), Err(CodecError::Invalid(_))));
    }

    #[test]
    fn list_of_i32_through_registry() {
        let registry = CodecRegistry::with_builtin();
        let codec = registry
            .get_codec(&TypeDesc::with_args("Vec", vec![TypeDesc::named("i32")]))
            .unwrap();

        let value: Value = Box::new(vec![Box::new(1i32) as Value, Box::new(2i32) as Value]);
        let size = codec.size_of(value.as_ref()).unwrap();
        assert_eq!(size, 12);

        let mut buf = vec![0u8; size];
        codec.encode(&mut WriteCursor::new(&mut buf), value.as_ref()).unwrap();
        assert_eq!(buf, vec![2, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0]);

        let decoded = codec.decode(&mut ReadCursor::new(&buf)).unwrap();
        let items = decoded.downcast_ref::<Vec<Value>>().unwrap();
        let items: Vec<i32> = items
            .iter()
            .map(|item| *item.downcast_ref::<i32>().unwrap())
            .collect();
        assert_eq!(items, vec![1, 2]);
    }

    struct UnitCodec;

    impl Codec for UnitCodec {
        type Value = ();

        fn size_of(&self, _value: &()) -> Result<usize, CodecError> {
            Ok(0)
        }

        fn encode(&self, _cursor: &mut WriteCursor<'_>, _value: &()) -> Result<(), CodecError> {
            Ok(())
        }

        fn decode(&self, _cursor: &mut ReadCursor<'_>) -> Result<(), CodecError> {
            Ok(())
        }
    }

    #[test]
    fn list_of_zero_width_elements() {
        let codec = ListCodec::new(Arc::new(TypedCodec::new(UnitCodec)));
        let mut cursor = ReadCursor::new(&[3, 0, 0, 0]);
        let items = codec.decode(&mut cursor).unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|item| item.downcast_ref::<()>().is_some()));
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn list_rejects_impossible_counts() {
        let codec = ListCodec::new(Arc::new(TypedCodec::new(U8Codec)));
        let mut cursor = ReadCursor::new(&[0xff, 0xff, 0xff, 0x7f, 1]);
        assert!(matches!(
            codec.decode(&mut cursor),
            Err(CodecError::BufferUnderrun { .. })
        ));
    }
}
