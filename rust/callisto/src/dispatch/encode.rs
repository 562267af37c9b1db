//! Response encoding.
//!
//! Layout: response parameter values in declaration order, then the return
//! value. Clients decode in the same order.

use std::sync::Arc;

use bytes::Bytes;
use callisto_codec::{CodecError, DynCodec, TypeDesc, Value, WriteCursor};

use crate::error::InvokeError;

/// Encodes the values a call hands back, with codecs bound at compile time.
#[derive(Clone)]
pub(crate) struct ResponseEncoder {
    parameters: Arc<[Arc<dyn DynCodec>]>,
    retval: Option<(TypeDesc, Arc<dyn DynCodec>)>,
}

impl ResponseEncoder {
    pub(crate) fn new(
        parameters: Vec<Arc<dyn DynCodec>>,
        retval: Option<(TypeDesc, Arc<dyn DynCodec>)>,
    ) -> Self {
        ResponseEncoder {
            parameters: parameters.into(),
            retval,
        }
    }

    /// Nothing to encode, ever: the response is always empty.
    pub(crate) fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.retval.is_none()
    }

    pub(crate) fn has_retval(&self) -> bool {
        self.retval.is_some()
    }

    /// Encode `parameters` (one value per response codec) followed by `retval`.
    pub(crate) fn encode(&self, parameters: Vec<Value>, retval: Option<Value>) -> Result<Bytes, InvokeError> {
        if self.is_empty() {
            return Ok(Bytes::new());
        }

        let mut fields: Vec<(&Arc<dyn DynCodec>, Value)> =
            self.parameters.iter().zip(parameters).collect();
        match (&self.retval, retval) {
            (Some((_, codec)), Some(value)) => fields.push((codec, value)),
            (None, _) => {}
            (Some((ty, _)), None) => {
                return Err(InvokeError::ReturnShape { expected: ty.clone() });
            }
        }

        let sizes = fields
            .iter()
            .map(|(codec, value)| codec.size_of(value.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let total: usize = sizes.iter().sum();

        let mut buf = vec![0u8; total];
        let mut cursor = WriteCursor::new(&mut buf);
        for ((codec, value), declared) in fields.iter().zip(sizes) {
            let start = cursor.position();
            codec.encode(&mut cursor, value.as_ref())?;
            let written = cursor.position() - start;
            if written != declared {
                return Err(CodecError::SizeMismatch { declared, written }.into());
            }
        }

        Ok(Bytes::from(buf))
    }
}

#[cfg(all(test, feature = "builtin"))]
mod tests {
    use super::*;
    use callisto_codec::builtin::{I32Codec, StringCodec};
    use callisto_codec::{Codec, ReadCursor, TypedCodec};

    fn i32_codec() -> Arc<dyn DynCodec> {
        Arc::new(TypedCodec::new(I32Codec))
    }

    fn i32_retval() -> Option<(TypeDesc, Arc<dyn DynCodec>)> {
        Some((TypeDesc::named("i32"), i32_codec()))
    }

    #[test]
    fn empty_response() {
        let encoder = ResponseEncoder::new(Vec::new(), None);
        assert!(encoder.is_empty());
        assert!(encoder.encode(Vec::new(), None).unwrap().is_empty());
    }

    #[test]
    fn parameters_then_retval() {
        let encoder = ResponseEncoder::new(
            vec![Arc::new(TypedCodec::new(StringCodec)) as Arc<dyn DynCodec>, i32_codec()],
            i32_retval(),
        );
        let bytes = encoder
            .encode(
                vec![Box::new("ok".to_string()) as Value, Box::new(5i32) as Value],
                Some(Box::new(-1i32) as Value),
            )
            .unwrap();
        assert_eq!(bytes.len(), 4 + 2 + 4 + 4);

        let mut cursor = ReadCursor::new(&bytes);
        assert_eq!(StringCodec.decode(&mut cursor).unwrap(), "ok");
        assert_eq!(I32Codec.decode(&mut cursor).unwrap(), 5);
        assert_eq!(I32Codec.decode(&mut cursor).unwrap(), -1);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn wrong_value_type() {
        let encoder = ResponseEncoder::new(Vec::new(), i32_retval());
        let err = encoder
            .encode(Vec::new(), Some(Box::new("seven".to_string()) as Value))
            .unwrap_err();
        assert!(matches!(err, InvokeError::Codec(CodecError::TypeMismatch { .. })));

        let err = encoder.encode(Vec::new(), None).unwrap_err();
        assert!(matches!(err, InvokeError::ReturnShape { .. }));
    }

    struct LyingCodec;

    impl Codec for LyingCodec {
        type Value = u8;

        fn size_of(&self, _value: &u8) -> Result<usize, CodecError> {
            Ok(2)
        }

        fn encode(&self, cursor: &mut WriteCursor<'_>, value: &u8) -> Result<(), CodecError> {
            cursor.put_u8(*value)
        }

        fn decode(&self, cursor: &mut ReadCursor<'_>) -> Result<u8, CodecError> {
            Ok(cursor.take(1)?[0])
        }
    }

    #[test]
    fn size_mismatch_detected() {
        let lying: Arc<dyn DynCodec> = Arc::new(TypedCodec::new(LyingCodec));
        let encoder = ResponseEncoder::new(vec![lying], None);
        let err = encoder.encode(vec![Box::new(1u8) as Value], None).unwrap_err();
        assert!(matches!(
            err,
            InvokeError::Codec(CodecError::SizeMismatch {
                declared: 2,
                written: 1
            })
        ));
    }
}
