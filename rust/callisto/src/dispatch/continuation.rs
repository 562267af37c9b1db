//! Encode-after-completion for methods that settle with a result.

use std::sync::Arc;

use callisto_codec::{DynCodec, TypeDesc};
use futures_util::FutureExt;

use super::encode::ResponseEncoder;
use super::invoker::PendingResponse;
use crate::error::InvokeError;
use crate::service::PendingOperation;

/// Built once per invoker from the settled result type. Each
/// [`attach`](Self::attach) encodes exactly one value, after the pending
/// operation settles.
#[derive(Clone)]
pub(crate) struct Continuation {
    invoker: Arc<str>,
    encoder: ResponseEncoder,
}

impl Continuation {
    pub(crate) fn new(invoker: Arc<str>, result_type: TypeDesc, codec: Arc<dyn DynCodec>) -> Self {
        Continuation {
            invoker,
            encoder: ResponseEncoder::new(Vec::new(), Some((result_type, codec))),
        }
    }

    pub(crate) fn attach(&self, pending: PendingOperation) -> PendingResponse {
        let Continuation { invoker, encoder } = self.clone();
        async move {
            let value = pending.await.map_err(|err| {
                tracing::warn!(invoker = %invoker, error = %err, "pending operation failed");
                InvokeError::Method(err)
            })?;
            encoder.encode(Vec::new(), value)
        }
        .boxed()
    }
}
