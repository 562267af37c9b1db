use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use callisto_codec::{DynCodec, ReadCursor, TypeDesc};
use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};

use super::continuation::Continuation;
use super::encode::ResponseEncoder;
use crate::args::Arguments;
use crate::error::{InvokeError, MethodError};
use crate::path::ServicePath;
use crate::service::{
    MethodHandler, ParameterWay, PendingOperation, RemotingKind, Returned, ServiceInstance,
    ServiceType, SubserviceAccessor,
};

/// The eventual response payload of one invocation.
pub type PendingResponse = BoxFuture<'static, Result<Bytes, InvokeError>>;

/// What happens to a method's result.
pub(crate) enum Completion {
    /// Encode response parameters and the return value right away.
    Direct(ResponseEncoder),
    /// Wait for the pending operation, answer with an empty payload.
    AsyncVoid,
    /// Wait for the pending operation, encode its result.
    AsyncWithRetval(Continuation),
}

pub(crate) struct InvokerParts {
    pub(crate) name: Arc<str>,
    pub(crate) path: ServicePath,
    pub(crate) service_type: Option<ServiceType>,
    pub(crate) navigation: Vec<Arc<dyn SubserviceAccessor>>,
    pub(crate) has_request: bool,
    pub(crate) handler: Arc<dyn MethodHandler>,
    pub(crate) parameters: Vec<(ParameterWay, Arc<dyn DynCodec>)>,
    pub(crate) return_type: TypeDesc,
    pub(crate) remoting: RemotingKind,
    pub(crate) generics: Arc<[TypeDesc]>,
    pub(crate) completion: Completion,
}

/// A ready-to-run decode, call, encode procedure for one method instantiation.
///
/// Everything that depends on metadata was resolved when the invoker was
/// compiled: navigation accessors, codecs, and the completion strategy.
/// Cloning is cheap and clones share the same compiled state. Invokers hold
/// no per-call state and may be used from many tasks at once.
#[derive(Clone)]
pub struct CompiledInvoker {
    inner: Arc<InvokerParts>,
}

impl CompiledInvoker {
    pub(crate) fn new(parts: InvokerParts) -> Self {
        CompiledInvoker {
            inner: Arc::new(parts),
        }
    }

    /// Diagnostic name, `Service__Service_Sub_Method`.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn path(&self) -> &ServicePath {
        &self.inner.path
    }

    pub fn remoting(&self) -> RemotingKind {
        self.inner.remoting
    }

    /// Concrete generic arguments this invoker was compiled for.
    pub fn generic_arguments(&self) -> &[TypeDesc] {
        &self.inner.generics
    }

    /// Run the method against `service` with the request encoded in
    /// `buffer[offset..]`.
    ///
    /// For direct methods the returned future is already complete. For async
    /// methods it completes when the method's pending operation does. The
    /// buffer is only borrowed for the synchronous decode step.
    pub fn invoke(&self, service: &ServiceInstance, buffer: &[u8], offset: usize) -> PendingResponse {
        tracing::trace!(
            invoker = %self.inner.name,
            offset,
            len = buffer.len(),
            "invoke"
        );
        match self.run(service, buffer, offset) {
            Ok(response) => response,
            Err(err) => future::ready(Err(err)).boxed(),
        }
    }

    fn run(&self, service: &ServiceInstance, buffer: &[u8], offset: usize) -> Result<PendingResponse, InvokeError> {
        let parts = &*self.inner;

        if let Some(ty) = parts.service_type {
            if !ty.matches(service) {
                return Err(MethodError::ServiceType { expected: ty.name() }.into());
            }
        }

        let mut target = service.clone();
        for accessor in &parts.navigation {
            target = accessor.access(&target)?;
        }

        let mut args = self.decode(buffer, offset)?;
        let returned = parts.handler.call(&target, &mut args)?;

        match &parts.completion {
            Completion::Direct(encoder) => {
                let retval = match returned {
                    Returned::Void => None,
                    Returned::Value(value) if encoder.has_retval() => Some(value),
                    Returned::Value(_) | Returned::Pending(_) => return Err(self.shape_error()),
                };
                let response = args.into_response()?;
                Ok(future::ready(encoder.encode(response, retval)).boxed())
            }
            Completion::AsyncVoid => {
                let pending = self.expect_pending(returned)?;
                let name = parts.name.clone();
                Ok(async move {
                    match pending.await {
                        Ok(_) => Ok(Bytes::new()),
                        Err(err) => {
                            tracing::warn!(invoker = %name, error = %err, "pending operation failed");
                            Err(InvokeError::Method(err))
                        }
                    }
                }
                .boxed())
            }
            Completion::AsyncWithRetval(continuation) => {
                let pending = self.expect_pending(returned)?;
                Ok(continuation.attach(pending))
            }
        }
    }

    /// Fill one slot per parameter. The buffer is not touched at all when no
    /// parameter is read from the request.
    fn decode(&self, buffer: &[u8], offset: usize) -> Result<Arguments, InvokeError> {
        let parts = &*self.inner;
        let mut args = Arguments::with_capacity(parts.parameters.len(), parts.generics.clone());

        if !parts.has_request {
            for _ in &parts.parameters {
                args.push_out();
            }
            return Ok(args);
        }

        let mut cursor = ReadCursor::at(buffer, offset)?;
        for (way, codec) in &parts.parameters {
            match way {
                ParameterWay::Val => args.push_val(codec.decode(&mut cursor)?),
                ParameterWay::Ref => args.push_ref(codec.decode(&mut cursor)?),
                ParameterWay::Out => args.push_out(),
            }
        }
        Ok(args)
    }

    fn expect_pending(&self, returned: Returned) -> Result<PendingOperation, InvokeError> {
        match returned {
            Returned::Pending(pending) => Ok(pending),
            Returned::Void | Returned::Value(_) => Err(self.shape_error()),
        }
    }

    fn shape_error(&self) -> InvokeError {
        InvokeError::ReturnShape {
            expected: self.inner.return_type.clone(),
        }
    }
}

impl fmt::Debug for CompiledInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledInvoker")
            .field("name", &self.inner.name)
            .field("remoting", &self.inner.remoting)
            .field("parameters", &self.inner.parameters.len())
            .finish()
    }
}
