//! The dispatch compiler.
//!
//! [`compile`] turns a service description plus a [`ServicePath`] into a
//! [`CompiledInvoker`]. All metadata work happens here, once: path
//! resolution, generic substitution, codec lookup, signature checks and the
//! choice of completion strategy. A compile error means no invoker was built.
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "builtin")] {
//! use std::sync::Arc;
//! use callisto::codec::{CodecRegistry, TypeDesc};
//! use callisto::dispatch::compile;
//! use callisto::path::ServicePath;
//! use callisto::service::{ParameterWay, Returned, ServiceBuilder, ServiceInstance};
//! use futures_util::FutureExt;
//!
//! let mut service = ServiceBuilder::new("Calculator").unwrap();
//! service
//!     .add_method("Add", |_service, args| {
//!         let a: i32 = args.take(0)?;
//!         let b: i32 = args.take(1)?;
//!         Ok(Returned::value(a + b))
//!     })
//!     .unwrap()
//!     .param("a", TypeDesc::named("i32"), ParameterWay::Val)
//!     .unwrap()
//!     .param("b", TypeDesc::named("i32"), ParameterWay::Val)
//!     .unwrap()
//!     .returns(TypeDesc::named("i32"));
//! let description = service.build();
//!
//! let registry = CodecRegistry::with_builtin();
//! let path = ServicePath::parse("Calculator/Add").unwrap();
//! let invoker = compile(&registry, &description, &path, &[]).unwrap();
//!
//! let instance: ServiceInstance = Arc::new(());
//! let response = invoker
//!     .invoke(&instance, &[3, 0, 0, 0, 4, 0, 0, 0], 0)
//!     .now_or_never()
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(&response[..], &[7, 0, 0, 0]);
//! # }
//! ```

mod continuation;
mod encode;
mod invoker;
mod plan;

use std::sync::Arc;

use callisto_codec::{CodecContainer, TypeDesc};

use crate::error::{CompileError, InvalidPathError, SegmentKind};
use crate::path::ServicePath;
use crate::service::{RemotingKind, ServiceDescription, SubserviceAccessor};

use continuation::Continuation;
use encode::ResponseEncoder;
pub use invoker::{CompiledInvoker, PendingResponse};
use invoker::{Completion, InvokerParts};

/// Something that builds invokers for service paths.
pub trait InvokerFactory {
    fn create_invoker(
        &self,
        service: &ServiceDescription,
        path: &ServicePath,
        generic_args: &[TypeDesc],
    ) -> Result<CompiledInvoker, CompileError>;
}

/// An [`InvokerFactory`] bound to a shared codec container.
#[derive(Clone)]
pub struct DispatchCompiler {
    codecs: Arc<dyn CodecContainer>,
}

impl DispatchCompiler {
    pub fn new(codecs: Arc<dyn CodecContainer>) -> Self {
        DispatchCompiler { codecs }
    }

    pub fn codecs(&self) -> &Arc<dyn CodecContainer> {
        &self.codecs
    }
}

impl InvokerFactory for DispatchCompiler {
    fn create_invoker(
        &self,
        service: &ServiceDescription,
        path: &ServicePath,
        generic_args: &[TypeDesc],
    ) -> Result<CompiledInvoker, CompileError> {
        compile(&*self.codecs, service, path, generic_args)
    }
}

/// Compile the method at `path` into an invoker.
///
/// `generic_args` instantiate the method's generic parameters in
/// declaration order.
pub fn compile(
    codecs: &dyn CodecContainer,
    service: &ServiceDescription,
    path: &ServicePath,
    generic_args: &[TypeDesc],
) -> Result<CompiledInvoker, CompileError> {
    let result = build(codecs, service, path, generic_args);
    if let Err(err) = &result {
        tracing::debug!(path = %path, error = %err, "compile failed");
    }
    result
}

fn invalid_path(path: &ServicePath, segment: &str, kind: SegmentKind) -> CompileError {
    CompileError::InvalidPath(InvalidPathError {
        path: path.to_string(),
        segment: segment.to_string(),
        kind,
    })
}

fn invoker_name(service: &ServiceDescription, path: &ServicePath) -> Arc<str> {
    format!("{}__{}", service.name(), path.segments().join("_")).into()
}

fn build(
    codecs: &dyn CodecContainer,
    service: &ServiceDescription,
    path: &ServicePath,
    generic_args: &[TypeDesc],
) -> Result<CompiledInvoker, CompileError> {
    if path.service_name() != service.name() {
        return Err(invalid_path(path, path.service_name(), SegmentKind::Service));
    }

    let mut node = service;
    let mut navigation: Vec<Arc<dyn SubserviceAccessor>> = Vec::with_capacity(path.subservices().len());
    for segment in path.subservices() {
        let subservice = node
            .subservice(segment)
            .ok_or_else(|| invalid_path(path, segment, SegmentKind::Subservice))?;
        navigation.push(subservice.accessor().clone());
        node = subservice.description();
    }

    let method = node
        .method(path.method_name())
        .ok_or_else(|| invalid_path(path, path.method_name(), SegmentKind::Method))?;

    let plan = plan::plan_method(codecs, method, generic_args)?;
    let name = invoker_name(service, path);

    let completion = match method.remoting() {
        RemotingKind::Direct => {
            Completion::Direct(ResponseEncoder::new(plan.response_codecs(), plan.result.clone()))
        }
        RemotingKind::AsyncVoid => Completion::AsyncVoid,
        RemotingKind::AsyncWithRetval => match plan.result.clone() {
            Some((result_type, codec)) => {
                Completion::AsyncWithRetval(Continuation::new(name.clone(), result_type, codec))
            }
            // plan_method only accepts AsyncWithRetval with a non-void result
            None => {
                return Err(CompileError::UnsupportedSignature {
                    method: method.name().to_string(),
                    reason: "async methods with a result must return a pending operation carrying a value",
                });
            }
        },
    };

    tracing::debug!(
        invoker = %name,
        remoting = %method.remoting(),
        request = plan.request_count(),
        parameters = ?plan.parameters.iter().map(|p| p.ty.to_string()).collect::<Vec<_>>(),
        returns = %plan.return_type,
        "compiled invoker"
    );

    Ok(CompiledInvoker::new(InvokerParts {
        name,
        path: path.clone(),
        service_type: service.service_type(),
        navigation,
        has_request: plan.has_request(),
        handler: method.handler().clone(),
        parameters: plan
            .parameters
            .iter()
            .map(|p| (p.way, p.codec.clone()))
            .collect(),
        return_type: plan.return_type,
        remoting: method.remoting(),
        generics: plan.generics,
        completion,
    }))
}
