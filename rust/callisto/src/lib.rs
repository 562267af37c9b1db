#![doc = include_str!("../README.md")]

pub mod args;
pub mod dispatch;
pub mod error;
pub mod path;
pub mod service;

// Re-export the codec layer so users need a single dependency
pub use callisto_codec as codec;

// Re-export core types
pub use args::Arguments;
pub use dispatch::{CompiledInvoker, DispatchCompiler, InvokerFactory, PendingResponse, compile};
pub use error::{ArgumentFault, CompileError, InvalidPathError, InvokeError, MethodError, SegmentKind};
pub use path::{PathParseError, ServicePath};
pub use service::{
    DescriptionError, MethodDescription, MethodHandler, MethodParameterDescription, ParameterWay,
    PendingOperation, RemotingKind, Returned, ServiceBuilder, ServiceDescription, ServiceInstance,
    SubserviceAccessor, downcast_service,
};

/// Everything needed to describe a service and compile invokers for it.
pub mod prelude {
    pub use crate::codec::{CodecContainer, CodecRegistry, TypeDesc};
    pub use crate::{
        Arguments, CompiledInvoker, DispatchCompiler, InvokerFactory, MethodError, ParameterWay,
        RemotingKind, Returned, ServiceBuilder, ServiceDescription, ServiceInstance, ServicePath,
        compile,
        downcast_service,
    };
}
