//! Service metadata model.
//!
//! A [`ServiceDescription`] is a tree: each node names a service, lists the
//! sub-services reachable from it through named accessors, and lists its
//! methods. Descriptions are assembled with [`ServiceBuilder`] and are
//! read-only afterwards; the dispatch compiler only ever borrows them.
//!
//! # Example
//!
//! ```rust
//! use callisto::service::{ParameterWay, Returned, ServiceBuilder};
//! use callisto::codec::TypeDesc;
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
//! assert!(description.method("Add").is_some());
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use callisto_codec::{TypeDesc, Value};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::args::Arguments;
use crate::error::MethodError;
use crate::path::PATH_SEPARATOR;

/// Maximum service (and sub-service accessor) name length in bytes.
pub const MAX_SERVICE_NAME_LEN: usize = 256;

/// Maximum method name length in bytes.
pub const MAX_METHOD_NAME_LEN: usize = 128;

/// How a parameter travels between request and response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterWay {
    /// Input only.
    Val,
    /// Input, and written back after the call.
    Ref,
    /// Output only; starts unassigned.
    Out,
}

impl ParameterWay {
    /// Decoded from the request payload.
    pub fn is_request(self) -> bool {
        matches!(self, ParameterWay::Val | ParameterWay::Ref)
    }

    /// Encoded into the response payload.
    pub fn is_response(self) -> bool {
        matches!(self, ParameterWay::Ref | ParameterWay::Out)
    }
}

/// How a method's result reaches the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemotingKind {
    /// The method returns its value (or nothing) synchronously.
    Direct,
    /// The method returns a pending operation without a result.
    AsyncVoid,
    /// The method returns a pending operation carrying a result.
    AsyncWithRetval,
}

impl RemotingKind {
    /// Classify a method by its declared return type.
    pub fn infer(return_type: &TypeDesc) -> Self {
        match return_type.pending_result() {
            Some(TypeDesc::Void) => RemotingKind::AsyncVoid,
            Some(_) => RemotingKind::AsyncWithRetval,
            None => RemotingKind::Direct,
        }
    }

    pub fn is_async(self) -> bool {
        !matches!(self, RemotingKind::Direct)
    }
}

impl fmt::Display for RemotingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemotingKind::Direct => write!(f, "direct"),
            RemotingKind::AsyncVoid => write!(f, "async-void"),
            RemotingKind::AsyncWithRetval => write!(f, "async-with-retval"),
        }
    }
}

/// A live service object. Handlers downcast it to their concrete type.
pub type ServiceInstance = Arc<dyn Any + Send + Sync>;

/// A method's in-flight result. Settles with `Some(value)` for methods that
/// produce a result and `None` otherwise.
pub type PendingOperation = BoxFuture<'static, Result<Option<Value>, MethodError>>;

/// What a method handler hands back to the invoker.
pub enum Returned {
    /// The method has no return value.
    Void,
    /// The synchronous return value.
    Value(Value),
    /// The method is still running.
    Pending(PendingOperation),
}

impl Returned {
    pub fn value<T: Any + Send>(value: T) -> Self {
        Returned::Value(Box::new(value))
    }

    /// A pending operation that settles with a `T`.
    pub fn pending<T, F>(future: F) -> Self
    where
        T: Any + Send,
        F: Future<Output = Result<T, MethodError>> + Send + 'static,
    {
        Returned::Pending(
            future
                .map(|result| result.map(|value| Some(Box::new(value) as Value)))
                .boxed(),
        )
    }

    /// A pending operation without a result.
    pub fn pending_void<F>(future: F) -> Self
    where
        F: Future<Output = Result<(), MethodError>> + Send + 'static,
    {
        Returned::Pending(future.map(|result| result.map(|()| None)).boxed())
    }
}

impl fmt::Debug for Returned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Returned::Void => write!(f, "Void"),
            Returned::Value(_) => write!(f, "Value(..)"),
            Returned::Pending(_) => write!(f, "Pending(..)"),
        }
    }
}

/// Performs the actual call of one method on a service instance.
pub trait MethodHandler: Send + Sync + 'static {
    fn call(&self, service: &ServiceInstance, args: &mut Arguments) -> Result<Returned, MethodError>;
}

impl<F> MethodHandler for F
where
    F: Fn(&ServiceInstance, &mut Arguments) -> Result<Returned, MethodError> + Send + Sync + 'static,
{
    fn call(&self, service: &ServiceInstance, args: &mut Arguments) -> Result<Returned, MethodError> {
        self(service, args)
    }
}

/// Navigates from a service instance to one of its sub-services.
pub trait SubserviceAccessor: Send + Sync + 'static {
    fn access(&self, service: &ServiceInstance) -> Result<ServiceInstance, MethodError>;
}

impl<F> SubserviceAccessor for F
where
    F: Fn(&ServiceInstance) -> Result<ServiceInstance, MethodError> + Send + Sync + 'static,
{
    fn access(&self, service: &ServiceInstance) -> Result<ServiceInstance, MethodError> {
        self(service)
    }
}

/// Borrow the concrete service behind a [`ServiceInstance`].
pub fn downcast_service<T: Any + Send + Sync>(service: &ServiceInstance) -> Result<&T, MethodError> {
    service
        .downcast_ref::<T>()
        .ok_or(MethodError::ServiceType {
            expected: std::any::type_name::<T>(),
        })
}

/// Concrete Rust type a description was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceType {
    id: TypeId,
    name: &'static str,
}

impl ServiceType {
    pub fn of<T: Any>() -> Self {
        ServiceType {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether `service` is an instance of this type.
    pub fn matches(&self, service: &ServiceInstance) -> bool {
        (**service).type_id() == self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodParameterDescription {
    pub name: String,
    pub ty: TypeDesc,
    pub way: ParameterWay,
}

/// Everything the dispatch compiler needs to know about one method.
#[derive(Clone)]
pub struct MethodDescription {
    name: String,
    parameters: Vec<MethodParameterDescription>,
    return_type: TypeDesc,
    generic_parameters: Vec<String>,
    remoting: RemotingKind,
    handler: Arc<dyn MethodHandler>,
}

impl MethodDescription {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters in declaration order.
    pub fn parameters(&self) -> &[MethodParameterDescription] {
        &self.parameters
    }

    /// Declared return type, possibly mentioning generic parameters.
    pub fn return_type(&self) -> &TypeDesc {
        &self.return_type
    }

    /// Generic parameter names in declaration order.
    pub fn generic_parameters(&self) -> &[String] {
        &self.generic_parameters
    }

    pub fn remoting(&self) -> RemotingKind {
        self.remoting
    }

    pub fn handler(&self) -> &Arc<dyn MethodHandler> {
        &self.handler
    }
}

impl fmt::Debug for MethodDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescription")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type)
            .field("generic_parameters", &self.generic_parameters)
            .field("remoting", &self.remoting)
            .finish_non_exhaustive()
    }
}

/// A sub-service entry: how to reach it, and what it offers.
#[derive(Clone)]
pub struct Subservice {
    accessor: Arc<dyn SubserviceAccessor>,
    description: Arc<ServiceDescription>,
}

impl Subservice {
    pub fn accessor(&self) -> &Arc<dyn SubserviceAccessor> {
        &self.accessor
    }

    pub fn description(&self) -> &ServiceDescription {
        &self.description
    }
}

impl fmt::Debug for Subservice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subservice")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A node of the service tree.
#[derive(Debug, Clone)]
pub struct ServiceDescription {
    name: String,
    service_type: Option<ServiceType>,
    subservices: HashMap<String, Subservice>,
    methods: HashMap<String, MethodDescription>,
}

impl ServiceDescription {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The concrete type instances of this service must have, when declared.
    pub fn service_type(&self) -> Option<ServiceType> {
        self.service_type
    }

    pub fn subservice(&self, accessor: &str) -> Option<&Subservice> {
        self.subservices.get(accessor)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescription> {
        self.methods.get(name)
    }

    pub fn subservice_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.subservices.keys().map(String::as_str)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.methods.keys().map(String::as_str)
    }
}

/// Error type for description builders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptionError {
    /// Service or accessor name is empty
    EmptyServiceName,
    /// Service or accessor name exceeds MAX_SERVICE_NAME_LEN
    ServiceNameTooLong,
    /// Method name is empty
    EmptyMethodName,
    /// Method name exceeds MAX_METHOD_NAME_LEN
    MethodNameTooLong,
    /// Parameter or generic parameter name is empty
    EmptyParameterName,
    /// A name contains the path separator
    SeparatorInName(String),
    DuplicateMethod(String),
    DuplicateSubservice(String),
    DuplicateParameter(String),
    DuplicateGeneric(String),
}

impl fmt::Display for DescriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptionError::EmptyServiceName => write!(f, "service name cannot be empty"),
            DescriptionError::ServiceNameTooLong => {
                write!(f, "service name exceeds {} bytes", MAX_SERVICE_NAME_LEN)
            }
            DescriptionError::EmptyMethodName => write!(f, "method name cannot be empty"),
            DescriptionError::MethodNameTooLong => {
                write!(f, "method name exceeds {} bytes", MAX_METHOD_NAME_LEN)
            }
            DescriptionError::EmptyParameterName => write!(f, "parameter name cannot be empty"),
            DescriptionError::SeparatorInName(name) => {
                write!(f, "name `{}` contains '{}'", name, PATH_SEPARATOR)
            }
            DescriptionError::DuplicateMethod(name) => write!(f, "duplicate method `{}`", name),
            DescriptionError::DuplicateSubservice(name) => {
                write!(f, "duplicate sub-service `{}`", name)
            }
            DescriptionError::DuplicateParameter(name) => {
                write!(f, "duplicate parameter `{}`", name)
            }
            DescriptionError::DuplicateGeneric(name) => {
                write!(f, "duplicate generic parameter `{}`", name)
            }
        }
    }
}

impl std::error::Error for DescriptionError {}

fn check_service_name(name: &str) -> Result<(), DescriptionError> {
    if name.is_empty() {
        return Err(DescriptionError::EmptyServiceName);
    }
    if name.len() > MAX_SERVICE_NAME_LEN {
        return Err(DescriptionError::ServiceNameTooLong);
    }
    if name.contains(PATH_SEPARATOR) {
        return Err(DescriptionError::SeparatorInName(name.to_string()));
    }
    Ok(())
}

/// Builder for a [`ServiceDescription`].
pub struct ServiceBuilder {
    name: String,
    service_type: Option<ServiceType>,
    subservices: HashMap<String, Subservice>,
    methods: Vec<MethodBuilder>,
    method_names: HashMap<String, usize>,
}

impl ServiceBuilder {
    /// Start describing a service.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Service name is empty
    /// - Service name exceeds MAX_SERVICE_NAME_LEN
    /// - Service name contains the path separator
    pub fn new(name: impl Into<String>) -> Result<Self, DescriptionError> {
        let name = name.into();
        check_service_name(&name)?;
        Ok(ServiceBuilder {
            name,
            service_type: None,
            subservices: HashMap::new(),
            methods: Vec::new(),
            method_names: HashMap::new(),
        })
    }

    /// Like [`new`](Self::new), and record `T` as the concrete service type.
    /// Invokers then refuse instances of any other type.
    pub fn for_type<T: Any + Send + Sync>(name: impl Into<String>) -> Result<Self, DescriptionError> {
        let mut builder = Self::new(name)?;
        builder.service_type = Some(ServiceType::of::<T>());
        Ok(builder)
    }

    /// Add a method backed by a closure.
    pub fn add_method<F>(
        &mut self,
        name: impl Into<String>,
        handler: F,
    ) -> Result<&mut MethodBuilder, DescriptionError>
    where
        F: Fn(&ServiceInstance, &mut Arguments) -> Result<Returned, MethodError> + Send + Sync + 'static,
    {
        self.add_method_dyn(name, Arc::new(handler))
    }

    /// Add a method backed by any [`MethodHandler`].
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Method name is empty
    /// - Method name exceeds MAX_METHOD_NAME_LEN
    /// - Method name is already used in this service
    pub fn add_method_dyn(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn MethodHandler>,
    ) -> Result<&mut MethodBuilder, DescriptionError> {
        let name = name.into();

        if name.is_empty() {
            return Err(DescriptionError::EmptyMethodName);
        }
        if name.len() > MAX_METHOD_NAME_LEN {
            return Err(DescriptionError::MethodNameTooLong);
        }
        if name.contains(PATH_SEPARATOR) {
            return Err(DescriptionError::SeparatorInName(name));
        }
        if self.method_names.contains_key(&name) {
            return Err(DescriptionError::DuplicateMethod(name));
        }

        let idx = self.methods.len();
        self.method_names.insert(name.clone(), idx);
        self.methods.push(MethodBuilder {
            name,
            parameters: Vec::new(),
            return_type: TypeDesc::Void,
            generic_parameters: Vec::new(),
            remoting: None,
            handler,
        });

        Ok(&mut self.methods[idx])
    }

    /// Add a sub-service reachable through `accessor`.
    pub fn add_subservice<F>(
        &mut self,
        name: impl Into<String>,
        accessor: F,
        description: impl Into<Arc<ServiceDescription>>,
    ) -> Result<&mut Self, DescriptionError>
    where
        F: Fn(&ServiceInstance) -> Result<ServiceInstance, MethodError> + Send + Sync + 'static,
    {
        self.add_subservice_dyn(name, Arc::new(accessor), description)
    }

    pub fn add_subservice_dyn(
        &mut self,
        name: impl Into<String>,
        accessor: Arc<dyn SubserviceAccessor>,
        description: impl Into<Arc<ServiceDescription>>,
    ) -> Result<&mut Self, DescriptionError> {
        let name = name.into();
        check_service_name(&name)?;
        if self.subservices.contains_key(&name) {
            return Err(DescriptionError::DuplicateSubservice(name));
        }
        self.subservices.insert(
            name,
            Subservice {
                accessor,
                description: description.into(),
            },
        );
        Ok(self)
    }

    pub fn build(self) -> ServiceDescription {
        let methods = self
            .methods
            .into_iter()
            .map(|method| {
                let method = method.finish();
                (method.name.clone(), method)
            })
            .collect();

        ServiceDescription {
            name: self.name,
            service_type: self.service_type,
            subservices: self.subservices,
            methods,
        }
    }
}

/// Builder for a single method, obtained from [`ServiceBuilder::add_method`].
pub struct MethodBuilder {
    name: String,
    parameters: Vec<MethodParameterDescription>,
    return_type: TypeDesc,
    generic_parameters: Vec<String>,
    remoting: Option<RemotingKind>,
    handler: Arc<dyn MethodHandler>,
}

impl MethodBuilder {
    /// Append a parameter.
    pub fn param(
        &mut self,
        name: impl Into<String>,
        ty: TypeDesc,
        way: ParameterWay,
    ) -> Result<&mut Self, DescriptionError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DescriptionError::EmptyParameterName);
        }
        if self.parameters.iter().any(|p| p.name == name) {
            return Err(DescriptionError::DuplicateParameter(name));
        }
        self.parameters.push(MethodParameterDescription { name, ty, way });
        Ok(self)
    }

    /// Declare a generic parameter. Order matters: generic arguments are
    /// supplied positionally at compile time.
    pub fn generic(&mut self, name: impl Into<String>) -> Result<&mut Self, DescriptionError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DescriptionError::EmptyParameterName);
        }
        if self.generic_parameters.contains(&name) {
            return Err(DescriptionError::DuplicateGeneric(name));
        }
        self.generic_parameters.push(name);
        Ok(self)
    }

    /// Set the return type. Defaults to `void`.
    pub fn returns(&mut self, ty: TypeDesc) -> &mut Self {
        self.return_type = ty;
        self
    }

    /// Override the remoting kind inferred from the return type.
    pub fn remoting(&mut self, kind: RemotingKind) -> &mut Self {
        self.remoting = Some(kind);
        self
    }

    fn finish(self) -> MethodDescription {
        let remoting = self
            .remoting
            .unwrap_or_else(|| RemotingKind::infer(&self.return_type));
        MethodDescription {
            name: self.name,
            parameters: self.parameters,
            return_type: self.return_type,
            generic_parameters: self.generic_parameters,
            remoting,
            handler: self.handler,
        }
    }
}
