//! Shared fixtures: a calculator service with one nested sub-service.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use callisto::codec::Value;
use callisto::prelude::*;
use callisto::InvokeError;
use futures_util::FutureExt;
use tokio::sync::oneshot;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct Scientific {
    pub calls: AtomicUsize,
}

pub struct Calculator {
    pub scientific: Arc<Scientific>,
    pub pings: AtomicUsize,
    pub notified: Mutex<Vec<i32>>,
    pub fetch: Mutex<Option<oneshot::Receiver<i32>>>,
}

impl Calculator {
    pub fn new() -> Self {
        Calculator {
            scientific: Arc::new(Scientific {
                calls: AtomicUsize::new(0),
            }),
            pings: AtomicUsize::new(0),
            notified: Mutex::new(Vec::new()),
            fetch: Mutex::new(None),
        }
    }

    /// Arm `FetchAsync`; the returned sender settles it.
    pub fn arm_fetch(&self) -> oneshot::Sender<i32> {
        let (tx, rx) = oneshot::channel();
        *self.fetch.lock().unwrap() = Some(rx);
        tx
    }
}

pub fn i32_ty() -> TypeDesc {
    TypeDesc::named("i32")
}

fn scientific_description() -> ServiceDescription {
    let mut service = ServiceBuilder::for_type::<Scientific>("Scientific").unwrap();
    service
        .add_method("Pow", |service, args| {
            let scientific = downcast_service::<Scientific>(service)?;
            scientific.calls.fetch_add(1, Ordering::SeqCst);
            let base: i64 = args.take(0)?;
            let exp: u32 = args.take(1)?;
            Ok(Returned::value(base.pow(exp)))
        })
        .unwrap()
        .param("base", TypeDesc::named("i64"), ParameterWay::Val)
        .unwrap()
        .param("exp", TypeDesc::named("u32"), ParameterWay::Val)
        .unwrap()
        .returns(TypeDesc::named("i64"));
    service.build()
}

pub fn calculator_description() -> ServiceDescription {
    let mut service = ServiceBuilder::for_type::<Calculator>("Calculator").unwrap();

    service
        .add_subservice(
            "Scientific",
            |service: &ServiceInstance| {
                let calculator = downcast_service::<Calculator>(service)?;
                Ok(calculator.scientific.clone() as ServiceInstance)
            },
            scientific_description(),
        )
        .unwrap();

    service
        .add_method("Add", |_, args| {
            let a: i32 = args.take(0)?;
            let b: i32 = args.take(1)?;
            Ok(Returned::value(a + b))
        })
        .unwrap()
        .param("a", i32_ty(), ParameterWay::Val)
        .unwrap()
        .param("b", i32_ty(), ParameterWay::Val)
        .unwrap()
        .returns(i32_ty());

    service
        .add_method("Increment", |_, args| {
            *args.get_mut::<i32>(0)? += 1;
            Ok(Returned::Void)
        })
        .unwrap()
        .param("x", i32_ty(), ParameterWay::Ref)
        .unwrap();

    service
        .add_method("TryParse", |_, args| {
            let text: String = args.take(0)?;
            let (value, ok) = match text.parse::<i32>() {
                Ok(value) => (value, true),
                Err(_) => (0, false),
            };
            args.set(1, value)?;
            Ok(Returned::value(ok))
        })
        .unwrap()
        .param("text", TypeDesc::named("String"), ParameterWay::Val)
        .unwrap()
        .param("value", i32_ty(), ParameterWay::Out)
        .unwrap()
        .returns(TypeDesc::named("bool"));

    service
        .add_method("Swap", |_, args| {
            let a = *args.get::<i32>(0)?;
            let b = *args.get::<i32>(1)?;
            args.set(0, b)?;
            args.set(1, a)?;
            let scale: i32 = args.take(2)?;
            args.set(3, (a + b) * scale)?;
            Ok(Returned::value(a - b))
        })
        .unwrap()
        .param("a", i32_ty(), ParameterWay::Ref)
        .unwrap()
        .param("b", i32_ty(), ParameterWay::Ref)
        .unwrap()
        .param("scale", i32_ty(), ParameterWay::Val)
        .unwrap()
        .param("scaled_sum", i32_ty(), ParameterWay::Out)
        .unwrap()
        .returns(i32_ty());

    service
        .add_method("Ping", |service, _| {
            let calculator = downcast_service::<Calculator>(service)?;
            calculator.pings.fetch_add(1, Ordering::SeqCst);
            Ok(Returned::Void)
        })
        .unwrap();

    service
        .add_method("Answer", |_, _| Ok(Returned::value(42i32)))
        .unwrap()
        .returns(i32_ty());

    service
        .add_method("Divide", |_, args| {
            let a: i32 = args.take(0)?;
            let b: i32 = args.take(1)?;
            if b == 0 {
                return Err(MethodError::failed("division by zero"));
            }
            Ok(Returned::value(a / b))
        })
        .unwrap()
        .param("a", i32_ty(), ParameterWay::Val)
        .unwrap()
        .param("b", i32_ty(), ParameterWay::Val)
        .unwrap()
        .returns(i32_ty());

    service
        .add_method("Forgetful", |_, _| Ok(Returned::Void))
        .unwrap()
        .param("value", i32_ty(), ParameterWay::Out)
        .unwrap();

    service
        .add_method("Echo", |_, args| Ok(Returned::Value(args.take_value(0)?)))
        .unwrap()
        .generic("T")
        .unwrap()
        .param("value", TypeDesc::generic("T"), ParameterWay::Val)
        .unwrap()
        .returns(TypeDesc::generic("T"));

    service
        .add_method("First", |_, args| {
            let items: Vec<Value> = args.take(0)?;
            items
                .into_iter()
                .next()
                .map(Returned::Value)
                .ok_or_else(|| MethodError::failed("empty list"))
        })
        .unwrap()
        .generic("T")
        .unwrap()
        .param(
            "items",
            TypeDesc::with_args("Vec", vec![TypeDesc::generic("T")]),
            ParameterWay::Val,
        )
        .unwrap()
        .returns(TypeDesc::generic("T"));

    service
        .add_method("FetchAsync", |service, _| {
            let calculator = downcast_service::<Calculator>(service)?;
            let rx = calculator
                .fetch
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| MethodError::failed("fetch not armed"))?;
            Ok(Returned::pending(async move {
                rx.await.map_err(MethodError::failed)
            }))
        })
        .unwrap()
        .returns(TypeDesc::pending(i32_ty()));

    service
        .add_method("LaterAsync", |_, args| {
            let value = args.take_value(0)?;
            Ok(Returned::Pending(
                async move {
                    tokio::task::yield_now().await;
                    Ok::<_, MethodError>(Some(value))
                }
                .boxed(),
            ))
        })
        .unwrap()
        .generic("T")
        .unwrap()
        .param("value", TypeDesc::generic("T"), ParameterWay::Val)
        .unwrap()
        .returns(TypeDesc::pending(TypeDesc::generic("T")));

    service
        .add_method("NotifyAsync", |service, args| {
            let value: i32 = args.take(0)?;
            let service = service.clone();
            Ok(Returned::pending_void(async move {
                let calculator = downcast_service::<Calculator>(&service)?;
                calculator.notified.lock().unwrap().push(value);
                Ok::<(), MethodError>(())
            }))
        })
        .unwrap()
        .param("value", i32_ty(), ParameterWay::Val)
        .unwrap()
        .returns(TypeDesc::pending_void());

    service
        .add_method("FailAsync", |_, _| {
            Ok(Returned::pending(async {
                Err::<i32, _>(MethodError::failed("backend unavailable"))
            }))
        })
        .unwrap()
        .returns(TypeDesc::pending(i32_ty()));

    service.build()
}

pub fn calculator() -> (Arc<Calculator>, ServiceInstance) {
    let calculator = Arc::new(Calculator::new());
    let instance: ServiceInstance = calculator.clone();
    (calculator, instance)
}

pub fn compile_path(path: &str, generic_args: &[TypeDesc]) -> Result<CompiledInvoker, callisto::CompileError> {
    let registry = CodecRegistry::with_builtin();
    let description = calculator_description();
    compile(&registry, &description, &ServicePath::parse(path).unwrap(), generic_args)
}

/// Run an invocation whose future must already be complete.
pub fn invoke_now(
    invoker: &CompiledInvoker,
    service: &ServiceInstance,
    buffer: &[u8],
    offset: usize,
) -> Result<Bytes, InvokeError> {
    invoker
        .invoke(service, buffer, offset)
        .now_or_never()
        .expect("direct invocations complete immediately")
}

pub fn le_i32s(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}
