//! Parameter planning: generic substitution, codec binding and the
//! request/response split for one method instantiation.

use std::collections::HashMap;
use std::sync::Arc;

use callisto_codec::{CodecContainer, DynCodec, TypeDesc};

use crate::error::CompileError;
use crate::service::{MethodDescription, ParameterWay, RemotingKind};

/// One parameter with its resolved type and bound codec.
pub(crate) struct ParameterPlan {
    pub(crate) way: ParameterWay,
    pub(crate) ty: TypeDesc,
    pub(crate) codec: Arc<dyn DynCodec>,
}

/// Everything the invoker needs to know about a method, resolved once.
pub(crate) struct MethodPlan {
    /// All parameters in declaration order.
    pub(crate) parameters: Vec<ParameterPlan>,
    /// Return type after substitution. For async methods this is the
    /// `Pending(..)` type.
    pub(crate) return_type: TypeDesc,
    /// Type and codec of the value the caller receives: the direct return
    /// value, or the settled result of an `AsyncWithRetval` method.
    pub(crate) result: Option<(TypeDesc, Arc<dyn DynCodec>)>,
    pub(crate) generics: Arc<[TypeDesc]>,
}

impl MethodPlan {
    pub(crate) fn has_request(&self) -> bool {
        self.parameters.iter().any(|p| p.way.is_request())
    }

    pub(crate) fn request_count(&self) -> usize {
        self.parameters.iter().filter(|p| p.way.is_request()).count()
    }

    /// Codecs of the response parameters, in declaration order.
    pub(crate) fn response_codecs(&self) -> Vec<Arc<dyn DynCodec>> {
        self.parameters
            .iter()
            .filter(|p| p.way.is_response())
            .map(|p| p.codec.clone())
            .collect()
    }
}

/// Map declared generic names to the supplied concrete types, positionally.
pub(crate) fn generic_map(
    method: &MethodDescription,
    generic_args: &[TypeDesc],
) -> Result<HashMap<String, TypeDesc>, CompileError> {
    let declared = method.generic_parameters();
    if declared.len() != generic_args.len() {
        return Err(CompileError::GenericArity {
            method: method.name().to_string(),
            expected: declared.len(),
            supplied: generic_args.len(),
        });
    }
    Ok(declared.iter().cloned().zip(generic_args.iter().cloned()).collect())
}

fn resolve(
    method: &MethodDescription,
    ty: &TypeDesc,
    map: &HashMap<String, TypeDesc>,
) -> Result<TypeDesc, CompileError> {
    let resolved = ty.substitute(map);
    if let Some(name) = resolved.first_unresolved_generic() {
        return Err(CompileError::UnresolvedGeneric {
            method: method.name().to_string(),
            name: name.to_string(),
        });
    }
    Ok(resolved)
}

fn codec_for(
    codecs: &dyn CodecContainer,
    method: &MethodDescription,
    ty: &TypeDesc,
) -> Result<Arc<dyn DynCodec>, CompileError> {
    codecs.get_codec(ty).map_err(|source| CompileError::Codec {
        method: method.name().to_string(),
        source,
    })
}

fn unsupported(method: &MethodDescription, reason: &'static str) -> CompileError {
    CompileError::UnsupportedSignature {
        method: method.name().to_string(),
        reason,
    }
}

/// Reject signatures the remoting kind cannot carry.
fn check_signature(method: &MethodDescription, return_type: &TypeDesc) -> Result<(), CompileError> {
    let remoting = method.remoting();
    if remoting.is_async() && method.parameters().iter().any(|p| p.way.is_response()) {
        return Err(unsupported(
            method,
            "async methods cannot have ref or out parameters",
        ));
    }
    match (remoting, return_type.pending_result()) {
        (RemotingKind::Direct, None) => Ok(()),
        (RemotingKind::Direct, Some(_)) => Err(unsupported(
            method,
            "direct methods cannot return a pending operation",
        )),
        (RemotingKind::AsyncVoid, Some(TypeDesc::Void)) => Ok(()),
        (RemotingKind::AsyncVoid, _) => Err(unsupported(
            method,
            "async-void methods must return a pending operation without a result",
        )),
        (RemotingKind::AsyncWithRetval, Some(result)) if !result.is_void() => Ok(()),
        (RemotingKind::AsyncWithRetval, _) => Err(unsupported(
            method,
            "async methods with a result must return a pending operation carrying a value",
        )),
    }
}

/// Resolve every type of `method` under `generic_args` and bind codecs.
pub(crate) fn plan_method(
    codecs: &dyn CodecContainer,
    method: &MethodDescription,
    generic_args: &[TypeDesc],
) -> Result<MethodPlan, CompileError> {
    let map = generic_map(method, generic_args)?;

    let return_type = resolve(method, method.return_type(), &map)?;
    check_signature(method, &return_type)?;

    let mut parameters = Vec::with_capacity(method.parameters().len());
    for parameter in method.parameters() {
        let ty = resolve(method, &parameter.ty, &map)?;
        let codec = codec_for(codecs, method, &ty)?;
        parameters.push(ParameterPlan {
            way: parameter.way,
            ty,
            codec,
        });
    }

    let result_type = match method.remoting() {
        RemotingKind::Direct => Some(&return_type),
        RemotingKind::AsyncVoid => None,
        RemotingKind::AsyncWithRetval => return_type.pending_result(),
    };
    let result = match result_type {
        Some(ty) if !ty.is_void() => Some((ty.clone(), codec_for(codecs, method, ty)?)),
        _ => None,
    };

    Ok(MethodPlan {
        parameters,
        return_type,
        result,
        generics: generic_args.into(),
    })
}
