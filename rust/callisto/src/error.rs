use std::fmt;

use callisto_codec::{CodecError, LookupError, TypeDesc};

/// Failure reported by a service method, a sub-service accessor or argument access.
#[derive(Debug)]
pub enum MethodError {
    /// The service implementation failed.
    Failed(Box<dyn std::error::Error + Send + Sync>),
    /// An argument slot was used with the wrong index, way or type.
    Argument { index: usize, reason: ArgumentFault },
    /// The service instance is not of the type the handler expects.
    ServiceType { expected: &'static str },
}

/// What went wrong when accessing an argument slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentFault {
    /// No parameter at this index.
    OutOfRange,
    /// The value was already taken out of the slot.
    AlreadyTaken,
    /// An `Out` parameter was read before being assigned.
    Unassigned,
    /// The operation is not allowed for this parameter way
    /// (e.g. assigning a `Val` parameter).
    WrongWay,
    /// The slot holds a value of a different type.
    WrongType { expected: &'static str },
}

impl MethodError {
    /// Wrap any service-level error.
    pub fn failed(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        MethodError::Failed(err.into())
    }
}

impl fmt::Display for ArgumentFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentFault::OutOfRange => write!(f, "no such parameter"),
            ArgumentFault::AlreadyTaken => write!(f, "value already taken"),
            ArgumentFault::Unassigned => write!(f, "out parameter not assigned yet"),
            ArgumentFault::WrongWay => write!(f, "operation not allowed for this parameter way"),
            ArgumentFault::WrongType { expected } => write!(f, "value is not a `{}`", expected),
        }
    }
}

impl fmt::Display for MethodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodError::Failed(err) => write!(f, "service method failed: {}", err),
            MethodError::Argument { index, reason } => {
                write!(f, "argument {}: {}", index, reason)
            }
            MethodError::ServiceType { expected } => {
                write!(f, "service instance is not a `{}`", expected)
            }
        }
    }
}

impl std::error::Error for MethodError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MethodError::Failed(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Which part of a service path failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// The first segment does not name the described service.
    Service,
    /// A sub-service accessor is unknown.
    Subservice,
    /// The final segment is not a method of the resolved sub-service.
    Method,
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentKind::Service => write!(f, "service"),
            SegmentKind::Subservice => write!(f, "sub-service"),
            SegmentKind::Method => write!(f, "method"),
        }
    }
}

/// A service path segment does not resolve against the service description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPathError {
    pub path: String,
    pub segment: String,
    pub kind: SegmentKind,
}

impl fmt::Display for InvalidPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid service path `{}`: unknown {} `{}`",
            self.path, self.kind, self.segment
        )
    }
}

impl std::error::Error for InvalidPathError {}

/// Errors raised while compiling an invoker. No invoker exists when one is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    InvalidPath(InvalidPathError),
    /// The number of generic arguments differs from the method's generic parameters.
    GenericArity {
        method: String,
        expected: usize,
        supplied: usize,
    },
    /// A parameter or return type still mentions a generic after substitution.
    UnresolvedGeneric { method: String, name: String },
    /// No codec for a parameter or return type.
    Codec { method: String, source: LookupError },
    /// The method signature cannot be dispatched with its remoting kind.
    UnsupportedSignature { method: String, reason: &'static str },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::InvalidPath(err) => write!(f, "{}", err),
            CompileError::GenericArity {
                method,
                expected,
                supplied,
            } => write!(
                f,
                "method `{}` takes {} generic arguments, {} supplied",
                method, expected, supplied
            ),
            CompileError::UnresolvedGeneric { method, name } => {
                write!(f, "method `{}`: generic parameter `{}` is not bound", method, name)
            }
            CompileError::Codec { method, source } => write!(f, "method `{}`: {}", method, source),
            CompileError::UnsupportedSignature { method, reason } => {
                write!(f, "method `{}` cannot be dispatched: {}", method, reason)
            }
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::InvalidPath(err) => Some(err),
            CompileError::Codec { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<InvalidPathError> for CompileError {
    fn from(err: InvalidPathError) -> Self {
        CompileError::InvalidPath(err)
    }
}

/// Errors raised by a compiled invoker for a single call.
#[derive(Debug)]
pub enum InvokeError {
    /// Decoding the request or encoding the response failed.
    Codec(CodecError),
    /// The method, or a sub-service accessor on the way to it, failed.
    Method(MethodError),
    /// The method returned without assigning an `Out` parameter.
    OutNotAssigned { index: usize },
    /// The method produced a result that does not match its declared shape.
    ReturnShape { expected: TypeDesc },
}

impl InvokeError {
    /// Whether the request payload was too short for the declared parameters.
    pub fn is_buffer_underrun(&self) -> bool {
        matches!(self, InvokeError::Codec(CodecError::BufferUnderrun { .. }))
    }
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeError::Codec(err) => write!(f, "{}", err),
            InvokeError::Method(err) => write!(f, "{}", err),
            InvokeError::OutNotAssigned { index } => {
                write!(f, "out parameter {} was not assigned by the method", index)
            }
            InvokeError::ReturnShape { expected } => {
                write!(f, "method result does not match declared return type `{}`", expected)
            }
        }
    }
}

impl std::error::Error for InvokeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InvokeError::Codec(err) => Some(err),
            InvokeError::Method(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CodecError> for InvokeError {
    fn from(err: CodecError) -> Self {
        InvokeError::Codec(err)
    }
}

impl From<MethodError> for InvokeError {
    fn from(err: MethodError) -> Self {
        InvokeError::Method(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_path_display() {
        let err = InvalidPathError {
            path: "Calculator/Nope/Add".into(),
            segment: "Nope".into(),
            kind: SegmentKind::Subservice,
        };
        assert_eq!(
            err.to_string(),
            "invalid service path `Calculator/Nope/Add`: unknown sub-service `Nope`"
        );
    }

    #[test]
    fn compile_error_display() {
        let err = CompileError::GenericArity {
            method: "Echo".into(),
            expected: 1,
            supplied: 0,
        };
        assert!(err.to_string().contains("takes 1 generic arguments, 0 supplied"));

        let err = CompileError::Codec {
            method: "Add".into(),
            source: LookupError::NotRegistered(TypeDesc::named("i128")),
        };
        assert!(err.to_string().contains("i128"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn underrun_detection() {
        let err = InvokeError::from(CodecError::BufferUnderrun {
            needed: 4,
            remaining: 0,
        });
        assert!(err.is_buffer_underrun());
        assert!(!InvokeError::OutNotAssigned { index: 1 }.is_buffer_underrun());
    }

    #[test]
    fn method_error_keeps_source() {
        let err = MethodError::failed("division by zero");
        assert_eq!(err.to_string(), "service method failed: division by zero");
        assert!(std::error::Error::source(&err).is_some());

        let err = MethodError::Argument {
            index: 2,
            reason: ArgumentFault::WrongType { expected: "i32" },
        };
        assert_eq!(err.to_string(), "argument 2: value is not a `i32`");
    }
}
