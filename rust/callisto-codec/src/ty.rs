//! Type descriptors.
//!
//! A [`TypeDesc`] is the metadata-level description of a parameter or return
//! type. Method metadata may mention generic parameters by name; the dispatch
//! compiler substitutes them before asking the codec registry for a codec, so
//! a descriptor that reaches [`crate::CodecContainer::get_codec`] is expected
//! to be fully resolved.

use std::collections::HashMap;
use std::fmt;

/// Description of a type as it appears in service metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    /// No value (a method that returns nothing).
    Void,
    /// A concrete, possibly parameterized type such as `i32` or `Vec<String>`.
    Named { name: String, args: Vec<TypeDesc> },
    /// A generic parameter declared on the method, e.g. `T`.
    Generic(String),
    /// A pending operation. `Pending(Void)` settles without a value,
    /// `Pending(R)` settles with an `R`.
    Pending(Box<TypeDesc>),
}

impl TypeDesc {
    /// A non-generic named type.
    pub fn named(name: impl Into<String>) -> Self {
        TypeDesc::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// A named type with type arguments, e.g. `Vec<T>`.
    pub fn with_args(name: impl Into<String>, args: Vec<TypeDesc>) -> Self {
        TypeDesc::Named {
            name: name.into(),
            args,
        }
    }

    /// A reference to a generic parameter of the enclosing method.
    pub fn generic(name: impl Into<String>) -> Self {
        TypeDesc::Generic(name.into())
    }

    /// A pending operation producing `inner`.
    pub fn pending(inner: TypeDesc) -> Self {
        TypeDesc::Pending(Box::new(inner))
    }

    /// A pending operation with no result value.
    pub fn pending_void() -> Self {
        TypeDesc::Pending(Box::new(TypeDesc::Void))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeDesc::Void)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TypeDesc::Pending(_))
    }

    /// The type a pending operation settles with, if this is one.
    pub fn pending_result(&self) -> Option<&TypeDesc> {
        match self {
            TypeDesc::Pending(inner) => Some(inner),
            _ => None,
        }
    }

    /// Replace every generic parameter found in `map`, recursively.
    ///
    /// Generic names that are not in the map are left in place; use
    /// [`TypeDesc::first_unresolved_generic`] to detect them.
    pub fn substitute(&self, map: &HashMap<String, TypeDesc>) -> TypeDesc {
        match self {
            TypeDesc::Void => TypeDesc::Void,
            TypeDesc::Generic(name) => match map.get(name) {
                Some(concrete) => concrete.clone(),
                None => self.clone(),
            },
            TypeDesc::Named { name, args } => TypeDesc::Named {
                name: name.clone(),
                args: args.iter().map(|arg| arg.substitute(map)).collect(),
            },
            TypeDesc::Pending(inner) => TypeDesc::Pending(Box::new(inner.substitute(map))),
        }
    }

    /// The first generic parameter name still present in this descriptor.
    pub fn first_unresolved_generic(&self) -> Option<&str> {
        match self {
            TypeDesc::Void => None,
            TypeDesc::Generic(name) => Some(name),
            TypeDesc::Named { args, .. } => args.iter().find_map(|arg| arg.first_unresolved_generic()),
            TypeDesc::Pending(inner) => inner.first_unresolved_generic(),
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Void => write!(f, "void"),
            TypeDesc::Generic(name) => write!(f, "{}", name),
            TypeDesc::Named { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeDesc::Pending(inner) => write!(f, "Pending<{}>", inner),
        }
    }
}
