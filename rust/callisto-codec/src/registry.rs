//! Codec lookup by resolved type.
//!
//! The dispatch compiler asks a [`CodecContainer`] for one codec per
//! parameter and return type while it builds an invoker. [`CodecRegistry`] is
//! the default container: exact registrations for concrete types, factories
//! for parameterized types such as `Vec<T>`, and a cache so that the same
//! resolved type always yields the same codec instance.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{Codec, DynCodec, LookupError, TypeDesc, TypedCodec};

/// Source of codecs for resolved types.
pub trait CodecContainer: Send + Sync {
    /// Codec for `ty`. Must return the same logical codec for equal descriptors.
    fn get_codec(&self, ty: &TypeDesc) -> Result<Arc<dyn DynCodec>, LookupError>;
}

impl<C: CodecContainer + ?Sized> CodecContainer for Arc<C> {
    fn get_codec(&self, ty: &TypeDesc) -> Result<Arc<dyn DynCodec>, LookupError> {
        (**self).get_codec(ty)
    }
}

/// Builds a codec for a parameterized type from the codecs of its arguments.
pub trait CodecFactory: Send + Sync + 'static {
    fn build(&self, args: Vec<Arc<dyn DynCodec>>) -> Arc<dyn DynCodec>;
}

impl<F> CodecFactory for F
where
    F: Fn(Vec<Arc<dyn DynCodec>>) -> Arc<dyn DynCodec> + Send + Sync + 'static,
{
    fn build(&self, args: Vec<Arc<dyn DynCodec>>) -> Arc<dyn DynCodec> {
        self(args)
    }
}

struct GenericEntry {
    arity: usize,
    factory: Arc<dyn CodecFactory>,
}

/// Default [`CodecContainer`].
///
/// Registration happens up front through `&mut self`; lookups afterwards are
/// shared. Codecs built by factories are cached on first use; any new
/// registration drops the cache.
pub struct CodecRegistry {
    exact: HashMap<TypeDesc, Arc<dyn DynCodec>>,
    generic: HashMap<String, GenericEntry>,
    built: RwLock<HashMap<TypeDesc, Arc<dyn DynCodec>>>,
}

impl CodecRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        CodecRegistry {
            exact: HashMap::new(),
            generic: HashMap::new(),
            built: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry pre-populated with the default codec set.
    #[cfg(feature = "builtin")]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::builtin::register_all(&mut registry);
        registry
    }

    /// Register a typed codec for a concrete type. Replaces any previous entry.
    pub fn register<C: Codec>(&mut self, ty: TypeDesc, codec: C) -> &mut Self {
        self.register_dyn(ty, Arc::new(TypedCodec::new(codec)))
    }

    /// Register an already type-erased codec for a concrete type.
    pub fn register_dyn(&mut self, ty: TypeDesc, codec: Arc<dyn DynCodec>) -> &mut Self {
        // composite codecs may embed the codec being replaced
        self.built.get_mut().clear();
        self.exact.insert(ty, codec);
        self
    }

    /// Register a factory for every instantiation of the named generic type.
    pub fn register_generic(
        &mut self,
        name: impl Into<String>,
        arity: usize,
        factory: impl CodecFactory,
    ) -> &mut Self {
        let name = name.into();
        self.built.get_mut().clear();
        self.generic.insert(
            name,
            GenericEntry {
                arity,
                factory: Arc::new(factory),
            },
        );
        self
    }

    /// Whether a codec can be produced for `ty`.
    pub fn contains(&self, ty: &TypeDesc) -> bool {
        self.get_codec(ty).is_ok()
    }

    fn build(&self, ty: &TypeDesc) -> Result<Arc<dyn DynCodec>, LookupError> {
        let (name, args) = match ty {
            TypeDesc::Named { name, args } => (name, args),
            TypeDesc::Generic(_) => return Err(LookupError::UnresolvedGeneric(ty.clone())),
            TypeDesc::Void | TypeDesc::Pending(_) => {
                return Err(LookupError::NotEncodable(ty.clone()));
            }
        };

        let entry = self
            .generic
            .get(name)
            .ok_or_else(|| LookupError::NotRegistered(ty.clone()))?;
        if entry.arity != args.len() {
            return Err(LookupError::Arity {
                ty: ty.clone(),
                expected: entry.arity,
                supplied: args.len(),
            });
        }

        let arg_codecs = args
            .iter()
            .map(|arg| self.get_codec(arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entry.factory.build(arg_codecs))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecContainer for CodecRegistry {
    fn get_codec(&self, ty: &TypeDesc) -> Result<Arc<dyn DynCodec>, LookupError> {
        if let Some(codec) = self.exact.get(ty) {
            return Ok(codec.clone());
        }
        if let Some(codec) = self.built.read().get(ty) {
            return Ok(codec.clone());
        }

        let codec = self.build(ty)?;
        // Another thread may have built the same type meanwhile; keep whichever
        // landed first so every caller sees one instance.
        let mut built = self.built.write();
        let codec = built.entry(ty.clone()).or_insert(codec).clone();
        tracing::trace!(ty = %ty, value = codec.value_type_name(), "built codec");
        Ok(codec)
    }
}
