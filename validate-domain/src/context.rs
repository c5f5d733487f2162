//! Type-erased context values, the per-run cache and restricted views over it.

use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use validate_types::ContextType;

/// One value produced by a provider. Cheap to clone; clones share the allocation.
#[derive(Clone)]
pub struct ContextValue(Arc<dyn Any + Send + Sync>);

impl ContextValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// True when both handles point at the same cached value.
    pub fn ptr_eq(&self, other: &ContextValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextValue").finish_non_exhaustive()
    }
}

/// Contexts built during one run, keyed by type. Written during resolution only.
#[derive(Debug, Default)]
pub struct ContextCache {
    entries: BTreeMap<ContextType, Vec<ContextValue>>,
}

impl ContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, context_type: ContextType, values: Vec<ContextValue>) {
        self.entries.insert(context_type, values);
    }

    pub fn contains(&self, context_type: &ContextType) -> bool {
        self.entries.contains_key(context_type)
    }

    pub fn get(&self, context_type: &ContextType) -> Option<&[ContextValue]> {
        self.entries.get(context_type).map(Vec::as_slice)
    }

    pub fn types(&self) -> impl Iterator<Item = &ContextType> {
        self.entries.keys()
    }

    /// A view exposing only `declared`.
    pub fn view<'a>(&'a self, declared: &[ContextType]) -> ContextView<'a> {
        ContextView {
            declared: declared.to_vec(),
            cache: self,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextAccessError {
    #[error("context type '{0}' was not declared by this plugin")]
    Undeclared(ContextType),

    #[error("no '{0}' context is available")]
    Missing(ContextType),

    #[error("context '{context_type}' does not hold a {expected}")]
    TypeMismatch {
        context_type: ContextType,
        expected: &'static str,
    },
}

/// Read-only access to the contexts a plugin declared, and nothing else.
#[derive(Debug, Clone)]
pub struct ContextView<'a> {
    declared: Vec<ContextType>,
    cache: &'a ContextCache,
}

impl<'a> ContextView<'a> {
    pub fn declared(&self) -> &[ContextType] {
        &self.declared
    }

    /// Every value of `context_type`, in the order the provider produced them.
    pub fn all(&self, context_type: &str) -> Result<&'a [ContextValue], ContextAccessError> {
        let Some(ct) = self.declared.iter().find(|ct| ct.as_str() == context_type) else {
            return Err(ContextAccessError::Undeclared(ContextType::new(context_type)));
        };
        self.cache
            .get(ct)
            .ok_or_else(|| ContextAccessError::Missing(ct.clone()))
    }

    /// Every value of `context_type`, downcast to `T`.
    pub fn iter_as<T: Any>(&self, context_type: &str) -> Result<Vec<&'a T>, ContextAccessError> {
        self.all(context_type)?
            .iter()
            .map(|v| {
                v.downcast_ref::<T>()
                    .ok_or_else(|| ContextAccessError::TypeMismatch {
                        context_type: ContextType::new(context_type),
                        expected: type_name::<T>(),
                    })
            })
            .collect()
    }

    /// The first value of `context_type`, downcast to `T`.
    pub fn first<T: Any>(&self, context_type: &str) -> Result<&'a T, ContextAccessError> {
        let values = self.all(context_type)?;
        let value = values
            .first()
            .ok_or_else(|| ContextAccessError::Missing(ContextType::new(context_type)))?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| ContextAccessError::TypeMismatch {
                context_type: ContextType::new(context_type),
                expected: type_name::<T>(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> ContextCache {
        let mut cache = ContextCache::new();
        cache.insert(
            ContextType::new("x"),
            vec![ContextValue::new(1u32), ContextValue::new(2u32)],
        );
        cache.insert(ContextType::new("y"), vec![ContextValue::new("y".to_string())]);
        cache
    }

    #[test]
    fn view_denies_undeclared_types() {
        let cache = cache();
        let view = cache.view(&[ContextType::new("x")]);
        assert_eq!(
            view.all("y").unwrap_err(),
            ContextAccessError::Undeclared(ContextType::new("y"))
        );
        assert_eq!(view.iter_as::<u32>("x").expect("x values"), vec![&1, &2]);
    }

    #[test]
    fn view_reports_missing_and_mismatched_values() {
        let cache = cache();
        let view = cache.view(&[ContextType::new("x"), ContextType::new("z")]);
        assert!(matches!(view.all("z"), Err(ContextAccessError::Missing(_))));
        assert!(matches!(
            view.first::<String>("x"),
            Err(ContextAccessError::TypeMismatch { .. })
        ));
        assert_eq!(*view.first::<u32>("x").expect("first"), 1);
    }

    #[test]
    fn clones_share_allocation() {
        let v = ContextValue::new(5u8);
        let w = v.clone();
        assert!(v.ptr_eq(&w));
        assert!(!v.ptr_eq(&ContextValue::new(5u8)));
    }
}
