//! Traversable resolvers decide which properties the engine may touch.

use super::path::PropertyPath;
use super::value::TypeName;
use std::collections::HashSet;
use std::fmt;

/// Decides, per property, whether it is evaluated and whether it is cascaded.
///
/// An unreachable property is neither evaluated nor cascaded. A reachable but
/// non-cascadable property is evaluated and not descended into.
pub trait TraversableResolver: fmt::Debug + Send + Sync {
    /// Whether `property` of `bean_type`, found below `path_to_bean`, is evaluated.
    fn is_reachable(&self, bean_type: &TypeName, property: &str, path_to_bean: &PropertyPath) -> bool;

    /// Whether the value of `property` is cascaded into.
    fn is_cascadable(
        &self,
        bean_type: &TypeName,
        property: &str,
        path_to_bean: &PropertyPath,
    ) -> bool;
}

/// Everything is reachable and cascadable.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraverseAll;

impl TraversableResolver for TraverseAll {
    fn is_reachable(&self, _: &TypeName, _: &str, _: &PropertyPath) -> bool {
        true
    }

    fn is_cascadable(&self, _: &TypeName, _: &str, _: &PropertyPath) -> bool {
        true
    }
}

/// Excludes listed properties, by `Type.property` name.
#[derive(Debug, Clone, Default)]
pub struct ExcludeProperties {
    unreachable: HashSet<(TypeName, String)>,
    not_cascadable: HashSet<(TypeName, String)>,
}

impl ExcludeProperties {
    /// Creates a resolver that excludes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Neither evaluates nor cascades `type_name.property`.
    pub fn unreachable(mut self, type_name: impl Into<TypeName>, property: impl Into<String>) -> Self {
        self.unreachable.insert((type_name.into(), property.into()));
        self
    }

    /// Evaluates but never cascades into `type_name.property`.
    pub fn not_cascadable(
        mut self,
        type_name: impl Into<TypeName>,
        property: impl Into<String>,
    ) -> Self {
        self.not_cascadable
            .insert((type_name.into(), property.into()));
        self
    }
}

impl TraversableResolver for ExcludeProperties {
    fn is_reachable(&self, bean_type: &TypeName, property: &str, _: &PropertyPath) -> bool {
        !self
            .unreachable
            .contains(&(bean_type.clone(), property.to_string()))
    }

    fn is_cascadable(&self, bean_type: &TypeName, property: &str, _: &PropertyPath) -> bool {
        !self
            .not_cascadable
            .contains(&(bean_type.clone(), property.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusions() {
        let resolver = ExcludeProperties::new()
            .unreachable("Order", "secret")
            .not_cascadable("Order", "customer");
        let order = TypeName::from("Order");
        let root = PropertyPath::root();

        assert!(!resolver.is_reachable(&order, "secret", &root));
        assert!(resolver.is_reachable(&order, "customer", &root));
        assert!(!resolver.is_cascadable(&order, "customer", &root));
        assert!(TraverseAll.is_cascadable(&order, "customer", &root));
    }
}
