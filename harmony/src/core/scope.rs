//! Nested scope stack resolved innermost-first.

use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

use tracing::warn;

use crate::core::variables::Variables;
use crate::error::ImmutableAccessError;

/// A chain of [`Variables`] with the global scope fixed at index 0.
///
/// Lookups and writes search from the most recently pushed scope back to the
/// global scope and act on the first scope that holds the key.
#[derive(Debug, Clone)]
pub struct NestedScope {
    scopes: Vec<Variables>,
}

impl NestedScope {
    pub fn new(global: Variables) -> Self {
        Self {
            scopes: vec![global],
        }
    }

    /// Push `scope`, returning the keys it shadows (sorted).
    ///
    /// Shadowing is legal but logged as a warning.
    pub fn push(&mut self, scope: Variables) -> Vec<String> {
        let visible: BTreeSet<&str> = self.scopes.iter().flat_map(Variables::keys).collect();
        let shadowed: Vec<String> = scope
            .keys()
            .filter(|key| visible.contains(key))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if !shadowed.is_empty() {
            warn!(shadowed = ?shadowed, "variables shadowed by nested scope");
        }
        self.scopes.push(scope);
        shadowed
    }

    /// Pop the innermost scope. The global scope is never popped.
    pub fn pop(&mut self) -> Option<Variables> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    /// Push `scope` for the lifetime of the returned guard.
    pub fn enter(&mut self, scope: Variables) -> ScopeGuard<'_> {
        self.push(scope);
        ScopeGuard { stack: self }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn global(&self) -> &Variables {
        &self.scopes[0]
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .find(|scope| scope.contains(name))
            .and_then(|scope| scope.get(name))
    }

    /// Write `name` in the innermost scope that already holds it.
    ///
    /// Returns `Ok(false)` without writing when no scope holds `name`.
    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<bool, ImmutableAccessError> {
        match self
            .scopes
            .iter_mut()
            .rev()
            .find(|scope| scope.contains(name))
        {
            Some(scope) => {
                scope.set(name, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Pops the scope pushed by [`NestedScope::enter`] when dropped.
pub struct ScopeGuard<'a> {
    stack: &'a mut NestedScope,
}

impl Deref for ScopeGuard<'_> {
    type Target = NestedScope;

    fn deref(&self) -> &NestedScope {
        self.stack
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut NestedScope {
        self.stack
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        let mut vars = Variables::new();
        for (key, value) in pairs {
            vars.set(*key, *value).expect("set");
        }
        vars
    }

    #[test]
    fn innermost_scope_wins() {
        let mut stack = NestedScope::new(vars(&[("user", "global"), ("site", "g")]));
        stack.push(vars(&[("user", "local")]));
        assert_eq!(stack.get("user"), Some("local"));
        assert_eq!(stack.get("site"), Some("g"));
        assert_eq!(stack.get("missing"), None);
    }

    #[test]
    fn push_reports_shadowed_keys() {
        let mut stack = NestedScope::new(vars(&[("a", "1"), ("b", "2")]));
        let shadowed = stack.push(vars(&[("b", "3"), ("c", "4")]));
        assert_eq!(shadowed, vec!["b".to_string()]);
        let shadowed = stack.push(vars(&[("c", "5"), ("a", "6")]));
        assert_eq!(shadowed, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn set_writes_innermost_holder() {
        let mut stack = NestedScope::new(vars(&[("user", "global"), ("site", "g")]));
        stack.push(vars(&[("user", "local")]));
        assert!(stack.set("user", "changed").expect("set"));
        assert!(stack.set("site", "g2").expect("set"));
        let local = stack.pop().expect("pop");
        assert_eq!(local.get("user"), Some("changed"));
        assert_eq!(stack.get("user"), Some("global"));
        assert_eq!(stack.get("site"), Some("g2"));
    }

    #[test]
    fn set_on_missing_key_is_noop() {
        let mut stack = NestedScope::new(Variables::new());
        stack.push(Variables::new());
        assert!(!stack.set("ghost", "boo").expect("set"));
        assert_eq!(stack.get("ghost"), None);
    }

    #[test]
    fn set_on_immutable_holder_fails() {
        let mut global = Variables::new();
        global.define_immutable("site", "x").expect("define");
        let mut stack = NestedScope::new(global);
        assert!(stack.set("site", "y").is_err());
    }

    #[test]
    fn global_scope_is_never_popped() {
        let mut stack = NestedScope::new(Variables::new());
        assert!(stack.pop().is_none());
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn guard_pops_on_drop() {
        let mut stack = NestedScope::new(Variables::new());
        {
            let guard = stack.enter(vars(&[("k", "v")]));
            assert_eq!(guard.get("k"), Some("v"));
            assert_eq!(guard.depth(), 2);
        }
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.get("k"), None);
    }
}
