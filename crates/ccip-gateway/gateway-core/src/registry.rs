//! Selector-keyed dispatch table.
//!
//! The table is filled while the gateway is being set up and only read while
//! serving. A selector can be registered once; a second registration for the
//! same selector is rejected rather than silently replacing the first handler.

use crate::{
    binder::CcipReadRequest,
    descriptor::MethodDescriptor,
    error::RegistrationError,
};

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::Selector;
use std::{
    collections::{
        HashMap,
        hash_map::Entry,
    },
    sync::Arc,
};

/// Application logic serving one function.
///
/// Called synchronously with the decoded request; returns the output values in
/// the order the function declares them.
pub trait Handler: Send + Sync {
    fn call(&self, request: &CcipReadRequest) -> anyhow::Result<Vec<DynSolValue>>;
}

impl<F> Handler for F
where
    F: Fn(&CcipReadRequest) -> anyhow::Result<Vec<DynSolValue>> + Send + Sync,
{
    fn call(&self, request: &CcipReadRequest) -> anyhow::Result<Vec<DynSolValue>> {
        self(request)
    }
}

/// A descriptor and the handler registered for it.
#[derive(Clone)]
pub struct RegisteredHandler {
    pub method: Arc<MethodDescriptor>,
    pub handler: Arc<dyn Handler>,
}

impl std::fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("method", &self.method.to_string())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct SelectorTable {
    handlers: HashMap<Selector, RegisteredHandler>,
}

impl SelectorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `handler` under the selector of `method`.
    pub fn register(
        &mut self,
        method: MethodDescriptor,
        handler: Arc<dyn Handler>,
    ) -> Result<Selector, RegistrationError> {
        let selector = method.selector();
        match self.handlers.entry(selector) {
            Entry::Occupied(existing) => {
                Err(RegistrationError::DuplicateSelector {
                    selector,
                    existing: existing.get().method.to_string(),
                })
            }
            Entry::Vacant(slot) => {
                tracing::debug!(%selector, method = %method, "Registered handler");
                slot.insert(RegisteredHandler {
                    method: Arc::new(method),
                    handler,
                });
                Ok(selector)
            }
        }
    }

    pub fn lookup(&self, selector: &Selector) -> Option<&RegisteredHandler> {
        self.handlers.get(selector)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered descriptors, in no particular order.
    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.handlers.values().map(|r| r.method.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::parse_signature;

    fn noop() -> Arc<dyn Handler> {
        Arc::new(|_: &CcipReadRequest| -> anyhow::Result<Vec<DynSolValue>> { Ok(Vec::new()) })
    }

    #[test]
    fn test_register_and_lookup() {
        let mut table = SelectorTable::new();
        let method = parse_signature("function addr(bytes32 namehash) view returns (address)").unwrap();
        let selector = table.register(method, noop()).unwrap();

        assert_eq!(table.len(), 1);
        let registered = table.lookup(&selector).unwrap();
        assert_eq!(registered.method.name(), "addr");
        assert!(table.lookup(&Selector::ZERO).is_none());
    }

    #[test]
    fn test_duplicate_selector_rejected() {
        let mut table = SelectorTable::new();
        table
            .register(
                parse_signature("function addr(bytes32 namehash) view returns (address)").unwrap(),
                noop(),
            )
            .unwrap();

        let err = table
            .register(
                parse_signature("function addr(bytes32 node) pure returns (bytes)").unwrap(),
                noop(),
            )
            .unwrap_err();

        match err {
            RegistrationError::DuplicateSelector { selector, existing } => {
                assert_eq!(hex::encode(selector), "3b3b57de");
                assert_eq!(
                    existing,
                    "function addr(bytes32 namehash) view returns (address b)"
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // the first registration is kept
        let kept = table.lookup(&"0x3b3b57de".parse().unwrap()).unwrap();
        assert_eq!(kept.method.outputs()[0].name, "b");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_methods_lists_registrations() {
        let mut table = SelectorTable::new();
        assert!(table.is_empty());
        for sig in [
            "function addr(bytes32) view returns (address)",
            "function text(bytes32, string) view returns (string)",
        ] {
            table.register(parse_signature(sig).unwrap(), noop()).unwrap();
        }
        let mut names: Vec<_> = table.methods().map(|m| m.name().to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["addr", "text"]);
    }
}
