//! A scoped registry of named types, so a layout under construction can
//! refer to a sibling or enclosing type by name before that type is fully
//! assembled (forward references, and self-referential structs nested
//! inside an array).

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::descriptor::Descriptor;
use crate::error::{Error, Result};

thread_local! {
    static SCOPES: RefCell<Vec<IndexMap<String, Rc<Descriptor>>>> = RefCell::new(Vec::new());
}

/// Register `descriptor` under `name` in the innermost active
/// [`BuilderScope`]. Outside of any scope, registration is a no-op and
/// [`type_lookup`] will never find it.
pub fn register(name: &str, descriptor: Rc<Descriptor>) {
    SCOPES.with(|scopes| {
        if let Some(top) = scopes.borrow_mut().last_mut() {
            top.insert(name.to_string(), descriptor);
        }
    });
}

/// Look up `name`, searching from the innermost scope outward.
pub fn type_lookup(name: &str) -> Result<Rc<Descriptor>> {
    SCOPES.with(|scopes| {
        scopes
            .borrow()
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).cloned())
            .ok_or_else(|| Error::UnknownKey(name.to_string()))
    })
}

/// Opens a new, empty naming scope for the duration of its lifetime.
/// Lookups started inside it also see every enclosing scope; names it
/// registers are discarded when it drops.
pub struct BuilderScope {
    _private: (),
}

impl BuilderScope {
    pub fn open() -> Self {
        SCOPES.with(|scopes| scopes.borrow_mut().push(IndexMap::new()));
        Self { _private: () }
    }
}

impl Drop for BuilderScope {
    fn drop(&mut self) {
        SCOPES.with(|scopes| {
            scopes.borrow_mut().pop();
        });
    }
}

impl Default for BuilderScope {
    fn default() -> Self {
        Self::open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::int::IntDesc;

    #[test]
    fn lookup_finds_registration_within_its_scope() {
        let _scope = BuilderScope::open();
        register("header", Rc::new(Descriptor::Int(IntDesc::u32())));
        assert!(type_lookup("header").is_ok());
    }

    #[test]
    fn lookup_fails_outside_any_scope() {
        assert!(type_lookup("nonexistent_xyz").is_err());
    }

    #[test]
    fn nested_scope_sees_enclosing_registrations() {
        let _outer = BuilderScope::open();
        register("outer_type", Rc::new(Descriptor::Int(IntDesc::u8())));
        {
            let _inner = BuilderScope::open();
            register("inner_type", Rc::new(Descriptor::Int(IntDesc::u16())));
            assert!(type_lookup("outer_type").is_ok());
            assert!(type_lookup("inner_type").is_ok());
        }
        assert!(type_lookup("inner_type").is_err());
        assert!(type_lookup("outer_type").is_ok());
    }

    #[test]
    fn registration_is_discarded_when_scope_drops() {
        {
            let _scope = BuilderScope::open();
            register("transient", Rc::new(Descriptor::Int(IntDesc::u8())));
        }
        assert!(type_lookup("transient").is_err());
    }
}
