use crate::{bindings::Bindings, error::UnboundVariable, name::Name};
use dynenv_error::Error;
use indexmap::IndexMap;
use std::{
    fmt,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    vec,
};

/// A binding frame, holding the names bound by one rebinding scope (or the global scope of an
/// environment).
///
/// Bindings are kept in insertion order. Overwriting a name keeps its original position.
///
/// A frame is written once when it is created; afterwards, the only writer is the mutation shape
/// ([`Environment::assign`]), which overwrites entries in place. Writes go through a lock so
/// that they are memory-safe, but nothing orders them against readers in other tasks: a reader
/// sees whichever value was written last when it happened to look.
///
/// [`Environment::assign`]: crate::Environment::assign
pub struct Frame<V> {
    /// The variables stored in this frame.
    bindings: RwLock<IndexMap<Name, V>>,
}

impl<V> Default for Frame<V> {
    fn default() -> Self {
        Self { bindings: RwLock::new(IndexMap::new()) }
    }
}

impl<V: fmt::Debug> fmt::Debug for Frame<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.read().iter()).finish()
    }
}

impl<V> Frame<V> {
    /// Creates a new, empty [`Frame`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frame from the given bindings. Every name is checked before anything is
    /// inserted; duplicate names resolve last-write-wins.
    pub fn from_bindings(bindings: Bindings<V>) -> Result<Self, Error> {
        bindings.validate()?;
        Ok(Self::from_validated(bindings))
    }

    /// Creates a frame from bindings whose names are known to be valid.
    pub(crate) fn from_validated(bindings: Bindings<V>) -> Self {
        Self { bindings: RwLock::new(bindings.into_iter().collect()) }
    }

    // every write is a single `insert`, so a poisoned map is still consistent
    fn read(&self) -> RwLockReadGuard<'_, IndexMap<Name, V>> {
        self.bindings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<Name, V>> {
        self.bindings.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if the name is bound in this frame.
    pub fn has(&self, name: &Name) -> bool {
        self.read().contains_key(name)
    }

    /// Binds the name in this frame, overwriting any existing value.
    pub fn set(&self, name: impl Into<Name>, value: V) -> Result<(), Error> {
        let name = name.into();
        name.validate()?;
        self.insert(name, value);
        Ok(())
    }

    /// Binds an already validated name.
    pub(crate) fn insert(&self, name: Name, value: V) {
        self.write().insert(name, value);
    }

    /// Returns the bound names, in insertion order.
    pub fn names(&self) -> Vec<Name> {
        self.read().keys().cloned().collect()
    }

    /// Returns the number of bindings in this frame.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if nothing is bound in this frame.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl<V: Clone> Frame<V> {
    /// Gets the value bound to the name in this frame.
    pub fn get(&self, name: impl Into<Name>) -> Result<V, Error> {
        let name = name.into();
        name.validate()?;
        self.lookup(&name).ok_or_else(|| Error::new(UnboundVariable {
            name: name.to_string(),
            suggestions: Vec::new(),
        }))
    }

    /// Gets the value bound to the name in this frame, if any.
    pub(crate) fn lookup(&self, name: &Name) -> Option<V> {
        self.read().get(name).cloned()
    }

    /// Returns a snapshot of the bindings in this frame, in insertion order.
    pub fn iter(&self) -> vec::IntoIter<(Name, V)> {
        self.read()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect::<Vec<_>>()
            .into_iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{InvalidName, UnboundVariable};
    use pretty_assertions::assert_eq;
    use super::*;

    #[test]
    fn get_and_has() {
        let frame = Frame::new();
        frame.set("x", 5).unwrap();
        assert!(frame.has(&"x".into()));
        assert!(!frame.has(&"y".into()));
        assert_eq!(frame.get("x").unwrap(), 5);
    }

    #[test]
    fn unbound() {
        let frame = Frame::<i32>::new();
        let err = frame.get("missing").unwrap_err();
        let kind = err.downcast_ref::<UnboundVariable>().unwrap();
        assert_eq!(kind.name, "missing");
    }

    #[test]
    fn invalid_name() {
        let frame = Frame::new();
        assert!(frame.set("", 1).unwrap_err().is::<InvalidName>());
        assert!(frame.get("").unwrap_err().is::<InvalidName>());
        assert!(frame.is_empty());
    }

    #[test]
    fn insertion_order_survives_overwrite() {
        let frame = Frame::new();
        frame.set("b", 1).unwrap();
        frame.set("a", 2).unwrap();
        frame.set("b", 3).unwrap();

        let bindings = frame.iter().collect::<Vec<_>>();
        assert_eq!(bindings, vec![(Name::from("b"), 3), (Name::from("a"), 2)]);
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn duplicate_bindings_last_write_wins() {
        let frame = Frame::from_bindings(Bindings::new().bind("x", 1).bind("y", 2).bind("x", 3))
            .unwrap();
        assert_eq!(frame.get("x").unwrap(), 3);
        assert_eq!(frame.names(), vec![Name::from("x"), Name::from("y")]);
    }

    #[test]
    fn rejects_bindings_without_partial_insert() {
        let err = Frame::from_bindings(Bindings::new().bind("x", 1).bind("", 2)).unwrap_err();
        assert!(err.is::<InvalidName>());
    }
}
