use crate::{
    bindings::{Arg, Bindings},
    error::{ArityError, UnboundVariable},
    frame::Frame,
    name::{Name, Token},
    scope::{Scope, Scoped},
};
use dynenv_error::Error;
use indexmap::IndexMap;
use levenshtein::levenshtein;
use std::{fmt, future::Future, ptr, sync::Arc};

/// A dynamic environment: a global frame, plus the frames pushed by rebinds along the current
/// continuation.
///
/// Lookups search the frames pushed by enclosing rebinds, innermost first, then fall back to the
/// global frame. Which frames are "enclosing" is decided by the dynamic extent the caller runs
/// in, not by where the calling code was written: a rebind is visible to its body and to every
/// continuation spawned from it, and to nothing else.
///
/// Cloning an environment is cheap; clones share the same global frame and see the same
/// rebinds.
///
/// ```
/// use dynenv::Environment;
///
/// let env = Environment::new(("x", 5)).unwrap();
/// let read = || env.get("x").unwrap();
///
/// assert_eq!(env.set(("x", 42), read).unwrap(), 42);
/// assert_eq!(read(), 5);
/// ```
pub struct Environment<V> {
    /// Identifies the frames this environment pushes.
    id: Token,

    /// The frame consulted when no pushed frame binds a name.
    global: Arc<Frame<V>>,
}

impl<V> Clone for Environment<V> {
    fn clone(&self) -> Self {
        Self { id: self.id, global: Arc::clone(&self.global) }
    }
}

impl<V: fmt::Debug> fmt::Debug for Environment<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("id", &self.id)
            .field("global", &self.global)
            .finish()
    }
}

impl<V: Clone + Send + Sync + 'static> Default for Environment<V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<V: Clone + Send + Sync + 'static> Environment<V> {
    /// Creates an environment whose global frame holds the given bindings.
    ///
    /// Duplicate names resolve last-write-wins. Fails with [`InvalidName`] if any name is empty.
    ///
    /// [`InvalidName`]: crate::error::InvalidName
    pub fn new(bindings: impl Into<Bindings<V>>) -> Result<Self, Error> {
        Ok(Self::with_global(Frame::from_bindings(bindings.into())?))
    }

    /// Creates an environment with an empty global frame.
    pub fn empty() -> Self {
        Self::with_global(Frame::new())
    }

    /// Creates an environment from a flattened list of alternating names and values.
    pub fn from_flat(args: impl IntoIterator<Item = Arg<V>>) -> Result<Self, Error> {
        Self::new(Bindings::from_flat(args)?)
    }

    pub(crate) fn with_global(global: Frame<V>) -> Self {
        Self { id: Token::fresh(), global: Arc::new(global) }
    }

    /// Returns the frames this environment has pushed in the given scope, innermost first.
    fn frames<'s>(&self, scope: &'s Scope) -> impl Iterator<Item = &'s Frame<V>> {
        scope
            .frames(self.id)
            .filter_map(|frame| frame.downcast_ref::<Frame<V>>())
    }

    /// Returns the frame that answers lookups of the name in the given scope: the innermost
    /// pushed frame that binds it, or else the global frame.
    fn resolve<'a>(&'a self, scope: &'a Scope, name: &Name) -> &'a Frame<V> {
        self.frames(scope)
            .find(|frame| frame.has(name))
            .unwrap_or(&*self.global)
    }

    /// Gets the value of the name, as seen from the current dynamic extent.
    ///
    /// Fails with [`UnboundVariable`] if neither a pushed frame nor the global frame binds the
    /// name, and with [`InvalidName`] if the name is empty.
    ///
    /// [`InvalidName`]: crate::error::InvalidName
    pub fn get(&self, name: impl Into<Name>) -> Result<V, Error> {
        let name = name.into();
        name.validate()?;

        let scope = Scope::current();
        let value = self.frames(&scope)
            .find_map(|frame| frame.lookup(&name))
            .or_else(|| self.global.lookup(&name));
        value.ok_or_else(|| Error::new(UnboundVariable {
            suggestions: self.similar_names(&scope, &name),
            name: name.to_string(),
        }))
    }

    /// Returns true if [`Environment::get`] would find the name.
    pub fn contains(&self, name: impl Into<Name>) -> bool {
        let name = name.into();
        let scope = Scope::current();
        name.validate().is_ok() && self.resolve(&scope, &name).has(&name)
    }

    /// Returns the visible symbols spelled similarly to the given name.
    fn similar_names(&self, scope: &Scope, name: &Name) -> Vec<String> {
        let Some(target) = name.as_str() else {
            return Vec::new();
        };

        self.visible(scope)
            .keys()
            .filter_map(Name::as_str)
            .filter(|candidate| levenshtein(candidate, target) < 2)
            .map(str::to_string)
            .collect()
    }

    /// Returns the scope that rebinding the given names would install: the current scope, with
    /// one new frame holding the bindings pushed on top.
    ///
    /// [`Environment::set`] and [`Environment::set_async`] install this scope for their body.
    /// It can also be installed by hand, with [`Scope::enter`] or [`Scope::run`], to carry a
    /// rebinding into a thread or executor that does not inherit the caller's scope.
    pub fn rebound(&self, bindings: impl Into<Bindings<V>>) -> Result<Scope, Error> {
        let frame = Frame::from_bindings(bindings.into())?;
        Ok(self.push(frame))
    }

    pub(crate) fn push(&self, frame: Frame<V>) -> Scope {
        let count = frame.len();
        let scope = Scope::current().push(self.id, Arc::new(frame));
        log::trace!("pushed frame with {} binding(s) at depth {}", count, scope.depth());
        scope
    }

    /// Rebinds the given names for the dynamic extent of a synchronous body, and returns the
    /// body's result.
    ///
    /// Exactly one new frame is pushed, visible to `body` and everything it calls. It is gone as
    /// soon as `body` returns or unwinds.
    ///
    /// Binding errors are reported before `body` is invoked; nothing is pushed in that case.
    pub fn set<F, R>(&self, bindings: impl Into<Bindings<V>>, body: F) -> Result<R, Error>
    where
        F: FnOnce() -> R,
    {
        Ok(self.rebound(bindings)?.enter(body))
    }

    /// Rebinds the given names for the dynamic extent of an asynchronous body.
    ///
    /// `body` is invoked immediately with the new frame pushed, and the future it returns is
    /// wrapped so that the frame is in effect every time it is polled. The frame is therefore
    /// visible to the synchronous part of `body`, to every continuation of the future, and to
    /// tasks spawned from it with [`spawn`](crate::spawn), but not to concurrently running
    /// siblings. The future's output, including any error it resolves to, is passed through
    /// unchanged.
    ///
    /// Binding errors are returned here, before any future exists.
    pub fn set_async<F, Fut>(
        &self,
        bindings: impl Into<Bindings<V>>,
        body: F,
    ) -> Result<Scoped<Fut>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let scope = self.rebound(bindings)?;
        let fut = scope.enter(body);
        Ok(scope.run(fut))
    }

    /// Overwrites the given names in place, permanently.
    ///
    /// Each name is written into the frame that would currently answer a [`get`] for it: the
    /// innermost pushed frame that binds it, or else the global frame (which gains the name if it
    /// is bound nowhere). No frame is pushed and nothing is restored afterwards.
    ///
    /// # Hazard
    ///
    /// The write is visible to every execution that later resolves the name to the same frame,
    /// including concurrently running sibling extents and the extents enclosing the caller. No
    /// ordering is imposed between this write and reads in other tasks.
    ///
    /// Fails with [`ArityError`] if no bindings are given, and with [`InvalidName`] if any name
    /// is empty; in both cases nothing is written.
    ///
    /// [`get`]: Environment::get
    /// [`InvalidName`]: crate::error::InvalidName
    pub fn assign(&self, bindings: impl Into<Bindings<V>>) -> Result<(), Error> {
        let bindings = bindings.into();
        if bindings.is_empty() {
            return Err(Error::new(ArityError {
                expected: "at least one name / value pair",
                given: 0,
            }));
        }
        bindings.validate()?;

        let scope = Scope::current();
        for (name, value) in bindings {
            let frame = self.resolve(&scope, &name);
            log::debug!(
                "assigning `{}` in place in the {} frame",
                name,
                if ptr::eq(frame, &*self.global) { "global" } else { "dynamic" },
            );
            frame.insert(name, value);
        }

        Ok(())
    }

    /// Merges the global frame with the frames pushed in the given scope, outermost first, so
    /// that inner values win.
    fn visible(&self, scope: &Scope) -> IndexMap<Name, V> {
        let mut merged = self.global.iter().collect::<IndexMap<_, _>>();
        let frames = self.frames(scope).collect::<Vec<_>>();
        for frame in frames.into_iter().rev() {
            merged.extend(frame.iter());
        }
        merged
    }

    /// Returns a snapshot of every visible binding, as seen from the current dynamic extent.
    ///
    /// Each name appears once, with the value from the innermost frame that binds it. Names
    /// appear in the order they were first bound, global names first.
    pub fn iter(&self) -> impl Iterator<Item = (Name, V)> {
        self.visible(&Scope::current()).into_iter()
    }

    /// Returns the number of frames this environment has pushed in the current dynamic extent.
    pub fn depth(&self) -> usize {
        let scope = Scope::current();
        self.frames(&scope).count()
    }
}
