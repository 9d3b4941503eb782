use crate::{
    env::Environment,
    frame::Frame,
    name::{Name, Token},
    scope::{Scope, Scoped},
};
use dynenv_error::Error;
use std::{fmt, future::Future};

/// A single dynamically scoped value.
///
/// A variable is an [`Environment`] with exactly one binding, stored under a private [`Token`]
/// that no caller can name. It can only be read with [`Variable::get`] and rebound with
/// [`Variable::set`] or [`Variable::set_async`]; there is no in-place mutation.
///
/// ```
/// use dynenv::Variable;
///
/// let verbose = Variable::new(false);
/// assert!(verbose.set(true, || verbose.get().unwrap()));
/// assert!(!verbose.get().unwrap());
/// ```
pub struct Variable<V> {
    key: Token,
    env: Environment<V>,
}

impl<V> Clone for Variable<V> {
    fn clone(&self) -> Self {
        Self { key: self.key, env: self.env.clone() }
    }
}

impl<V: fmt::Debug + Clone + Send + Sync + 'static> fmt::Debug for Variable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Variable").field(&self.get().ok()).finish()
    }
}

impl<V: Clone + Send + Sync + 'static> Variable<V> {
    /// Creates a variable with the given initial value.
    pub fn new(value: V) -> Self {
        let key = Token::fresh();
        let global = Frame::new();
        global.insert(Name::Token(key), value);
        Self { key, env: Environment::with_global(global) }
    }

    /// Gets the value of the variable, as seen from the current dynamic extent.
    ///
    /// The key is bound in the variable's global frame from construction on and can never be
    /// removed, so this only fails if that invariant is broken.
    pub fn get(&self) -> Result<V, Error> {
        self.env.get(self.key)
    }

    /// Rebinds the variable for the dynamic extent of a synchronous body, and returns the body's
    /// result.
    pub fn set<F, R>(&self, value: V, body: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.rebind(value).enter(body)
    }

    /// Rebinds the variable for the dynamic extent of an asynchronous body. See
    /// [`Environment::set_async`].
    pub fn set_async<F, Fut>(&self, value: V, body: F) -> Scoped<Fut>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let scope = self.rebind(value);
        let fut = scope.enter(body);
        scope.run(fut)
    }

    fn rebind(&self, value: V) -> Scope {
        let frame = Frame::new();
        frame.insert(Name::Token(self.key), value);
        self.env.push(frame)
    }
}
