//! Propagation of pushed frames along async continuations.
//!
//! Every task carries a [`Scope`]: an immutable snapshot of the frames pushed by the rebinds
//! enclosing it. The snapshot lives in a [`tokio::task_local!`] slot, which the runtime swaps in
//! each time a scoped future is polled and swaps out when the poll returns. A continuation
//! therefore resumes with exactly the snapshot that was in effect when it was created, no matter
//! which other continuations ran on the same worker in between.
//!
//! Pushing a frame never modifies a snapshot; it creates a new one that shares the old one as its
//! tail. Sibling continuations forked from the same point share the same snapshot, and a rebind
//! in one of them is invisible to the others.
//!
//! Tasks started with [`tokio::spawn`] begin with an empty scope. Use [`spawn`] and
//! [`spawn_blocking`] to start tasks that inherit the caller's snapshot, or capture it with
//! [`Scope::current`] and install it elsewhere with [`Scope::enter`] or [`Scope::run`].

use crate::name::Token;
use std::{any::Any, fmt, future::Future, sync::Arc};
use tokio::task::{futures::TaskLocalFuture, JoinHandle};

tokio::task_local! {
    static CURRENT: Scope;
}

/// A future that runs with a [`Scope`] installed on every poll.
pub type Scoped<F> = TaskLocalFuture<Scope, F>;

/// One pushed frame, tagged with the environment that owns it.
struct Link {
    owner: Token,
    frame: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<Link>>,
    depth: usize,
}

/// An immutable snapshot of the frames pushed by every enclosing rebind, across all
/// environments, innermost first.
#[derive(Clone, Default)]
pub struct Scope {
    head: Option<Arc<Link>>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope").field("depth", &self.depth()).finish()
    }
}

impl Scope {
    /// Returns the snapshot in effect for the current task or synchronous extent.
    ///
    /// Outside any rebind (including outside of any async runtime) this is the empty scope.
    pub fn current() -> Self {
        CURRENT.try_with(Clone::clone).unwrap_or_default()
    }

    /// Returns the number of frames pushed in this snapshot, across all environments.
    pub fn depth(&self) -> usize {
        self.head.as_ref().map_or(0, |link| link.depth)
    }

    /// Returns a new snapshot with the given frame pushed on top of this one.
    pub(crate) fn push(&self, owner: Token, frame: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            head: Some(Arc::new(Link {
                owner,
                frame,
                parent: self.head.clone(),
                depth: self.depth() + 1,
            })),
        }
    }

    /// Returns the frames pushed by the given environment, innermost first.
    pub(crate) fn frames(&self, owner: Token) -> impl Iterator<Item = &(dyn Any + Send + Sync + 'static)> {
        Links { next: self.head.as_deref() }
            .filter(move |link| link.owner == owner)
            .map(|link| &*link.frame)
    }

    /// Runs a synchronous closure with this snapshot installed.
    pub fn enter<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        CURRENT.sync_scope(self.clone(), f)
    }

    /// Wraps a future so that this snapshot is installed every time it is polled.
    pub fn run<F: Future>(&self, fut: F) -> Scoped<F> {
        CURRENT.scope(self.clone(), fut)
    }
}

/// Walks a chain of links from the head towards the root.
struct Links<'a> {
    next: Option<&'a Link>,
}

impl<'a> Iterator for Links<'a> {
    type Item = &'a Link;

    fn next(&mut self) -> Option<Self::Item> {
        let link = self.next?;
        self.next = link.parent.as_deref();
        Some(link)
    }
}

/// Spawns a task on the current tokio runtime that inherits the caller's scope.
///
/// # Panics
///
/// Panics if called outside of a tokio runtime, like [`tokio::spawn`].
pub fn spawn<F>(fut: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let scope = Scope::current();
    log::trace!("spawning task inheriting {} frame(s)", scope.depth());
    tokio::spawn(scope.run(fut))
}

/// Runs a blocking closure on tokio's blocking pool with the caller's scope installed.
///
/// # Panics
///
/// Panics if called outside of a tokio runtime, like [`tokio::task::spawn_blocking`].
pub fn spawn_blocking<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let scope = Scope::current();
    tokio::task::spawn_blocking(move || scope.enter(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_outside_runtime() {
        assert_eq!(Scope::current().depth(), 0);
    }

    #[test]
    fn push_does_not_modify_snapshot() {
        let owner = Token::fresh();
        let root = Scope::default();
        let a = root.push(owner, Arc::new(1_i32));
        let b = a.push(owner, Arc::new(2_i32));
        let sibling = a.push(owner, Arc::new(3_i32));

        assert_eq!(root.depth(), 0);
        assert_eq!(a.depth(), 1);
        assert_eq!(b.depth(), 2);

        let values = |scope: &Scope| scope
            .frames(owner)
            .filter_map(|frame| frame.downcast_ref::<i32>().copied())
            .collect::<Vec<_>>();
        assert_eq!(values(&b), vec![2, 1]);
        assert_eq!(values(&sibling), vec![3, 1]);
        assert_eq!(values(&a), vec![1]);
    }

    #[test]
    fn frames_filter_by_owner() {
        let (mine, theirs) = (Token::fresh(), Token::fresh());
        let scope = Scope::default()
            .push(mine, Arc::new("a"))
            .push(theirs, Arc::new("b"))
            .push(mine, Arc::new("c"));

        let frames = scope
            .frames(mine)
            .filter_map(|frame| frame.downcast_ref::<&str>().copied())
            .collect::<Vec<_>>();
        assert_eq!(frames, vec!["c", "a"]);
        assert_eq!(scope.depth(), 3);
    }

    #[test]
    fn enter_installs_and_restores() {
        let scope = Scope::default().push(Token::fresh(), Arc::new(()));
        let inner = scope.enter(|| Scope::current().depth());
        assert_eq!(inner, 1);
        assert_eq!(Scope::current().depth(), 0);
    }

    #[tokio::test]
    async fn run_installs_on_every_poll() {
        let scope = Scope::default().push(Token::fresh(), Arc::new(()));
        let depths = scope.run(async {
            let before = Scope::current().depth();
            tokio::task::yield_now().await;
            (before, Scope::current().depth())
        }).await;
        assert_eq!(depths, (1, 1));
        assert_eq!(Scope::current().depth(), 0);
    }

    #[tokio::test]
    async fn spawn_inherits_but_tokio_spawn_does_not() {
        let scope = Scope::default().push(Token::fresh(), Arc::new(()));
        let (inherited, plain) = scope.run(async {
            let inherited = spawn(async { Scope::current().depth() });
            let plain = tokio::spawn(async { Scope::current().depth() });
            (inherited.await.unwrap(), plain.await.unwrap())
        }).await;
        assert_eq!(inherited, 1);
        assert_eq!(plain, 0);
    }

    #[tokio::test]
    async fn spawn_blocking_inherits() {
        let scope = Scope::default().push(Token::fresh(), Arc::new(()));
        let depth = scope
            .run(async { spawn_blocking(|| Scope::current().depth()).await.unwrap() })
            .await;
        assert_eq!(depth, 1);
    }

    #[test]
    fn threads_inherit_explicitly() {
        let scope = Scope::default().push(Token::fresh(), Arc::new(()));
        let captured = scope.enter(Scope::current);
        let depth = std::thread::spawn(move || captured.enter(|| Scope::current().depth()))
            .join()
            .unwrap();
        assert_eq!(depth, 1);
    }
}
