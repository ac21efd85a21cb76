//! Dependency lists for memoized derivation.
//!
//! Bridges and effect subscriptions re-derive their source only when the
//! dependency value changes, compared with `PartialEq`. Tuples and vectors
//! compare element-wise; wrap shared objects in [`Identity`] to compare them
//! by pointer instead of by content.
//!
//! Callers must pass stable dependencies. A value that differs on every
//! render (a fresh `Identity` around a newly built `Arc`, say) re-derives and
//! re-subscribes on every render.

use crate::sources::Source;
use std::fmt;
use std::sync::Arc;

/// Compares an `Arc` by pointer identity.
pub struct Identity<T: ?Sized>(pub Arc<T>);

impl<T: ?Sized> Identity<T> {
    pub fn of(value: &Arc<T>) -> Self {
        Identity(Arc::clone(value))
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl<T: ?Sized> PartialEq for Identity<T> {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl<T: ?Sized> Eq for Identity<T> {}

impl<T: ?Sized> Clone for Identity<T> {
    fn clone(&self) -> Self {
        Identity(Arc::clone(&self.0))
    }
}

impl<T: ?Sized> fmt::Debug for Identity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({:p})", self.addr())
    }
}

/// Dependencies of a directly supplied source: the source itself.
pub type SourceDeps<T> = Option<Identity<dyn Source<T>>>;

/// Last dependency value seen.
#[derive(Debug)]
pub(crate) struct Memo<D> {
    deps: Option<D>,
}

impl<D: PartialEq> Memo<D> {
    pub(crate) fn new() -> Self {
        Self { deps: None }
    }

    /// True if `deps` equals the stored dependencies.
    pub(crate) fn is_current(&self, deps: &D) -> bool {
        self.deps.as_ref() == Some(deps)
    }

    pub(crate) fn store(&mut self, deps: D) {
        self.deps = Some(deps);
    }

    pub(crate) fn clear(&mut self) {
        self.deps = None;
    }
}
