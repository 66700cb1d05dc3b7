use leptos::{RwSignal, SignalUpdate, SignalWithUntracked};
use std::cell::RefCell;
use std::rc::Rc;

/// Somewhere a view's state lives.
///
/// Both methods return `None` once the backing state is gone (a disposed
/// signal after its component unmounted), so handlers finishing late just
/// stop. Implementations must not hold a borrow past the closure.
pub trait Store<T> {
    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R>;
    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R>;
}

impl<T: 'static> Store<T> for RwSignal<T> {
    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.try_with_untracked(f)
    }

    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.try_update(f)
    }
}

impl<T> Store<T> for Rc<RefCell<T>> {
    fn read<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        Some(f(&self.borrow()))
    }

    fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        Some(f(&mut self.borrow_mut()))
    }
}
