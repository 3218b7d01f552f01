//! Instrumented element types for the container tests: every clone and drop
//! is reported to a shared journal, so tests can assert exact lifecycle
//! counts and drop order.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Shared record of element lifecycle events.
#[derive(Default, Debug)]
pub struct Journal {
    drops: RefCell<Vec<i32>>,
    clones: Cell<usize>,
}

impl Journal {
    pub fn new() -> Rc<Journal> {
        Rc::new(Journal::default())
    }

    /// Ids of dropped elements, in drop order.
    pub fn dropped(&self) -> Vec<i32> {
        self.drops.borrow().clone()
    }

    pub fn drop_count(&self) -> usize {
        self.drops.borrow().len()
    }

    pub fn clone_count(&self) -> usize {
        self.clones.get()
    }

    pub fn reset(&self) {
        self.drops.borrow_mut().clear();
        self.clones.set(0);
    }
}

/// An element that reports its clones and drops to a [`Journal`].
#[derive(Debug)]
pub struct Tracked {
    pub id: i32,
    journal: Rc<Journal>,
}

impl Tracked {
    pub fn new(id: i32, journal: &Rc<Journal>) -> Tracked {
        Tracked {
            id,
            journal: Rc::clone(journal),
        }
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        self.journal.clones.set(self.journal.clones.get() + 1);
        Tracked::new(self.id, &self.journal)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.journal.drops.borrow_mut().push(self.id);
    }
}

impl PartialEq for Tracked {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl PartialEq<i32> for Tracked {
    fn eq(&self, other: &i32) -> bool {
        self.id == *other
    }
}

/// Wraps a sequence of ids into [`Tracked`] elements tied to `journal`.
pub fn wrap<I: IntoIterator<Item = i32>>(
    ids: I,
    journal: &Rc<Journal>,
) -> impl Iterator<Item = Tracked> {
    let journal = Rc::clone(journal);
    ids.into_iter().map(move |id| Tracked::new(id, &journal))
}
