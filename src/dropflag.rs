//! This module is for testing only

use std::cell::RefCell;
use std::rc::Rc;

pub type DropFlag<T> = Rc<RefCell<T>>;

pub struct Droppable {
    pub dropflag: DropFlag<bool>,
}

impl Drop for Droppable {
    fn drop(&mut self) {
        *self.dropflag.borrow_mut() = true;
    }
}

/// Array element whose drop appends its id to a shared log, so tests can
/// observe both whether and in which order destructors ran. `Default`
/// produces an inert slot; tests fill in the id and log after allocation.
#[derive(Default)]
pub struct OrderedSlot {
    pub id: usize,
    pub log: Option<DropFlag<Vec<usize>>>,
}

impl Drop for OrderedSlot {
    fn drop(&mut self) {
        if let Some(log) = &self.log {
            log.borrow_mut().push(self.id);
        }
    }
}

#[test]
fn dropflag() {
    let flag = DropFlag::new(RefCell::new(false));
    let droppable = Droppable { dropflag: flag.clone() };
    assert_eq!(false, *flag.borrow());
    std::mem::drop(droppable);
    assert_eq!(true, *flag.borrow());
}
