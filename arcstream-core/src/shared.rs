//! Lending a reader to a pipeline that must not close it.
//!
//! Decorators own their source and close it when they are closed. A
//! [`SharedReader`] handle breaks that chain: its `close` does nothing, so the
//! caller keeps the underlying reader open and positioned after the
//! pipeline built on top of it is gone.

use crate::error::Result;
use crate::reader::Reader;
use crate::stat::Stat;
use std::cell::{RefCell, RefMut};
use std::path::PathBuf;
use std::rc::Rc;

/// Reader whose lifetime stays with the caller.
///
/// Clones are handles to the same reader. Every cursor call is forwarded to
/// it except [`Reader::close`], which leaves it untouched. The default
/// [`Reader::select`] therefore scans forward from the current entry instead
/// of rewinding.
pub struct SharedReader<R> {
    inner: Rc<RefCell<R>>,
}

impl<R: Reader> SharedReader<R> {
    /// Share `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            inner: Rc::new(RefCell::new(reader)),
        }
    }

    /// Direct access to the shared reader, including its real `close`.
    ///
    /// # Panics
    ///
    /// Panics if another handle is in the middle of a call.
    pub fn borrow_mut(&self) -> RefMut<'_, R> {
        self.inner.borrow_mut()
    }

    /// Take the reader back once no other handle is alive.
    pub fn into_inner(self) -> Option<R> {
        Rc::try_unwrap(self.inner).ok().map(RefCell::into_inner)
    }
}

impl<R: Reader + 'static> SharedReader<R> {
    /// Boxed handle, ready to be wrapped by a decorator.
    pub fn handle(&self) -> Box<dyn Reader> {
        Box::new(self.clone())
    }
}

impl<R> Clone for SharedReader<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<R: Reader> Reader for SharedReader<R> {
    fn next(&mut self) -> Result<bool> {
        self.inner.borrow_mut().next()
    }

    fn filename(&self) -> String {
        self.inner.borrow().filename()
    }

    fn stat(&self) -> Stat {
        self.inner.borrow().stat()
    }

    fn mime(&self) -> String {
        self.inner.borrow().mime()
    }

    fn data_filename(&self) -> Option<PathBuf> {
        self.inner.borrow().data_filename()
    }

    fn read_data(&mut self, length: Option<usize>) -> Result<Option<Vec<u8>>> {
        self.inner.borrow_mut().read_data(length)
    }

    fn skip(&mut self, length: u64) -> Result<u64> {
        self.inner.borrow_mut().skip(length)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
