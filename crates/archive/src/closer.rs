//! Explicit close ordering for layered streams.
//!
//! A stream handed out of a walk often sits on top of another resource that
//! must outlive it. [`CloseBoth`] takes ownership of both and closes them in
//! a fixed order exactly once.

use std::io::{self, Read};

/// A resource with a fallible close.
pub trait Close {
    /// Releases the resource. Calling it again must be harmless.
    fn close(&mut self) -> io::Result<()>;
}

/// A readable stream that must be closed.
pub trait ReadClose: Read + Close {}

impl<T: Read + Close + ?Sized> ReadClose for T {}

/// Adapts a plain reader whose close is simply dropping it.
#[derive(Debug)]
pub struct NoClose<R>(pub R);

impl<R: Read> Read for NoClose<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R> Close for NoClose<R> {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Owns an outer stream and the inner resource it depends on.
///
/// Closing closes `outer` first, then `inner`, even when the first close
/// fails; the first error is returned. Reads go to `outer`. Dropping an
/// unclosed value closes it and discards any error.
pub struct CloseBoth<A: Close, B: Close> {
    outer: Option<A>,
    inner: Option<B>,
}

impl<A: Close, B: Close> CloseBoth<A, B> {
    /// Takes ownership of both halves.
    pub const fn new(outer: A, inner: B) -> Self {
        Self {
            outer: Some(outer),
            inner: Some(inner),
        }
    }

    /// Returns `true` once [`Close::close`] has run.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.outer.is_none() && self.inner.is_none()
    }
}

impl<A: Close, B: Close> Close for CloseBoth<A, B> {
    fn close(&mut self) -> io::Result<()> {
        let outer = self.outer.take().map_or(Ok(()), |mut outer| outer.close());
        let inner = self.inner.take().map_or(Ok(()), |mut inner| inner.close());
        outer.and(inner)
    }
}

impl<A: Close + Read, B: Close> Read for CloseBoth<A, B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.outer {
            Some(outer) => outer.read(buf),
            None => Err(io::Error::other("read from a closed stream")),
        }
    }
}

impl<A: Close, B: Close> Drop for CloseBoth<A, B> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Probe {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
        fail: bool,
    }

    impl Close for Probe {
        fn close(&mut self) -> io::Result<()> {
            self.log.borrow_mut().push(self.name);
            if self.fail {
                Err(io::Error::other(self.name))
            } else {
                Ok(())
            }
        }
    }

    fn pair(log: &Rc<RefCell<Vec<&'static str>>>, fail_outer: bool, fail_inner: bool) -> CloseBoth<Probe, Probe> {
        CloseBoth::new(
            Probe {
                name: "outer",
                log: Rc::clone(log),
                fail: fail_outer,
            },
            Probe {
                name: "inner",
                log: Rc::clone(log),
                fail: fail_inner,
            },
        )
    }

    #[test]
    fn closes_outer_then_inner_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut both = pair(&log, false, false);
        both.close().expect("close");
        both.close().expect("idempotent");
        drop(both);
        assert_eq!(*log.borrow(), ["outer", "inner"]);
    }

    #[test]
    fn first_error_wins_and_inner_still_closes() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let err = pair(&log, true, true).close().expect_err("both fail");
        assert_eq!(err.to_string(), "outer");
        assert_eq!(*log.borrow(), ["outer", "inner"]);
    }

    #[test]
    fn drop_closes_an_unclosed_pair() {
        let log = Rc::new(RefCell::new(Vec::new()));
        drop(pair(&log, false, true));
        assert_eq!(*log.borrow(), ["outer", "inner"]);
    }
}
