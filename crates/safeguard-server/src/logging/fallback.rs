//! Diagnostic writer used when no [`Logger`] is configured.
//!
//! Writes go straight to standard error. Failures are ignored: this runs on
//! the recovery path and must not fail a second time (`eprintln!` would
//! panic on a closed stream).
//!
//! [`Logger`]: super::Logger

use std::backtrace::Backtrace;
use std::io::{self, Write};

/// Writes a recovered panic followed by a backtrace of the recovery site.
pub(crate) fn write_panic(message: &str) {
    let backtrace = Backtrace::force_capture();
    with_writer(|writer| {
        let _ = writeln!(writer, "Panic: {message}");
        let _ = writeln!(writer, "{backtrace}");
    });
}

/// Writes an error returned by a wrapped handler.
pub(crate) fn write_error(message: &str) {
    with_writer(|writer| {
        let _ = writeln!(writer, "Panic: {message}");
    });
}

fn with_writer(write: impl FnOnce(&mut dyn Write)) {
    #[cfg(test)]
    let Err(write) = capture::redirect(write) else {
        return;
    };

    write(&mut io::stderr().lock());
}

/// Captures fallback output of the current thread.
#[cfg(test)]
pub(crate) mod capture {
    use std::cell::RefCell;
    use std::io::Write;

    thread_local! {
        static BUFFER: RefCell<Option<Vec<u8>>> = const { RefCell::new(None) };
    }

    /// Runs `write` against the capture buffer if one is installed.
    pub(super) fn redirect<F>(write: F) -> Result<(), F>
    where
        F: FnOnce(&mut dyn Write),
    {
        BUFFER.with_borrow_mut(|buffer| match buffer {
            Some(buffer) => {
                write(buffer);
                Ok(())
            }
            None => Err(write),
        })
    }

    /// Runs `f` and returns what it wrote to the fallback writer.
    pub(crate) fn stderr<T>(f: impl FnOnce() -> T) -> (T, String) {
        BUFFER.set(Some(Vec::new()));
        let value = f();
        let buffer = BUFFER.take().unwrap_or_default();
        (value, String::from_utf8_lossy(&buffer).into_owned())
    }
}
