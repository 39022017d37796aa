//! Output destinations and per-execution output capture.
//!
//! Two separate concerns live here:
//!
//! - Where reporters write: an `OutputTarget` from the configuration is
//!   opened into a `Sink`.
//! - What test bodies print: every execution runs inside an `OutputScope`,
//!   a thread-local capture buffer. Text written through [`print_line`],
//!   [`capture_print!`](crate::capture_print) or `TestContext::out` lands in
//!   the innermost scope. The scope is restored when the guard drops, so an
//!   execution that panics cannot leak partial output into the next one.

use std::cell::RefCell;
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

/// In-memory byte sink shared between the writer and whoever reads it back.
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        SharedBuffer::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Where reporter output goes.
#[derive(Clone, Debug, Default)]
pub enum OutputTarget {
    #[default]
    Stdout,
    Stderr,
    /// Created (truncated) when the run starts.
    File(PathBuf),
    Buffer(SharedBuffer),
}

impl OutputTarget {
    /// Open the destination for writing.
    pub fn open(&self) -> io::Result<Sink> {
        let writer: Box<dyn Write + Send> = match self {
            OutputTarget::Stdout => Box::new(io::stdout()),
            OutputTarget::Stderr => Box::new(io::stderr()),
            OutputTarget::File(path) => Box::new(io::BufWriter::new(File::create(path)?)),
            OutputTarget::Buffer(buffer) => Box::new(buffer.clone()),
        };
        Ok(Sink::new(writer))
    }
}

/// An opened output destination.
///
/// Write errors are logged and otherwise ignored: a reporter that cannot
/// write must not change the outcome of the run.
pub struct Sink {
    writer: Box<dyn Write + Send>,
}

impl Sink {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Sink { writer }
    }

    /// Sink writing into `buffer`.
    pub fn buffer(buffer: &SharedBuffer) -> Self {
        Sink::new(Box::new(buffer.clone()))
    }

    /// Write one line.
    pub fn line(&mut self, args: fmt::Arguments<'_>) {
        if let Err(e) = self.writer.write_fmt(args).and_then(|()| self.writer.write_all(b"\n")) {
            tracing::warn!("reporter output failed: {e}");
        }
    }

    /// Write text without a line terminator.
    pub fn text(&mut self, text: &str) {
        if let Err(e) = self.writer.write_all(text.as_bytes()) {
            tracing::warn!("reporter output failed: {e}");
        }
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!("reporter flush failed: {e}");
        }
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink").finish_non_exhaustive()
    }
}

thread_local! {
    static CAPTURE: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Guard for one capture scope on the current thread.
///
/// Scopes nest. Dropping a guard discards its buffer and anything nested
/// inside it, restoring the enclosing scope. The guard is tied to the
/// thread that created it.
#[must_use = "output is only captured while the scope is alive"]
pub struct OutputScope {
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

impl OutputScope {
    /// Start capturing on this thread.
    pub fn acquire() -> Self {
        let depth = CAPTURE.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(String::new());
            stack.len() - 1
        });
        OutputScope {
            depth,
            _not_send: PhantomData,
        }
    }

    /// Stop capturing and return what this scope collected.
    pub fn release(self) -> String {
        let captured = CAPTURE.with(|stack| {
            let mut stack = stack.borrow_mut();
            let captured = stack.get_mut(self.depth).map(std::mem::take);
            stack.truncate(self.depth);
            captured
        });
        std::mem::forget(self);
        captured.unwrap_or_default()
    }
}

impl Drop for OutputScope {
    fn drop(&mut self) {
        let depth = self.depth;
        // `try_with`: the thread-local may already be gone during thread exit.
        let _ = CAPTURE.try_with(|stack| {
            if let Ok(mut stack) = stack.try_borrow_mut() {
                stack.truncate(depth);
            }
        });
    }
}

/// True if a capture scope is active on this thread.
pub fn is_capturing() -> bool {
    CAPTURE.with(|stack| !stack.borrow().is_empty())
}

/// Append text to the innermost scope. Returns `false` when none is
/// active.
fn capture_str(text: &str) -> bool {
    CAPTURE.with(|stack| match stack.borrow_mut().last_mut() {
        Some(buffer) => {
            buffer.push_str(text);
            true
        }
        None => false,
    })
}

/// Print a line into the active capture scope, or to stdout when none is
/// active.
pub fn print_line(args: fmt::Arguments<'_>) {
    let line = format!("{args}\n");
    if !capture_str(&line) {
        if let Err(e) = io::stdout().lock().write_all(line.as_bytes()) {
            tracing::warn!("uncaptured output failed: {e}");
        }
    }
}

/// `println!` into the active capture scope.
#[macro_export]
macro_rules! capture_print {
    ($($arg:tt)*) => {
        $crate::output::print_line(format_args!($($arg)*))
    };
}

/// `io::Write` adapter over the active capture scope.
#[derive(Debug, Default)]
pub struct ScopeWriter {
    _not_send: PhantomData<*const ()>,
}

impl ScopeWriter {
    pub fn new() -> Self {
        ScopeWriter::default()
    }
}

impl Write for ScopeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        if !capture_str(&text) {
            io::stdout().lock().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
