use std::fmt;

use crate::stream::Stream;

/// Errors that can occur in the interpreter at the Rust level.
///
/// User-level mistakes (bad arity, unbound symbols, type mismatches) are
/// never represented here; they are reported through the logging stream and
/// evaluation continues with `nil`. This enum is for conditions the
/// interpreter cannot recover from within the current expression.
#[derive(Debug, Clone)]
pub enum LispError {
    /// Cell capacity exceeded. Raised only by the allocator.
    HeapOverflow,

    /// I/O error from stream operations.
    IoError(String),

    /// The host's interrupt flag was observed set.
    Interrupted,

    /// Internal interpreter error (should not happen in correct code).
    Internal(String),
}

impl fmt::Display for LispError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LispError::HeapOverflow => write!(f, "out of memory: cell capacity exceeded"),
            LispError::IoError(msg) => write!(f, "I/O error: {}", msg),
            LispError::Interrupted => write!(f, "interrupted"),
            LispError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for LispError {}

pub type LispResult<T> = Result<T, LispError>;

/// Write one diagnostic line to the logging stream:
/// `(error "<message>" "<file>" <line>)`.
///
/// Diagnostics are best-effort; a failing logging stream must not take the
/// evaluator down with it.
pub fn diagnose(log: &mut Stream, msg: &str, file: &str, line: u32) {
    let _ = write_diag(log, msg, file, line);
}

fn write_diag(log: &mut Stream, msg: &str, file: &str, line: u32) -> LispResult<()> {
    log.put_str("(error \"")?;
    log.put_str(msg)?;
    log.put_str("\" \"")?;
    log.put_str(file)?;
    log.put_str("\" ")?;
    log.print_int(line as i32)?;
    log.put_str(")\n")?;
    log.flush()
}

/// Report a recoverable error on a logging stream, capturing the Rust source
/// location of the diagnosing site.
macro_rules! perror {
    ($log:expr, $msg:expr) => {
        $crate::error::diagnose($log, $msg, file!(), line!())
    };
}

pub(crate) use perror;
