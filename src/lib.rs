//! A small embeddable Lisp interpreter: S-expression reader, tree-walking
//! evaluator with lexical environments, a fixed primitive table and a
//! mark-and-sweep collector over a cell heap.
//!
//! The usual loop:
//!
//! ```no_run
//! use liblisp::Lisp;
//!
//! let mut l = Lisp::init().unwrap();
//! std::process::exit(l.repl().unwrap_or(1));
//! ```

pub mod env;
pub mod error;
pub mod eval;
pub mod heap;
pub mod primitives;
pub mod printer;
pub mod reader;
pub mod stream;
pub mod value;

pub use error::{LispError, LispResult};
pub use eval::Lisp;
pub use stream::Stream;
pub use value::{CellId, PrimFn, Tag};
