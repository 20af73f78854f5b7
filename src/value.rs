use std::fmt;

use crate::error::LispResult;
use crate::eval::Lisp;

/// Index into the cell heap. This is the GC handle; all references between
/// runtime values go through it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(pub u32);

/// A host-implemented primitive. Receives the interpreter and a List cell of
/// already-evaluated arguments.
pub type PrimFn = fn(&mut Lisp, CellId) -> LispResult<CellId>;

/// Type tag of a live cell, as observed by `eqt` and the dispatchers.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tag {
    Nil,
    Tee,
    Int,
    Sym,
    Str,
    List,
    Proc,
    Prim,
}

/// A single cell on the heap: tagged payload plus the collector's mark bit.
pub struct Cell {
    pub kind: CellKind,
    pub mark: bool,
}

/// The payload of a cell. Strings and symbol names are owned by the cell;
/// a List owns the array of its children's handles. `Free` is a swept arena
/// slot waiting for reuse and must never be reachable from live data.
pub enum CellKind {
    Nil,
    Tee,
    Int(i32),
    Sym(String),
    Str(Vec<u8>),
    List(Vec<CellId>),
    Proc {
        params: CellId,
        body: CellId,
        env: CellId,
    },
    Prim(PrimFn),
    Free,
}

impl CellKind {
    /// The tag of a live payload; `None` for a freed slot.
    pub fn tag(&self) -> Option<Tag> {
        match self {
            CellKind::Nil => Some(Tag::Nil),
            CellKind::Tee => Some(Tag::Tee),
            CellKind::Int(_) => Some(Tag::Int),
            CellKind::Sym(_) => Some(Tag::Sym),
            CellKind::Str(_) => Some(Tag::Str),
            CellKind::List(_) => Some(Tag::List),
            CellKind::Proc { .. } => Some(Tag::Proc),
            CellKind::Prim(_) => Some(Tag::Prim),
            CellKind::Free => None,
        }
    }
}

impl fmt::Debug for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellId({})", self.0)
    }
}

impl fmt::Debug for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellKind::Nil => write!(f, "Nil"),
            CellKind::Tee => write!(f, "Tee"),
            CellKind::Int(n) => write!(f, "Int({})", n),
            CellKind::Sym(s) => write!(f, "Sym({})", s),
            CellKind::Str(b) => write!(f, "Str({} bytes)", b.len()),
            CellKind::List(v) => write!(f, "List(len {})", v.len()),
            CellKind::Proc { params, body, env } => {
                write!(f, "Proc({:?} {:?} {:?})", params, body, env)
            }
            CellKind::Prim(_) => write!(f, "Prim"),
            CellKind::Free => write!(f, "Free"),
        }
    }
}
