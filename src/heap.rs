use crate::error::{LispError, LispResult};
use crate::value::{Cell, CellId, CellKind, PrimFn, Tag};

/// Default bound on outstanding cells.
pub const DEFAULT_CAPACITY: usize = 1 << 20;

/// The cell heap. Every runtime value is allocated here, and the arena
/// itself is the registry the sweep phase walks: a cell is a member from
/// allocation until the sweep that frees it.
pub struct Heap {
    cells: Vec<Cell>,
    free_list: Vec<CellId>,
    capacity: usize,
}

impl Heap {
    pub fn new(capacity: usize) -> Self {
        Heap {
            cells: Vec::with_capacity(1024),
            free_list: Vec::new(),
            capacity,
        }
    }

    /// Allocate a cell, reusing a swept slot when one is available.
    /// Exceeding the capacity is fatal to the interpreter; the allocator is
    /// the only component that raises `HeapOverflow`.
    pub fn alloc(&mut self, kind: CellKind) -> LispResult<CellId> {
        if let Some(id) = self.free_list.pop() {
            self.cells[id.0 as usize] = Cell { kind, mark: false };
            return Ok(id);
        }

        if self.cells.len() >= self.capacity {
            return Err(LispError::HeapOverflow);
        }

        let id = CellId(self.cells.len() as u32);
        self.cells.push(Cell { kind, mark: false });
        Ok(id)
    }

    // === constructors ===

    pub fn new_int(&mut self, n: i32) -> LispResult<CellId> {
        self.alloc(CellKind::Int(n))
    }

    pub fn new_sym(&mut self, name: &str) -> LispResult<CellId> {
        self.alloc(CellKind::Sym(name.to_string()))
    }

    pub fn new_str(&mut self, bytes: Vec<u8>) -> LispResult<CellId> {
        self.alloc(CellKind::Str(bytes))
    }

    /// A fresh empty List. `append` is the only way to grow it afterwards.
    pub fn new_list(&mut self) -> LispResult<CellId> {
        self.alloc(CellKind::List(Vec::new()))
    }

    pub fn new_prim(&mut self, func: PrimFn) -> LispResult<CellId> {
        self.alloc(CellKind::Prim(func))
    }

    /// Build a procedure. The environment is snapshotted by copying its
    /// element handles into a fresh List; the cells themselves are shared
    /// with the creating scope.
    pub fn new_proc(&mut self, params: CellId, body: CellId, env: CellId) -> LispResult<CellId> {
        let snapshot = self.list_elems(env).to_vec();
        let captured = self.alloc(CellKind::List(snapshot))?;
        self.alloc(CellKind::Proc {
            params,
            body,
            env: captured,
        })
    }

    // === accessors ===

    pub fn kind(&self, id: CellId) -> &CellKind {
        &self.cells[id.0 as usize].kind
    }

    /// Tag of a live cell. Observing a freed slot is an interpreter bug and
    /// aborts.
    pub fn tag(&self, id: CellId) -> Tag {
        match self.cells[id.0 as usize].kind.tag() {
            Some(tag) => tag,
            None => panic!("tag of freed cell {:?}", id),
        }
    }

    /// First child of a List, if any.
    pub fn car(&self, id: CellId) -> Option<CellId> {
        self.nth(id, 0)
    }

    pub fn cadr(&self, id: CellId) -> Option<CellId> {
        self.nth(id, 1)
    }

    pub fn caddr(&self, id: CellId) -> Option<CellId> {
        self.nth(id, 2)
    }

    pub fn cadddr(&self, id: CellId) -> Option<CellId> {
        self.nth(id, 3)
    }

    pub fn nth(&self, id: CellId, i: usize) -> Option<CellId> {
        match &self.cells[id.0 as usize].kind {
            CellKind::List(elems) => elems.get(i).copied(),
            _ => None,
        }
    }

    /// Element count of a List, byte count of a String, 0 otherwise.
    pub fn len(&self, id: CellId) -> usize {
        match &self.cells[id.0 as usize].kind {
            CellKind::List(elems) => elems.len(),
            CellKind::Str(bytes) => bytes.len(),
            _ => 0,
        }
    }

    pub fn int(&self, id: CellId) -> Option<i32> {
        match self.cells[id.0 as usize].kind {
            CellKind::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn sym_name(&self, id: CellId) -> Option<&str> {
        match &self.cells[id.0 as usize].kind {
            CellKind::Sym(name) => Some(name),
            _ => None,
        }
    }

    pub fn str_bytes(&self, id: CellId) -> Option<&[u8]> {
        match &self.cells[id.0 as usize].kind {
            CellKind::Str(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Children of a List; empty slice for anything else.
    pub fn list_elems(&self, id: CellId) -> &[CellId] {
        match &self.cells[id.0 as usize].kind {
            CellKind::List(elems) => elems,
            _ => &[],
        }
    }

    /// Append one child to a List. The sole legal way to extend a List
    /// after construction.
    pub fn append(&mut self, list: CellId, child: CellId) -> LispResult<()> {
        match &mut self.cells[list.0 as usize].kind {
            CellKind::List(elems) => {
                elems.push(child);
                Ok(())
            }
            _ => Err(LispError::Internal("append to a non-list".into())),
        }
    }

    /// Replace the `i`th child of a List in place (used by `set`).
    pub fn set_elem(&mut self, list: CellId, i: usize, child: CellId) -> LispResult<()> {
        match &mut self.cells[list.0 as usize].kind {
            CellKind::List(elems) if i < elems.len() => {
                elems[i] = child;
                Ok(())
            }
            _ => Err(LispError::Internal("set_elem out of range".into())),
        }
    }

    /// Structural equality over Nil, Tee, Int, Sym, Str and Lists thereof.
    /// Procs and primitives compare by identity.
    pub fn structural_eq(&self, a: CellId, b: CellId) -> bool {
        if a == b {
            return true;
        }
        match (self.kind(a), self.kind(b)) {
            (CellKind::Nil, CellKind::Nil) => true,
            (CellKind::Tee, CellKind::Tee) => true,
            (CellKind::Int(x), CellKind::Int(y)) => x == y,
            (CellKind::Sym(x), CellKind::Sym(y)) => x == y,
            (CellKind::Str(x), CellKind::Str(y)) => x == y,
            (CellKind::List(x), CellKind::List(y)) => {
                x.len() == y.len()
                    && x.iter()
                        .zip(y.iter())
                        .all(|(&ea, &eb)| self.structural_eq(ea, eb))
            }
            _ => false,
        }
    }

    // === GC ===

    /// Clear all mark bits (phase 0 of mark-sweep).
    pub fn clear_marks(&mut self) {
        for cell in &mut self.cells {
            cell.mark = false;
        }
    }

    /// Mark everything reachable from `root`. Iterative worklist; the mark
    /// bit is the sole protection against cycles and shared structure.
    pub fn mark(&mut self, root: CellId) {
        let mut worklist = Vec::new();
        self.mark_one(root, &mut worklist);
        while let Some(id) = worklist.pop() {
            match &self.cells[id.0 as usize].kind {
                CellKind::List(elems) => {
                    let elems = elems.clone();
                    for e in elems {
                        self.mark_one(e, &mut worklist);
                    }
                }
                CellKind::Proc { params, body, env } => {
                    let (p, b, e) = (*params, *body, *env);
                    self.mark_one(p, &mut worklist);
                    self.mark_one(b, &mut worklist);
                    self.mark_one(e, &mut worklist);
                }
                _ => {}
            }
        }
    }

    fn mark_one(&mut self, id: CellId, worklist: &mut Vec<CellId>) {
        let cell = &mut self.cells[id.0 as usize];
        if !cell.mark {
            cell.mark = true;
            worklist.push(id);
        }
    }

    /// Free every unmarked cell, dropping its owned payload, and clear the
    /// mark bit on every survivor. Returns the number of cells freed.
    pub fn sweep(&mut self) -> usize {
        let mut freed = 0;
        for i in 0..self.cells.len() {
            let cell = &mut self.cells[i];
            if cell.mark {
                cell.mark = false;
            } else if !matches!(cell.kind, CellKind::Free) {
                cell.kind = CellKind::Free;
                self.free_list.push(CellId(i as u32));
                freed += 1;
            }
        }
        freed
    }

    /// Slots ever allocated, including freed ones.
    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    pub fn live_count(&self) -> usize {
        self.cells.len() - self.free_list.len()
    }
}
