use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::env;
use crate::error::{perror, LispError, LispResult};
use crate::heap::{Heap, DEFAULT_CAPACITY};
use crate::primitives;
use crate::printer;
use crate::reader::Reader;
use crate::stream::Stream;
use crate::value::{CellId, CellKind, PrimFn, Tag};

/// The interpreter. All state lives here so the collector can find its
/// roots: the two environments, the two singletons and the interned
/// special-form markers.
///
/// Not re-entrant; one instance is one single-threaded interpreter, but
/// several instances can coexist.
pub struct Lisp {
    pub heap: Heap,
    input: Stream,
    output: Stream,
    logging: Stream,

    nil: CellId,
    tee: CellId,

    s_if: CellId,
    s_lambda: CellId,
    s_begin: CellId,
    s_define: CellId,
    s_set: CellId,
    s_quote: CellId,

    /// Global environment: primitives and top-level defines.
    global: CellId,
    /// Current lexical environment. Empty at top level.
    env: CellId,

    /// Checked between top-level expressions, never between substeps.
    interrupted: Arc<AtomicBool>,
}

enum Applicable {
    Prim(PrimFn),
    Proc {
        params: CellId,
        body: CellId,
        env: CellId,
    },
    Other,
}

impl Lisp {
    /// Construct a fresh interpreter on the standard streams, with the
    /// singletons, the special-form markers and the primitive table
    /// installed in the global environment.
    pub fn init() -> LispResult<Lisp> {
        let mut heap = Heap::new(DEFAULT_CAPACITY);

        let nil = heap.alloc(CellKind::Nil)?;
        let tee = heap.alloc(CellKind::Tee)?;
        let global = heap.new_list()?;
        let env = heap.new_list()?;

        let s_if = heap.new_sym("if")?;
        let s_lambda = heap.new_sym("lambda")?;
        let s_begin = heap.new_sym("begin")?;
        let s_define = heap.new_sym("define")?;
        let s_set = heap.new_sym("set")?;
        let s_quote = heap.new_sym("quote")?;

        let mut l = Lisp {
            heap,
            input: Stream::stdin(),
            output: Stream::stdout(),
            logging: Stream::stderr(),
            nil,
            tee,
            s_if,
            s_lambda,
            s_begin,
            s_define,
            s_set,
            s_quote,
            global,
            env,
            interrupted: Arc::new(AtomicBool::new(false)),
        };

        let n = l.heap.new_sym("nil")?;
        env::extend(&mut l.heap, n, nil, global)?;
        let t = l.heap.new_sym("t")?;
        env::extend(&mut l.heap, t, tee, global)?;

        // The markers are bound to themselves; evaluating the head of a
        // form yields the marker cell, compared below by identity.
        for marker in [s_if, s_lambda, s_begin, s_define, s_set, s_quote] {
            env::extend(&mut l.heap, marker, marker, global)?;
        }

        primitives::install(&mut l)?;
        Ok(l)
    }

    pub fn nil(&self) -> CellId {
        self.nil
    }

    pub fn t(&self) -> CellId {
        self.tee
    }

    /// The logging stream, for components that report recoverable errors.
    pub fn log_stream(&mut self) -> &mut Stream {
        &mut self.logging
    }

    pub fn output(&self) -> &Stream {
        &self.output
    }

    pub fn logging(&self) -> &Stream {
        &self.logging
    }

    pub fn set_input(&mut self, stream: Stream) -> Stream {
        mem::replace(&mut self.input, stream)
    }

    pub fn set_output(&mut self, stream: Stream) -> Stream {
        mem::replace(&mut self.output, stream)
    }

    pub fn set_logging(&mut self, stream: Stream) -> Stream {
        mem::replace(&mut self.logging, stream)
    }

    /// Flag a host may set to stop the REPL between top-level expressions.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// Add a host-implemented primitive under `name`.
    pub fn register_function(&mut self, name: &str, func: PrimFn) -> LispResult<()> {
        let sym = self.heap.new_sym(name)?;
        let prim = self.heap.new_prim(func)?;
        env::extend(&mut self.heap, sym, prim, self.global)?;
        Ok(())
    }

    /// Read one expression from the input stream.
    pub fn read(&mut self) -> LispResult<Option<CellId>> {
        let Lisp {
            heap,
            input,
            logging,
            ..
        } = self;
        Reader::new(input, heap, logging).read()
    }

    /// Evaluate in the current lexical environment.
    pub fn eval(&mut self, x: CellId) -> LispResult<CellId> {
        let env = self.env;
        self.eval_in(x, env)
    }

    /// Print one expression and a trailing newline to the output stream.
    pub fn print(&mut self, x: CellId) -> LispResult<()> {
        printer::print(x, &self.heap, &mut self.output)?;
        self.output.putc(b'\n')?;
        self.output.flush()
    }

    /// The evaluator proper. Recoverable user errors are reported on the
    /// logging stream and yield `nil`; `Err` is reserved for conditions
    /// that end the interpreter.
    pub fn eval_in(&mut self, x: CellId, env: CellId) -> LispResult<CellId> {
        match self.heap.tag(x) {
            Tag::Nil | Tag::Tee | Tag::Int | Tag::Str | Tag::Proc | Tag::Prim => Ok(x),
            Tag::Sym => match env::find(&self.heap, env, self.global, x) {
                Some(pair) => self.pair_val(pair),
                None => {
                    perror!(self.log_stream(), "unbound symbol");
                    Ok(self.nil)
                }
            },
            Tag::List => self.eval_list(x, env),
        }
    }

    fn eval_list(&mut self, x: CellId, env: CellId) -> LispResult<CellId> {
        let head = match self.heap.car(x) {
            Some(head) => head,
            None => return Ok(self.nil),
        };

        match self.heap.tag(head) {
            Tag::Sym => {
                let f = self.eval_in(head, env)?;
                if f == self.s_if {
                    self.form_if(x, env)
                } else if f == self.s_begin {
                    self.form_begin(x, env)
                } else if f == self.s_quote {
                    self.form_quote(x)
                } else if f == self.s_set {
                    self.form_set(x, env)
                } else if f == self.s_define {
                    self.form_define(x, env)
                } else if f == self.s_lambda {
                    self.form_lambda(x, env)
                } else {
                    let args = self.evlis(x, env)?;
                    self.apply(f, args)
                }
            }
            // A list in head position evaluates to whatever it applies to,
            // e.g. ((lambda (x) x) 1).
            Tag::List => {
                let f = self.eval_in(head, env)?;
                let args = self.evlis(x, env)?;
                self.apply(f, args)
            }
            _ => {
                perror!(self.log_stream(), "cannot apply");
                Ok(self.nil)
            }
        }
    }

    /// (if test conseq alt)
    fn form_if(&mut self, x: CellId, env: CellId) -> LispResult<CellId> {
        if self.heap.len(x) != 4 {
            perror!(self.log_stream(), "if: argc != 4");
            return Ok(self.nil);
        }
        let test = self.eval_in(self.cadr(x)?, env)?;
        if test == self.nil {
            self.eval_in(self.cadddr(x)?, env)
        } else {
            self.eval_in(self.caddr(x)?, env)
        }
    }

    /// (begin expr ...) — left to right, value of the last.
    fn form_begin(&mut self, x: CellId, env: CellId) -> LispResult<CellId> {
        let len = self.heap.len(x);
        if len == 1 {
            return Ok(self.nil);
        }
        for i in 1..len - 1 {
            self.eval_in(self.elem(x, i)?, env)?;
        }
        self.eval_in(self.elem(x, len - 1)?, env)
    }

    /// (quote expr) — the second element, unevaluated.
    fn form_quote(&mut self, x: CellId) -> LispResult<CellId> {
        if self.heap.len(x) != 2 {
            perror!(self.log_stream(), "quote: argc != 2");
            return Ok(self.nil);
        }
        self.cadr(x)
    }

    /// (set sym val) — replace the value of an existing binding.
    fn form_set(&mut self, x: CellId, env: CellId) -> LispResult<CellId> {
        if self.heap.len(x) != 3 {
            perror!(self.log_stream(), "set: argc != 3");
            return Ok(self.nil);
        }
        let sym = self.cadr(x)?;
        let pair = match env::find(&self.heap, env, self.global, sym) {
            Some(pair) => pair,
            None => {
                perror!(self.log_stream(), "unbound symbol");
                return Ok(self.nil);
            }
        };
        let val = self.eval_in(self.caddr(x)?, env)?;
        self.heap.set_elem(pair, 1, val)?;
        Ok(val)
    }

    /// (define sym val) — bind in the global environment, returning the
    /// new `[sym val]` pair.
    fn form_define(&mut self, x: CellId, env: CellId) -> LispResult<CellId> {
        if self.heap.len(x) != 3 {
            perror!(self.log_stream(), "define: argc != 3");
            return Ok(self.nil);
        }
        let sym = self.cadr(x)?;
        let val = self.eval_in(self.caddr(x)?, env)?;
        env::extend(&mut self.heap, sym, val, self.global)?;
        self.heap
            .list_elems(self.global)
            .last()
            .copied()
            .ok_or_else(|| LispError::Internal("empty global after extend".into()))
    }

    /// (lambda params body) — capture the current environment.
    fn form_lambda(&mut self, x: CellId, env: CellId) -> LispResult<CellId> {
        if self.heap.len(x) != 3 {
            perror!(self.log_stream(), "lambda: argc != 3");
            return Ok(self.nil);
        }
        let params = self.cadr(x)?;
        let ok = self.heap.tag(params) == Tag::List
            && self
                .heap
                .list_elems(params)
                .iter()
                .all(|&p| self.heap.tag(p) == Tag::Sym);
        if !ok {
            perror!(self.log_stream(), "lambda: params != symbol list");
            return Ok(self.nil);
        }
        let body = self.caddr(x)?;
        self.heap.new_proc(params, body, env)
    }

    /// Evaluate the non-head elements of `x` left to right into a fresh
    /// List.
    fn evlis(&mut self, x: CellId, env: CellId) -> LispResult<CellId> {
        let args = self.heap.new_list()?;
        for i in 1..self.heap.len(x) {
            let v = self.eval_in(self.elem(x, i)?, env)?;
            self.heap.append(args, v)?;
        }
        Ok(args)
    }

    /// Apply a primitive or a procedure to already-evaluated arguments.
    pub fn apply(&mut self, f: CellId, args: CellId) -> LispResult<CellId> {
        let applicable = match self.heap.kind(f) {
            CellKind::Prim(func) => Applicable::Prim(*func),
            CellKind::Proc { params, body, env } => Applicable::Proc {
                params: *params,
                body: *body,
                env: *env,
            },
            _ => Applicable::Other,
        };

        match applicable {
            Applicable::Prim(func) => func(self, args),
            Applicable::Proc { params, body, env } => {
                if self.heap.len(args) != self.heap.len(params) {
                    perror!(self.log_stream(), "wrong number of arguments");
                    return Ok(self.nil);
                }
                // Fresh frame: snapshot of the captured environment plus
                // the zipped parameter bindings. The capture itself is
                // never mutated, so repeated calls start clean.
                let nenv = self.heap.new_list()?;
                for pair in self.heap.list_elems(env).to_vec() {
                    self.heap.append(nenv, pair)?;
                }
                env::extensions(&mut self.heap, nenv, params, args)?;
                self.eval_in(body, nenv)
            }
            Applicable::Other => {
                perror!(self.log_stream(), "apply failed");
                Ok(self.nil)
            }
        }
    }

    /// Collect garbage: mark everything reachable from the roots, then
    /// sweep the heap. Returns the number of cells freed.
    pub fn clean(&mut self) -> usize {
        self.heap.clear_marks();
        for root in [
            self.global,
            self.env,
            self.nil,
            self.tee,
            self.s_if,
            self.s_lambda,
            self.s_begin,
            self.s_define,
            self.s_set,
            self.s_quote,
        ] {
            self.heap.mark(root);
        }
        self.heap.sweep()
    }

    /// Read-evaluate-print-collect until end of input. Returns 0 on a
    /// clean end of stream.
    pub fn repl(&mut self) -> LispResult<i32> {
        loop {
            if self.interrupted.load(Ordering::Relaxed) {
                break;
            }
            let x = match self.read()? {
                Some(x) => x,
                None => break,
            };
            let v = self.eval(x)?;
            self.print(v)?;
            self.clean();
        }
        self.output.flush()?;
        Ok(0)
    }

    /// Tear the interpreter down: flush the streams and free every cell.
    /// Standard streams are flushed but stay open for the host.
    pub fn end(mut self) {
        let _ = self.output.flush();
        let _ = self.logging.flush();
        // Sweep without marking: everything goes, singletons included.
        self.heap.clear_marks();
        self.heap.sweep();
    }

    fn elem(&self, list: CellId, i: usize) -> LispResult<CellId> {
        self.heap
            .nth(list, i)
            .ok_or_else(|| LispError::Internal("list element out of range".into()))
    }

    fn cadr(&self, x: CellId) -> LispResult<CellId> {
        self.heap
            .cadr(x)
            .ok_or_else(|| LispError::Internal("cadr out of range".into()))
    }

    fn caddr(&self, x: CellId) -> LispResult<CellId> {
        self.heap
            .caddr(x)
            .ok_or_else(|| LispError::Internal("caddr out of range".into()))
    }

    fn cadddr(&self, x: CellId) -> LispResult<CellId> {
        self.heap
            .cadddr(x)
            .ok_or_else(|| LispError::Internal("cadddr out of range".into()))
    }

    fn pair_val(&self, pair: CellId) -> LispResult<CellId> {
        self.heap
            .cadr(pair)
            .ok_or_else(|| LispError::Internal("malformed binding pair".into()))
    }
}
