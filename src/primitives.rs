use std::process::Command;

use rand::Rng;

use crate::error::{perror, LispResult};
use crate::eval::Lisp;
use crate::value::{CellId, PrimFn, Tag};

/// Integer payload of an argument, or report and bail out with nil.
macro_rules! intchk {
    ($l:expr, $x:expr) => {
        match $l.heap.int($x) {
            Some(n) => n,
            None => {
                perror!($l.log_stream(), "arg != integer");
                return Ok($l.nil());
            }
        }
    };
}

/// Exactly `$n` arguments, or report and bail out with nil.
macro_rules! aritychk {
    ($l:expr, $args:expr, $n:expr, $msg:expr) => {
        if $l.heap.len($args) != $n {
            perror!($l.log_stream(), $msg);
            return Ok($l.nil());
        }
    };
}

/// Install every built-in under its symbol in the global environment.
pub fn install(l: &mut Lisp) -> LispResult<()> {
    const TABLE: &[(&str, PrimFn)] = &[
        ("+", primop_add),
        ("-", primop_sub),
        ("*", primop_prod),
        ("/", primop_div),
        ("mod", primop_mod),
        ("car", primop_car),
        ("cdr", primop_cdr),
        ("cons", primop_cons),
        ("nth", primop_nth),
        ("length", primop_len),
        ("reverse", primop_reverse),
        ("scar", primop_scar),
        ("scdr", primop_scdr),
        ("scons", primop_scons),
        ("=", primop_numeq),
        ("<", primop_numless),
        (">", primop_nummore),
        ("eqt", primop_typeeq),
        ("print", primop_printexpr),
        ("random", primop_random),
        ("system", primop_system),
    ];

    for &(name, func) in TABLE {
        l.register_function(name, func)?;
    }
    Ok(())
}

/// The `i`th pre-evaluated argument. Arity has been checked by the caller,
/// so the index is always in range.
fn arg(l: &Lisp, args: CellId, i: usize) -> CellId {
    l.heap.nth(args, i).unwrap_or(args)
}

/// (+ n ...) — sum.
fn primop_add(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    if l.heap.len(args) == 0 {
        return Ok(l.nil());
    }
    let mut acc: i32 = 0;
    for i in 0..l.heap.len(args) {
        let a = arg(l, args, i);
        acc = acc.wrapping_add(intchk!(l, a));
    }
    l.heap.new_int(acc)
}

/// (- n m ...) — subtract the tail from the first argument.
fn primop_sub(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    if l.heap.len(args) == 0 {
        return Ok(l.nil());
    }
    let first = arg(l, args, 0);
    let mut acc = intchk!(l, first);
    for i in 1..l.heap.len(args) {
        let a = arg(l, args, i);
        acc = acc.wrapping_sub(intchk!(l, a));
    }
    l.heap.new_int(acc)
}

/// (* n ...) — product of the arguments.
fn primop_prod(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    if l.heap.len(args) == 0 {
        return Ok(l.nil());
    }
    let first = arg(l, args, 0);
    let mut acc = intchk!(l, first);
    for i in 1..l.heap.len(args) {
        let a = arg(l, args, i);
        acc = acc.wrapping_mul(intchk!(l, a));
    }
    l.heap.new_int(acc)
}

/// (/ n m ...) — divide the first argument by the rest.
fn primop_div(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    if l.heap.len(args) == 0 {
        return Ok(l.nil());
    }
    let first = arg(l, args, 0);
    let mut acc = intchk!(l, first);
    for i in 1..l.heap.len(args) {
        let a = arg(l, args, i);
        let d = intchk!(l, a);
        if d == 0 {
            perror!(l.log_stream(), "div 0");
            return Ok(l.nil());
        }
        acc = acc.wrapping_div(d);
    }
    l.heap.new_int(acc)
}

/// (mod a b)
fn primop_mod(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    aritychk!(l, args, 2, "mod: argc != 2");
    let a = arg(l, args, 0);
    let b = arg(l, args, 1);
    let a = intchk!(l, a);
    let b = intchk!(l, b);
    if b == 0 {
        perror!(l.log_stream(), "mod 0");
        return Ok(l.nil());
    }
    l.heap.new_int(a.wrapping_rem(b))
}

/// (car l) — first element of a list, nil for the empty list.
fn primop_car(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    aritychk!(l, args, 1, "car: argc != 1");
    let a = arg(l, args, 0);
    if l.heap.tag(a) != Tag::List {
        perror!(l.log_stream(), "arg != list");
        return Ok(l.nil());
    }
    Ok(l.heap.car(a).unwrap_or(l.nil()))
}

/// (cdr l) — fresh list of everything but the first element; nil when
/// there is at most one element.
fn primop_cdr(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    aritychk!(l, args, 1, "cdr: argc != 1");
    let a = arg(l, args, 0);
    if l.heap.tag(a) != Tag::List {
        perror!(l.log_stream(), "arg != list");
        return Ok(l.nil());
    }
    if l.heap.len(a) <= 1 {
        return Ok(l.nil());
    }
    let rest = l.heap.list_elems(a)[1..].to_vec();
    let nx = l.heap.new_list()?;
    for e in rest {
        l.heap.append(nx, e)?;
    }
    Ok(nx)
}

/// (cons a b) — prepend onto a copy of a list; pair up anything else.
fn primop_cons(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    aritychk!(l, args, 2, "cons: argc != 2");
    let prepend = arg(l, args, 0);
    let tail = arg(l, args, 1);

    let nx = l.heap.new_list()?;
    match l.heap.tag(tail) {
        Tag::Nil => {
            l.heap.append(nx, prepend)?;
        }
        Tag::List => {
            l.heap.append(nx, prepend)?;
            for e in l.heap.list_elems(tail).to_vec() {
                l.heap.append(nx, e)?;
            }
        }
        _ => {
            l.heap.append(nx, prepend)?;
            l.heap.append(nx, tail)?;
        }
    }
    Ok(nx)
}

/// (nth i x) — indexed element of a list or string; negative indices
/// count from the tail.
fn primop_nth(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    aritychk!(l, args, 2, "nth: argc != 2");
    let a1 = arg(l, args, 0);
    let a2 = arg(l, args, 1);
    let i = match l.heap.int(a1) {
        Some(i) => i as i64,
        None => {
            perror!(l.log_stream(), "nth: arg 1 != integer");
            return Ok(l.nil());
        }
    };
    let tag = l.heap.tag(a2);
    if tag != Tag::List && tag != Tag::Str {
        perror!(l.log_stream(), "nth: arg 2 != list || string");
        return Ok(l.nil());
    }

    let len = l.heap.len(a2) as i64;
    let i = if i < 0 { len + i } else { i };
    if i < 0 || i >= len {
        return Ok(l.nil());
    }

    if tag == Tag::List {
        Ok(l.heap.nth(a2, i as usize).unwrap_or(l.nil()))
    } else {
        let b = l.heap.str_bytes(a2).map(|s| s[i as usize]);
        match b {
            Some(b) => l.heap.new_str(vec![b]),
            None => Ok(l.nil()),
        }
    }
}

/// (length x) — element count of a list, byte count of a string.
fn primop_len(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    aritychk!(l, args, 1, "length: argc != 1");
    let a = arg(l, args, 0);
    let tag = l.heap.tag(a);
    if tag != Tag::List && tag != Tag::Str {
        perror!(l.log_stream(), "length: arg != list || string");
        return Ok(l.nil());
    }
    let n = l.heap.len(a);
    l.heap.new_int(n as i32)
}

/// (reverse x) — reversed copy of a list or string.
fn primop_reverse(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    aritychk!(l, args, 1, "reverse: argc != 1");
    let a = arg(l, args, 0);
    match l.heap.tag(a) {
        Tag::List => {
            let mut elems = l.heap.list_elems(a).to_vec();
            elems.reverse();
            let nx = l.heap.new_list()?;
            for e in elems {
                l.heap.append(nx, e)?;
            }
            Ok(nx)
        }
        Tag::Str => {
            let mut bytes = l.heap.str_bytes(a).unwrap_or(&[]).to_vec();
            bytes.reverse();
            l.heap.new_str(bytes)
        }
        _ => {
            perror!(l.log_stream(), "reverse: not a reversible type");
            Ok(l.nil())
        }
    }
}

/// (scar s) — first byte of a string as a one-byte string.
fn primop_scar(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    aritychk!(l, args, 1, "scar: argc != 1");
    let a = arg(l, args, 0);
    let bytes = match l.heap.str_bytes(a) {
        Some(bytes) => bytes,
        None => {
            perror!(l.log_stream(), "arg != string");
            return Ok(l.nil());
        }
    };
    match bytes.first().copied() {
        Some(b) => l.heap.new_str(vec![b]),
        None => Ok(l.nil()),
    }
}

/// (scdr s) — everything but the first byte; nil when at most one byte.
fn primop_scdr(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    aritychk!(l, args, 1, "scdr: argc != 1");
    let a = arg(l, args, 0);
    let bytes = match l.heap.str_bytes(a) {
        Some(bytes) => bytes,
        None => {
            perror!(l.log_stream(), "arg != string");
            return Ok(l.nil());
        }
    };
    if bytes.len() <= 1 {
        return Ok(l.nil());
    }
    let rest = bytes[1..].to_vec();
    l.heap.new_str(rest)
}

/// (scons a b) — concatenation of two strings. Both arguments must be
/// strings.
fn primop_scons(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    aritychk!(l, args, 2, "scons: argc != 2");
    let a = arg(l, args, 0);
    let b = arg(l, args, 1);
    match (l.heap.str_bytes(a), l.heap.str_bytes(b)) {
        (Some(prepend), Some(tail)) => {
            let mut bytes = Vec::with_capacity(prepend.len() + tail.len());
            bytes.extend_from_slice(prepend);
            bytes.extend_from_slice(tail);
            l.heap.new_str(bytes)
        }
        _ => {
            perror!(l.log_stream(), "scons: arg != string");
            Ok(l.nil())
        }
    }
}

/// (= n m ...) — numeric equality over every argument.
fn primop_numeq(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    if l.heap.len(args) == 0 {
        return Ok(l.nil());
    }
    let first = arg(l, args, 0);
    let v = intchk!(l, first);
    for i in 1..l.heap.len(args) {
        let a = arg(l, args, i);
        if intchk!(l, a) != v {
            return Ok(l.nil());
        }
    }
    Ok(l.t())
}

/// (< a b)
fn primop_numless(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    aritychk!(l, args, 2, "<: argc != 2");
    let a = arg(l, args, 0);
    let b = arg(l, args, 1);
    let a = intchk!(l, a);
    let b = intchk!(l, b);
    Ok(if a < b { l.t() } else { l.nil() })
}

/// (> a b)
fn primop_nummore(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    aritychk!(l, args, 2, ">: argc != 2");
    let a = arg(l, args, 0);
    let b = arg(l, args, 1);
    let a = intchk!(l, a);
    let b = intchk!(l, b);
    Ok(if a > b { l.t() } else { l.nil() })
}

/// (eqt x ...) — t when every argument shares one type tag.
fn primop_typeeq(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    if l.heap.len(args) == 0 {
        return Ok(l.nil());
    }
    let first = arg(l, args, 0);
    let tag = l.heap.tag(first);
    for i in 1..l.heap.len(args) {
        let a = arg(l, args, i);
        if l.heap.tag(a) != tag {
            return Ok(l.nil());
        }
    }
    Ok(l.t())
}

/// (print x ...) — write the argument list on the output stream.
fn primop_printexpr(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    l.print(args)?;
    Ok(args)
}

/// (random) — a pseudo-random integer.
fn primop_random(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    aritychk!(l, args, 0, "random: argc != 0");
    let n = rand::thread_rng().gen::<i32>();
    l.heap.new_int(n)
}

/// (system cmd) — run a shell command, yielding its exit status; nil when
/// the command did not terminate normally.
fn primop_system(l: &mut Lisp, args: CellId) -> LispResult<CellId> {
    aritychk!(l, args, 1, "system: argc != 1");
    let a = arg(l, args, 0);
    let cmd = match l.heap.str_bytes(a) {
        Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        None => {
            perror!(l.log_stream(), "system: arg != string");
            return Ok(l.nil());
        }
    };
    match Command::new("sh").arg("-c").arg(&cmd).status() {
        Ok(status) => match status.code() {
            Some(code) if code >= 0 => l.heap.new_int(code),
            _ => Ok(l.nil()),
        },
        Err(_) => {
            perror!(l.log_stream(), "system: command failed to run");
            Ok(l.nil())
        }
    }
}
