use crate::error::{LispError, LispResult};
use crate::heap::Heap;
use crate::stream::Stream;
use crate::value::{CellId, CellKind};

/// Nesting limit past which the printer gives up with an ellipsis.
const MAX_DEPTH: usize = 1000;

/// Write one expression to `out`. Never mutates cells.
pub fn print(x: CellId, heap: &Heap, out: &mut Stream) -> LispResult<()> {
    print_inner(x, heap, out, 0)
}

fn print_inner(x: CellId, heap: &Heap, out: &mut Stream, depth: usize) -> LispResult<()> {
    if depth > MAX_DEPTH {
        out.put_str("...")?;
        return Ok(());
    }

    match heap.kind(x) {
        CellKind::Nil => {
            out.put_str("()")?;
        }
        CellKind::Tee => {
            out.put_str("t")?;
        }
        CellKind::Int(n) => {
            out.print_int(*n)?;
        }
        CellKind::Sym(name) => {
            out.put_str(name)?;
        }
        CellKind::Str(bytes) => {
            print_string(bytes, out)?;
        }
        CellKind::List(elems) => {
            out.putc(b'(')?;
            for (i, &e) in elems.iter().enumerate() {
                if i != 0 {
                    out.putc(b' ')?;
                }
                print_inner(e, heap, out, depth + 1)?;
            }
            out.putc(b')')?;
        }
        CellKind::Proc { params, body, .. } => {
            out.put_str("(lambda ")?;
            print_inner(*params, heap, out, depth + 1)?;
            out.putc(b' ')?;
            print_inner(*body, heap, out, depth + 1)?;
            out.putc(b')')?;
        }
        CellKind::Prim(_) => {
            out.put_str("<PRIMOP>")?;
        }
        CellKind::Free => {
            return Err(LispError::Internal("print of freed cell".into()));
        }
    }
    Ok(())
}

/// Quoted string body, re-escaping what the reader unescapes.
fn print_string(bytes: &[u8], out: &mut Stream) -> LispResult<()> {
    out.putc(b'"')?;
    for &b in bytes {
        match b {
            b'"' => {
                out.put_str("\\\"")?;
            }
            b'\\' => {
                out.put_str("\\\\")?;
            }
            b'\n' => {
                out.put_str("\\n")?;
            }
            _ => {
                out.putc(b)?;
            }
        }
    }
    out.putc(b'"')?;
    Ok(())
}

/// Render an expression into a String. Test and tooling convenience.
pub fn print_to_string(x: CellId, heap: &Heap) -> String {
    let mut out = Stream::string_out(1 << 20);
    let _ = print(x, heap, &mut out);
    String::from_utf8_lossy(out.contents().unwrap_or(&[])).into_owned()
}
