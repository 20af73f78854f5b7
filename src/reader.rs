use crate::error::{perror, LispResult};
use crate::heap::Heap;
use crate::stream::Stream;
use crate::value::CellId;

/// Upper bound on one token or string literal, in bytes.
pub const TOKEN_MAX: usize = 4096;

/// S-expression parser over a byte stream. Cells go through the normal
/// allocator so everything the reader produces participates in collection.
pub struct Reader<'a> {
    input: &'a mut Stream,
    heap: &'a mut Heap,
    log: &'a mut Stream,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a mut Stream, heap: &'a mut Heap, log: &'a mut Stream) -> Self {
        Reader { input, heap, log }
    }

    /// Read one expression. `Ok(None)` at end of stream or after a
    /// diagnosed parse failure; an unmatched `)` is reported and skipped.
    pub fn read(&mut self) -> LispResult<Option<CellId>> {
        loop {
            let c = match self.input.getc() {
                Some(c) => c,
                None => return Ok(None),
            };
            if c.is_ascii_whitespace() {
                continue;
            }
            match c {
                b';' => self.skip_comment(),
                b')' => perror!(self.log, "unmatched ')'"),
                b'(' => return self.read_list(),
                b'"' => return self.read_string(),
                _ => {
                    self.input.ungetc(c)?;
                    return self.read_atom();
                }
            }
        }
    }

    /// Consume the rest of a `;` line comment.
    fn skip_comment(&mut self) {
        while let Some(c) = self.input.getc() {
            if c == b'\n' {
                break;
            }
        }
    }

    fn read_list(&mut self) -> LispResult<Option<CellId>> {
        let list = self.heap.new_list()?;
        loop {
            let c = match self.input.getc() {
                Some(c) => c,
                None => {
                    perror!(self.log, "EOF inside list");
                    return Ok(None);
                }
            };
            if c.is_ascii_whitespace() {
                continue;
            }
            let child = match c {
                b';' => {
                    self.skip_comment();
                    continue;
                }
                b')' => return Ok(Some(list)),
                b'(' => self.read_list()?,
                b'"' => self.read_string()?,
                _ => {
                    self.input.ungetc(c)?;
                    self.read_atom()?
                }
            };
            match child {
                Some(child) => self.heap.append(list, child)?,
                None => return Ok(None),
            }
        }
    }

    /// Bytes between double quotes. `\` escapes n, t, `\`, `"`, `(`, `)`;
    /// `\ooo` is a three-digit octal escape.
    fn read_string(&mut self) -> LispResult<Option<CellId>> {
        let mut buf = Vec::new();
        loop {
            let c = match self.input.getc() {
                Some(c) => c,
                None => {
                    perror!(self.log, "EOF inside string");
                    return Ok(None);
                }
            };
            if buf.len() >= TOKEN_MAX {
                perror!(self.log, "string too long");
                return Ok(None);
            }
            match c {
                b'"' => return Ok(Some(self.heap.new_str(buf)?)),
                b'\\' => match self.read_escape()? {
                    Some(b) => buf.push(b),
                    None => return Ok(None),
                },
                _ => buf.push(c),
            }
        }
    }

    fn read_escape(&mut self) -> LispResult<Option<u8>> {
        let c = match self.input.getc() {
            Some(c) => c,
            None => {
                perror!(self.log, "EOF inside escape");
                return Ok(None);
            }
        };
        let b = match c {
            b'n' => b'\n',
            b't' => b'\t',
            b'\\' | b'"' | b'(' | b')' => c,
            b'0'..=b'7' => {
                let mut v = (c - b'0') as u32;
                for _ in 0..2 {
                    match self.input.getc() {
                        Some(d @ b'0'..=b'7') => v = v * 8 + (d - b'0') as u32,
                        _ => {
                            perror!(self.log, "bad octal escape");
                            return Ok(None);
                        }
                    }
                }
                if v > 0xFF {
                    perror!(self.log, "octal escape out of range");
                    return Ok(None);
                }
                v as u8
            }
            _ => {
                perror!(self.log, "invalid escape char");
                return Ok(None);
            }
        };
        Ok(Some(b))
    }

    /// A symbol or an integer: bytes up to whitespace or a delimiter. The
    /// delimiter is pushed back so the caller sees it again.
    fn read_atom(&mut self) -> LispResult<Option<CellId>> {
        let mut buf = Vec::new();
        while let Some(c) = self.input.getc() {
            if c.is_ascii_whitespace() {
                break;
            }
            if c == b'(' || c == b')' || c == b'"' || c == b';' {
                self.input.ungetc(c)?;
                break;
            }
            if buf.len() >= TOKEN_MAX {
                perror!(self.log, "token too long");
                return Ok(None);
            }
            buf.push(c);
        }

        if buf.is_empty() {
            perror!(self.log, "empty token");
            return Ok(None);
        }

        if is_number(&buf) {
            return Ok(Some(self.heap.new_int(parse_int(&buf))?));
        }
        let name = String::from_utf8_lossy(&buf);
        Ok(Some(self.heap.new_sym(&name)?))
    }
}

/// Integer grammar: `[+-]?(0|0[xX][0-9a-fA-F]+|[1-9][0-9]*|0[0-7]+)`.
fn is_number(buf: &[u8]) -> bool {
    let body = match buf[0] {
        b'+' | b'-' => &buf[1..],
        _ => buf,
    };
    if body.is_empty() {
        return false;
    }
    if body[0] == b'0' {
        if body.len() == 1 {
            return true;
        }
        if body[1] == b'x' || body[1] == b'X' {
            return body.len() > 2 && body[2..].iter().all(u8::is_ascii_hexdigit);
        }
        return body[1..].iter().all(|c| (b'0'..=b'7').contains(c));
    }
    body.iter().all(u8::is_ascii_digit)
}

/// Numeric value of a token accepted by `is_number`, with strtol-style base
/// detection. Out-of-range values wrap to 32 bits.
fn parse_int(buf: &[u8]) -> i32 {
    let (neg, body) = match buf[0] {
        b'-' => (true, &buf[1..]),
        b'+' => (false, &buf[1..]),
        _ => (false, buf),
    };
    let (radix, digits) = if body.len() > 2 && (body[1] == b'x' || body[1] == b'X') {
        (16i64, &body[2..])
    } else if body.len() > 1 && body[0] == b'0' {
        (8, body)
    } else {
        (10, body)
    };
    let mut v: i64 = 0;
    for &d in digits {
        let d = match d {
            b'0'..=b'9' => (d - b'0') as i64,
            b'a'..=b'f' => (d - b'a' + 10) as i64,
            b'A'..=b'F' => (d - b'A' + 10) as i64,
            _ => 0,
        };
        v = v.wrapping_mul(radix).wrapping_add(d);
    }
    if neg {
        v = v.wrapping_neg();
    }
    v as i32
}

/// Read a single expression from a string.
pub fn read_str(src: &str, heap: &mut Heap, log: &mut Stream) -> LispResult<Option<CellId>> {
    let mut input = Stream::string_in(src);
    Reader::new(&mut input, heap, log).read()
}
