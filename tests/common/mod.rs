#![allow(dead_code)]

use liblisp::printer::print_to_string;
use liblisp::{CellId, Lisp, Stream};

/// A fresh interpreter with capturable output and logging streams.
pub fn new_lisp() -> Lisp {
    let mut l = Lisp::init().unwrap();
    l.set_output(Stream::string_out(1 << 20));
    l.set_logging(Stream::string_out(1 << 20));
    l
}

/// Evaluate every expression in `src`, returning the value of the last.
pub fn eval_all(l: &mut Lisp, src: &str) -> CellId {
    l.set_input(Stream::string_in(src));
    let mut last = l.nil();
    while let Some(x) = l.read().unwrap() {
        last = l.eval(x).unwrap();
    }
    last
}

/// Evaluate `src` and render the final value.
pub fn printed(l: &mut Lisp, src: &str) -> String {
    let v = eval_all(l, src);
    print_to_string(v, &l.heap)
}

/// One-shot: evaluate `src` on a fresh interpreter and render the result.
pub fn result_of(src: &str) -> String {
    let mut l = new_lisp();
    printed(&mut l, src)
}

/// The `(error ...)` lines accumulated on the logging stream.
pub fn diagnostics(l: &Lisp) -> Vec<String> {
    let text = String::from_utf8_lossy(l.logging().contents().unwrap()).into_owned();
    text.lines()
        .filter(|line| line.starts_with("(error "))
        .map(str::to_string)
        .collect()
}

/// Everything written to the output stream so far.
pub fn output_text(l: &Lisp) -> String {
    String::from_utf8_lossy(l.output().contents().unwrap()).into_owned()
}

/// Feed `src` through the full read-eval-print-collect loop and return
/// (output, diagnostics) transcripts.
pub fn run_repl(src: &str) -> (String, String) {
    let mut l = new_lisp();
    l.set_input(Stream::string_in(src));
    let code = l.repl().unwrap();
    assert_eq!(code, 0);
    let out = output_text(&l);
    let log = String::from_utf8_lossy(l.logging().contents().unwrap()).into_owned();
    (out, log)
}
