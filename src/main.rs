use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use owo_colors::OwoColorize;

use liblisp::{Lisp, LispResult, Stream};

#[derive(Parser, Debug)]
#[command(name = "lisp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A small Lisp interpreter", long_about = None)]
struct Args {
    /// Source files evaluated, silently, before the REPL starts.
    #[arg(short, long, value_name = "FILE")]
    load: Vec<PathBuf>,

    /// Evaluate one expression string and exit.
    #[arg(short, long, value_name = "EXPR")]
    eval: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut l = match Lisp::init() {
        Ok(l) => l,
        Err(e) => {
            eprintln!("{}: {}", "error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    for path in &args.load {
        if let Err(e) = load_file(&mut l, path) {
            eprintln!("{}: {}: {}", "error".red(), path.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let status = if let Some(expr) = args.eval {
        l.set_input(Stream::string_in(expr));
        l.repl()
    } else if io::stdin().is_terminal() {
        run_interactive(&mut l)
    } else {
        l.repl()
    };

    match status {
        Ok(code) => {
            l.end();
            ExitCode::from(code as u8)
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red(), e);
            ExitCode::FAILURE
        }
    }
}

/// Evaluate a file without printing results.
fn load_file(l: &mut Lisp, path: &PathBuf) -> LispResult<()> {
    let old = l.set_input(Stream::open_in(path)?);
    let result = (|| -> LispResult<()> {
        while let Some(x) = l.read()? {
            l.eval(x)?;
        }
        Ok(())
    })();
    l.clean();
    l.set_input(old);
    result
}

/// Prompted REPL for a terminal session.
fn run_interactive(l: &mut Lisp) -> LispResult<i32> {
    println!("{}", "liblisp".bold());
    println!("{} cells live, ctrl-d to exit", l.heap.live_count());

    loop {
        print!("{} ", ">".green());
        let _ = io::stdout().flush();

        let x = match l.read()? {
            Some(x) => x,
            None => break,
        };
        let v = l.eval(x)?;
        l.print(v)?;
        l.clean();
    }
    println!();
    Ok(0)
}
