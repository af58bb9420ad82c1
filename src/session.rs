//! The two entry points the outside world uses, "scan+parse a source string
//! into a program" and "execute a program", plus [`Session`], which pairs one
//! persistent [`Interpreter`] with one [`Diagnostics`] context for a file
//! run or a whole REPL session.

use std::borrow::Cow;
use std::io::Write;

use log::{info, warn};

use crate::ast::Stmt;
use crate::diagnostics::Diagnostics;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::scan;

/// Source text from raw script or prompt bytes.  Invalid UTF-8 never
/// rejects the input; each bad sequence becomes U+FFFD and is then reported
/// by the scanner like any other unexpected character.
pub fn decode_source(bytes: &[u8]) -> Cow<'_, str> {
    let text = String::from_utf8_lossy(bytes);

    if let Cow::Owned(_) = text {
        warn!("Source is not valid UTF-8; replaced invalid sequences");
    }

    text
}

/// Scan, parse and statically check `source`.  If `diagnostics` reports an
/// error afterwards the program must not be executed.
pub fn parse_source(source: &str, diagnostics: &mut Diagnostics) -> Vec<Stmt> {
    let tokens = scan(source, diagnostics);
    let statements = Parser::new(tokens, diagnostics).parse();

    if !diagnostics.had_error() {
        Resolver::new(diagnostics).resolve(&statements);
    }

    statements
}

/// Scan, parse and, when the front end found no error, execute `source`.
pub fn run(source: &str, interpreter: &mut Interpreter, diagnostics: &mut Diagnostics) {
    info!("Running {} bytes of source", source.len());

    let statements = parse_source(source, diagnostics);

    if diagnostics.had_error() {
        info!("Front end reported errors; skipping evaluation");
        return;
    }

    interpreter.interpret(&statements, diagnostics);
}

/// Interpreter state that outlives a single run.  Top‑level declarations
/// persist from one [`run`](Session::run) to the next; the error flags
/// persist until [`reset_errors`](Session::reset_errors).
#[derive(Default)]
pub struct Session {
    interpreter: Interpreter,
    diagnostics: Diagnostics,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session whose program output goes to `out` and whose diagnostics
    /// are recorded only.
    pub fn with_output<W: Write + 'static>(out: W) -> Self {
        Self {
            interpreter: Interpreter::with_output(out),
            diagnostics: Diagnostics::silent(),
        }
    }

    /// A session around an already configured interpreter, recording
    /// diagnostics only.
    pub fn with_interpreter(interpreter: Interpreter) -> Self {
        Self {
            interpreter,
            diagnostics: Diagnostics::silent(),
        }
    }

    pub fn run(&mut self, source: &str) {
        run(source, &mut self.interpreter, &mut self.diagnostics);
    }

    pub fn had_error(&self) -> bool {
        self.diagnostics.had_error()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.diagnostics.had_runtime_error()
    }

    pub fn reset_errors(&mut self) {
        self.diagnostics.reset();
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}
