#[cfg(test)]
mod session_tests {
    use std::borrow::Cow;
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use rox::diagnostics::Diagnostics;
    use rox::environment::Environment;
    use rox::error::LoxError;
    use rox::interpreter::Interpreter;
    use rox::session::{decode_source, parse_source, run, Session};
    use rox::token::{Token, TokenType};
    use rox::value::Value;

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl SharedBuffer {
        /// Everything written so far; clears the buffer.
        fn take(&self) -> String {
            let bytes = std::mem::take(&mut *self.0.borrow_mut());
            String::from_utf8(bytes).expect("utf-8 output")
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name, 1)
    }

    #[test]
    fn test_session_01_declarations_persist_across_runs() {
        let out = SharedBuffer::default();
        let mut session = Session::with_output(out.clone());

        session.run("var a = 1;");
        session.run("fun inc() { a = a + 1; return a; }");
        session.run("class Box { get() { return a; } }");
        session.run("print inc(); print Box().get();");

        assert_eq!(out.take(), "2\n2\n");
        assert!(!session.had_error());
        assert!(!session.had_runtime_error());
    }

    #[test]
    fn test_session_02_errors_stop_the_line_not_the_session() {
        let out = SharedBuffer::default();
        let mut session = Session::with_output(out.clone());

        session.run("var a = 1;");
        session.run("{ var b = 2; print b; missing; print \"unreached\"; }");

        assert_eq!(out.take(), "2\n");
        assert!(session.had_runtime_error());
        assert!(!session.had_error());

        session.reset_errors();
        assert!(!session.had_runtime_error());
        assert!(session.diagnostics().reports().is_empty());

        // The block's scope did not leak into the globals.
        session.run("print b;");
        assert!(session.had_runtime_error());
        session.reset_errors();

        session.run("a = a + 1; print a;");
        assert_eq!(out.take(), "2\n");
        assert!(!session.had_runtime_error());
    }

    #[test]
    fn test_session_03_syntax_errors_are_flagged_separately() {
        let mut session = Session::with_output(SharedBuffer::default());

        session.run("print ;");
        assert!(session.had_error());
        assert!(!session.had_runtime_error());

        session.reset_errors();
        session.run("print 1;");
        assert!(!session.had_error());
    }

    #[test]
    fn test_session_04_multiple_errors_in_one_pass() {
        let mut diagnostics = Diagnostics::silent();
        parse_source("var 1;\n@\nprint (;\n\"open", &mut diagnostics);

        let lines: Vec<usize> = diagnostics
            .reports()
            .iter()
            .map(|e| match e {
                LoxError::Lex { line, .. } | LoxError::Parse { line, .. } => *line,
                other => panic!("unexpected error kind: {:?}", other),
            })
            .collect();

        // Scanner errors first (lines 2 and 4), then the parser's.
        assert_eq!(lines, vec![2, 4, 1, 3]);
        assert!(diagnostics.had_error());
    }

    #[test]
    fn test_session_05_run_threads_an_explicit_context() {
        let out = SharedBuffer::default();
        let mut interpreter = Interpreter::with_output(out.clone());
        let mut first = Diagnostics::silent();
        let mut second = Diagnostics::silent();

        run("var shared = \"kept\"; nope();", &mut interpreter, &mut first);
        run("print shared;", &mut interpreter, &mut second);

        assert!(first.had_runtime_error());
        assert!(!second.had_runtime_error());
        assert_eq!(out.take(), "kept\n");
    }

    #[test]
    fn test_environment_chain() {
        let globals = Environment::new().into_ref();
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::with_enclosing(globals.clone()).into_ref();
        inner.borrow_mut().define("b", Value::Bool(true));

        // Reads walk outward.
        assert!(matches!(inner.borrow().get(&ident("a")), Ok(Value::Number(n)) if n == 1.0));

        // Assignment updates the frame that owns the name.
        inner
            .borrow_mut()
            .assign(&ident("a"), Value::Number(2.0))
            .expect("assign a");
        assert!(matches!(globals.borrow().lookup("a"), Some(Value::Number(n)) if n == 2.0));

        // Inner names are invisible outside, and assignment never creates one.
        assert!(globals.borrow().get(&ident("b")).is_err());
        let err = globals
            .borrow_mut()
            .assign(&ident("c"), Value::Nil)
            .unwrap_err();
        assert_eq!(err.to_string(), "Undefined variable 'c'.\n[line 1]");
        assert!(globals.borrow().lookup("c").is_none());
    }

    #[test]
    fn test_interpreter_globals_hold_natives() {
        let interpreter = Interpreter::with_output(SharedBuffer::default());

        assert!(matches!(
            interpreter.globals().borrow().lookup("clock"),
            Some(Value::NativeFunction(_))
        ));
    }

    #[test]
    fn test_session_06_invalid_utf8_is_decoded_not_rejected() {
        assert!(matches!(decode_source(b"print 1;"), Cow::Borrowed("print 1;")));

        let out = SharedBuffer::default();
        let mut session = Session::with_output(out.clone());

        // A bad prompt line is reported by the scanner like any stray character.
        let line = decode_source(b"print \xFF 1;");
        assert_eq!(line, "print \u{FFFD} 1;");
        session.run(&line);

        assert!(session.had_error());
        assert_eq!(
            session.diagnostics().reports()[0].to_string(),
            "[line 1] Error: Unexpected character."
        );
        session.reset_errors();

        session.run(&decode_source(b"print \"caf\xC3\xA9\";"));
        assert!(!session.had_error());
        assert_eq!(out.take(), "caf\u{e9}\n");
    }
}
