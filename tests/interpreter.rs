#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use rox::interpreter::Interpreter;
    use rox::session::Session;

    /// In-memory `print` target shared between the test and the interpreter.
    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Run {
        output: String,
        errors: Vec<String>,
        had_error: bool,
        had_runtime_error: bool,
    }

    fn run(source: &str) -> Run {
        let buffer = SharedBuffer::default();
        let mut session = Session::with_output(buffer.clone());
        session.run(source);

        let output = String::from_utf8(buffer.0.borrow().clone()).expect("utf-8 output");

        Run {
            output,
            errors: session
                .diagnostics()
                .reports()
                .iter()
                .map(|e| e.to_string())
                .collect(),
            had_error: session.had_error(),
            had_runtime_error: session.had_runtime_error(),
        }
    }

    /// Evaluation recurses on the native stack; deep programs get room to
    /// reach the interpreter's own call-depth limit.
    fn on_large_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
        std::thread::Builder::new()
            .stack_size(256 * 1024 * 1024)
            .spawn(f)
            .expect("spawn evaluator thread")
            .join()
            .expect("evaluator thread panicked")
    }

    const COUNTDOWN: &str = "fun f(n) { if (n == 0) return 0; return f(n - 1) + 1; }";

    fn output_of(source: &str) -> String {
        let result = run(source);
        assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
        result.output
    }

    fn runtime_error_of(source: &str) -> (String, String) {
        let result = run(source);
        assert!(result.had_runtime_error, "expected a runtime error");
        assert!(!result.had_error);
        assert_eq!(result.errors.len(), 1);
        (result.output, result.errors[0].clone())
    }

    // ───────────────────────────── expressions ─────────────────────────────

    #[test]
    fn test_interpreter_01_precedence() {
        assert_eq!(output_of("print 1 + 2 * 3;"), "7\n");
        assert_eq!(output_of("print (1 + 2) * 3;"), "9\n");
        assert_eq!(output_of("print 10 - 4 - 3;"), "3\n");
    }

    #[test]
    fn test_interpreter_02_number_and_string_display() {
        assert_eq!(output_of("print 2.5; print 3.0; print -1;"), "2.5\n3\n-1\n");
        assert_eq!(output_of("print \"con\" + \"cat\";"), "concat\n");
        assert_eq!(output_of("print nil; print true; print !true;"), "nil\ntrue\nfalse\n");
    }

    #[test]
    fn test_interpreter_03_division_by_zero_follows_ieee() {
        assert_eq!(
            output_of("print 1 / 0; print -1 / 0; print 0 / 0;"),
            "Infinity\n-Infinity\nNaN\n"
        );
    }

    #[test]
    fn test_interpreter_04_equality() {
        assert_eq!(output_of("print \"a\" == \"a\";"), "true\n");
        assert_eq!(output_of("print 1 == \"1\";"), "false\n");
        assert_eq!(
            output_of("print nil == nil; print nil == false; print 2 != 2; print true == true;"),
            "true\nfalse\nfalse\ntrue\n"
        );
        assert_eq!(
            output_of("fun f() {} var g = f; print f == g; print clock == clock;"),
            "true\ntrue\n"
        );
    }

    #[test]
    fn test_interpreter_05_truthiness() {
        assert_eq!(
            output_of(
                "if (0) print \"zero\"; if (\"\") print \"empty\"; \
                 if (nil) print \"nil\"; else print \"no nil\"; \
                 if (false) print \"false\"; else print \"no false\";"
            ),
            "zero\nempty\nno nil\nno false\n"
        );
    }

    #[test]
    fn test_interpreter_06_logical_operators_return_operands() {
        assert_eq!(
            output_of("print nil or \"x\"; print 1 and 2; print 0 or 3; print nil and 1;"),
            "x\n2\n0\nnil\n"
        );
        // The right operand is never evaluated when short-circuiting.
        assert_eq!(
            output_of("print false and missing(); print \"a\" or missing;"),
            "false\na\n"
        );
    }

    #[test]
    fn test_interpreter_07_type_errors() {
        let (_, error) = runtime_error_of("print \"a\" + 1;");
        assert_eq!(error, "Operands must be two numbers or two strings.\n[line 1]");

        let (_, error) = runtime_error_of("print -\"x\";");
        assert_eq!(error, "Operand must be a number.\n[line 1]");

        let (_, error) = runtime_error_of("\n\nprint \"a\" < 1;");
        assert_eq!(error, "Operands must be numbers.\n[line 3]");

        let (_, error) = runtime_error_of("print nil * 2;");
        assert_eq!(error, "Operands must be numbers.\n[line 1]");
    }

    // ───────────────────────────── variables ───────────────────────────────

    #[test]
    fn test_interpreter_08_block_scoping_shadows() {
        assert_eq!(
            output_of("var a = 1; { var a = 2; print a; } print a;"),
            "2\n1\n"
        );
    }

    #[test]
    fn test_interpreter_09_uninitialised_var_is_nil_and_redefinition_allowed() {
        assert_eq!(output_of("var a; print a; var a = 3; print a;"), "nil\n3\n");
    }

    #[test]
    fn test_interpreter_10_assignment() {
        let (_, error) = runtime_error_of("x = 1;");
        assert_eq!(error, "Undefined variable 'x'.\n[line 1]");

        let (_, error) = runtime_error_of("print y;");
        assert_eq!(error, "Undefined variable 'y'.\n[line 1]");

        assert_eq!(
            output_of("var x; x = 2; { x = 3; print x; } print x; print x = 4;"),
            "3\n3\n4\n"
        );
    }

    #[test]
    fn test_interpreter_11_loops() {
        assert_eq!(
            output_of("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
        assert_eq!(
            output_of("for (var i = 0; i < 3; i = i + 1) print i * 10;"),
            "0\n10\n20\n"
        );
        // The loop variable belongs to the loop.
        let (output, error) = runtime_error_of("for (var j = 0; j < 1; j = j + 1) {} print j;");
        assert_eq!(output, "");
        assert_eq!(error, "Undefined variable 'j'.\n[line 1]");
    }

    // ───────────────────────────── functions ───────────────────────────────

    #[test]
    fn test_interpreter_12_closures_capture_their_scope() {
        let source = "fun makeCounter() { var i = 0; fun inc() { i = i + 1; return i; } return inc; } \
                      var c = makeCounter(); print c(); print c();";

        assert_eq!(output_of(source), "1\n2\n");

        let independent = "fun makeCounter() { var i = 0; fun inc() { i = i + 1; return i; } return inc; } \
                           var a = makeCounter(); var b = makeCounter(); a(); a(); print a(); print b();";

        assert_eq!(output_of(independent), "3\n1\n");
    }

    #[test]
    fn test_interpreter_13_return_unwinds_to_the_call() {
        assert_eq!(
            output_of(
                "fun f() { while (true) { { return \"out\"; } } } print f(); print \"after\"; \
                 fun g() {} print g(); fun h() { return; } print h();"
            ),
            "out\nafter\nnil\nnil\n"
        );
    }

    #[test]
    fn test_interpreter_14_recursion() {
        assert_eq!(
            output_of("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(15);"),
            "610\n"
        );
    }

    #[test]
    fn test_interpreter_15_arity_mismatch_aborts_the_program() {
        let (output, error) = runtime_error_of("fun f(a) {} print 1; f(); print 2;");

        assert_eq!(output, "1\n");
        assert_eq!(error, "Expected 1 arguments but got 0.\n[line 1]");
    }

    #[test]
    fn test_interpreter_16_calling_non_callables() {
        let (_, error) = runtime_error_of("\"str\"();");
        assert_eq!(error, "Can only call functions and classes.\n[line 1]");

        let (_, error) = runtime_error_of("var n = nil; n(1, 2);");
        assert_eq!(error, "Can only call functions and classes.\n[line 1]");
    }

    #[test]
    fn test_interpreter_17_callable_display_and_clock() {
        assert_eq!(
            output_of("fun f() {} class A {} print f; print A; print A(); print clock;"),
            "<fn f>\nA\nA instance\n<native fn>\n"
        );
        assert_eq!(output_of("print clock() > 0;"), "true\n");

        let (_, error) = runtime_error_of("clock(1);");
        assert_eq!(error, "Expected 0 arguments but got 1.\n[line 1]");
    }

    // ────────────────────────────── classes ────────────────────────────────

    #[test]
    fn test_interpreter_18_fields_and_methods() {
        let source = "class Point { sum() { return this.x + this.y; } } \
                      var p = Point(); p.x = 1; p.y = 2; print p.sum(); \
                      p.x = 10; var s = p.sum; print s();";

        assert_eq!(output_of(source), "3\n12\n");
    }

    #[test]
    fn test_interpreter_19_fields_shadow_methods() {
        assert_eq!(
            output_of("class A { m() { return \"method\"; } } var a = A(); a.m = \"field\"; print a.m;"),
            "field\n"
        );
    }

    #[test]
    fn test_interpreter_20_property_errors() {
        let (_, error) = runtime_error_of("class A {} print A().missing;");
        assert_eq!(error, "Undefined property 'missing'.\n[line 1]");

        let (_, error) = runtime_error_of("var n = 1; print n.x;");
        assert_eq!(error, "Only instances have properties.\n[line 1]");

        let (_, error) = runtime_error_of("var n = \"s\"; n.x = 1;");
        assert_eq!(error, "Only instances have fields.\n[line 1]");
    }

    #[test]
    fn test_interpreter_21_initializer() {
        let source = "class P { init(x) { this.x = x; return; } } \
                      var p = P(3); print p.x; print p.init(4) == p; print p.x;";

        assert_eq!(output_of(source), "3\ntrue\n4\n");

        assert_eq!(
            output_of("class Q { init() { return 5; } } print Q();"),
            "Q instance\n"
        );

        let (_, error) = runtime_error_of("class R { init(a, b) {} } R(1);");
        assert_eq!(error, "Expected 2 arguments but got 1.\n[line 1]");
    }

    #[test]
    fn test_interpreter_22_super_calls_bind_this_to_subclass_instance() {
        let source = "class A { name() { return \"A\"; } describe() { return \"I am \" + this.name(); } } \
                      class B < A { name() { return \"B\"; } describe() { return super.describe() + \"!\"; } } \
                      print B().describe();";

        assert_eq!(output_of(source), "I am B!\n");
    }

    #[test]
    fn test_interpreter_23_inherited_methods_and_initializers() {
        let source = "class A { init(v) { this.v = v; } get() { return this.v; } } \
                      class B < A {} \
                      class C < B { init() { super.init(7); } } \
                      print B(1).get(); print C().get();";

        assert_eq!(output_of(source), "1\n7\n");
    }

    #[test]
    fn test_interpreter_24_methods_see_defining_scope() {
        let source = "var C; { var greeting = \"hi\"; class K { greet() { return greeting; } } C = K; } \
                      print C().greet();";

        assert_eq!(output_of(source), "hi\n");
    }

    #[test]
    fn test_interpreter_25_superclass_must_be_a_class() {
        let (_, error) = runtime_error_of("var NotClass = 1; class A < NotClass {}");
        assert_eq!(error, "Superclass must be a class.\n[line 1]");
    }

    #[test]
    fn test_interpreter_26_super_missing_method() {
        let (_, error) =
            runtime_error_of("class A {} class B < A { m() { return super.nope(); } } B().m();");
        assert_eq!(error, "Undefined property 'nope'.\n[line 1]");
    }

    // ────────────────────────────── failures ───────────────────────────────

    #[test]
    fn test_interpreter_27_syntax_error_skips_evaluation() {
        let result = run("print 1;\nprint ;");

        assert!(result.had_error);
        assert!(!result.had_runtime_error);
        assert_eq!(result.output, "");
        assert_eq!(result.errors, vec!["[line 2] Error at ';': Expect expression."]);
    }

    #[test]
    fn test_interpreter_28_deep_recursion_is_a_runtime_error() {
        let (output, errors, recovered) = on_large_stack(|| {
            let buffer = SharedBuffer::default();
            let mut session = Session::with_output(buffer.clone());

            session.run(&format!("{} print \"start\"; print f(5000);", COUNTDOWN));
            let errors: Vec<String> = session
                .diagnostics()
                .reports()
                .iter()
                .map(|e| e.to_string())
                .collect();
            assert!(session.had_runtime_error());
            assert!(!session.had_error());

            // The depth count unwound with the error; the session goes on.
            session.reset_errors();
            session.run("print f(500);");
            let recovered = !session.had_runtime_error();

            let output = String::from_utf8(buffer.0.borrow().clone()).expect("utf-8 output");
            (output, errors, recovered)
        });

        assert_eq!(errors, vec!["Stack overflow.\n[line 1]"]);
        assert!(recovered);
        assert_eq!(output, "start\n500\n");
    }

    #[test]
    fn test_interpreter_29_call_depth_limit_is_configurable() {
        let buffer = SharedBuffer::default();
        let interpreter = Interpreter::with_output(buffer.clone()).with_max_call_depth(10);
        let mut session = Session::with_interpreter(interpreter);

        // f(9) nests exactly ten calls.
        session.run(&format!("{} print f(9);", COUNTDOWN));
        assert!(!session.had_runtime_error());

        session.run("print f(10);");
        assert!(session.had_runtime_error());
        assert_eq!(
            session.diagnostics().reports()[0].to_string(),
            "Stack overflow.\n[line 1]"
        );

        let output = String::from_utf8(buffer.0.borrow().clone()).expect("utf-8 output");
        assert_eq!(output, "9\n");
    }

    #[test]
    fn test_interpreter_30_large_numbers_use_exponent_form() {
        assert_eq!(
            output_of("print 123456789012345678901234567890; print 1000000000000000000000; print 100000000000000000000;"),
            "1.2345678901234568e29\n1e21\n100000000000000000000\n"
        );
        assert_eq!(output_of("print -1000000000000000000000;"), "-1e21\n");
    }
}
