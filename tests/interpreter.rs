#[cfg(test)]
mod interpreter_tests {
    use pretty_assertions::assert_eq;

    use jaql::error::Diagnostics;
    use jaql::pipeline::Session;

    /// Run a program through the whole pipeline, capturing printed output
    /// and accumulated diagnostics.
    fn run(source: &str) -> (String, Diagnostics) {
        let mut session = Session::new();
        let mut diag = Diagnostics::new();
        let mut out: Vec<u8> = Vec::new();

        session.run(source.as_bytes(), &mut diag, &mut out);

        (String::from_utf8(out).expect("valid UTF-8 output"), diag)
    }

    /// Run a program expected to succeed and return its printed lines.
    fn output(source: &str) -> String {
        let (out, diag) = run(source);

        assert!(
            !diag.had_error() && !diag.had_runtime_error(),
            "unexpected errors: {:?}",
            diag
        );

        out
    }

    /// Run a program expected to die with a runtime error; returns the
    /// output so far and the error message.
    fn runtime_error(source: &str) -> (String, String) {
        let (out, diag) = run(source);

        assert!(!diag.had_error(), "static errors: {:?}", diag);
        assert!(diag.had_runtime_error(), "expected a runtime error");
        assert_eq!(diag.errors().len(), 1, "exactly one runtime error");

        (out, diag.errors()[0].to_string())
    }

    // ── printing and literals ───────────────────────────────────────────

    #[test]
    fn test_interp_01_print_formatting() {
        assert_eq!(
            output("print 4.0; print 2.5; print nil; print true; print \"hi\";"),
            "4\n2.5\nnil\ntrue\nhi\n"
        );
    }

    #[test]
    fn test_interp_02_arithmetic() {
        assert_eq!(output("print 1 + 2;"), "3\n");
        assert_eq!(output("print 7 - 2 * 3;"), "1\n");
        assert_eq!(output("print 10 / 4;"), "2.5\n");
        assert_eq!(output("print -(3 + 2);"), "-5\n");
    }

    #[test]
    fn test_interp_03_division_by_zero_is_infinity() {
        assert_eq!(output("print 1 / 0;"), "inf\n");
    }

    #[test]
    fn test_interp_04_string_concatenation() {
        assert_eq!(output("print \"a\" + \"b\";"), "ab\n");
    }

    #[test]
    fn test_interp_05_mixed_plus_is_a_runtime_error() {
        let (_, message) = runtime_error("print 1 + \"a\";");

        assert!(message.contains("must be two numbers or two strings"));
    }

    #[test]
    fn test_interp_06_comparison_requires_numbers() {
        let (_, message) = runtime_error("print 1 < \"a\";");

        assert!(message.contains("must be numbers"));
        assert!(message.contains("'<'"));
    }

    #[test]
    fn test_interp_07_unary_minus_requires_a_number() {
        let (_, message) = runtime_error("print -\"a\";");

        assert!(message.contains("must be a number"));
    }

    // ── truthiness and equality ─────────────────────────────────────────

    #[test]
    fn test_interp_08_zero_and_empty_string_are_truthy() {
        assert_eq!(output("if (0) print \"y\"; else print \"n\";"), "y\n");
        assert_eq!(output("if (\"\") print \"y\"; else print \"n\";"), "y\n");
        assert_eq!(output("if (nil) print \"y\"; else print \"n\";"), "n\n");
        assert_eq!(output("if (false) print \"y\"; else print \"n\";"), "n\n");
    }

    #[test]
    fn test_interp_09_equality_rules() {
        assert_eq!(
            output(
                "print nil == nil; \
                 print nil == false; \
                 print 1 == 1; \
                 print 1 == \"1\"; \
                 print \"a\" == \"b\";"
            ),
            "true\nfalse\ntrue\nfalse\nfalse\n"
        );
    }

    #[test]
    fn test_interp_10_logical_operators_return_operands() {
        assert_eq!(
            output(
                "print \"a\" or \"b\"; \
                 print nil or \"b\"; \
                 print nil and 1; \
                 print 1 and 2;"
            ),
            "a\nb\nnil\n2\n"
        );
    }

    #[test]
    fn test_interp_11_short_circuit_skips_side_effects() {
        assert_eq!(
            output(
                "var hits = 0; \
                 fun bump() { hits = hits + 1; return true; } \
                 var _ = false and bump(); \
                 print hits; \
                 var __ = true or bump(); \
                 print hits;"
            ),
            "0\n0\n"
        );
    }

    // ── variables, scoping, closures ────────────────────────────────────

    #[test]
    fn test_interp_12_shadowing_reads_outer_in_initializer() {
        assert_eq!(
            output("var a = 1; { var a = a + 1; print a; } print a;"),
            "2\n1\n"
        );
    }

    #[test]
    fn test_interp_13_undefined_variable() {
        let (_, message) = runtime_error("print nope;");

        assert!(message.contains("Undefined variable 'nope'"));
    }

    #[test]
    fn test_interp_14_assignment_evaluates_to_the_value() {
        assert_eq!(output("var a = 1; print a = 2; print a;"), "2\n2\n");
    }

    #[test]
    fn test_interp_15_counter_closures_are_independent() {
        assert_eq!(
            output(
                "fun makeCounter() { \
                   var i = 0; \
                   fun count() { i = i + 1; return i; } \
                   return count; \
                 } \
                 var c1 = makeCounter(); \
                 var c2 = makeCounter(); \
                 print c1(); print c1(); print c2(); print c1();"
            ),
            "1\n2\n1\n3\n"
        );
    }

    #[test]
    fn test_interp_16_closures_share_their_captured_frame() {
        assert_eq!(
            output(
                "var bump; var read; \
                 { \
                   var shared = 0; \
                   fun incr() { shared = shared + 1; } \
                   fun get() { return shared; } \
                   bump = incr; read = get; \
                 } \
                 bump(); bump(); print read();"
            ),
            "2\n"
        );
    }

    #[test]
    fn test_interp_17_closure_outlives_defining_call() {
        assert_eq!(
            output(
                "fun make() { var n = 10; fun get() { return n; } return get; } \
                 var g = make(); \
                 print g();"
            ),
            "10\n"
        );
    }

    #[test]
    fn test_interp_18_function_returns_nil_without_return() {
        assert_eq!(output("fun f() {} print f();"), "nil\n");
    }

    #[test]
    fn test_interp_19_recursion() {
        assert_eq!(
            output(
                "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } \
                 print fib(10);"
            ),
            "55\n"
        );
    }

    #[test]
    fn test_interp_20_while_and_desugared_for() {
        assert_eq!(
            output("var s = 0; for (var i = 1; i <= 4; i = i + 1) s = s + i; print s;"),
            "10\n"
        );
        assert_eq!(
            output("var n = 3; while (n > 0) { print n; n = n - 1; }"),
            "3\n2\n1\n"
        );
    }

    // ── calls and arity ─────────────────────────────────────────────────

    #[test]
    fn test_interp_21_arity_mismatch_reports_both_counts() {
        let (_, message) = runtime_error("fun f(a, b) {} f(1);");
        assert!(message.contains("Expected 2 arguments but got 1"));

        let (_, message) = runtime_error("fun f(a, b) {} f(1, 2, 3);");
        assert!(message.contains("Expected 2 arguments but got 3"));
    }

    #[test]
    fn test_interp_22_calling_a_non_callable() {
        let (_, message) = runtime_error("\"str\"();");

        assert!(message.contains("Can only call functions and classes"));
    }

    #[test]
    fn test_interp_23_clock_native() {
        assert_eq!(output("print clock() > 0;"), "true\n");
        assert_eq!(output("var t = clock(); print clock() >= t;"), "true\n");
    }

    // ── classes, instances, inheritance ─────────────────────────────────

    #[test]
    fn test_interp_24_instance_fields() {
        assert_eq!(
            output("class Box {} var b = Box(); b.v = 1; b.v = b.v + 1; print b.v;"),
            "2\n"
        );
    }

    #[test]
    fn test_interp_25_instance_display_form() {
        assert_eq!(output("class Box {} print Box(); print Box;"), "Box instance\nBox\n");
    }

    #[test]
    fn test_interp_26_initializer_binds_this_and_returns_instance() {
        assert_eq!(
            output("class P { init(x) { this.x = x; } } print P(5).x;"),
            "5\n"
        );
        assert_eq!(
            output("class Q { init() { return; } } print Q();"),
            "Q instance\n"
        );
    }

    #[test]
    fn test_interp_27_bound_method_keeps_its_instance() {
        assert_eq!(
            output(
                "class C { init() { this.v = 7; } get() { return this.v; } } \
                 var m = C().get; \
                 print m();"
            ),
            "7\n"
        );
    }

    #[test]
    fn test_interp_28_inherited_method_lookup() {
        assert_eq!(
            output(
                "class A { name() { return \"base\"; } } \
                 class B < A {} \
                 print B().name();"
            ),
            "base\n"
        );
    }

    #[test]
    fn test_interp_29_super_dispatch_keeps_subclass_this() {
        assert_eq!(
            output(
                "class A { \
                   speak() { return \"A:\" + this.who(); } \
                   who() { return \"a\"; } \
                 } \
                 class B < A { \
                   who() { return \"b\"; } \
                   speak() { return super.speak(); } \
                 } \
                 print B().speak();"
            ),
            "A:b\n"
        );
    }

    #[test]
    fn test_interp_30_override_calls_superclass_version() {
        assert_eq!(
            output(
                "class A { m() { return \"A.m\"; } } \
                 class B < A { m() { return super.m() + \"+B\"; } } \
                 print B().m();"
            ),
            "A.m+B\n"
        );
    }

    #[test]
    fn test_interp_31_undefined_property() {
        let (_, message) = runtime_error("class D {} print D().missing;");

        assert!(message.contains("Undefined property 'missing'"));
    }

    #[test]
    fn test_interp_32_properties_require_instances() {
        let (_, message) = runtime_error("print (1).x;");
        assert!(message.contains("Only instances have properties"));

        let (_, message) = runtime_error("(1).x = 2;");
        assert!(message.contains("Only instances have fields"));
    }

    #[test]
    fn test_interp_33_superclass_must_be_a_class() {
        let (_, message) = runtime_error("var NotAClass = 1; class B < NotAClass {}");

        assert!(message.contains("Superclass must be a class"));
    }

    #[test]
    fn test_interp_34_fields_shadow_methods() {
        assert_eq!(
            output(
                "class F { m() { return \"method\"; } } \
                 var f = F(); \
                 print f.m(); \
                 f.m = 1; \
                 print f.m;"
            ),
            "method\n1\n"
        );
    }

    // ── error discipline ────────────────────────────────────────────────

    #[test]
    fn test_interp_35_runtime_error_stops_remaining_statements() {
        let (out, message) = runtime_error("print 1; print nope; print 2;");

        assert_eq!(out, "1\n");
        assert!(message.contains("Undefined variable 'nope'"));
    }

    #[test]
    fn test_interp_36_static_errors_block_interpretation() {
        let (out, diag) = run("print 1; var 2;");

        assert_eq!(out, "");
        assert!(diag.had_error());
        assert!(!diag.had_runtime_error());
    }

    #[test]
    fn test_interp_37_runtime_error_names_the_line() {
        let (_, message) = runtime_error("var a = 1;\nprint a + nil;");

        assert!(message.contains("[line 2]"));
    }

    // ── session reuse (REPL semantics) ──────────────────────────────────

    #[test]
    fn test_interp_38_definitions_persist_across_runs() {
        let mut session = Session::new();
        let mut diag = Diagnostics::new();
        let mut out: Vec<u8> = Vec::new();

        session.run(b"var a = 1; fun next() { a = a + 1; return a; }", &mut diag, &mut out);
        assert!(!diag.had_error() && !diag.had_runtime_error());

        session.run(b"print next(); print next();", &mut diag, &mut out);
        assert!(!diag.had_error() && !diag.had_runtime_error());

        assert_eq!(String::from_utf8(out).expect("utf8"), "2\n3\n");
    }

    #[test]
    fn test_interp_39_error_in_one_run_spares_the_next() {
        let mut session = Session::new();
        let mut diag = Diagnostics::new();
        let mut out: Vec<u8> = Vec::new();

        session.run(b"print nope;", &mut diag, &mut out);
        assert!(diag.had_runtime_error());

        diag.reset();

        session.run(b"print 42;", &mut diag, &mut out);
        assert!(!diag.had_error() && !diag.had_runtime_error());

        assert_eq!(String::from_utf8(out).expect("utf8"), "42\n");
    }
}
