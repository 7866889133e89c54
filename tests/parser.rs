#[cfg(test)]
mod parser_tests {
    use pretty_assertions::assert_eq;

    use jaql::ast::{Expr, LiteralValue, NodeIds, Stmt};
    use jaql::ast_printer::AstPrinter;
    use jaql::error::Diagnostics;
    use jaql::parser::Parser;
    use jaql::scanner::Scanner;
    use jaql::token::Token;

    fn tokens(source: &str) -> Vec<Token> {
        Scanner::new(source.as_bytes())
            .map(|r| r.expect("lex error in test source"))
            .collect()
    }

    /// Parse a single expression and render its parenthesized form.
    fn printed(source: &str) -> String {
        let toks = tokens(source);
        let mut ids = NodeIds::new();
        let mut diag = Diagnostics::new();

        let expr = Parser::new(&toks, &mut ids, &mut diag)
            .parse_expression()
            .expect("expression did not parse");

        assert!(!diag.had_error(), "unexpected parse errors: {:?}", diag);

        AstPrinter::print(&expr)
    }

    /// Parse a whole program, returning the surviving statements and the sink.
    fn program(source: &str) -> (Vec<Stmt>, Diagnostics) {
        let toks = tokens(source);
        let mut ids = NodeIds::new();
        let mut diag = Diagnostics::new();

        let statements = Parser::new(&toks, &mut ids, &mut diag).parse();

        (statements, diag)
    }

    #[test]
    fn test_parser_01_round_trip_canonical_form() {
        assert_eq!(printed("-123 * (45.67)"), "(* (- 123) (group 45.67))");
    }

    #[test]
    fn test_parser_02_factor_binds_tighter_than_term() {
        assert_eq!(printed("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(printed("(1 + 2) * 3"), "(* (group (+ 1 2)) 3)");
    }

    #[test]
    fn test_parser_03_binary_operators_are_left_associative() {
        assert_eq!(printed("1 - 2 - 3"), "(- (- 1 2) 3)");
        assert_eq!(printed("8 / 4 / 2"), "(/ (/ 8 4) 2)");
    }

    #[test]
    fn test_parser_04_comparison_below_equality() {
        assert_eq!(printed("1 < 2 == true"), "(== (< 1 2) true)");
    }

    #[test]
    fn test_parser_05_logical_precedence() {
        assert_eq!(printed("a or b and c"), "(or a (and b c))");
    }

    #[test]
    fn test_parser_06_unary_nesting() {
        assert_eq!(printed("!!true"), "(! (! true))");
        assert_eq!(printed("--1"), "(- (- 1))");
    }

    #[test]
    fn test_parser_07_assignment_is_right_associative() {
        assert_eq!(printed("a = b = 1"), "(= a (= b 1))");
    }

    #[test]
    fn test_parser_08_calls_and_property_access() {
        assert_eq!(printed("f(1, 2)"), "(call f 1 2)");
        assert_eq!(printed("a.b(1).c"), "(. (call (. a b) 1) c)");
        assert_eq!(printed("a.b = 2"), "(= (. a b) 2)");
        assert_eq!(printed("super.method"), "(super method)");
        assert_eq!(printed("this.x"), "(. this x)");
    }

    #[test]
    fn test_parser_09_invalid_assignment_target_is_reported() {
        let (statements, diag) = program("1 = 2;");

        assert!(diag.had_error());
        assert!(diag
            .errors()
            .iter()
            .any(|e| e.to_string().contains("Invalid assignment target")));

        // the statement still parses; parsing was not aborted
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_parser_10_synchronize_after_bad_declaration() {
        let (statements, diag) = program("var 1 = 2;\nprint 3;");

        assert!(diag.had_error());
        assert!(diag
            .errors()
            .iter()
            .any(|e| e.to_string().contains("Expected variable name")));

        // the malformed declaration is dropped, the next statement survives
        assert_eq!(statements.len(), 1);
        assert!(matches!(statements[0], Stmt::Print(_)));
    }

    #[test]
    fn test_parser_11_missing_semicolon_reports_line() {
        let (_, diag) = program("print 1\nprint 2;");

        assert!(diag.had_error());
        assert!(diag
            .errors()
            .iter()
            .any(|e| e.to_string().contains("Expected ';'")));
    }

    #[test]
    fn test_parser_12_for_desugars_into_while_in_block() {
        let (statements, diag) = program("for (var i = 0; i < 3; i = i + 1) print i;");

        assert!(!diag.had_error());
        assert_eq!(statements.len(), 1);

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected surrounding block, got {:?}", statements[0]);
        };

        assert_eq!(outer.len(), 2);
        assert!(matches!(outer[0], Stmt::Var { .. }));

        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected while loop, got {:?}", outer[1]);
        };

        // increment appended inside the loop body
        let Stmt::Block(loop_body) = body.as_ref() else {
            panic!("expected block body, got {:?}", body);
        };

        assert_eq!(loop_body.len(), 2);
        assert!(matches!(loop_body[0], Stmt::Print(_)));
        assert!(matches!(
            loop_body[1],
            Stmt::Expression(Expr::Assign { .. })
        ));
    }

    #[test]
    fn test_parser_13_for_without_clauses_loops_on_true() {
        let (statements, diag) = program("for (;;) print 1;");

        assert!(!diag.had_error());
        assert_eq!(statements.len(), 1);

        let Stmt::While { condition, body } = &statements[0] else {
            panic!("expected bare while, got {:?}", statements[0]);
        };

        assert_eq!(*condition, Expr::Literal(LiteralValue::True));
        assert!(matches!(body.as_ref(), Stmt::Print(_)));
    }

    #[test]
    fn test_parser_14_class_declaration_shape() {
        let (statements, diag) = program("class B < A { init(n) { this.n = n; } say() {} }");

        assert!(!diag.had_error());
        assert_eq!(statements.len(), 1);

        let Stmt::Class {
            name,
            superclass,
            methods,
        } = &statements[0]
        else {
            panic!("expected class, got {:?}", statements[0]);
        };

        assert_eq!(name.lexeme, "B");
        assert!(matches!(superclass, Some(Expr::Variable { .. })));
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].name.lexeme, "init");
        assert_eq!(methods[0].params.len(), 1);
        assert_eq!(methods[1].name.lexeme, "say");
    }

    #[test]
    fn test_parser_15_argument_limit_reported_without_truncating() {
        let mut source = String::from("f(");
        for i in 0..257 {
            if i > 0 {
                source.push_str(", ");
            }
            source.push('1');
        }
        source.push_str(");");

        let (statements, diag) = program(&source);

        assert!(diag.had_error());
        assert!(diag
            .errors()
            .iter()
            .any(|e| e.to_string().contains("more than 256 arguments")));

        // the call still carries every argument
        assert_eq!(statements.len(), 1);
        let Stmt::Expression(Expr::Call { arguments, .. }) = &statements[0] else {
            panic!("expected call statement, got {:?}", statements[0]);
        };
        assert_eq!(arguments.len(), 257);
    }

    #[test]
    fn test_parser_16_unclosed_paren_is_reported() {
        let (_, diag) = program("print (1 + 2;");

        assert!(diag.had_error());
        assert!(diag
            .errors()
            .iter()
            .any(|e| e.to_string().contains("Expected ')'")));
    }
}
