#[cfg(test)]
mod scanner_tests {
    use pretty_assertions::assert_eq;

    use jaql::scanner::Scanner;
    use jaql::token::{Token, TokenType};

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len(), "token count for {:?}", source);

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_every_punctuator_alone() {
        let table: &[(&str, TokenType)] = &[
            ("(", TokenType::LEFT_PAREN),
            (")", TokenType::RIGHT_PAREN),
            ("{", TokenType::LEFT_BRACE),
            ("}", TokenType::RIGHT_BRACE),
            (",", TokenType::COMMA),
            (".", TokenType::DOT),
            ("-", TokenType::MINUS),
            ("+", TokenType::PLUS),
            (";", TokenType::SEMICOLON),
            ("/", TokenType::SLASH),
            ("*", TokenType::STAR),
            ("!", TokenType::BANG),
            ("!=", TokenType::BANG_EQUAL),
            ("=", TokenType::EQUAL),
            ("==", TokenType::EQUAL_EQUAL),
            (">", TokenType::GREATER),
            (">=", TokenType::GREATER_EQUAL),
            ("<", TokenType::LESS),
            ("<=", TokenType::LESS_EQUAL),
        ];

        for (lexeme, token_type) in table.iter() {
            assert_token_sequence(
                lexeme,
                &[(token_type.clone(), *lexeme), (TokenType::EOF, "")],
            );
        }
    }

    #[test]
    fn test_scanner_03_every_keyword() {
        let table: &[(&str, TokenType)] = &[
            ("and", TokenType::AND),
            ("class", TokenType::CLASS),
            ("else", TokenType::ELSE),
            ("false", TokenType::FALSE),
            ("fun", TokenType::FUN),
            ("for", TokenType::FOR),
            ("if", TokenType::IF),
            ("nil", TokenType::NIL),
            ("or", TokenType::OR),
            ("print", TokenType::PRINT),
            ("return", TokenType::RETURN),
            ("super", TokenType::SUPER),
            ("this", TokenType::THIS),
            ("true", TokenType::TRUE),
            ("var", TokenType::VAR),
            ("while", TokenType::WHILE),
        ];

        for (lexeme, token_type) in table.iter() {
            assert_token_sequence(
                lexeme,
                &[(token_type.clone(), *lexeme), (TokenType::EOF, "")],
            );
        }
    }

    #[test]
    fn test_scanner_04_keywords_are_case_sensitive() {
        assert_token_sequence(
            "And CLASS While",
            &[
                (TokenType::IDENTIFIER, "And"),
                (TokenType::IDENTIFIER, "CLASS"),
                (TokenType::IDENTIFIER, "While"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_05_number_literals() {
        let tokens: Vec<Token> = Scanner::new(b"123 1.5")
            .filter_map(Result::ok)
            .collect();

        assert_eq!(tokens.len(), 3);

        match tokens[0].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 123.0),
            ref other => panic!("expected NUMBER, got {:?}", other),
        }

        match tokens[1].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 1.5),
            ref other => panic!("expected NUMBER, got {:?}", other),
        }
    }

    #[test]
    fn test_scanner_06_trailing_dot_is_not_a_fraction() {
        assert_token_sequence(
            "4.",
            &[
                (TokenType::NUMBER(4.0), "4"),
                (TokenType::DOT, "."),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_07_string_literal_payload() {
        let tokens: Vec<Token> = Scanner::new(b"\"hello\"")
            .filter_map(Result::ok)
            .collect();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].lexeme, "\"hello\"");

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "hello"),
            other => panic!("expected STRING, got {:?}", other),
        }
    }

    #[test]
    fn test_scanner_08_whitespace_only_input() {
        assert_token_sequence("  \t\r\n  ", &[(TokenType::EOF, "")]);
    }

    #[test]
    fn test_scanner_09_comment_only_input() {
        assert_token_sequence("// nothing to see here", &[(TokenType::EOF, "")]);
        assert_token_sequence("// line one\n// line two\n", &[(TokenType::EOF, "")]);
    }

    #[test]
    fn test_scanner_10_comment_does_not_eat_next_line() {
        assert_token_sequence(
            "// comment\nprint",
            &[(TokenType::PRINT, "print"), (TokenType::EOF, "")],
        );
    }

    #[test]
    fn test_scanner_11_unexpected_chars_recover() {
        let source = ",.$(#";
        let results: Vec<_> = Scanner::new(source.as_bytes()).collect();

        // COMMA, DOT, error '$', LEFT_PAREN, error '#', EOF
        assert_eq!(results.len(), 6, "expected 6 items in result");

        assert!(results[0].as_ref().is_ok_and(|t| t.lexeme == ","));
        assert!(results[1].as_ref().is_ok_and(|t| t.lexeme == "."));
        assert!(results[3].as_ref().is_ok_and(|t| t.lexeme == "("));
        assert!(results[5]
            .as_ref()
            .is_ok_and(|t| t.token_type == TokenType::EOF));

        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|e| e.to_string())
            .collect();

        assert_eq!(errors.len(), 2, "expected 2 error messages");

        for message in &errors {
            assert!(
                message.contains("Unexpected character"),
                "error message should contain 'Unexpected character', got: {}",
                message
            );
        }
    }

    #[test]
    fn test_scanner_12_unterminated_string() {
        let results: Vec<_> = Scanner::new(b"\"abc").collect();

        // one error, then the EOF marker — no token for the partial lexeme
        assert_eq!(results.len(), 2);
        assert!(results[0]
            .as_ref()
            .err()
            .is_some_and(|e| e.to_string().contains("Unterminated string")));
        assert!(results[1]
            .as_ref()
            .is_ok_and(|t| t.token_type == TokenType::EOF));
    }

    #[test]
    fn test_scanner_13_line_counting() {
        let tokens: Vec<Token> = Scanner::new(b"one\ntwo\n\nthree")
            .filter_map(Result::ok)
            .collect();

        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[2].line, 4);
        assert_eq!(tokens[3].line, 4); // EOF carries the final line
    }

    #[test]
    fn test_scanner_14_multiline_string_counts_lines() {
        let tokens: Vec<Token> = Scanner::new(b"\"a\nb\" x")
            .filter_map(Result::ok)
            .collect();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_scanner_15_tokenize_display_form() {
        let tokens: Vec<Token> = Scanner::new(b"var x = 3;")
            .filter_map(Result::ok)
            .collect();

        let printed: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();

        assert_eq!(
            printed,
            vec![
                "VAR var null",
                "IDENTIFIER x null",
                "EQUAL = null",
                "NUMBER 3 3.0",
                "SEMICOLON ; null",
                "EOF  null",
            ]
        );
    }
}
