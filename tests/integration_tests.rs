// Parser robustness suites.
//
// Each suite is a table of inputs with the expected outcome. Cases run
// under `catch_unwind` so a panic in the lexer or parser is reported as a
// crash for that input instead of aborting the whole run.

use sel::error::SyntaxError;
use std::panic;

enum Expect {
    Parses,
    Fails {
        message: Option<&'static str>,
        offset: Option<usize>,
    },
}

struct Case {
    name: &'static str,
    input: String,
    expect: Expect,
}

enum Outcome {
    Pass,
    Fail(String),
    Crash(String),
}

struct Suite {
    name: &'static str,
    cases: Vec<Case>,
}

impl Suite {
    fn new(name: &'static str) -> Self {
        Self { name, cases: Vec::new() }
    }

    fn push(&mut self, name: &'static str, input: impl Into<String>, expect: Expect) {
        self.cases.push(Case {
            name,
            input: input.into(),
            expect,
        });
    }

    fn parses(&mut self, name: &'static str, input: impl Into<String>) {
        self.push(name, input, Expect::Parses);
    }

    fn fails(&mut self, name: &'static str, input: impl Into<String>) {
        self.push(name, input, Expect::Fails { message: None, offset: None });
    }

    fn fails_with(&mut self, name: &'static str, input: impl Into<String>, message: &'static str) {
        self.push(name, input, Expect::Fails { message: Some(message), offset: None });
    }

    fn fails_at(&mut self, name: &'static str, input: impl Into<String>, message: &'static str, offset: usize) {
        self.push(
            name,
            input,
            Expect::Fails {
                message: Some(message),
                offset: Some(offset),
            },
        );
    }

    /// Run every case, print a line per case, and return the names of
    /// the ones that did not pass.
    fn run(&self) -> Vec<String> {
        println!("{} ({} cases)", self.name, self.cases.len());

        let mut problems = Vec::new();
        for case in &self.cases {
            match check(case) {
                Outcome::Pass => println!("  ok    {}", case.name),
                Outcome::Fail(reason) => {
                    println!("  FAIL  {}: {}", case.name, reason);
                    problems.push(format!("{}/{}", self.name, case.name));
                }
                Outcome::Crash(reason) => {
                    println!("  CRASH {}: {}", case.name, reason);
                    problems.push(format!("{}/{} (panicked)", self.name, case.name));
                }
            }
        }
        println!();
        problems
    }
}

fn check(case: &Case) -> Outcome {
    let parsed = match panic::catch_unwind(|| sel::parse(&case.input)) {
        Ok(parsed) => parsed,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<String>()
                .cloned()
                .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
                .unwrap_or_else(|| "unknown panic".to_string());
            return Outcome::Crash(reason);
        }
    };

    match (&case.expect, parsed) {
        (Expect::Parses, Ok(_)) => Outcome::Pass,
        (Expect::Parses, Err(error)) => Outcome::Fail(format!("unexpected error: {}", error)),
        (Expect::Fails { .. }, Ok(expr)) => Outcome::Fail(format!("expected an error, parsed as {}", expr)),
        (Expect::Fails { message, offset }, Err(error)) => check_error(&error, *message, *offset),
    }
}

fn check_error(error: &SyntaxError, message: Option<&str>, offset: Option<usize>) -> Outcome {
    if let Some(expected) = message {
        if !error.message.contains(expected) {
            return Outcome::Fail(format!("message {:?} lacks {:?}", error.message, expected));
        }
    }
    match offset {
        Some(expected) if error.offset != expected => {
            Outcome::Fail(format!("reported at offset {}, expected {}", error.offset, expected))
        }
        _ => Outcome::Pass,
    }
}

// ============================================================================
// Suites
// ============================================================================

/// `open` repeated `depth` times around `inner`, closed by `close` repeated
/// as often.
fn nest(open: &str, depth: usize, inner: &str, close: &str) -> String {
    open.repeat(depth) + inner + &close.repeat(depth)
}

fn malformed_expressions() -> Suite {
    let mut suite = Suite::new("Malformed Expressions");

    // Parentheses
    suite.fails_at("unmatched_opening_paren", "(1 + 2", "Expected ')' after expression", 6);
    suite.fails_with("unmatched_opening_paren_nested", "((1 + 2)", "Expected ')' after expression");
    suite.fails_at(
        "unmatched_closing_paren",
        "1 + 2)",
        "Unexpected ')' after complete expression",
        5,
    );

    suite.fails_with("empty_parentheses", "()", "Expected expression, found ')'");
    suite.fails_with("empty_parentheses_in_expression", "1 + ()", "Expected expression, found ')'");

    // Brackets
    suite.fails_with("list_literals_are_not_syntax", "[1, 2]", "Expected expression, found '['");
    suite.fails_with("empty_subscript", "'foo'[]", "Expected expression or ':' in subscript");
    suite.fails_with("unclosed_subscript", "x[1", "Expected ']' after subscript");
    suite.fails_at("slice_with_four_parts", "x[1:2:3:4]", "Expected ']' after subscript", 7);

    // Ternaries
    suite.fails_with("ternary_missing_colon", "a ? b", "Expected ':' in conditional expression");
    suite.fails_with("ternary_missing_else", "a ? b :", "Unexpected end of input");

    suite
}

fn edge_cases() -> Suite {
    let mut suite = Suite::new("Edge Cases");

    suite.fails_at("empty_input", "", "Unexpected end of input", 0);
    suite.fails_at("only_whitespace", "   \n\t  ", "Unexpected end of input", 7);
    suite.fails("unexpected_eof_after_operator", "1 +");
    suite.fails("unexpected_eof_in_expression", "1 + (");

    let nested_parens = "(".repeat(40) + "1" + &")".repeat(40);
    suite.parses("nested_parens", &nested_parens);

    let too_deep = "(".repeat(100) + "1" + &")".repeat(100);
    suite.fails_with("too_deeply_nested_parens", &too_deep, "Expression nested too deeply");

    // Nesting limit boundaries
    suite.parses("parens_at_limit", nest("(", 64, "1", ")"));
    suite.fails_at("parens_past_limit", nest("(", 65, "1", ")"), "Expression nested too deeply", 65);
    suite.parses("negated_groups_at_limit", nest("-(", 64, "1", ")"));
    suite.fails_with("negated_groups_past_limit", nest("-(", 65, "1", ")"), "Expression nested too deeply");
    suite.parses("not_groups_at_limit", nest("!(", 64, "a", ")"));
    suite.parses("prefix_minus_at_limit", nest("-", 64, "1", ""));
    suite.fails_with("prefix_minus_past_limit", nest("-", 65, "1", ""), "Expression nested too deeply");
    suite.parses("long_else_chain", nest("0 ? 1 : ", 200, "2", ""));
    suite.parses("then_branches_at_limit", nest("1 ? ", 64, "2", " : 3"));
    suite.fails_with("then_branches_past_limit", nest("1 ? ", 65, "2", " : 3"), "Expression nested too deeply");

    let long_chain = vec!["1"; 500].join(" + ");
    suite.parses("long_flat_chain", &long_chain);

    suite
}

fn operators() -> Suite {
    let mut suite = Suite::new("Operator Tests");

    suite.parses("unary_plus", "+ 1");
    suite.fails_at("missing_right_operand", "1 +", "Expected expression after '+'", 2);
    suite.fails_with("lone_minus", "-", "Expected expression after '-'");
    suite.fails("lone_bang", "!");
    suite.fails_with("missing_power_exponent", "2 **", "Expected expression after '**'");

    // Sign operators stack
    suite.parses("double_plus", "1 ++ 2");
    suite.parses("double_minus", "1 -- 2");
    suite.parses("mixed_operators", "1 +- 2");
    suite.parses("signed_exponent", "2 ** -1");

    // '!' sits below comparisons, so it cannot appear as an arithmetic operand
    suite.parses("not_over_comparison", "!a == b");
    suite.parses("double_not", "!!a");
    suite.fails_with("not_inside_arithmetic", "1 + !a", "Expected expression, found '!'");
    suite.parses("comparison_equal", "1 == 2");
    suite.parses("comparison_not_equal", "1 != 2");
    suite.parses("comparison_chain", "a < b < c");
    suite.parses("floor_division", "7 // 2 % 3");
    suite.parses("logic", "a || b && !c");

    suite
}

fn lexical() -> Suite {
    let mut suite = Suite::new("Lexical Tests");

    suite.parses("integer_literal", "42");
    suite.parses("leading_zeros", "007");
    suite.parses("float_literal", "3.14");
    suite.parses("trailing_dot", "42.");
    suite.parses("single_quoted", "'hello'");
    suite.parses("double_quoted", "\"hello\"");
    suite.parses("escaped_quote", "'foo\\'s'");
    suite.fails_with("multiple_dots", "3.14.159", "Expected attribute name after '.'");
    suite.fails_with("leading_dot", ".42", "Expected expression, found '.'");
    suite.fails_at("unterminated_string", "'foo", "Unterminated string", 0);
    suite.fails_at("unterminated_string_later", "a + \"foo'", "Unterminated string", 4);
    suite.fails_at("single_equals", "a = b", "Unexpected character: '='", 2);
    suite.fails_at("single_ampersand", "a & b", "Unexpected character: '&'", 2);
    suite.fails_at("single_pipe", "a | b", "Unexpected character: '|'", 2);
    suite.fails_at("unknown_character", "a $ b", "Unexpected character: '$'", 2);

    suite
}

fn postfix_chains() -> Suite {
    let mut suite = Suite::new("Postfix Tests");

    suite.parses("simple_call", "foo()");
    suite.parses("call_with_args", "foo(1, 2, 3)");
    suite.parses("chained", "a.b()[0].c");
    suite.parses("method_on_literal", "'foo'.upper().lower()");
    suite.parses("call_result_called", "f(1)(2)");
    suite.parses("slice_full", "x[1:2:3]");
    suite.parses("slice_start", "x[1:]");
    suite.parses("slice_stop", "x[:2]");
    suite.parses("slice_step", "x[::-1]");
    suite.parses("slice_single_colon", "x[:]");
    suite.parses("slice_two_colons", "x[::]");
    suite.parses("ternary_in_subscript", "x[a ? 0 : 1]");
    suite.fails_with("missing_closing_paren", "foo(1, 2", "Expected ')' after arguments");
    suite.fails_with(
        "missing_opening_paren",
        "foo 1, 2)",
        "Unexpected '1' after complete expression",
    );
    suite.fails_with("trailing_comma", "foo(1, 2,)", "Expected expression, found ')'");
    suite.fails_with("accessor_without_name", "a.", "Expected attribute name after '.'");
    suite.fails_with("accessor_with_number", "a.(b)", "Expected attribute name after '.'");

    suite
}

fn ternaries() -> Suite {
    let mut suite = Suite::new("Ternary Tests");

    suite.parses("simple", "c ? 'foo' : 'bar'");
    suite.parses("nested_then", "1 ? 1 ? 2 : 3 : 4");
    suite.parses("nested_else", "0 ? 1 : 0 ? 2 : 3");
    suite.parses("condition_with_logic", "a && b || c ? x : y");
    suite.fails("double_question", "a ?? b");

    suite
}

#[test]
fn parser_robustness_suites() {
    let suites = [
        malformed_expressions(),
        edge_cases(),
        operators(),
        lexical(),
        postfix_chains(),
        ternaries(),
    ];

    let problems: Vec<String> = suites.iter().flat_map(Suite::run).collect();
    assert!(problems.is_empty(), "cases that did not pass: {:#?}", problems);
}
