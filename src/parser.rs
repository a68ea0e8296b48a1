use crate::ast::{BinaryOp, Expr, Index, Literal, LogicalOp, UnaryOp};
use crate::error::{Span, SyntaxError};
use crate::lexer::{tokenize, Token, TokenType};

/// Maximum nesting depth before parsing is refused.
///
/// Each parenthesized group, call argument, subscript component, ternary
/// `then` branch and prefix operator is one level. A prefix operator
/// applied directly to a parenthesized group shares the group's level,
/// and the top-level expression and a ternary's `else` branch are free.
pub const MAX_NESTING: usize = 64;

/// Recursive-descent parser, one method per precedence tier.
///
/// From loosest to tightest:
///
/// ```text
/// expression     := logical_or ( "?" expression ":" logical_or )*
/// logical_or     := logical_and ( "||" logical_and )*
/// logical_and    := logical_not ( "&&" logical_not )*
/// logical_not    := "!" logical_not | relational
/// relational     := additive ( ( "==" | "!=" | ">" | "<" | ">=" | "<=" ) additive )*
/// additive       := multiplicative ( ( "+" | "-" ) multiplicative )*
/// multiplicative := unary ( ( "*" | "/" | "//" | "%" ) unary )*
/// unary          := ( "-" | "+" ) unary | power
/// power          := postfix ( "**" unary )?
/// postfix        := primary ( "." IDENT | "(" arguments? ")" | "[" subscript "]" )*
/// primary        := INT | FLOAT | STRING | IDENT | "(" expression ")"
/// ```
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
}

impl<'src> Parser<'src> {
    /// `tokens` must come from lexing `source` and end with an `Eof` token.
    pub fn new(source: &'src str, mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|token| token.token_type) != Some(TokenType::Eof) {
            let end = source.chars().count();
            tokens.push(Token::new(TokenType::Eof, String::new(), Span::new(end, end)));
        }
        Self {
            source,
            tokens,
            current: 0,
            depth: 0,
        }
    }

    /// Parse a complete expression; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expr, SyntaxError> {
        let expr = self.ternary()?;

        if !self.is_at_end() {
            let token = self.peek();
            return Err(self
                .error_at(token, format!("Unexpected {} after complete expression", describe(token)))
                .with_help("An expression ends here; combine further terms with an operator."));
        }

        Ok(expr)
    }

    fn expression(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(Self::ternary)
    }

    /// `a ? b : c ? d : e` is read as a flat chain of arms and folded
    /// from the right, so a long `else` chain does not recurse.
    fn ternary(&mut self) -> Result<Expr, SyntaxError> {
        let mut condition = self.logical_or()?;
        let mut arms = Vec::new();

        while self.match_types(&[TokenType::Question]) {
            let then_branch = self.expression()?;
            self.consume_with_help(
                TokenType::Colon,
                "Expected ':' in conditional expression",
                "Conditional expressions take the form: condition ? then : else",
            )?;
            arms.push((condition, then_branch));
            condition = self.logical_or()?;
        }

        let mut expr = condition;
        while let Some((condition, then_branch)) = arms.pop() {
            let span = condition.span().to(expr.span());
            expr = Expr::Ternary {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(expr),
                span,
            };
        }
        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.logical_and()?;

        while self.match_types(&[TokenType::PipePipe]) {
            let right = self.logical_and()?;
            expr = logical(expr, LogicalOp::Or, right);
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.logical_not()?;

        while self.match_types(&[TokenType::AmpAmp]) {
            let right = self.logical_not()?;
            expr = logical(expr, LogicalOp::And, right);
        }

        Ok(expr)
    }

    fn logical_not(&mut self) -> Result<Expr, SyntaxError> {
        if self.match_types(&[TokenType::Bang]) {
            let start = self.previous().span;
            let operand = self.prefix_operand(Self::logical_not)?;
            let span = start.to(operand.span());
            return Ok(Expr::Unary {
                operator: UnaryOp::Not,
                operand: Box::new(operand),
                span,
            });
        }

        self.relational()
    }

    fn relational(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_tier(
            &[
                TokenType::EqualEqual,
                TokenType::BangEqual,
                TokenType::Greater,
                TokenType::Less,
                TokenType::GreaterEqual,
                TokenType::LessEqual,
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_tier(&[TokenType::Plus, TokenType::Minus], Self::multiplicative)
    }

    fn multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_tier(
            &[
                TokenType::Star,
                TokenType::Slash,
                TokenType::SlashSlash,
                TokenType::Percent,
            ],
            Self::unary,
        )
    }

    /// Left-associative loop shared by the relational, additive and
    /// multiplicative tiers.
    fn binary_tier(
        &mut self,
        operators: &[TokenType],
        operand: fn(&mut Self) -> Result<Expr, SyntaxError>,
    ) -> Result<Expr, SyntaxError> {
        let mut expr = operand(self)?;

        while self.match_types(operators) {
            let operator_token = self.previous().clone();
            let right = self.operand_after(&operator_token, operand)?;
            let span = expr.span().to(right.span());

            expr = Expr::Binary {
                left: Box::new(expr),
                operator: binary_operator(operator_token.token_type),
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        if self.match_types(&[TokenType::Minus, TokenType::Plus]) {
            let operator_token = self.previous().clone();
            let operator = match operator_token.token_type {
                TokenType::Minus => UnaryOp::Negate,
                _ => UnaryOp::Plus,
            };

            let operand = self.prefix_operand(|parser| parser.operand_after(&operator_token, Self::unary))?;
            let span = operator_token.span.to(operand.span());
            return Ok(Expr::Unary {
                operator,
                operand: Box::new(operand),
                span,
            });
        }

        self.power()
    }

    fn power(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.postfix()?;

        if !self.match_types(&[TokenType::StarStar]) {
            return Ok(base);
        }

        // Recursing through `unary` makes `**` right-associative and lets
        // the exponent carry a sign: `2 ** -1`.
        let operator_token = self.previous().clone();
        let exponent = self.prefix_operand(|parser| parser.operand_after(&operator_token, Self::unary))?;
        let span = base.span().to(exponent.span());
        Ok(Expr::Binary {
            left: Box::new(base),
            operator: BinaryOp::Power,
            right: Box::new(exponent),
            span,
        })
    }

    fn postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.primary()?;

        loop {
            if self.match_types(&[TokenType::Dot]) {
                let name_token = self
                    .consume_with_help(
                        TokenType::Identifier,
                        "Expected attribute name after '.'",
                        "Attribute access takes the form: value.name",
                    )?
                    .clone();
                let span = expr.span().to(name_token.span);
                expr = Expr::Accessor {
                    target: Box::new(expr),
                    name: name_token.lexeme,
                    span,
                };
            } else if self.match_types(&[TokenType::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.match_types(&[TokenType::LeftBracket]) {
                expr = self.finish_subscript(expr)?;
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, SyntaxError> {
        let mut args = Vec::new();

        if !self.check(TokenType::RightParen) {
            loop {
                args.push(self.expression()?);
                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let paren = self.consume_with_help(
            TokenType::RightParen,
            "Expected ')' after arguments",
            "Calls take comma-separated arguments: func(arg1, arg2)",
        )?;
        let span = callee.span().to(paren.span);

        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
            span,
        })
    }

    fn finish_subscript(&mut self, target: Expr) -> Result<Expr, SyntaxError> {
        if self.check(TokenType::RightBracket) || self.is_at_end() {
            let token = self.peek();
            return Err(self
                .error_at(token, "Expected expression or ':' in subscript".to_string())
                .with_help("Subscripts take an index or a slice: value[0], value[1:], value[::-1]"));
        }

        let first = self.optional_slice_component()?;

        let index = if self.match_types(&[TokenType::Colon]) {
            let stop = self.optional_slice_component()?;
            let step = if self.match_types(&[TokenType::Colon]) {
                self.optional_slice_component()?
            } else {
                None
            };
            Index::Slice {
                start: first,
                stop,
                step,
            }
        } else {
            match first {
                Some(expr) => Index::Single(expr),
                None => {
                    let token = self.peek();
                    return Err(self.error_at(token, "Expected expression or ':' in subscript".to_string()));
                }
            }
        };

        let bracket = self.consume_with_help(
            TokenType::RightBracket,
            "Expected ']' after subscript",
            "A slice has at most three parts: value[start:stop:step]",
        )?;
        let span = target.span().to(bracket.span);

        Ok(Expr::Subscript {
            target: Box::new(target),
            index,
            span,
        })
    }

    fn optional_slice_component(&mut self) -> Result<Option<Box<Expr>>, SyntaxError> {
        if self.check(TokenType::Colon) || self.check(TokenType::RightBracket) {
            Ok(None)
        } else {
            Ok(Some(Box::new(self.expression()?)))
        }
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        if self.is_at_end() {
            let token = self.peek();
            return Err(self
                .error_at(token, "Unexpected end of input".to_string())
                .with_help("Expected an expression here. Check for unmatched parentheses or a dangling operator."));
        }

        let token = self.advance().clone();

        match token.token_type {
            TokenType::Integer => {
                let value = token.lexeme.parse::<i64>().map_err(|_| {
                    SyntaxError::new(self.source, token.span, format!("Invalid integer: {}", token.lexeme))
                })?;
                Ok(Expr::Literal {
                    value: Literal::Int(value),
                    span: token.span,
                })
            }
            TokenType::Float => {
                let value = token.lexeme.parse::<f64>().map_err(|_| {
                    SyntaxError::new(self.source, token.span, format!("Invalid float: {}", token.lexeme))
                })?;
                Ok(Expr::Literal {
                    value: Literal::Float(value),
                    span: token.span,
                })
            }
            TokenType::String => Ok(Expr::Literal {
                value: Literal::Str(token.lexeme),
                span: token.span,
            }),
            TokenType::Identifier => Ok(Expr::Identifier {
                name: token.lexeme,
                span: token.span,
            }),
            TokenType::LeftParen => {
                let expr = self.expression()?;
                self.consume_with_help(
                    TokenType::RightParen,
                    "Expected ')' after expression",
                    "Every opening parenthesis '(' must have a matching closing parenthesis ')'.",
                )?;
                Ok(expr)
            }
            _ => {
                let help_msg = match token.token_type {
                    TokenType::RightParen => "Found ')' without matching '('. Check for unbalanced parentheses.",
                    TokenType::RightBracket => "Found ']' without matching '['. Check for unbalanced brackets.",
                    TokenType::Bang => "'!' binds looser than comparisons; wrap it in parentheses: a + (!b)",
                    _ => "Expected a literal, an identifier, or a parenthesized expression here.",
                };

                Err(self
                    .error_at(&token, format!("Expected expression, found {}", describe(&token)))
                    .with_help(help_msg))
            }
        }
    }

    /// Parse the operand following `operator_token`, reporting a missing
    /// operand against the operator itself.
    fn operand_after(
        &mut self,
        operator_token: &Token,
        operand: fn(&mut Self) -> Result<Expr, SyntaxError>,
    ) -> Result<Expr, SyntaxError> {
        if self.is_at_end() {
            return Err(self
                .error_at(operator_token, format!("Expected expression after '{}'", operator_token.lexeme))
                .with_help("Operators require an expression on each side."));
        }
        operand(self)
    }

    /// Operand of a prefix operator or of `**`. A parenthesized operand is
    /// charged by the group itself.
    fn prefix_operand(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Expr, SyntaxError>,
    ) -> Result<Expr, SyntaxError> {
        if self.check(TokenType::LeftParen) {
            parse(self)
        } else {
            self.nested(parse)
        }
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, SyntaxError>) -> Result<T, SyntaxError> {
        if self.depth >= MAX_NESTING {
            let token = self.peek();
            return Err(self
                .error_at(token, "Expression nested too deeply".to_string())
                .with_help(format!("At most {} levels of nesting are supported.", MAX_NESTING)));
        }

        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn match_types(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(*token_type) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.peek().token_type == token_type
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn consume_with_help(&mut self, token_type: TokenType, message: &str, help: &str) -> Result<&Token, SyntaxError> {
        if self.check(token_type) {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(self
                .error_at(token, format!("{}, found {}", message, describe(token)))
                .with_help(help))
        }
    }

    fn error_at(&self, token: &Token, message: String) -> SyntaxError {
        // Eof is zero-width; widen it so the diagnostic has something to point at.
        let span = if token.token_type == TokenType::Eof {
            Span::single(token.span.start)
        } else {
            token.span
        };
        SyntaxError::new(self.source, span, message)
    }
}

fn describe(token: &Token) -> String {
    match token.token_type {
        TokenType::Eof => "end of input".to_string(),
        TokenType::String => format!("string {:?}", token.lexeme),
        TokenType::Identifier | TokenType::Integer | TokenType::Float => format!("'{}'", token.lexeme),
        other => other.describe().to_string(),
    }
}

fn logical(left: Expr, operator: LogicalOp, right: Expr) -> Expr {
    let span = left.span().to(right.span());
    Expr::Logical {
        left: Box::new(left),
        operator,
        right: Box::new(right),
        span,
    }
}

fn binary_operator(token_type: TokenType) -> BinaryOp {
    match token_type {
        TokenType::Plus => BinaryOp::Add,
        TokenType::Minus => BinaryOp::Subtract,
        TokenType::Star => BinaryOp::Multiply,
        TokenType::Slash => BinaryOp::Divide,
        TokenType::SlashSlash => BinaryOp::FloorDivide,
        TokenType::Percent => BinaryOp::Modulo,
        TokenType::EqualEqual => BinaryOp::Equal,
        TokenType::BangEqual => BinaryOp::NotEqual,
        TokenType::Greater => BinaryOp::Greater,
        TokenType::Less => BinaryOp::Less,
        TokenType::GreaterEqual => BinaryOp::GreaterEqual,
        TokenType::LessEqual => BinaryOp::LessEqual,
        other => unreachable!("{:?} is not a binary operator", other),
    }
}

/// Lex and parse `source` into an expression tree.
pub fn parse(source: &str) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(source)?;
    Parser::new(source, tokens).parse()
}

/// Parse an already lexed token sequence.
pub fn parse_tokens(source: &str, tokens: Vec<Token>) -> Result<Expr, SyntaxError> {
    Parser::new(source, tokens).parse()
}
