//! Precedence-climbing parser producing a single expression tree.

use tracing::debug;

use crate::{
    ast::{BinOp, Expr},
    error::{CompileError, CompileResult},
    lexer::{Lexer, Span, Token, TokenKind},
};

// Grammar (precedence climbing, low to high):
//   expr   := term ( ('+' | '-') term )*
//   term   := factor ( ('*' | '/') factor )*
//   factor := NUMBER | '(' expr ')'
//
// operators:
//   infix left:  '*','/'    binding power: 7
//   infix left:  '+','-'    binding power: 5

/// Deepest tree (and deepest parenthesis nesting) accepted. Later stages walk
/// the tree recursively, so this bounds their stack use too.
pub const MAX_DEPTH: usize = 1000;

/// Parse a complete source string, requiring every token to be consumed.
pub fn parse(src: &str) -> CompileResult<Expr> {
    let mut parser = Parser::new(src)?;
    let expr = parser.parse_expr()?;
    debug!(
        tokens = parser.tokens_read(),
        depth = expr.depth(),
        nodes = expr.node_count(),
        "parsed expression"
    );
    Ok(expr)
}

/// One-token-lookahead parser over a lazy [`Lexer`].
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    tokens_read: usize,
    open_parens: usize,
}

impl<'a> Parser<'a> {
    /// Create a parser positioned on the first token of `src`.
    pub fn new(src: &'a str) -> CompileResult<Self> {
        let mut lexer = Lexer::new(src);
        let mut tokens_read = 0;
        let current = next_token(&mut lexer, &mut tokens_read)?;
        Ok(Self { lexer, current, tokens_read, open_parens: 0 })
    }

    /// Tokens pulled from the lexer so far, `EndOfInput` included.
    pub fn tokens_read(&self) -> usize {
        self.tokens_read
    }

    /// Parse a whole expression and reject trailing tokens.
    pub fn parse_expr(&mut self) -> CompileResult<Expr> {
        let (expr, _) = self.parse_bp(0)?;
        if self.current.kind != TokenKind::EndOfInput {
            return Err(self.unexpected("an operator or end of input"));
        }
        Ok(expr)
    }

    fn bump(&mut self) -> CompileResult<Token> {
        let next = next_token(&mut self.lexer, &mut self.tokens_read)?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn unexpected(&self, expected: impl Into<String>) -> CompileError {
        CompileError::Syntax {
            found: self.current.kind.to_string(),
            position: self.current.span.start,
            expected: expected.into(),
        }
    }

    fn too_deep(&self) -> CompileError {
        self.unexpected(format!("nesting depth <= {MAX_DEPTH}"))
    }

    /// Each operator has a binding power; the loop folds operators of equal
    /// power to the left, and recursion with a raised `min_bp` handles the
    /// tighter-binding ones.
    ///
    /// Returns the subtree together with its depth.
    fn parse_bp(&mut self, min_bp: u8) -> CompileResult<(Expr, usize)> {
        let (mut lhs, mut depth) = self.parse_factor()?;

        loop {
            let (l_bp, r_bp, op) = match self.current.kind {
                TokenKind::Plus => (5, 6, BinOp::Add),
                TokenKind::Minus => (5, 6, BinOp::Sub),
                TokenKind::Star => (7, 8, BinOp::Mul),
                TokenKind::Slash => (7, 8, BinOp::Div),
                _ => break,
            };
            if l_bp < min_bp {
                break;
            }
            self.bump()?; // consume operator
            let (rhs, rhs_depth) = self.parse_bp(r_bp)?;
            depth = depth.max(rhs_depth) + 1;
            if depth > MAX_DEPTH {
                return Err(self.too_deep());
            }
            lhs = Expr::binary(op, lhs, rhs);
        }

        Ok((lhs, depth))
    }

    fn parse_factor(&mut self) -> CompileResult<(Expr, usize)> {
        match self.current.kind {
            TokenKind::Number(v) => {
                self.bump()?;
                Ok((Expr::literal(v), 1))
            }
            TokenKind::LParen => {
                if self.open_parens >= MAX_DEPTH {
                    return Err(self.too_deep());
                }
                self.open_parens += 1;
                let open = self.bump()?;
                let inner = self.parse_bp(0)?;
                if self.current.kind != TokenKind::RParen {
                    return Err(self.unexpected(format!("')' to close '(' at {}", open.span.start)));
                }
                self.bump()?;
                self.open_parens -= 1;
                Ok(inner)
            }
            _ => Err(self.unexpected("a number or '('")),
        }
    }
}

fn next_token(lexer: &mut Lexer<'_>, tokens_read: &mut usize) -> CompileResult<Token> {
    match lexer.next() {
        Some(tok) => {
            *tokens_read += 1;
            tok
        }
        // the lexer is fused after `EndOfInput`; keep handing that token back
        None => {
            let end = lexer.source().len();
            Ok(Token { kind: TokenKind::EndOfInput, span: Span::new(end, end) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(v: i32) -> Expr {
        Expr::literal(v)
    }

    fn syntax_error(src: &str) -> (String, usize, String) {
        match parse(src) {
            Err(CompileError::Syntax { found, position, expected }) => (found, position, expected),
            other => panic!("expected syntax error for {src:?}, got {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter() {
        assert_eq!(
            parse("3 + 4 * 2").unwrap(),
            Expr::binary(BinOp::Add, lit(3), Expr::binary(BinOp::Mul, lit(4), lit(2)))
        );
    }

    #[test]
    fn equal_precedence_folds_left() {
        assert_eq!(
            parse("10 - 2 - 3").unwrap(),
            Expr::binary(BinOp::Sub, Expr::binary(BinOp::Sub, lit(10), lit(2)), lit(3))
        );
        assert_eq!(
            parse("8 / 4 * 2").unwrap(),
            Expr::binary(BinOp::Mul, Expr::binary(BinOp::Div, lit(8), lit(4)), lit(2))
        );
    }

    #[test]
    fn parentheses_override_precedence() {
        assert_eq!(
            parse("(3 + 4) * 2").unwrap(),
            Expr::binary(BinOp::Mul, Expr::binary(BinOp::Add, lit(3), lit(4)), lit(2))
        );
        assert_eq!(parse("((42))").unwrap(), lit(42));
    }

    #[test]
    fn bare_literal() {
        assert_eq!(parse("42").unwrap(), lit(42));
    }

    #[test]
    fn reparsing_yields_equal_trees() {
        let src = "3 + 4 * (2 - 1)";
        assert_eq!(parse(src).unwrap(), parse(src).unwrap());
    }

    #[test]
    fn missing_operand_is_syntax_error() {
        let (found, position, expected) = syntax_error("3 + * 4");
        assert_eq!(found, "'*'");
        assert_eq!(position, 4);
        assert_eq!(expected, "a number or '('");
    }

    #[test]
    fn unclosed_paren_is_syntax_error() {
        let (found, position, expected) = syntax_error("(3 + 4");
        assert_eq!(found, "end of input");
        assert_eq!(position, 6);
        assert_eq!(expected, "')' to close '(' at 0");
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let (found, position, _) = syntax_error("1 2");
        assert_eq!(found, "number 2");
        assert_eq!(position, 2);
        let (found, _, _) = syntax_error("(1))");
        assert_eq!(found, "')'");
    }

    #[test]
    fn empty_source_is_syntax_error() {
        let (found, position, _) = syntax_error("   ");
        assert_eq!(found, "end of input");
        assert_eq!(position, 3);
    }

    fn nested(depth: usize) -> String {
        format!("{}1{}", "(".repeat(depth), ")".repeat(depth))
    }

    #[test]
    fn nesting_up_to_the_limit_is_accepted() {
        assert_eq!(parse(&nested(MAX_DEPTH)).unwrap(), lit(1));
        let chain = vec!["1"; MAX_DEPTH].join(" + ");
        let expr = parse(&chain).unwrap();
        assert_eq!(expr.depth(), MAX_DEPTH);
        assert_eq!(expr.evaluate(), Some(MAX_DEPTH as i32));
    }

    #[test]
    fn deep_parentheses_are_a_syntax_error() {
        let src = nested(20_000);
        let (found, position, expected) = syntax_error(&src);
        assert_eq!(found, "'('");
        assert_eq!(position, MAX_DEPTH);
        assert_eq!(expected, format!("nesting depth <= {MAX_DEPTH}"));
    }

    #[test]
    fn long_operator_chains_are_bounded() {
        let chain = vec!["1"; 20_000].join(" - ");
        let (_, _, expected) = syntax_error(&chain);
        assert_eq!(expected, format!("nesting depth <= {MAX_DEPTH}"));
    }

    #[test]
    fn counts_tokens_read() {
        let mut parser = Parser::new("3 + 4 * (2 - 1)").unwrap();
        parser.parse_expr().unwrap();
        assert_eq!(parser.tokens_read(), 10);
    }

    #[test]
    fn lex_errors_propagate_unchanged() {
        match parse("3 & 4") {
            Err(CompileError::Lex { ch: '&', position: 2 }) => {}
            other => panic!("expected lex error, got {other:?}"),
        }
    }
}
