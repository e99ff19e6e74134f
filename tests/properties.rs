use arithc::{
    ast::{BinOp, Expr},
    lexer::{Lexer, TokenKind},
    parse,
};
use proptest::prelude::*;

const MAX_INPUT_BYTES: usize = 64;

fn arb_op() -> impl Strategy<Value = BinOp> {
    prop_oneof![Just(BinOp::Add), Just(BinOp::Sub), Just(BinOp::Mul), Just(BinOp::Div)]
}

fn arb_expr() -> impl Strategy<Value = Expr> {
    let leaf = (0..=i32::MAX).prop_map(Expr::literal);
    leaf.prop_recursive(6, 48, 2, |inner| {
        (arb_op(), inner.clone(), inner).prop_map(|(op, l, r)| Expr::binary(op, l, r))
    })
}

proptest! {
    #[test]
    fn rendered_trees_parse_back_unchanged(expr in arb_expr()) {
        let rendered = expr.to_string();
        prop_assert_eq!(parse(&rendered).unwrap(), expr);
    }

    #[test]
    fn parsing_twice_gives_equal_trees(expr in arb_expr()) {
        let rendered = expr.to_string();
        prop_assert_eq!(parse(&rendered).unwrap(), parse(&rendered).unwrap());
    }

    #[test]
    fn parser_never_panics_on_arbitrary_input(
        bytes in proptest::collection::vec(any::<u8>(), 0..=MAX_INPUT_BYTES)
    ) {
        let input = String::from_utf8_lossy(&bytes).into_owned();
        let _ = parse(&input);
    }

    #[test]
    fn lexer_ends_with_one_end_of_input_or_an_error(input in "[0-9+*/() \t-]{0,40}") {
        let items: Vec<_> = Lexer::new(&input).collect();
        let last = items.last().expect("lexer yields at least one item");
        match last {
            Ok(tok) => {
                prop_assert_eq!(tok.kind, TokenKind::EndOfInput);
                let ends = items
                    .iter()
                    .filter(|t| matches!(t, Ok(t) if t.kind == TokenKind::EndOfInput))
                    .count();
                prop_assert_eq!(ends, 1);
            }
            // only overflowing literals can fail on this alphabet
            Err(err) => prop_assert!(
                matches!(err, arithc::CompileError::NumberOverflow { .. }),
                "expected an overflowing literal, got {:?}",
                err
            ),
        }
    }

    #[test]
    fn subtraction_chains_fold_left(values in proptest::collection::vec(0..1000i32, 2..8)) {
        let source = values.iter().map(i32::to_string).collect::<Vec<_>>().join(" - ");
        let expected = values[1..].iter().fold(values[0], |acc, v| acc - v);
        prop_assert_eq!(parse(&source).unwrap().evaluate(), Some(expected));
    }
}
