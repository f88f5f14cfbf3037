#![forbid(unsafe_code)]

mod lexer;
mod token;

pub use lexer::{LexError, Lexer};
pub use token::{Token, TokenKind};

#[cfg(test)]
mod tests {
	use super::*;

	fn kinds(src: &str) -> Vec<TokenKind> {
		Lexer::new(src).lex().unwrap().into_iter().map(|t| t.kind).collect()
	}

	#[test]
	fn lex_keywords_match_whole_words_only() {
		assert_eq!(
			kinds("and android not nothing forall forallx True Truthy"),
			vec![
				TokenKind::KwAnd,
				TokenKind::Ident("android".into()),
				TokenKind::KwNot,
				TokenKind::Ident("nothing".into()),
				TokenKind::KwForall,
				TokenKind::Ident("forallx".into()),
				TokenKind::KwTrue,
				TokenKind::Ident("Truthy".into()),
				TokenKind::Eof,
			]
		);
	}

	#[test]
	fn lex_prefers_longest_operator() {
		assert_eq!(
			kinds("a <==> b ==> c == d <= e :: f : g"),
			vec![
				TokenKind::Ident("a".into()),
				TokenKind::Iff,
				TokenKind::Ident("b".into()),
				TokenKind::Implies,
				TokenKind::Ident("c".into()),
				TokenKind::EqEq,
				TokenKind::Ident("d".into()),
				TokenKind::Le,
				TokenKind::Ident("e".into()),
				TokenKind::ColonColon,
				TokenKind::Ident("f".into()),
				TokenKind::Colon,
				TokenKind::Ident("g".into()),
				TokenKind::Eof,
			]
		);
	}

	#[test]
	fn lex_double_slash_is_division() {
		assert_eq!(
			kinds("n // 2 / 3 % 4"),
			vec![
				TokenKind::Ident("n".into()),
				TokenKind::Slash,
				TokenKind::Int(2),
				TokenKind::Slash,
				TokenKind::Int(3),
				TokenKind::Percent,
				TokenKind::Int(4),
				TokenKind::Eof,
			]
		);
	}

	#[test]
	fn lex_spans_are_byte_offsets() {
		let tokens = Lexer::new("x  >= 10").lex().unwrap();
		assert_eq!(tokens[1].span.offset(), 3);
		assert_eq!(tokens[1].span.len(), 2);
		assert_eq!(tokens[2].span.offset(), 6);
		assert_eq!(tokens[3].kind, TokenKind::Eof);
		assert_eq!(tokens[3].span.offset(), 8);
	}

	#[test]
	fn lex_rejects_unknown_characters() {
		let err = Lexer::new("x & y").lex().unwrap_err();
		assert!(err.message.contains("unexpected token"));
		assert_eq!(err.span.offset(), 2);
	}

	#[test]
	fn lex_rejects_generated_names() {
		let err = Lexer::new("x$0 > 1").lex().unwrap_err();
		assert_eq!(err.span.offset(), 1);
	}

	#[test]
	fn lex_rejects_out_of_range_integers() {
		let err = Lexer::new("99999999999999999999").lex().unwrap_err();
		assert!(err.message.contains("out of range"));
	}
}
