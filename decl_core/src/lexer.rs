use tracing::warn;

use crate::cursor::CharCursor;
use crate::cursor::StrCursor;
use crate::parser::ParseDiagnostic;
use crate::tokens::SyntaxToken;
use crate::tokens::TokenKind;

const OPENING_BRACE: char = '{';
const CLOSING_BRACE: char = '}';
const QUOTE: char = '"';

/// States of the scanner. Every call to [`Tokenizer::next`] starts over in
/// `Searching`; nothing carries over between tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexerState {
	/// Nothing found yet.
	Searching,
	/// On whitespace.
	Whitespace,
	/// On a bare word.
	Token,
	/// Within a braced block.
	BracedBlock,
	/// Within a quoted string inside a braced block.
	QuotedStringWithinBlock,
	/// Within a `/* block comment */`.
	BlockComment,
	/// On a `// comment` running to the end of the line.
	EolComment,
}

fn is_whitespace(ch: char) -> bool {
	matches!(ch, ' ' | '\t' | '\n' | '\x0b' | '\r')
}

/// Cuts a character stream into [`SyntaxToken`]s.
///
/// The tokenizer never fails. Unterminated comments and blocks are returned
/// as whatever was collected before the input ran out, and a diagnostic is
/// recorded.
#[derive(Debug)]
pub struct Tokenizer<C> {
	cursor: C,
	line: usize,
	diagnostics: Vec<ParseDiagnostic>,
}

impl<'a> Tokenizer<StrCursor<'a>> {
	pub fn from_source(source: &'a str) -> Self {
		Self::new(StrCursor::new(source))
	}
}

impl<C: CharCursor> Tokenizer<C> {
	pub fn new(cursor: C) -> Self {
		Self {
			cursor,
			line: 1,
			diagnostics: Vec::new(),
		}
	}

	/// Diagnostics recorded so far.
	pub fn diagnostics(&self) -> &[ParseDiagnostic] {
		&self.diagnostics
	}

	pub fn take_diagnostics(&mut self) -> Vec<ParseDiagnostic> {
		std::mem::take(&mut self.diagnostics)
	}

	/// The 1-indexed line of the cursor.
	pub fn line(&self) -> usize {
		self.line
	}

	pub fn into_cursor(self) -> C {
		self.cursor
	}

	fn bump(&mut self, value: &mut String) {
		if let Some(ch) = self.cursor.current() {
			if ch == '\n' {
				self.line += 1;
			}
			value.push(ch);
			self.cursor.advance();
		}
	}

	fn next_token(&mut self) -> Option<SyntaxToken> {
		let mut state = LexerState::Searching;
		let mut kind = TokenKind::Token;
		let mut value = String::new();
		let mut open_blocks = 0usize;
		let start_line = self.line;

		while let Some(ch) = self.cursor.current() {
			match state {
				LexerState::Searching => {
					if is_whitespace(ch) {
						state = LexerState::Whitespace;
						kind = TokenKind::Whitespace;
					} else if ch == OPENING_BRACE {
						state = LexerState::BracedBlock;
						kind = TokenKind::BracedBlock;
						open_blocks = 1;
					} else if ch == '/' && self.cursor.peek() == Some('*') {
						state = LexerState::BlockComment;
						kind = TokenKind::BlockComment;
						self.bump(&mut value);
					} else if ch == '/' && self.cursor.peek() == Some('/') {
						state = LexerState::EolComment;
						kind = TokenKind::EolComment;
						self.bump(&mut value);
					} else if ch == CLOSING_BRACE {
						// A stray closing brace is a token of its own.
						self.bump(&mut value);
						return Some(SyntaxToken::token(value));
					} else {
						state = LexerState::Token;
						kind = TokenKind::Token;
					}

					self.bump(&mut value);
				}
				LexerState::Whitespace => {
					if !is_whitespace(ch) {
						return Some(SyntaxToken { kind, value });
					}

					self.bump(&mut value);
				}
				LexerState::BracedBlock => {
					self.bump(&mut value);

					if ch == OPENING_BRACE {
						open_blocks += 1;
					} else if ch == CLOSING_BRACE {
						open_blocks -= 1;
						if open_blocks == 0 {
							return Some(SyntaxToken { kind, value });
						}
					} else if ch == QUOTE {
						state = LexerState::QuotedStringWithinBlock;
					}
				}
				LexerState::QuotedStringWithinBlock => {
					self.bump(&mut value);

					if ch == QUOTE {
						state = LexerState::BracedBlock;
					}
				}
				LexerState::BlockComment => {
					self.bump(&mut value);

					if ch == '*' && self.cursor.current() == Some('/') {
						self.bump(&mut value);
						return Some(SyntaxToken { kind, value });
					}
				}
				LexerState::EolComment => {
					// The line break belongs to the following whitespace token.
					if ch == '\r' || ch == '\n' {
						return Some(SyntaxToken { kind, value });
					}

					self.bump(&mut value);
				}
				LexerState::Token => {
					let starts_comment =
						ch == '/' && matches!(self.cursor.peek(), Some('*' | '/'));

					if ch == OPENING_BRACE
						|| ch == CLOSING_BRACE
						|| starts_comment
						|| is_whitespace(ch)
					{
						return Some(SyntaxToken { kind, value });
					}

					self.bump(&mut value);
				}
			}
		}

		match state {
			LexerState::BlockComment => {
				warn!(line = start_line, "unterminated block comment at end of input");
				self.diagnostics
					.push(ParseDiagnostic::UnterminatedBlockComment { line: start_line });
			}
			LexerState::BracedBlock | LexerState::QuotedStringWithinBlock => {
				warn!(
					line = start_line,
					open_blocks, "unterminated braced block at end of input"
				);
				self.diagnostics
					.push(ParseDiagnostic::UnterminatedBlock { line: start_line });
			}
			_ => {}
		}

		if value.is_empty() {
			None
		} else {
			Some(SyntaxToken { kind, value })
		}
	}
}

impl<C: CharCursor> Iterator for Tokenizer<C> {
	type Item = SyntaxToken;

	fn next(&mut self) -> Option<Self::Item> {
		self.next_token()
	}
}

/// Cut `source` into tokens.
pub fn tokenize(source: &str) -> Vec<SyntaxToken> {
	Tokenizer::from_source(source).collect()
}
