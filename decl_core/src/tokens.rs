use std::fmt::Display;

/// The category of a [`SyntaxToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
	/// A run of ` `, `\t`, `\r`, `\n` or `\x0b`.
	Whitespace,
	/// `{ ... }` including both braces, possibly unterminated.
	BracedBlock,
	/// A bare word, e.g. `material` or `textures/common/caulk`.
	Token,
	/// `// ...` up to, but excluding, the line break.
	EolComment,
	/// `/* ... */` including both delimiters, possibly unterminated.
	BlockComment,
}

impl TokenKind {
	pub fn is_comment(self) -> bool {
		matches!(self, Self::EolComment | Self::BlockComment)
	}
}

/// A snippet of source text. The raw `value` is kept byte-exact so the
/// original text can be reassembled from the token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxToken {
	pub kind: TokenKind,
	pub value: String,
}

impl SyntaxToken {
	pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
		Self {
			kind,
			value: value.into(),
		}
	}

	pub fn whitespace(value: impl Into<String>) -> Self {
		Self::new(TokenKind::Whitespace, value)
	}

	pub fn token(value: impl Into<String>) -> Self {
		Self::new(TokenKind::Token, value)
	}

	pub fn braced_block(value: impl Into<String>) -> Self {
		Self::new(TokenKind::BracedBlock, value)
	}

	pub fn eol_comment(value: impl Into<String>) -> Self {
		Self::new(TokenKind::EolComment, value)
	}

	pub fn block_comment(value: impl Into<String>) -> Self {
		Self::new(TokenKind::BlockComment, value)
	}
}

impl Display for SyntaxToken {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.value)
	}
}
