use std::io::BufRead;

use tracing::warn;

use crate::DeclResult;
use crate::cursor::CharCursor;
use crate::cursor::ReaderCursor;
use crate::cursor::StrCursor;
use crate::lexer::Tokenizer;
use crate::syntax::DeclBlockSyntax;
use crate::syntax::SyntaxNode;
use crate::syntax::SyntaxTree;
use crate::tokens::SyntaxToken;
use crate::tokens::TokenKind;

/// A diagnostic produced during parsing. These are issues that don't prevent
/// parsing from completing but indicate problems in the source content.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseDiagnostic {
	/// A third identifier appeared before the opening brace. It is ignored.
	ExtraHeaderToken { token: String, line: usize },
	/// A braced block without any name in front of it.
	AnonymousBlock { line: usize },
	/// Identifiers at the end of the input never followed by a block.
	DanglingHeader { line: usize },
	/// A `/*` comment still open at the end of the input.
	UnterminatedBlockComment { line: usize },
	/// A `{` block still open at the end of the input.
	UnterminatedBlock { line: usize },
}

impl ParseDiagnostic {
	/// 1-indexed line the problem starts on.
	pub fn line(&self) -> usize {
		match self {
			Self::ExtraHeaderToken { line, .. }
			| Self::AnonymousBlock { line }
			| Self::DanglingHeader { line }
			| Self::UnterminatedBlockComment { line }
			| Self::UnterminatedBlock { line } => *line,
		}
	}

	/// Human-readable message for this diagnostic.
	pub fn message(&self) -> String {
		match self {
			Self::ExtraHeaderToken { token, .. } => {
				format!("invalid number of decl block headers, already got a name and type (`{token}`)")
			}
			Self::AnonymousBlock { .. } => "unnamed block encountered".to_string(),
			Self::DanglingHeader { .. } => "declaration header without a block".to_string(),
			Self::UnterminatedBlockComment { .. } => "unterminated block comment".to_string(),
			Self::UnterminatedBlock { .. } => "unterminated braced block".to_string(),
		}
	}
}

/// Groups the token stream into a one-level tree below the root.
#[derive(Debug)]
struct SyntaxTreeBuilder<C> {
	tokens: Tokenizer<C>,
	nodes: Vec<SyntaxNode>,
	header: Vec<SyntaxNode>,
	header_line: usize,
	name_index: Option<usize>,
	type_index: Option<usize>,
	diagnostics: Vec<ParseDiagnostic>,
}

impl<C: CharCursor> SyntaxTreeBuilder<C> {
	fn new(cursor: C) -> Self {
		Self {
			tokens: Tokenizer::new(cursor),
			nodes: Vec::new(),
			header: Vec::new(),
			header_line: 1,
			name_index: None,
			type_index: None,
			diagnostics: Vec::new(),
		}
	}

	fn build(mut self) -> (SyntaxTree, Vec<ParseDiagnostic>, C) {
		loop {
			let line = self.tokens.line();
			let Some(token) = self.tokens.next() else {
				break;
			};
			self.diagnostics.append(&mut self.tokens.take_diagnostics());

			match token.kind {
				TokenKind::Whitespace => self.push_trivia(SyntaxNode::Whitespace(token)),
				TokenKind::EolComment | TokenKind::BlockComment => {
					self.push_trivia(SyntaxNode::Comment(token));
				}
				TokenKind::Token => self.push_identifier(token, line),
				TokenKind::BracedBlock => self.finish_block(token, line),
			}
		}

		if !self.header.is_empty() {
			warn!(line = self.header_line, "declaration header without a block");
			self.diagnostics.push(ParseDiagnostic::DanglingHeader {
				line: self.header_line,
			});
			self.nodes.append(&mut self.header);
		}

		(
			SyntaxTree::from_nodes(self.nodes),
			self.diagnostics,
			self.tokens.into_cursor(),
		)
	}

	/// Whitespace and comments outside a header go straight to the root.
	fn push_trivia(&mut self, node: SyntaxNode) {
		if self.name_index.is_some() {
			self.header.push(node);
		} else {
			self.nodes.push(node);
		}
	}

	fn push_identifier(&mut self, token: SyntaxToken, line: usize) {
		let Some(name_index) = self.name_index else {
			self.header_line = line;
			self.name_index = Some(self.header.len());
			self.header.push(SyntaxNode::DeclName(token));
			return;
		};

		if self.type_index.is_none() {
			// A second identifier means the first one was the type.
			if let SyntaxNode::DeclName(first) = &self.header[name_index] {
				let first = first.clone();
				self.header[name_index] = SyntaxNode::DeclType(first);
			}
			self.type_index = Some(name_index);
			self.name_index = Some(self.header.len());
			self.header.push(SyntaxNode::DeclName(token));
			return;
		}

		warn!(
			line,
			token = token.value.as_str(),
			"invalid number of decl block headers, already got a name and type"
		);
		self.diagnostics.push(ParseDiagnostic::ExtraHeaderToken {
			token: token.value.clone(),
			line,
		});
		self.header.push(SyntaxNode::Stray(token));
	}

	fn finish_block(&mut self, token: SyntaxToken, line: usize) {
		if self.name_index.is_none() {
			warn!(line, "unnamed block encountered");
			self.diagnostics
				.push(ParseDiagnostic::AnonymousBlock { line });
			self.nodes.push(SyntaxNode::DeclBlock(DeclBlockSyntax::new(
				token,
				Vec::new(),
				None,
				None,
			)));
			return;
		}

		let header = std::mem::take(&mut self.header);
		let block = DeclBlockSyntax::new(token, header, self.name_index.take(), self.type_index.take());
		self.nodes.push(SyntaxNode::DeclBlock(block));
	}
}

/// Parse declaration text into a syntax tree. Never fails; problems are
/// logged and recovered from.
pub fn parse(content: impl AsRef<str>) -> SyntaxTree {
	parse_with_diagnostics(content).0
}

/// Parse declaration text and return the tree together with diagnostics.
pub fn parse_with_diagnostics(content: impl AsRef<str>) -> (SyntaxTree, Vec<ParseDiagnostic>) {
	let (tree, diagnostics, _) = parse_cursor(StrCursor::new(content.as_ref()));
	(tree, diagnostics)
}

/// Parse a streamed file. Only an I/O error while reading fails the call.
pub fn parse_reader<R: BufRead>(reader: R) -> DeclResult<(SyntaxTree, Vec<ParseDiagnostic>)> {
	let (tree, diagnostics, mut cursor) = parse_cursor(ReaderCursor::new(reader));
	if let Some(error) = cursor.take_error() {
		return Err(error.into());
	}

	Ok((tree, diagnostics))
}

/// Parse from any cursor, handing the cursor back afterwards.
pub fn parse_cursor<C: CharCursor>(cursor: C) -> (SyntaxTree, Vec<ParseDiagnostic>, C) {
	SyntaxTreeBuilder::new(cursor).build()
}
