use std::fmt::Display;

use crate::tokens::SyntaxToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxNodeKind {
	Root,
	Whitespace,
	Comment,
	DeclType,
	DeclName,
	Stray,
	DeclBlock,
}

/// An element of a parsed declaration file.
///
/// Leaf nodes wrap the token they were built from; rendering a node with
/// [`Display`] concatenates its leaves in document order, which reproduces
/// the source text the node covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxNode {
	Root(Vec<SyntaxNode>),
	Whitespace(SyntaxToken),
	Comment(SyntaxToken),
	DeclType(SyntaxToken),
	DeclName(SyntaxToken),
	/// A surplus header identifier. It plays no part in the declaration and
	/// is only kept so the tree renders back to its source.
	Stray(SyntaxToken),
	DeclBlock(DeclBlockSyntax),
}

impl SyntaxNode {
	pub fn kind(&self) -> SyntaxNodeKind {
		match self {
			Self::Root(_) => SyntaxNodeKind::Root,
			Self::Whitespace(_) => SyntaxNodeKind::Whitespace,
			Self::Comment(_) => SyntaxNodeKind::Comment,
			Self::DeclType(_) => SyntaxNodeKind::DeclType,
			Self::DeclName(_) => SyntaxNodeKind::DeclName,
			Self::Stray(_) => SyntaxNodeKind::Stray,
			Self::DeclBlock(_) => SyntaxNodeKind::DeclBlock,
		}
	}

	/// Child nodes. Only the root has children; a block's header is reached
	/// through [`DeclBlockSyntax::header_nodes`].
	pub fn children(&self) -> &[SyntaxNode] {
		match self {
			Self::Root(children) => children,
			_ => &[],
		}
	}

	/// The token of a leaf node.
	pub fn token(&self) -> Option<&SyntaxToken> {
		match self {
			Self::Whitespace(token)
			| Self::Comment(token)
			| Self::DeclType(token)
			| Self::DeclName(token)
			| Self::Stray(token) => Some(token),
			Self::Root(_) | Self::DeclBlock(_) => None,
		}
	}

	pub fn as_block(&self) -> Option<&DeclBlockSyntax> {
		match self {
			Self::DeclBlock(block) => Some(block),
			_ => None,
		}
	}

	fn write_to(&self, output: &mut String) {
		match self {
			Self::Root(children) => {
				for child in children {
					child.write_to(output);
				}
			}
			Self::Whitespace(token)
			| Self::Comment(token)
			| Self::DeclType(token)
			| Self::DeclName(token)
			| Self::Stray(token) => output.push_str(&token.value),
			Self::DeclBlock(block) => block.write_to(output),
		}
	}
}

impl Display for SyntaxNode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut output = String::new();
		self.write_to(&mut output);
		f.write_str(&output)
	}
}

/// A `[type] name { ... }` unit: the header nodes seen before the opening
/// brace plus the braced block itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclBlockSyntax {
	header: Vec<SyntaxNode>,
	block: SyntaxToken,
	name_index: Option<usize>,
	type_index: Option<usize>,
}

impl DeclBlockSyntax {
	/// `name_index` and `type_index` point into `header` and must reference
	/// `DeclName` and `DeclType` nodes respectively.
	pub(crate) fn new(
		block: SyntaxToken,
		header: Vec<SyntaxNode>,
		name_index: Option<usize>,
		type_index: Option<usize>,
	) -> Self {
		debug_assert!(
			name_index.is_none_or(|index| matches!(header.get(index), Some(SyntaxNode::DeclName(_))))
		);
		debug_assert!(
			type_index.is_none_or(|index| matches!(header.get(index), Some(SyntaxNode::DeclType(_))))
		);

		Self {
			header,
			block,
			name_index,
			type_index,
		}
	}

	pub fn header_nodes(&self) -> &[SyntaxNode] {
		&self.header
	}

	pub fn block_token(&self) -> &SyntaxToken {
		&self.block
	}

	/// The type identifier, present for `type name { }` headers.
	pub fn type_name(&self) -> Option<&str> {
		self.type_index
			.and_then(|index| self.header[index].token())
			.map(|token| token.value.as_str())
	}

	/// The name identifier, absent only for anonymous blocks.
	pub fn name(&self) -> Option<&str> {
		self.name_index
			.and_then(|index| self.header[index].token())
			.map(|token| token.value.as_str())
	}

	/// The raw text between the outer braces.
	pub fn block_contents(&self) -> &str {
		let value = self.block.value.as_str();
		let value = value.strip_prefix('{').unwrap_or(value);
		value.strip_suffix('}').unwrap_or(value)
	}

	fn write_to(&self, output: &mut String) {
		for node in &self.header {
			node.write_to(output);
		}
		output.push_str(&self.block.value);
	}
}

impl Display for DeclBlockSyntax {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut output = String::with_capacity(self.block.value.len() + self.header.len() * 16);
		self.write_to(&mut output);
		f.write_str(&output)
	}
}

/// A parsed declaration file. The root always exists, even for empty input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
	root: SyntaxNode,
}

impl Default for SyntaxTree {
	fn default() -> Self {
		Self {
			root: SyntaxNode::Root(Vec::new()),
		}
	}
}

impl SyntaxTree {
	pub(crate) fn from_nodes(nodes: Vec<SyntaxNode>) -> Self {
		Self {
			root: SyntaxNode::Root(nodes),
		}
	}

	pub fn root(&self) -> &SyntaxNode {
		&self.root
	}

	pub fn children(&self) -> &[SyntaxNode] {
		self.root.children()
	}

	/// All declaration blocks in document order.
	pub fn blocks(&self) -> impl Iterator<Item = &DeclBlockSyntax> {
		self.children().iter().filter_map(SyntaxNode::as_block)
	}

	pub fn into_blocks(self) -> impl Iterator<Item = DeclBlockSyntax> {
		let children = match self.root {
			SyntaxNode::Root(children) => children,
			_ => Vec::new(),
		};

		children.into_iter().filter_map(|node| {
			match node {
				SyntaxNode::DeclBlock(block) => Some(block),
				_ => None,
			}
		})
	}
}

impl Display for SyntaxTree {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.root.fmt(f)
	}
}
