use std::borrow::Cow;
use std::fmt::Debug;
use std::fs::Metadata;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::UNIX_EPOCH;

use derive_more::Display;
use serde::Deserialize;
use serde::Serialize;

use crate::syntax::DeclBlockSyntax;

/// A category of declaration.
///
/// The set is open: any string names a type. The constants cover the types
/// most content trees carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[display("{_0}")]
#[serde(transparent)]
pub struct DeclarationType(Cow<'static, str>);

impl DeclarationType {
	pub const ENTITY_DEF: Self = Self::from_static("entitydef");
	pub const FX: Self = Self::from_static("fx");
	pub const MATERIAL: Self = Self::from_static("material");
	pub const MODEL_DEF: Self = Self::from_static("model_def");
	pub const PARTICLE: Self = Self::from_static("particle");
	pub const SKIN: Self = Self::from_static("skin");
	pub const SOUND_SHADER: Self = Self::from_static("sound_shader");
	pub const TABLE: Self = Self::from_static("table");
	pub const XDATA: Self = Self::from_static("xdata");

	pub const fn from_static(name: &'static str) -> Self {
		Self(Cow::Borrowed(name))
	}

	pub fn new(name: impl Into<String>) -> Self {
		Self(Cow::Owned(name.into()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for DeclarationType {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

/// Size and modification time of a visited file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileFingerprint {
	pub size: u64,
	pub modified_unix_ms: u64,
}

impl FileFingerprint {
	pub fn from_metadata(metadata: &Metadata) -> Self {
		let modified_unix_ms = metadata
			.modified()
			.ok()
			.and_then(|time| time.duration_since(UNIX_EPOCH).ok())
			.and_then(|duration| duration.as_millis().try_into().ok())
			.unwrap_or(0);

		Self {
			size: metadata.len(),
			modified_unix_ms,
		}
	}
}

/// A declaration file found by a folder scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeclarationFile {
	/// Path relative to the content root, `/`-separated, e.g.
	/// `materials/base_wall.mtr`.
	pub name: String,
	/// The content root the file was found under.
	pub root: PathBuf,
	/// Label of the content root, usually the root's directory name.
	pub mod_name: String,
	pub fingerprint: FileFingerprint,
}

impl DeclarationFile {
	pub fn full_path(&self) -> PathBuf {
		self.root.join(Path::new(&self.name))
	}

	/// Whether `other` describes the same file with different contents.
	pub fn is_modified_relative_to(&self, other: &Self) -> bool {
		self.name == other.name && self.root == other.root && self.fingerprint != other.fingerprint
	}
}

/// The captured source of one declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeclarationBlockSyntax {
	/// The type keyword from the header, empty when the header had none.
	pub type_name: String,
	pub name: String,
	/// The text between the outer braces.
	pub contents: String,
	/// Header and braced block exactly as they appeared in the file.
	pub raw: String,
	pub mod_name: String,
	pub file: Option<DeclarationFile>,
}

impl DeclarationBlockSyntax {
	pub fn from_syntax(block: &DeclBlockSyntax, file: Option<DeclarationFile>) -> Self {
		Self {
			type_name: block.type_name().unwrap_or_default().to_string(),
			name: block.name().unwrap_or_default().to_string(),
			contents: block.block_contents().to_string(),
			raw: block.to_string(),
			mod_name: file
				.as_ref()
				.map(|file| file.mod_name.clone())
				.unwrap_or_default(),
			file,
		}
	}
}

/// A named, typed declaration. Implementations are shared behind an [`Arc`]
/// and must update their block syntax in place, so handles stay valid across
/// reloads.
pub trait Declaration: Send + Sync + Debug {
	fn decl_type(&self) -> &DeclarationType;
	fn decl_name(&self) -> &str;
	fn block_syntax(&self) -> DeclarationBlockSyntax;
	fn set_block_syntax(&self, block: DeclarationBlockSyntax);
}

/// Builds declarations of one fixed type.
pub trait DeclarationCreator: Send + Sync {
	fn decl_type(&self) -> DeclarationType;
	fn create_declaration(&self, name: &str, block: &DeclarationBlockSyntax) -> Arc<dyn Declaration>;
}

/// A declaration that only keeps its block syntax.
#[derive(Debug)]
pub struct BasicDeclaration {
	decl_type: DeclarationType,
	name: String,
	block: RwLock<DeclarationBlockSyntax>,
	revision: AtomicU64,
}

impl BasicDeclaration {
	pub fn new(decl_type: DeclarationType, name: impl Into<String>, block: DeclarationBlockSyntax) -> Self {
		Self {
			decl_type,
			name: name.into(),
			block: RwLock::new(block),
			revision: AtomicU64::new(0),
		}
	}

	/// Number of times the block syntax was replaced.
	pub fn revision(&self) -> u64 {
		self.revision.load(Ordering::Acquire)
	}
}

impl Declaration for BasicDeclaration {
	fn decl_type(&self) -> &DeclarationType {
		&self.decl_type
	}

	fn decl_name(&self) -> &str {
		&self.name
	}

	fn block_syntax(&self) -> DeclarationBlockSyntax {
		self.block
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	fn set_block_syntax(&self, block: DeclarationBlockSyntax) {
		*self.block.write().unwrap_or_else(PoisonError::into_inner) = block;
		self.revision.fetch_add(1, Ordering::AcqRel);
	}
}

/// Creator producing [`BasicDeclaration`]s of a configurable type.
#[derive(Debug, Clone)]
pub struct BasicCreator {
	decl_type: DeclarationType,
}

impl BasicCreator {
	pub fn new(decl_type: DeclarationType) -> Self {
		Self { decl_type }
	}
}

impl DeclarationCreator for BasicCreator {
	fn decl_type(&self) -> DeclarationType {
		self.decl_type.clone()
	}

	fn create_declaration(&self, name: &str, block: &DeclarationBlockSyntax) -> Arc<dyn Declaration> {
		Arc::new(BasicDeclaration::new(self.decl_type.clone(), name, block.clone()))
	}
}
