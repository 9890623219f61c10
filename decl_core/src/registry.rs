use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use crate::DeclError;
use crate::DeclResult;
use crate::declaration::DeclarationCreator;
use crate::declaration::DeclarationType;

/// Keyword → creator bindings.
///
/// Keywords are the type identifiers found in declaration headers, e.g.
/// `material` in `material textures/base/wall { ... }`. They are matched
/// ASCII case-insensitively.
#[derive(Default)]
pub struct DeclarationRegistry {
	creators_by_typename: HashMap<String, Arc<dyn DeclarationCreator>>,
	creators_by_type: HashMap<DeclarationType, Arc<dyn DeclarationCreator>>,
}

impl std::fmt::Debug for DeclarationRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DeclarationRegistry")
			.field("type_names", &self.type_names())
			.finish_non_exhaustive()
	}
}

/// Outcome of resolving a parsed block against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
	/// A creator exists for this type.
	Resolved(DeclarationType),
	/// No creator yet; the block waits under this key.
	Deferred(PendingKey),
}

/// What an unrecognised block is waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PendingKey {
	/// A header keyword nobody registered yet (lowercased).
	Keyword(String),
	/// A header-less block whose folder default type has no creator.
	DefaultType(DeclarationType),
}

impl Display for PendingKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Keyword(keyword) => write!(f, "{keyword}"),
			Self::DefaultType(decl_type) => write!(f, "{decl_type} (default)"),
		}
	}
}

fn keyword_key(type_name: &str) -> String {
	type_name.to_ascii_lowercase()
}

impl DeclarationRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Bind `type_name` to `creator`. A keyword can only be bound once, even
	/// to a different creator instance.
	pub fn register(&mut self, type_name: &str, creator: Arc<dyn DeclarationCreator>) -> DeclResult<()> {
		let key = keyword_key(type_name);
		if self.creators_by_typename.contains_key(&key) {
			return Err(DeclError::AlreadyRegistered(type_name.to_string()));
		}

		self.creators_by_type
			.insert(creator.decl_type(), Arc::clone(&creator));
		self.creators_by_typename.insert(key, creator);

		Ok(())
	}

	/// Remove the binding for `type_name` and return its creator.
	pub fn unregister(&mut self, type_name: &str) -> DeclResult<Arc<dyn DeclarationCreator>> {
		let creator = self
			.creators_by_typename
			.remove(&keyword_key(type_name))
			.ok_or_else(|| DeclError::NotRegistered(type_name.to_string()))?;

		let decl_type = creator.decl_type();
		let replacement = self
			.creators_by_typename
			.values()
			.find(|other| other.decl_type() == decl_type)
			.cloned();

		match replacement {
			Some(other) => {
				self.creators_by_type.insert(decl_type, other);
			}
			None => {
				self.creators_by_type.remove(&decl_type);
			}
		}

		Ok(creator)
	}

	pub fn creator_for_keyword(&self, type_name: &str) -> Option<Arc<dyn DeclarationCreator>> {
		self.creators_by_typename
			.get(&keyword_key(type_name))
			.cloned()
	}

	pub fn creator_for_type(&self, decl_type: &DeclarationType) -> Option<Arc<dyn DeclarationCreator>> {
		self.creators_by_type.get(decl_type).cloned()
	}

	pub fn is_registered(&self, type_name: &str) -> bool {
		self.creators_by_typename
			.contains_key(&keyword_key(type_name))
	}

	/// All registered keywords, sorted.
	pub fn type_names(&self) -> Vec<String> {
		let mut names: Vec<_> = self.creators_by_typename.keys().cloned().collect();
		names.sort();
		names
	}

	/// Determine the type of a block with header keyword `type_name` (empty
	/// when the header had none) found in a folder defaulting to
	/// `default_type`.
	pub fn resolve(&self, type_name: &str, default_type: &DeclarationType) -> Resolution {
		if type_name.is_empty() {
			return if self.creators_by_type.contains_key(default_type) {
				Resolution::Resolved(default_type.clone())
			} else {
				Resolution::Deferred(PendingKey::DefaultType(default_type.clone()))
			};
		}

		match self.creator_for_keyword(type_name) {
			Some(creator) => Resolution::Resolved(creator.decl_type()),
			None => Resolution::Deferred(PendingKey::Keyword(keyword_key(type_name))),
		}
	}

	/// Re-resolve a block that was deferred under `key`.
	pub fn resolve_pending(&self, key: &PendingKey) -> Option<DeclarationType> {
		match key {
			PendingKey::Keyword(keyword) => self.creator_for_keyword(keyword).map(|c| c.decl_type()),
			PendingKey::DefaultType(decl_type) => {
				self.creators_by_type
					.contains_key(decl_type)
					.then(|| decl_type.clone())
			}
		}
	}
}

/// A folder whose files are scanned for declarations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegisteredFolder {
	/// Folder relative to every content root, always ending in `/`.
	pub folder: String,
	/// File extension including the leading dot, e.g. `.mtr`.
	pub extension: String,
	/// Type assumed for blocks without a type keyword.
	pub default_type: DeclarationType,
}

impl RegisteredFolder {
	/// Normalise `folder` to a trailing `/` and `extension` to a leading `.`.
	pub fn new(default_type: DeclarationType, folder: &str, extension: &str) -> Self {
		let mut folder = folder.replace('\\', "/");
		if !folder.is_empty() && !folder.ends_with('/') {
			folder.push('/');
		}

		let extension = if extension.is_empty() || extension.starts_with('.') {
			extension.to_string()
		} else {
			format!(".{extension}")
		};

		Self {
			folder,
			extension,
			default_type,
		}
	}
}
