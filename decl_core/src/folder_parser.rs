use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use tracing::debug;
use tracing::warn;

use crate::DeclError;
use crate::ScanOptions;
use crate::declaration::DeclarationBlockSyntax;
use crate::declaration::DeclarationFile;
use crate::declaration::DeclarationType;
use crate::file_source::FileSource;
use crate::parser::parse_reader;
use crate::registry::DeclarationRegistry;
use crate::registry::PendingKey;
use crate::registry::RegisteredFolder;
use crate::registry::Resolution;

/// A parsed block whose type currently has no creator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBlock {
	pub key: PendingKey,
	pub block: DeclarationBlockSyntax,
	/// Default type of the scan that found the block.
	pub origin: DeclarationType,
}

/// Files that differ between two visits of the same folders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileChanges {
	pub added: Vec<String>,
	pub removed: Vec<String>,
	pub modified: Vec<String>,
}

impl FileChanges {
	pub fn between(previous: &BTreeSet<DeclarationFile>, current: &BTreeSet<DeclarationFile>) -> Self {
		let previous_by_name: BTreeMap<_, _> = previous.iter().map(|file| (&file.name, file)).collect();
		let current_by_name: BTreeMap<_, _> = current.iter().map(|file| (&file.name, file)).collect();
		let mut changes = Self::default();

		for (name, file) in &current_by_name {
			match previous_by_name.get(name) {
				None => changes.added.push((*name).clone()),
				Some(old) if file.is_modified_relative_to(old) || file.root != old.root => {
					changes.modified.push((*name).clone());
				}
				Some(_) => {}
			}
		}

		changes.removed = previous_by_name
			.keys()
			.filter(|name| !current_by_name.contains_key(*name))
			.map(|name| (*name).clone())
			.collect();

		changes
	}

	pub fn is_empty(&self) -> bool {
		self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
	}
}

/// Everything one folder scan produced.
#[derive(Debug, Default)]
pub struct ScanOutput {
	/// Resolved blocks per type, in file order.
	pub parsed: BTreeMap<DeclarationType, Vec<DeclarationBlockSyntax>>,
	pub unresolved: Vec<PendingBlock>,
	pub files: BTreeSet<DeclarationFile>,
	pub changes: FileChanges,
}

/// Scans every folder registered for one default type.
pub struct DeclarationFolderParser {
	default_type: DeclarationType,
	folders: Vec<RegisteredFolder>,
	source: Arc<dyn FileSource>,
	options: ScanOptions,
}

impl DeclarationFolderParser {
	pub fn new(
		default_type: DeclarationType,
		folders: Vec<RegisteredFolder>,
		source: Arc<dyn FileSource>,
		options: ScanOptions,
	) -> Self {
		Self {
			default_type,
			folders,
			source,
			options,
		}
	}

	/// Enumerate and parse all files. `previous` is the visited set of the
	/// last completed scan and only feeds [`ScanOutput::changes`].
	pub fn run(
		&self,
		registry: &RwLock<DeclarationRegistry>,
		previous: &BTreeSet<DeclarationFile>,
	) -> ScanOutput {
		let mut output = ScanOutput::default();

		for folder in &self.folders {
			let mut files = Vec::new();
			self.source.for_each_file(
				&folder.folder,
				&folder.extension,
				self.options.max_depth,
				&mut |file| files.push(file),
			);

			debug!(
				folder = folder.folder.as_str(),
				extension = folder.extension.as_str(),
				files = files.len(),
				"scanning declaration folder"
			);

			for file in files {
				if output.files.contains(&file) {
					continue;
				}
				self.parse_file(&file, registry, &mut output);
			}
		}

		output.changes = FileChanges::between(previous, &output.files);
		output
	}

	fn parse_file(
		&self,
		file: &DeclarationFile,
		registry: &RwLock<DeclarationRegistry>,
		output: &mut ScanOutput,
	) {
		if file.fingerprint.size > self.options.max_file_size {
			let error = DeclError::FileTooLarge {
				path: file.name.clone(),
				size: file.fingerprint.size,
				limit: self.options.max_file_size,
			};
			warn!(%error, "skipping declaration file");
			return;
		}

		let reader = match self.source.open(file) {
			Ok(reader) => reader,
			Err(error) => {
				warn!(file = file.name.as_str(), %error, "failed to open declaration file, skipping");
				return;
			}
		};

		let (tree, diagnostics) = match parse_reader(reader) {
			Ok(parsed) => parsed,
			Err(error) => {
				warn!(file = file.name.as_str(), %error, "failed to read declaration file, skipping");
				return;
			}
		};

		for diagnostic in &diagnostics {
			debug!(
				file = file.name.as_str(),
				line = diagnostic.line(),
				"{}",
				diagnostic.message()
			);
		}

		let registry = registry.read().unwrap_or_else(PoisonError::into_inner);
		for block in tree.into_blocks() {
			if block.name().is_none() {
				continue;
			}

			let syntax = DeclarationBlockSyntax::from_syntax(&block, Some(file.clone()));
			match registry.resolve(&syntax.type_name, &self.default_type) {
				Resolution::Resolved(decl_type) => {
					output.parsed.entry(decl_type).or_default().push(syntax);
				}
				Resolution::Deferred(key) => {
					debug!(
						file = file.name.as_str(),
						name = syntax.name.as_str(),
						%key,
						"deferring block with unregistered type"
					);
					output.unresolved.push(PendingBlock {
						key,
						block: syntax,
						origin: self.default_type.clone(),
					});
				}
			}
		}

		output.files.insert(file.clone());
	}
}
