use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;

use ignore::WalkBuilder;
use tracing::trace;
use tracing::warn;

use crate::declaration::DeclarationFile;
use crate::declaration::FileFingerprint;

/// File enumeration and reading, as needed by folder scans.
pub trait FileSource: Send + Sync {
	/// Visit every file below `folder` whose name ends in `extension`
	/// (`.mtr`, empty for all files), descending at most `max_depth`
	/// directory levels. Files are visited in name order.
	fn for_each_file(
		&self,
		folder: &str,
		extension: &str,
		max_depth: usize,
		visitor: &mut dyn FnMut(DeclarationFile),
	);

	fn open(&self, file: &DeclarationFile) -> io::Result<Box<dyn BufRead + Send>>;
}

/// One directory mounted into a [`DirectorySource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRoot {
	pub path: PathBuf,
	pub mod_name: String,
}

impl ContentRoot {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		let path = path.into();
		let mod_name = path
			.file_name()
			.and_then(|name| name.to_str())
			.unwrap_or_default()
			.to_string();

		Self { path, mod_name }
	}
}

/// Reads declaration files from ordered directories on disk. When two roots
/// contain the same relative path, the earlier root wins.
#[derive(Debug, Clone, Default)]
pub struct DirectorySource {
	roots: Vec<ContentRoot>,
}

impl DirectorySource {
	pub fn new(roots: impl IntoIterator<Item = ContentRoot>) -> Self {
		Self {
			roots: roots.into_iter().collect(),
		}
	}

	pub fn single(root: impl Into<PathBuf>) -> Self {
		Self::new([ContentRoot::new(root)])
	}

	pub fn roots(&self) -> &[ContentRoot] {
		&self.roots
	}
}

fn has_extension(path: &Path, extension: &str) -> bool {
	if extension.is_empty() {
		return true;
	}

	path.file_name()
		.and_then(|name| name.to_str())
		.is_some_and(|name| {
			name.len() > extension.len()
				&& name.is_char_boundary(name.len() - extension.len())
				&& name[name.len() - extension.len()..].eq_ignore_ascii_case(extension)
		})
}

fn relative_name(root: &Path, path: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.to_string_lossy()
		.replace('\\', "/")
}

impl FileSource for DirectorySource {
	fn for_each_file(
		&self,
		folder: &str,
		extension: &str,
		max_depth: usize,
		visitor: &mut dyn FnMut(DeclarationFile),
	) {
		let mut seen = HashSet::new();
		let mut files = Vec::new();

		for root in &self.roots {
			let dir = root.path.join(folder);
			if !dir.is_dir() {
				trace!(dir = %dir.display(), "folder missing in content root");
				continue;
			}

			let walker = WalkBuilder::new(&dir)
				.standard_filters(false)
				.follow_links(true)
				.max_depth(Some(max_depth))
				.build();

			for entry in walker {
				let entry = match entry {
					Ok(entry) => entry,
					Err(error) => {
						warn!(dir = %dir.display(), %error, "failed to enumerate declaration folder");
						continue;
					}
				};

				if !entry.file_type().is_some_and(|kind| kind.is_file())
					|| !has_extension(entry.path(), extension)
				{
					continue;
				}

				let name = relative_name(&root.path, entry.path());
				if !seen.insert(name.clone()) {
					continue;
				}

				let fingerprint = entry
					.metadata()
					.map(|metadata| FileFingerprint::from_metadata(&metadata))
					.unwrap_or_default();

				files.push(DeclarationFile {
					name,
					root: root.path.clone(),
					mod_name: root.mod_name.clone(),
					fingerprint,
				});
			}
		}

		files.sort();
		for file in files {
			visitor(file);
		}
	}

	fn open(&self, file: &DeclarationFile) -> io::Result<Box<dyn BufRead + Send>> {
		let handle = File::open(file.full_path())?;
		Ok(Box::new(BufReader::new(handle)))
	}
}
