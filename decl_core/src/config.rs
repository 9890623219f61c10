use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::DeclError;
use crate::DeclResult;
use crate::declaration::DeclarationType;
use crate::file_source::ContentRoot;

/// Default maximum file size in bytes (10 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default number of directory levels a folder scan descends.
pub const DEFAULT_MAX_DEPTH: usize = 99;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["decl.toml", ".decl.toml", ".config/decl.toml"];

/// Configuration loaded from a `decl.toml` file.
///
/// ```toml
/// roots = ["base", "mods/darkmod"]
/// max_depth = 99
///
/// [types]
/// material = "material"
/// table = "table"
/// skin = "skin"
///
/// [[folders]]
/// folder = "materials"
/// extension = "mtr"
/// default_type = "material"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DeclConfig {
	/// Content roots relative to the config directory, highest precedence
	/// first.
	#[serde(default = "default_roots")]
	pub roots: Vec<PathBuf>,
	#[serde(default = "default_max_depth")]
	pub max_depth: usize,
	/// Files larger than this are skipped during scans.
	#[serde(default = "default_max_file_size")]
	pub max_file_size: u64,
	/// Header keyword to declaration type. Each entry is served by a
	/// [`BasicCreator`](crate::BasicCreator).
	#[serde(default)]
	pub types: BTreeMap<String, DeclarationType>,
	#[serde(default)]
	pub folders: Vec<FolderConfig>,
}

/// One `[[folders]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FolderConfig {
	pub folder: String,
	pub extension: String,
	pub default_type: DeclarationType,
}

fn default_roots() -> Vec<PathBuf> {
	vec![PathBuf::from(".")]
}

fn default_max_depth() -> usize {
	DEFAULT_MAX_DEPTH
}

fn default_max_file_size() -> u64 {
	DEFAULT_MAX_FILE_SIZE
}

impl Default for DeclConfig {
	fn default() -> Self {
		Self {
			roots: default_roots(),
			max_depth: DEFAULT_MAX_DEPTH,
			max_file_size: DEFAULT_MAX_FILE_SIZE,
			types: BTreeMap::new(),
			folders: Vec::new(),
		}
	}
}

impl DeclConfig {
	/// Resolve the first existing config file path from supported
	/// candidates.
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if the file does not exist.
	pub fn load(root: &Path) -> DeclResult<Option<DeclConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		Self::parse(&content).map(Some)
	}

	pub fn parse(content: &str) -> DeclResult<DeclConfig> {
		toml::from_str(content).map_err(|e| DeclError::ConfigParse(e.to_string()))
	}

	/// Content roots resolved against `root`, in precedence order.
	pub fn content_roots(&self, root: &Path) -> Vec<ContentRoot> {
		self.roots
			.iter()
			.map(|path| {
				if path.is_absolute() {
					ContentRoot::new(path)
				} else if path == Path::new(".") {
					ContentRoot::new(root)
				} else {
					ContentRoot::new(root.join(path))
				}
			})
			.collect()
	}
}

/// Limits applied by every folder scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
	pub max_depth: usize,
	pub max_file_size: u64,
}

impl Default for ScanOptions {
	fn default() -> Self {
		Self {
			max_depth: DEFAULT_MAX_DEPTH,
			max_file_size: DEFAULT_MAX_FILE_SIZE,
		}
	}
}

impl ScanOptions {
	pub fn from_config(config: Option<&DeclConfig>) -> Self {
		Self {
			max_depth: config.map_or(DEFAULT_MAX_DEPTH, |c| c.max_depth),
			max_file_size: config.map_or(DEFAULT_MAX_FILE_SIZE, |c| c.max_file_size),
		}
	}
}
