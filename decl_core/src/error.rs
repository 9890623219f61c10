use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum DeclError {
	#[error(transparent)]
	#[diagnostic(code(decl::io_error))]
	Io(#[from] std::io::Error),

	#[error("declaration type `{0}` is already registered")]
	#[diagnostic(
		code(decl::already_registered),
		help("unregister `{0}` first or pick a different type keyword")
	)]
	AlreadyRegistered(String),

	#[error("declaration type `{0}` is not registered")]
	#[diagnostic(code(decl::not_registered))]
	NotRegistered(String),

	#[error("no creator is registered for declaration type `{0}`")]
	#[diagnostic(
		code(decl::no_creator),
		help("register a creator for this type with `register_decl_type`")
	)]
	NoCreator(String),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(decl::config_parse),
		help("check that decl.toml is valid TOML with `roots`, `[types]` and `[[folders]]` entries")
	)]
	ConfigParse(String),

	#[error("file too large: `{path}` is {size} bytes (limit: {limit} bytes)")]
	#[diagnostic(
		code(decl::file_too_large),
		help("increase `max_file_size` in decl.toml")
	)]
	FileTooLarge { path: String, size: u64, limit: u64 },

	#[error("background scan `{0}` panicked")]
	#[diagnostic(code(decl::worker_panicked))]
	WorkerPanicked(String),
}

pub type DeclResult<T> = Result<T, DeclError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
