use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Inspect and verify declaration files (materials, skins, tables and more).",
	long_about = "decl loads the declaration folders configured in `decl.toml` the same way \
	              the engine does: every content root is scanned, blocks are grouped by type \
	              and later files override earlier ones.\n\nQuick start:\n  decl list    \
	              List every loaded declaration\n  decl show    Print one declaration's \
	              source\n  decl check   Verify files round-trip and every block has a type"
)]
pub struct DeclCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// List the declarations found in the configured folders.
	///
	/// Declarations are grouped by type and sorted by name. Blocks whose type
	/// has no entry under `[types]` are counted as unrecognised.
	List {
		/// Only list declarations of this type.
		#[arg(long = "type", short = 't')]
		decl_type: Option<String>,

		/// Output format. Use `text` for human-readable output or `json` for
		/// programmatic consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Print the source of a single declaration.
	Show {
		/// The declaration type, e.g. `material`.
		decl_type: String,
		/// The declaration name. Matched case-insensitively.
		name: String,
	},
	/// Verify every configured declaration file.
	///
	/// Each file is parsed and rendered back; any difference from the file on
	/// disk is shown as a diff. Blocks whose type is not configured are
	/// reported too. Exits with a non-zero status code when either check
	/// fails.
	Check,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
