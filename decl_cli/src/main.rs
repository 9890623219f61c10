use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use clap::Parser;
use decl_cli::Commands;
use decl_cli::DeclCli;
use decl_cli::OutputFormat;
use decl_core::AnyEmptyResult;
use decl_core::AnyResult;
use decl_core::DeclConfig;
use decl_core::DeclError;
use decl_core::DeclarationManager;
use decl_core::DeclarationType;
use decl_core::parse_with_diagnostics;
use owo_colors::OwoColorize;
use serde::Serialize;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;

static USE_COLOR: AtomicBool = AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = DeclCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, Ordering::Relaxed);
	}

	let filter = if args.verbose { "debug" } else { "warn" };
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.init();

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::List { decl_type, format }) => run_list(&args, decl_type.as_deref(), *format),
		Some(Commands::Show { decl_type, name }) => run_show(&args, decl_type, name),
		Some(Commands::Check) => {
			match run_check(&args) {
				Ok(true) => Ok(()),
				Ok(false) => process::exit(1),
				Err(e) => Err(e),
			}
		}
		None => {
			eprintln!("No subcommand specified. Run `decl --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<DeclError>() {
			Ok(decl_err) => {
				let report: miette::Report = (*decl_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

fn resolve_root(args: &DeclCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load_manager(args: &DeclCli) -> AnyResult<DeclarationManager> {
	let root = resolve_root(args);
	let config = DeclConfig::load(&root)?.unwrap_or_default();
	let manager = DeclarationManager::from_config(&root, &config)?;
	// Types without a folder of their own are filled by other scans.
	manager.wait_for_scans()?;

	Ok(manager)
}

#[derive(Serialize)]
struct ListEntry {
	#[serde(rename = "type")]
	decl_type: String,
	name: String,
	file: Option<String>,
	#[serde(rename = "mod")]
	mod_name: String,
}

#[derive(Serialize)]
struct ListOutput {
	declarations: Vec<ListEntry>,
	unrecognised: usize,
}

fn run_list(args: &DeclCli, decl_type: Option<&str>, format: OutputFormat) -> AnyEmptyResult {
	let manager = load_manager(args)?;
	let types = match decl_type {
		Some(decl_type) => vec![DeclarationType::new(decl_type)],
		None => manager.declaration_types(),
	};

	let mut entries = Vec::new();
	for decl_type in &types {
		for decl in manager.declarations(decl_type) {
			let syntax = decl.block_syntax();
			entries.push(ListEntry {
				decl_type: decl_type.to_string(),
				name: decl.decl_name().to_string(),
				file: syntax.file.map(|file| file.name),
				mod_name: syntax.mod_name,
			});
		}
	}
	let unrecognised = manager.unrecognised_block_count();
	manager.shutdown()?;

	if matches!(format, OutputFormat::Json) {
		let output = ListOutput {
			declarations: entries,
			unrecognised,
		};
		println!("{}", serde_json::to_string_pretty(&output)?);
		return Ok(());
	}

	if entries.is_empty() {
		println!("No declarations found.");
	} else {
		let mut current_type: Option<&str> = None;
		for entry in &entries {
			if current_type != Some(entry.decl_type.as_str()) {
				if current_type.is_some() {
					println!();
				}
				println!("{}", colored!(format!("{}:", entry.decl_type), bold));
				current_type = Some(entry.decl_type.as_str());
			}
			let file = entry.file.as_deref().unwrap_or("<generated>");
			println!("  {} {file}", entry.name);
		}
	}

	println!(
		"\n{} declaration(s), {} unrecognised block(s)",
		entries.len(),
		unrecognised
	);

	Ok(())
}

fn run_show(args: &DeclCli, decl_type: &str, name: &str) -> AnyEmptyResult {
	let manager = load_manager(args)?;
	let decl = manager.find_declaration(&DeclarationType::new(decl_type), name);
	manager.shutdown()?;

	let Some(decl) = decl else {
		return Err(format!("no {decl_type} declaration named `{name}`").into());
	};

	let syntax = decl.block_syntax();
	if let Some(file) = &syntax.file {
		eprintln!("{}", colored!(format!("// {} ({})", file.name, file.mod_name), yellow));
	}
	println!("{}", syntax.raw);

	Ok(())
}

/// Returns whether every check passed.
fn run_check(args: &DeclCli) -> AnyResult<bool> {
	let manager = load_manager(args)?;
	let mut default_types: Vec<_> = manager
		.registered_folders()
		.into_iter()
		.map(|folder| folder.default_type)
		.collect();
	default_types.sort();
	default_types.dedup();

	let mut file_count = 0usize;
	let mut mismatches = 0usize;
	for default_type in &default_types {
		for file in manager.parsed_files(default_type) {
			file_count += 1;
			let path = file.full_path();
			let bytes = std::fs::read(&path)?;
			let content = String::from_utf8_lossy(&bytes);
			let (tree, diagnostics) = parse_with_diagnostics(&content);

			for diagnostic in &diagnostics {
				eprintln!(
					"{} {}:{}: {}",
					colored!("warning:", yellow),
					file.name,
					diagnostic.line(),
					diagnostic.message()
				);
			}

			let rendered = tree.to_string();
			if bytes != rendered.as_bytes() {
				mismatches += 1;
				eprintln!("{} {} does not round-trip", colored!("mismatch:", red), make_relative(&path, &file.root));
				print_diff(&content, &rendered);
			}
		}
	}

	let unrecognised = manager.unrecognised_blocks();
	for pending in &unrecognised {
		let location = pending
			.block
			.file
			.as_ref()
			.map_or_else(String::new, |file| format!(" in {}", file.name));
		eprintln!(
			"{} block `{}` has unregistered type `{}`{location}",
			colored!("unrecognised:", red),
			pending.block.name,
			pending.key
		);
	}
	manager.shutdown()?;

	if mismatches == 0 && unrecognised.is_empty() {
		println!(
			"{} {file_count} file(s) checked, all declarations recognised.",
			colored!("ok:", green)
		);
		return Ok(true);
	}

	println!(
		"{file_count} file(s) checked: {mismatches} round-trip mismatch(es), {} unrecognised block(s).",
		unrecognised.len()
	);
	Ok(false)
}

/// Print a unified diff between two strings, colorized.
fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
