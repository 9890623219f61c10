//! `decl_core` loads declaration files: the brace-delimited `type name { ... }`
//! definitions that describe materials, skins, sound shaders, tables and
//! other assets in idTech-style content trees.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Declaration file
//!   → Cursor (characters from a string or a buffered reader)
//!   → Tokenizer (whitespace, comments, bare tokens, braced blocks)
//!   → Syntax tree builder (groups header tokens with their block, lossless)
//!   → Folder parser (background scan per default type, resolves block types)
//!   → Declaration manager (per-type stores, unrecognised buffer, reload signals)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: loading `decl.toml`, with content roots, scan limits, type keywords and folders.
//! - [`cursor`]: character cursors over in-memory text and buffered readers.
//!
//! ## Key Types
//!
//! - [`SyntaxTree`]: a lossless parse of one file. Its `Display` output is the original text.
//! - [`DeclarationManager`]: the concurrent store of every declaration, keyed by type and name.
//! - [`DeclarationCreator`]: builds a [`Declaration`] for one type; registered per header keyword.
//! - [`FileSource`]: file enumeration used by folder scans. [`DirectorySource`] reads from disk.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use decl_core::BasicCreator;
//! use decl_core::DeclarationManager;
//! use decl_core::DeclarationType;
//! use decl_core::DirectorySource;
//! use decl_core::ScanOptions;
//!
//! let manager = DeclarationManager::new(
//! 	Arc::new(DirectorySource::single("base")),
//! 	ScanOptions::default(),
//! );
//! manager
//! 	.register_decl_type("material", Arc::new(BasicCreator::new(DeclarationType::MATERIAL)))
//! 	.unwrap();
//! manager
//! 	.register_decl_folder(DeclarationType::MATERIAL, "materials", "mtr")
//! 	.unwrap();
//!
//! manager.foreach_declaration(&DeclarationType::MATERIAL, |decl| {
//! 	println!("{}", decl.decl_name());
//! });
//! ```

pub use config::*;
pub use declaration::*;
pub use error::*;
pub use file_source::*;
pub use folder_parser::*;
pub use lexer::*;
pub use manager::*;
pub use parser::*;
pub use registry::*;
pub use signal::*;
pub use syntax::*;
pub use task::*;
pub use tokens::*;

pub mod config;
pub mod cursor;
mod declaration;
#[allow(unused_assignments)]
mod error;
mod file_source;
mod folder_parser;
mod lexer;
mod manager;
mod parser;
mod registry;
mod signal;
mod syntax;
mod task;
mod tokens;
