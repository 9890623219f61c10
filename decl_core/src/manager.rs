use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::Weak;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use tracing::debug;
use tracing::debug_span;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::BasicCreator;
use crate::DeclConfig;
use crate::DeclError;
use crate::DeclResult;
use crate::ScanOptions;
use crate::declaration::Declaration;
use crate::declaration::DeclarationBlockSyntax;
use crate::declaration::DeclarationCreator;
use crate::declaration::DeclarationFile;
use crate::declaration::DeclarationType;
use crate::file_source::DirectorySource;
use crate::file_source::FileSource;
use crate::folder_parser::DeclarationFolderParser;
use crate::folder_parser::FileChanges;
use crate::folder_parser::PendingBlock;
use crate::folder_parser::ScanOutput;
use crate::registry::DeclarationRegistry;
use crate::registry::PendingKey;
use crate::registry::RegisteredFolder;
use crate::signal::Signal;
use crate::task::BackgroundTask;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn name_key(name: &str) -> String {
	name.to_ascii_lowercase()
}

struct StoredDeclaration {
	declaration: Arc<dyn Declaration>,
	/// Default type of the scan that produced the current block syntax.
	/// `None` for declarations created on demand.
	origin: Option<DeclarationType>,
}

struct ScanSlot {
	generation: u64,
	task: Arc<BackgroundTask>,
}

/// What the last installed scan of one default type visited.
#[derive(Default)]
struct VisitedFiles {
	files: BTreeSet<DeclarationFile>,
	changes: FileChanges,
}

#[derive(Default)]
struct TypeStore {
	/// Keyed by lowercased name.
	declarations: HashMap<String, StoredDeclaration>,
	/// The scan for every folder defaulting to this type.
	scan: Option<ScanSlot>,
}

struct ManagerInner {
	source: Arc<dyn FileSource>,
	options: ScanOptions,
	registry: RwLock<DeclarationRegistry>,
	folders: Mutex<Vec<RegisteredFolder>>,
	// Lock order: unrecognised, declarations, registry, parsed_files.
	unrecognised: Mutex<Vec<PendingBlock>>,
	declarations: Mutex<HashMap<DeclarationType, TypeStore>>,
	parsed_files: Mutex<HashMap<DeclarationType, VisitedFiles>>,
	signals: Mutex<HashMap<DeclarationType, Arc<Signal>>>,
	/// Superseded scans that may still be running.
	retired: Mutex<Vec<Arc<BackgroundTask>>>,
	next_generation: AtomicU64,
}

/// Owns every declaration loaded from the registered folders.
///
/// The manager is a cheap handle; clones share the same state. Each
/// registered default type is scanned on its own background thread, and any
/// accessor for a type first waits for that type's scan to finish. A type
/// with no folder of its own is read as it currently is; use
/// [`wait_for_scans`](Self::wait_for_scans) to see blocks other scans are
/// still producing for it.
///
/// ```text
/// register_decl_folder ──▶ BackgroundTask ──▶ DeclarationFolderParser
///                                                  │
///                         resolved blocks ◀────────┴────▶ unrecognised blocks
///                               │                              │
///                               ▼                              ▼
///                        TypeStore (by type)  ◀── retry on register_decl_type
/// ```
#[derive(Clone)]
pub struct DeclarationManager {
	inner: Arc<ManagerInner>,
}

impl std::fmt::Debug for DeclarationManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DeclarationManager")
			.field("options", &self.inner.options)
			.field("folders", &*lock(&self.inner.folders))
			.finish_non_exhaustive()
	}
}

impl DeclarationManager {
	pub fn new(source: Arc<dyn FileSource>, options: ScanOptions) -> Self {
		Self {
			inner: Arc::new(ManagerInner {
				source,
				options,
				registry: RwLock::new(DeclarationRegistry::new()),
				folders: Mutex::new(Vec::new()),
				unrecognised: Mutex::new(Vec::new()),
				declarations: Mutex::new(HashMap::new()),
				parsed_files: Mutex::new(HashMap::new()),
				signals: Mutex::new(HashMap::new()),
				retired: Mutex::new(Vec::new()),
				next_generation: AtomicU64::new(0),
			}),
		}
	}

	/// Build a manager over the content roots of `config`, registering a
	/// [`BasicCreator`] for each `[types]` entry and every `[[folders]]`
	/// entry. Types are registered before folders so the first scans can
	/// resolve every block.
	pub fn from_config(root: &Path, config: &DeclConfig) -> DeclResult<Self> {
		let source = DirectorySource::new(config.content_roots(root));
		let manager = Self::new(Arc::new(source), ScanOptions::from_config(Some(config)));

		for (keyword, decl_type) in &config.types {
			manager.register_decl_type(keyword, Arc::new(BasicCreator::new(decl_type.clone())))?;
		}

		for folder in &config.folders {
			manager.register_decl_folder(folder.default_type.clone(), &folder.folder, &folder.extension)?;
		}

		Ok(manager)
	}

	pub fn options(&self) -> &ScanOptions {
		&self.inner.options
	}

	/// Bind a header keyword to a creator. Buffered blocks waiting for the
	/// keyword (or for the creator's type as a folder default) are turned
	/// into declarations before this returns.
	#[instrument(skip(self, creator), fields(decl_type = %creator.decl_type()))]
	pub fn register_decl_type(&self, type_name: &str, creator: Arc<dyn DeclarationCreator>) -> DeclResult<()> {
		self.inner
			.registry
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.register(type_name, creator)?;

		debug!("registered declaration type");
		let changed = self.inner.process_unrecognised_blocks();
		self.inner.emit_reloaded(&changed);

		Ok(())
	}

	/// Remove a keyword binding. Declarations already created stay in place.
	pub fn unregister_decl_type(&self, type_name: &str) -> DeclResult<()> {
		self.inner
			.registry
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.unregister(type_name)?;

		debug!(type_name, "unregistered declaration type");
		Ok(())
	}

	pub fn is_registered(&self, type_name: &str) -> bool {
		self.inner
			.registry
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.is_registered(type_name)
	}

	/// Registered keywords, sorted.
	pub fn type_names(&self) -> Vec<String> {
		self.inner
			.registry
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.type_names()
	}

	/// Add a folder to scan and (re)start the background scan for
	/// `default_type`. `folder` gets a trailing `/` and `extension` a leading
	/// `.` when they lack one.
	pub fn register_decl_folder(&self, default_type: DeclarationType, folder: &str, extension: &str) -> DeclResult<()> {
		let folder = RegisteredFolder::new(default_type.clone(), folder, extension);
		{
			let mut folders = lock(&self.inner.folders);
			if !folders.contains(&folder) {
				debug!(
					folder = folder.folder.as_str(),
					extension = folder.extension.as_str(),
					%default_type,
					"registered declaration folder"
				);
				folders.push(folder);
			}
		}

		self.inner.start_scan(&default_type)
	}

	pub fn registered_folders(&self) -> Vec<RegisteredFolder> {
		lock(&self.inner.folders).clone()
	}

	/// Look up a declaration by type and name (ASCII case-insensitive).
	pub fn find_declaration(&self, decl_type: &DeclarationType, name: &str) -> Option<Arc<dyn Declaration>> {
		self.inner.wait_for_type(decl_type);

		lock(&self.inner.declarations)
			.get(decl_type)
			.and_then(|store| store.declarations.get(&name_key(name)))
			.map(|stored| Arc::clone(&stored.declaration))
	}

	/// Return the existing declaration or create an empty one through the
	/// type's creator.
	pub fn find_or_create_declaration(&self, decl_type: &DeclarationType, name: &str) -> DeclResult<Arc<dyn Declaration>> {
		self.inner.wait_for_type(decl_type);

		let mut declarations = lock(&self.inner.declarations);
		let store = declarations.entry(decl_type.clone()).or_default();
		if let Some(stored) = store.declarations.get(&name_key(name)) {
			return Ok(Arc::clone(&stored.declaration));
		}

		let creator = self
			.inner
			.registry
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.creator_for_type(decl_type)
			.ok_or_else(|| DeclError::NoCreator(decl_type.to_string()))?;

		let block = DeclarationBlockSyntax {
			name: name.to_string(),
			..DeclarationBlockSyntax::default()
		};
		let declaration = creator.create_declaration(name, &block);
		store.declarations.insert(
			name_key(name),
			StoredDeclaration {
				declaration: Arc::clone(&declaration),
				origin: None,
			},
		);

		debug!(%decl_type, name, "created declaration on demand");
		Ok(declaration)
	}

	/// Drop a declaration. Returns whether it existed. Handles held elsewhere
	/// stay valid but are no longer reachable through the manager.
	pub fn remove_declaration(&self, decl_type: &DeclarationType, name: &str) -> bool {
		self.inner.wait_for_type(decl_type);

		lock(&self.inner.declarations)
			.get_mut(decl_type)
			.and_then(|store| store.declarations.remove(&name_key(name)))
			.is_some()
	}

	/// Visit every declaration of `decl_type` in name order. The visitor runs
	/// without any manager lock held, so it may call back into the manager.
	pub fn foreach_declaration(&self, decl_type: &DeclarationType, mut visitor: impl FnMut(&dyn Declaration)) {
		for declaration in self.declarations(decl_type) {
			visitor(declaration.as_ref());
		}
	}

	/// Snapshot of every declaration of `decl_type`, sorted by name.
	pub fn declarations(&self, decl_type: &DeclarationType) -> Vec<Arc<dyn Declaration>> {
		self.inner.wait_for_type(decl_type);

		let declarations = lock(&self.inner.declarations);
		let Some(store) = declarations.get(decl_type) else {
			return Vec::new();
		};

		let mut entries: Vec<_> = store.declarations.iter().collect();
		entries.sort_by(|a, b| a.0.cmp(b.0));
		entries
			.into_iter()
			.map(|(_, stored)| Arc::clone(&stored.declaration))
			.collect()
	}

	pub fn declaration_count(&self, decl_type: &DeclarationType) -> usize {
		self.inner.wait_for_type(decl_type);

		lock(&self.inner.declarations)
			.get(decl_type)
			.map_or(0, |store| store.declarations.len())
	}

	/// Types that currently hold at least one declaration, sorted.
	pub fn declaration_types(&self) -> Vec<DeclarationType> {
		self.inner.wait_for_all();

		let mut types: Vec<_> = lock(&self.inner.declarations)
			.iter()
			.filter(|(_, store)| !store.declarations.is_empty())
			.map(|(decl_type, _)| decl_type.clone())
			.collect();
		types.sort();
		types
	}

	/// Files visited by the last completed scan of folders defaulting to
	/// `default_type`.
	pub fn parsed_files(&self, default_type: &DeclarationType) -> Vec<DeclarationFile> {
		self.inner.wait_for_type(default_type);

		lock(&self.inner.parsed_files)
			.get(default_type)
			.map(|visited| visited.files.iter().cloned().collect())
			.unwrap_or_default()
	}

	/// Files added, removed or modified between the last two completed scans
	/// of folders defaulting to `default_type`.
	pub fn file_changes(&self, default_type: &DeclarationType) -> FileChanges {
		self.inner.wait_for_type(default_type);

		lock(&self.inner.parsed_files)
			.get(default_type)
			.map(|visited| visited.changes.clone())
			.unwrap_or_default()
	}

	/// Join every current scan, whatever its type. Returns the first scan
	/// failure.
	pub fn wait_for_scans(&self) -> DeclResult<()> {
		let mut result = Ok(());
		for task in self.inner.current_tasks() {
			if let Err(error) = task.ensure_finished() {
				result = result.and(Err(error));
			}
		}

		result
	}

	/// Blocks still waiting for a creator, after all scans have finished.
	pub fn unrecognised_blocks(&self) -> Vec<PendingBlock> {
		self.inner.wait_for_all();
		lock(&self.inner.unrecognised).clone()
	}

	pub fn unrecognised_block_count(&self) -> usize {
		self.inner.wait_for_all();
		lock(&self.inner.unrecognised).len()
	}

	/// Rescan every registered folder. Existing declarations are updated in
	/// place; declarations whose block disappeared are removed.
	#[instrument(skip(self))]
	pub fn reload_declarations(&self) -> DeclResult<()> {
		let mut default_types: Vec<_> = lock(&self.inner.folders)
			.iter()
			.map(|folder| folder.default_type.clone())
			.collect();
		default_types.sort();
		default_types.dedup();

		info!(types = default_types.len(), "reloading declarations");
		for default_type in &default_types {
			self.inner.start_scan(default_type)?;
		}

		Ok(())
	}

	/// Signal fired after a scan or a retry added or updated declarations of
	/// `decl_type`. Callbacks run on the thread that did the work, with no
	/// manager lock held.
	pub fn signal_decls_reloaded(&self, decl_type: &DeclarationType) -> Arc<Signal> {
		Arc::clone(
			lock(&self.inner.signals)
				.entry(decl_type.clone())
				.or_default(),
		)
	}

	/// Block until every scan, including superseded ones, has exited.
	pub fn shutdown(&self) -> DeclResult<()> {
		let mut tasks: Vec<_> = lock(&self.inner.retired).drain(..).collect();
		tasks.extend(self.inner.current_tasks());

		let mut result = Ok(());
		for task in tasks {
			if let Err(error) = task.ensure_finished() {
				result = result.and(Err(error));
			}
		}

		result
	}
}

impl ManagerInner {
	/// Replace the scan for `default_type` with a fresh one and start it.
	fn start_scan(self: &Arc<Self>, default_type: &DeclarationType) -> DeclResult<()> {
		let folders: Vec<_> = lock(&self.folders)
			.iter()
			.filter(|folder| &folder.default_type == default_type)
			.cloned()
			.collect();

		let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
		let parser = DeclarationFolderParser::new(
			default_type.clone(),
			folders,
			Arc::clone(&self.source),
			self.options.clone(),
		);

		let mut declarations = lock(&self.declarations);
		let previous = lock(&self.parsed_files)
			.get(default_type)
			.map(|visited| visited.files.clone())
			.unwrap_or_default();

		let weak: Weak<Self> = Arc::downgrade(self);
		let scan_type = default_type.clone();
		// The worker logs under the span of whoever started the scan.
		let span = debug_span!("decl_scan", %default_type, generation);
		let task = Arc::new(BackgroundTask::new(
			format!("decl-scan-{default_type}"),
			move || {
				let _entered = span.enter();
				let Some(inner) = weak.upgrade() else {
					return;
				};
				let output = parser.run(&inner.registry, &previous);
				inner.finish_scan(&scan_type, generation, output);
			},
		));

		// Started while the store is locked so no reader can observe the slot
		// before the worker exists.
		task.start()?;

		let replaced = declarations
			.entry(default_type.clone())
			.or_default()
			.scan
			.replace(ScanSlot { generation, task });
		drop(declarations);

		if let Some(old) = replaced {
			let mut retired = lock(&self.retired);
			retired.retain(|task| !task.is_finished());
			retired.push(old.task);
		}

		debug!(%default_type, generation, "declaration scan started");
		Ok(())
	}

	fn current_tasks(&self) -> Vec<Arc<BackgroundTask>> {
		lock(&self.declarations)
			.values()
			.filter_map(|store| store.scan.as_ref())
			.map(|slot| Arc::clone(&slot.task))
			.collect()
	}

	/// Join the scan of `decl_type`. Returns at once when the type has no
	/// folder of its own.
	fn wait_for_type(&self, decl_type: &DeclarationType) {
		let task = lock(&self.declarations)
			.get(decl_type)
			.and_then(|store| store.scan.as_ref())
			.map(|slot| Arc::clone(&slot.task));

		let Some(task) = task else {
			return;
		};

		if let Err(error) = task.ensure_finished() {
			warn!(%decl_type, %error, "declaration scan failed");
		}
	}

	fn wait_for_all(&self) {
		for task in self.current_tasks() {
			if let Err(error) = task.ensure_finished() {
				warn!(task = task.name(), %error, "declaration scan failed");
			}
		}
	}

	/// Install the result of a scan. Runs on the scan's worker thread. Results
	/// of a scan that was replaced in the meantime are dropped.
	fn finish_scan(&self, default_type: &DeclarationType, generation: u64, output: ScanOutput) {
		let ScanOutput {
			parsed,
			unresolved,
			files,
			changes,
		} = output;

		let mut changed = BTreeSet::new();
		{
			let mut unrecognised = lock(&self.unrecognised);
			let mut declarations = lock(&self.declarations);

			let is_current = declarations
				.get(default_type)
				.and_then(|store| store.scan.as_ref())
				.is_some_and(|slot| slot.generation == generation);
			if !is_current {
				debug!(%default_type, generation, "discarding superseded declaration scan");
				return;
			}

			let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);

			let mut seen: HashMap<&DeclarationType, HashSet<String>> = HashMap::new();
			for (decl_type, blocks) in &parsed {
				seen.entry(decl_type)
					.or_default()
					.extend(blocks.iter().map(|block| name_key(&block.name)));
			}
			for (decl_type, store) in declarations.iter_mut() {
				let before = store.declarations.len();
				store.declarations.retain(|key, stored| {
					stored.origin.as_ref() != Some(default_type)
						|| seen.get(decl_type).is_some_and(|names| names.contains(key))
				});
				let removed = before - store.declarations.len();
				if removed > 0 {
					debug!(%decl_type, removed, "removed vanished declarations");
					changed.insert(decl_type.clone());
				}
			}

			// Pending blocks from the previous run of this scan are replaced.
			unrecognised.retain(|pending| &pending.origin != default_type);

			for (decl_type, blocks) in parsed {
				for block in blocks {
					match install_block(&mut declarations, &registry, &decl_type, block, default_type) {
						Ok(()) => {
							changed.insert(decl_type.clone());
						}
						Err(block) => {
							unrecognised.push(PendingBlock {
								key: pending_key_for(&block, default_type),
								block,
								origin: default_type.clone(),
							});
						}
					}
				}
			}

			unrecognised.extend(unresolved);
			retry_unrecognised(&mut unrecognised, &mut declarations, &registry, &mut changed);

			info!(
				%default_type,
				files = files.len(),
				added = changes.added.len(),
				removed = changes.removed.len(),
				modified = changes.modified.len(),
				updated_types = changed.len(),
				unrecognised = unrecognised.len(),
				"declaration scan finished"
			);

			lock(&self.parsed_files).insert(default_type.clone(), VisitedFiles { files, changes });
		}

		self.emit_reloaded(&changed);
	}

	/// Retry every buffered block against the current registry.
	fn process_unrecognised_blocks(&self) -> BTreeSet<DeclarationType> {
		let mut changed = BTreeSet::new();
		let mut unrecognised = lock(&self.unrecognised);
		if unrecognised.is_empty() {
			return changed;
		}

		let mut declarations = lock(&self.declarations);
		let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
		retry_unrecognised(&mut unrecognised, &mut declarations, &registry, &mut changed);

		changed
	}

	fn emit_reloaded(&self, changed: &BTreeSet<DeclarationType>) {
		let signals: Vec<_> = {
			let signals = lock(&self.signals);
			changed
				.iter()
				.filter_map(|decl_type| signals.get(decl_type).cloned())
				.collect()
		};

		for signal in signals {
			signal.emit();
		}
	}
}

fn pending_key_for(block: &DeclarationBlockSyntax, default_type: &DeclarationType) -> PendingKey {
	if block.type_name.is_empty() {
		PendingKey::DefaultType(default_type.clone())
	} else {
		PendingKey::Keyword(block.type_name.to_ascii_lowercase())
	}
}

/// Create or update the declaration for `block`. Gives the block back when
/// `decl_type` has no creator.
fn install_block(
	declarations: &mut HashMap<DeclarationType, TypeStore>,
	registry: &DeclarationRegistry,
	decl_type: &DeclarationType,
	block: DeclarationBlockSyntax,
	origin: &DeclarationType,
) -> Result<(), DeclarationBlockSyntax> {
	let Some(creator) = registry.creator_for_type(decl_type) else {
		return Err(block);
	};

	let store = declarations.entry(decl_type.clone()).or_default();
	let key = name_key(&block.name);
	match store.declarations.get_mut(&key) {
		Some(stored) => {
			stored.declaration.set_block_syntax(block);
			stored.origin = Some(origin.clone());
		}
		None => {
			let declaration = creator.create_declaration(&block.name, &block);
			store.declarations.insert(
				key,
				StoredDeclaration {
					declaration,
					origin: Some(origin.clone()),
				},
			);
		}
	}

	Ok(())
}

fn retry_unrecognised(
	unrecognised: &mut Vec<PendingBlock>,
	declarations: &mut HashMap<DeclarationType, TypeStore>,
	registry: &DeclarationRegistry,
	changed: &mut BTreeSet<DeclarationType>,
) {
	let mut remaining = Vec::new();

	for pending in unrecognised.drain(..) {
		let Some(decl_type) = registry.resolve_pending(&pending.key) else {
			remaining.push(pending);
			continue;
		};

		let PendingBlock { key, block, origin } = pending;
		match install_block(declarations, registry, &decl_type, block, &origin) {
			Ok(()) => {
				changed.insert(decl_type);
			}
			Err(block) => remaining.push(PendingBlock { key, block, origin }),
		}
	}

	if !remaining.is_empty() {
		debug!(remaining = remaining.len(), "declaration blocks still unrecognised");
	}
	*unrecognised = remaining;
}
