//! A restartable job running on its own thread.
//!
//! ```text
//! Idle ──start()──▶ Running ──ensure_finished()──▶ Finished
//!  ▲                                                 │
//!  └──────────────────────── reset() ─────────────────┘
//! ```

use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::thread;
use std::thread::JoinHandle;
use std::thread::ThreadId;

use tracing::error;
use tracing::trace;

use crate::DeclError;
use crate::DeclResult;

type Job = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Default)]
enum WorkerState {
	#[default]
	Idle,
	Running(JoinHandle<()>),
	/// Another caller is joining the thread.
	Joining,
	Finished,
}

/// Owns at most one worker thread executing `job`.
pub struct BackgroundTask {
	name: String,
	job: Job,
	state: Mutex<WorkerState>,
	joined: Condvar,
	worker_thread: Arc<Mutex<Option<ThreadId>>>,
}

impl std::fmt::Debug for BackgroundTask {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BackgroundTask")
			.field("name", &self.name)
			.field("state", &self.state)
			.finish_non_exhaustive()
	}
}

impl BackgroundTask {
	pub fn new(name: impl Into<String>, job: impl Fn() + Send + Sync + 'static) -> Self {
		Self {
			name: name.into(),
			job: Arc::new(job),
			state: Mutex::new(WorkerState::Idle),
			joined: Condvar::new(),
			worker_thread: Arc::new(Mutex::new(None)),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Spawn the worker unless it already ran or is running. Never blocks
	/// on the job.
	pub fn start(&self) -> DeclResult<()> {
		let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
		if !matches!(*state, WorkerState::Idle) {
			return Ok(());
		}

		let job = Arc::clone(&self.job);
		let worker_thread = Arc::clone(&self.worker_thread);
		let handle = thread::Builder::new()
			.name(self.name.clone())
			.spawn(move || {
				*worker_thread.lock().unwrap_or_else(PoisonError::into_inner) =
					Some(thread::current().id());
				job();
			})?;

		trace!(task = self.name.as_str(), "background task started");
		*state = WorkerState::Running(handle);
		Ok(())
	}

	/// Block until the worker has exited. Returns immediately when nothing is
	/// running or when called from the worker itself. The state lock is not
	/// held while joining.
	pub fn ensure_finished(&self) -> DeclResult<()> {
		if self.is_worker_thread() {
			return Ok(());
		}

		let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
		loop {
			match std::mem::take(&mut *state) {
				WorkerState::Running(handle) => {
					*state = WorkerState::Joining;
					drop(state);

					let result = handle.join();
					*self.state.lock().unwrap_or_else(PoisonError::into_inner) = WorkerState::Finished;
					self.joined.notify_all();

					if result.is_err() {
						error!(task = self.name.as_str(), "background task panicked");
						return Err(DeclError::WorkerPanicked(self.name.clone()));
					}

					return Ok(());
				}
				WorkerState::Joining => {
					*state = WorkerState::Joining;
					state = self
						.joined
						.wait(state)
						.unwrap_or_else(PoisonError::into_inner);
				}
				other => {
					*state = other;
					return Ok(());
				}
			}
		}
	}

	/// Wait for the worker, then return to idle so [`start`](Self::start)
	/// runs the job again.
	pub fn reset(&self) -> DeclResult<()> {
		let result = self.ensure_finished();
		*self.state.lock().unwrap_or_else(PoisonError::into_inner) = WorkerState::Idle;
		*self
			.worker_thread
			.lock()
			.unwrap_or_else(PoisonError::into_inner) = None;
		result
	}

	/// Whether the job ran to completion. Does not block.
	pub fn is_finished(&self) -> bool {
		match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
			WorkerState::Idle | WorkerState::Joining => false,
			WorkerState::Running(handle) => handle.is_finished(),
			WorkerState::Finished => true,
		}
	}

	fn is_worker_thread(&self) -> bool {
		*self
			.worker_thread
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			== Some(thread::current().id())
	}
}
