use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

type Slot = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by [`Signal::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A list of callbacks invoked on [`emit`](Signal::emit).
#[derive(Default)]
pub struct Signal {
	next_id: AtomicU64,
	slots: Mutex<Vec<(SubscriptionId, Slot)>>,
}

impl std::fmt::Debug for Signal {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Signal")
			.field("subscribers", &self.len())
			.finish()
	}
}

impl Signal {
	pub fn connect(&self, callback: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
		let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
		self.slots
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.push((id, Arc::new(callback)));
		id
	}

	pub fn disconnect(&self, id: SubscriptionId) -> bool {
		let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
		let before = slots.len();
		slots.retain(|(slot_id, _)| *slot_id != id);
		slots.len() != before
	}

	pub fn len(&self) -> usize {
		self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Invoke every callback. The subscriber list is not locked while the
	/// callbacks run, so they may connect or disconnect.
	pub fn emit(&self) {
		let slots: Vec<Slot> = self
			.slots
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.iter()
			.map(|(_, slot)| Arc::clone(slot))
			.collect();

		for slot in slots {
			slot();
		}
	}
}
