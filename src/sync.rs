//! Blocking and mutual exclusion for readers and writers.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Events that can wake a suspended reader or writer.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Event {
	/// New bytes are available, or the read block mode changed.
	RxData,

	/// The peer allowed us to transmit again.
	TxResume,
}

impl Event {
	fn flag(self) -> u32 {
		match self {
			Self::RxData => 1 << 0,
			Self::TxResume => 1 << 1,
		}
	}
}

/// Synchronization between readers, writers and the interrupt handlers.
///
/// Implemented by [`NoScheduler`] and [`Scheduler`].
pub trait Synchronization: Send + Sync {
	/// Guard returned by the read and write locks.
	type Guard<'a>
	where
		Self: 'a;

	/// Serialize readers.
	fn lock_read(&self) -> Self::Guard<'_>;

	/// Serialize writers.
	fn lock_write(&self) -> Self::Guard<'_>;

	/// Check if a read without data should wait.
	fn read_blocks(&self) -> bool;

	/// Check if a write paused by the peer should wait.
	fn write_blocks(&self) -> bool;

	/// Suspend the calling task until `event` is signalled.
	///
	/// Returns immediately if the event was signalled since the last wait.
	fn wait(&self, event: Event);

	/// Signal an event to a waiting task.
	fn signal(&self, event: Event);
}

/// No scheduler: reads and writes never block.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScheduler;

impl Synchronization for NoScheduler {
	type Guard<'a> = ();

	fn lock_read(&self) {}
	fn lock_write(&self) {}

	fn read_blocks(&self) -> bool {
		false
	}

	fn write_blocks(&self) -> bool {
		false
	}

	fn wait(&self, _event: Event) {}
	fn signal(&self, _event: Event) {}
}

/// Sticky event flags, cleared by the waiter that consumes them.
#[derive(Debug, Default)]
pub(crate) struct EventFlags {
	flags: Mutex<u32>,
	changed: Condvar,
}

impl EventFlags {
	pub fn set(&self, flags: u32) {
		let mut current = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
		*current |= flags;
		self.changed.notify_all();
	}

	/// Wait until any of `flags` is set, clear them and return them.
	pub fn wait_any(&self, flags: u32) -> u32 {
		let mut current = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
		while *current & flags == 0 {
			current = self.changed.wait(current).unwrap_or_else(PoisonError::into_inner);
		}
		let raised = *current & flags;
		*current &= !raised;
		raised
	}

	#[cfg(test)]
	pub fn pending(&self) -> u32 {
		*self.flags.lock().unwrap()
	}
}

/// Blocking reads and serialized writes for multi-threaded use.
///
/// A read lock and a write lock keep concurrent readers and writers from interleaving.
/// Readers and writers wait on event flags raised by the interrupt handlers.
#[derive(Debug)]
pub struct Scheduler {
	read_lock: Mutex<()>,
	write_lock: Mutex<()>,
	events: EventFlags,
	block: AtomicBool,
}

impl Scheduler {
	/// Create a scheduler with blocking reads.
	pub fn new() -> Self {
		Self {
			read_lock: Mutex::new(()),
			write_lock: Mutex::new(()),
			events: EventFlags::default(),
			block: AtomicBool::new(true),
		}
	}

	/// Select blocking or non-blocking reads.
	///
	/// Wakes up a blocked reader, so it returns promptly when blocking is disabled.
	pub fn set_read_block(&self, on: bool) {
		self.block.store(on, Ordering::Release);
		self.signal(Event::RxData);
	}

	/// Check if reads block.
	pub fn read_block(&self) -> bool {
		self.block.load(Ordering::Acquire)
	}
}

impl Default for Scheduler {
	fn default() -> Self {
		Self::new()
	}
}

impl Synchronization for Scheduler {
	type Guard<'a> = MutexGuard<'a, ()>;

	fn lock_read(&self) -> MutexGuard<'_, ()> {
		self.read_lock.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn lock_write(&self) -> MutexGuard<'_, ()> {
		self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn read_blocks(&self) -> bool {
		self.read_block()
	}

	fn write_blocks(&self) -> bool {
		true
	}

	fn wait(&self, event: Event) {
		self.events.wait_any(event.flag());
	}

	fn signal(&self, event: Event) {
		self.events.set(event.flag());
	}
}
