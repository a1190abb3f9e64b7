//! Sleep coordination with a platform power manager.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::Config;

/// Energy modes of the platform, from fully active to deep sleep.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum EnergyMode {
	Em0,
	Em1,
	Em2,
	Em3,
}

/// The decision of a peripheral on interrupt exit.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OnIsrExit {
	/// The peripheral did not raise the interrupt.
	Ignore,

	/// New data arrived, the system must return to active mode.
	Wakeup,

	/// The interrupt was handled, the system may go back to sleep.
	Sleep,
}

impl OnIsrExit {
	fn from_raw(raw: u8) -> Self {
		match raw {
			1 => Self::Wakeup,
			2 => Self::Sleep,
			_ => Self::Ignore,
		}
	}

	fn to_raw(self) -> u8 {
		match self {
			Self::Ignore => 0,
			Self::Wakeup => 1,
			Self::Sleep => 2,
		}
	}
}

/// Platform power manager.
///
/// A requirement on an energy mode prevents the platform from sleeping deeper than that mode.
/// Requirements are counted: every added requirement must be removed exactly once.
pub trait PowerManager: Send + Sync {
	/// Add a requirement on an energy mode.
	fn add_requirement(&self, mode: EnergyMode);

	/// Remove a requirement previously added with [`Self::add_requirement()`].
	fn remove_requirement(&self, mode: EnergyMode);
}

impl<T: PowerManager + ?Sized> PowerManager for std::sync::Arc<T> {
	fn add_requirement(&self, mode: EnergyMode) {
		(**self).add_requirement(mode)
	}

	fn remove_requirement(&self, mode: EnergyMode) {
		(**self).remove_requirement(mode)
	}
}

/// Hooks of the stream into power coordination.
///
/// Implemented by [`NoPower`] and [`PowerCoordinator`].
pub trait PowerCapability: Send + Sync {
	/// Apply the configuration, called once during construction.
	fn configure(&mut self, config: &Config);

	/// A write is about to transmit.
	fn transmit_started(&self);

	/// The transmitter went idle.
	fn transmit_completed(&self);

	/// A receive interrupt was handled, with or without new data for the reader.
	fn rx_interrupt(&self, new_data: bool);

	/// A transmit complete interrupt was handled.
	fn tx_interrupt(&self);

	/// Release all requirements.
	fn deinit(&self);
}

/// No power manager: sleep decisions are left to the application.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPower;

impl PowerCapability for NoPower {
	fn configure(&mut self, _config: &Config) {}
	fn transmit_started(&self) {}
	fn transmit_completed(&self) {}
	fn rx_interrupt(&self, _new_data: bool) {}
	fn tx_interrupt(&self) {}
	fn deinit(&self) {}
}

/// Energy mode bookkeeping of a stream.
///
/// Holds the receive requirement while the application wants to receive during sleep,
/// and the transmit requirement from the start of a write until the transmitter is idle.
pub struct PowerCoordinator<M> {
	manager: M,
	rx_em: EnergyMode,
	tx_em: EnergyMode,
	rx_when_sleeping: bool,
	rx_requirement: Mutex<bool>,
	tx_idle: AtomicBool,
	on_isr_exit: AtomicU8,
}

impl<M: PowerManager> PowerCoordinator<M> {
	/// Coordinate sleep with the given power manager.
	///
	/// The energy modes and the initial receive restriction are taken from the stream [`Config`].
	pub fn new(manager: M) -> Self {
		Self {
			manager,
			rx_em: EnergyMode::Em1,
			tx_em: EnergyMode::Em1,
			rx_when_sleeping: false,
			rx_requirement: Mutex::new(false),
			tx_idle: AtomicBool::new(true),
			on_isr_exit: AtomicU8::new(OnIsrExit::Ignore.to_raw()),
		}
	}

	/// Get a reference to the power manager.
	pub fn manager(&self) -> &M {
		&self.manager
	}

	/// Add or remove the requirement that keeps reception running during sleep.
	pub fn set_rx_restriction(&self, on: bool) {
		let mut held = self.rx_requirement.lock().unwrap_or_else(PoisonError::into_inner);
		if on && !*held {
			debug!("adding receive energy mode requirement on {:?}", self.rx_em);
			self.manager.add_requirement(self.rx_em);
			*held = true;
		} else if !on && *held {
			debug!("removing receive energy mode requirement on {:?}", self.rx_em);
			self.manager.remove_requirement(self.rx_em);
			*held = false;
		}
	}

	/// Check if the receive requirement is held.
	pub fn rx_restriction(&self) -> bool {
		*self.rx_requirement.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Check if the transmitter is idle.
	pub fn tx_idle(&self) -> bool {
		self.tx_idle.load(Ordering::Acquire)
	}

	/// Take the decision of the last interrupts, resetting it to [`OnIsrExit::Ignore`].
	pub(crate) fn take_isr_exit(&self) -> OnIsrExit {
		OnIsrExit::from_raw(self.on_isr_exit.swap(OnIsrExit::Ignore.to_raw(), Ordering::AcqRel))
	}

	fn handled(&self, decision: OnIsrExit) {
		match decision {
			OnIsrExit::Wakeup => self.on_isr_exit.store(decision.to_raw(), Ordering::Release),
			_ => {
				// Do not downgrade a pending wakeup.
				let _ = self.on_isr_exit.compare_exchange(
					OnIsrExit::Ignore.to_raw(),
					decision.to_raw(),
					Ordering::AcqRel,
					Ordering::Acquire,
				);
			},
		}
	}
}

impl<M: PowerManager> PowerCapability for PowerCoordinator<M> {
	fn configure(&mut self, config: &Config) {
		self.rx_em = config.rx_energy_mode;
		self.tx_em = config.tx_energy_mode;
		self.rx_when_sleeping = config.rx_when_sleeping;
		if self.rx_when_sleeping {
			self.set_rx_restriction(true);
		}
	}

	fn transmit_started(&self) {
		if self.tx_idle.swap(false, Ordering::AcqRel) {
			trace!("adding transmit energy mode requirement on {:?}", self.tx_em);
			self.manager.add_requirement(self.tx_em);
		}
	}

	fn transmit_completed(&self) {
		if !self.tx_idle.swap(true, Ordering::AcqRel) {
			trace!("removing transmit energy mode requirement on {:?}", self.tx_em);
			self.manager.remove_requirement(self.tx_em);
		}
	}

	fn rx_interrupt(&self, new_data: bool) {
		self.handled(if new_data { OnIsrExit::Wakeup } else { OnIsrExit::Sleep });
	}

	fn tx_interrupt(&self) {
		self.handled(OnIsrExit::Sleep);
	}

	fn deinit(&self) {
		self.set_rx_restriction(false);
		self.transmit_completed();
	}
}

impl<M> core::fmt::Debug for PowerCoordinator<M> {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("PowerCoordinator")
			.field("rx_em", &self.rx_em)
			.field("tx_em", &self.tx_em)
			.field("rx_when_sleeping", &self.rx_when_sleeping)
			.field("tx_idle", &self.tx_idle)
			.finish_non_exhaustive()
	}
}
