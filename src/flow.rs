//! XON/XOFF flow control state.

use core::sync::atomic::{AtomicU8, Ordering};

/// Resume token (DC1).
pub const XON: u8 = 0x11;

/// Pause token (DC3).
pub const XOFF: u8 = 0x13;

const LOCAL_XON: u8 = 1 << 0;
const REMOTE_XON: u8 = 1 << 1;

/// Snapshot of the flow control state.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FlowState {
	/// Both sides may transmit.
	Open,

	/// We asked the peer to pause, because our receive buffer is filling up.
	PeerPaused,

	/// The peer asked us to pause.
	SelfPaused,

	/// Both sides are paused.
	BothPaused,
}

impl FlowState {
	fn from_bits(bits: u8) -> Self {
		match (bits & LOCAL_XON != 0, bits & REMOTE_XON != 0) {
			(true, true) => Self::Open,
			(true, false) => Self::PeerPaused,
			(false, true) => Self::SelfPaused,
			(false, false) => Self::BothPaused,
		}
	}

	/// Check if this side may transmit.
	pub fn xon(self) -> bool {
		matches!(self, Self::Open | Self::PeerPaused)
	}

	/// Check if the peer may transmit, as far as we told it.
	pub fn remote_xon(self) -> bool {
		matches!(self, Self::Open | Self::SelfPaused)
	}
}

/// Flow control permissions shared between the interrupt handlers and the reader and writer.
///
/// Both permissions live in a single atomic, so no context can observe a torn update.
/// The setters report whether they changed the state:
/// only the caller that observed the edge may send the corresponding signal.
#[derive(Debug)]
pub(crate) struct FlowControl {
	bits: AtomicU8,
}

impl FlowControl {
	pub fn new() -> Self {
		Self {
			bits: AtomicU8::new(LOCAL_XON | REMOTE_XON),
		}
	}

	pub fn state(&self) -> FlowState {
		FlowState::from_bits(self.bits.load(Ordering::Acquire))
	}

	/// Check if this side may transmit.
	pub fn xon(&self) -> bool {
		self.state().xon()
	}

	/// Set the local transmit permission, returning true if it changed.
	pub fn set_xon(&self, on: bool) -> bool {
		self.set(LOCAL_XON, on)
	}

	/// Set the remote transmit permission, returning true if it changed.
	pub fn set_remote_xon(&self, on: bool) -> bool {
		self.set(REMOTE_XON, on)
	}

	fn set(&self, bit: u8, on: bool) -> bool {
		let previous = if on {
			self.bits.fetch_or(bit, Ordering::AcqRel)
		} else {
			self.bits.fetch_and(!bit, Ordering::AcqRel)
		};
		(previous & bit != 0) != on
	}
}
