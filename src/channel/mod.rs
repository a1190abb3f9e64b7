//! [`HardwareChannel`] trait to connect the stream to a peripheral and its DMA engine.

#[cfg(feature = "serial2")]
pub mod serial2;

use crate::config::Interrupts;

/// A DMA capable receive channel and single unit transmitter of a UART peripheral.
///
/// Reception works on an *armed region*: a contiguous part of the ring buffer of `len` bytes,
/// set up by [`Self::arm()`].
/// The DMA engine fills the region from the start without involvement of the CPU,
/// and reports its progress through the remaining count of the transfer.
/// When the remaining count reaches zero, the transfer stops until the region is armed again.
///
/// The ring buffer engine never arms two regions at the same time.
pub trait HardwareChannel {
	/// The error type returned by the channel.
	type Error: core::fmt::Debug + core::fmt::Display;

	/// Route the receive and transmit interrupt lines to the peripheral.
	///
	/// Called once when the stream is constructed.
	fn route_interrupts(&mut self, interrupts: Interrupts) -> Result<(), Self::Error> {
		let _ = interrupts;
		Ok(())
	}

	/// Start (or restart) reception of at most `len` bytes into a new armed region.
	///
	/// Bytes the peripheral received while no region was armed must stay in its FIFO
	/// (as far as the FIFO depth allows) and are the first to be transferred into the new region.
	fn arm(&mut self, len: usize) -> Result<(), Self::Error>;

	/// Get the number of bytes the armed transfer can still accept.
	///
	/// `region` is the armed region, with the same length as passed to the last [`Self::arm()`].
	/// Every byte accounted for by the returned count must have been written to `region` when this returns.
	/// A real DMA engine has already written the data and only reads its transfer counter,
	/// a software channel copies the bytes it accepted into `region` here.
	fn remaining(&mut self, region: &mut [u8]) -> Result<usize, Self::Error>;

	/// Check and clear the overrun flag of the peripheral.
	fn take_overrun(&mut self) -> bool {
		false
	}

	/// Transmit a single byte.
	fn transmit_one(&mut self, byte: u8) -> Result<(), Self::Error>;

	/// Check if the peripheral has a hardware flow control line.
	fn has_hardware_flow_control(&self) -> bool {
		false
	}

	/// Drive the hardware flow control line.
	///
	/// With `ready` false, the remote transmitter is asked to pause.
	fn set_receive_ready(&mut self, ready: bool) -> Result<(), Self::Error> {
		let _ = ready;
		Ok(())
	}

	/// Enable or disable the interrupt that fires on the next received byte.
	///
	/// Used to wake the system from sleep.
	fn set_wake_interrupt(&mut self, enable: bool) {
		let _ = enable;
	}

	/// Enable or disable the interrupt that fires when the transmitter is idle.
	fn set_tx_complete_interrupt(&mut self, enable: bool) {
		let _ = enable;
	}

	/// Stop reception and transmission and release the DMA channel.
	fn deinit(&mut self) -> Result<(), Self::Error>;
}
