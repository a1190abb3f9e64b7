//! Software [`HardwareChannel`] using the `serial2` crate.
//!
//! The kernel buffer of the host serial port takes the place of the peripheral FIFO,
//! and reading from the port takes the place of the DMA transfer.

use std::path::Path;
use std::time::Duration;

use crate::HardwareChannel;

/// Re-exported `serial2` crate in case you need to modify serial port settings.
pub use serial2;

/// Host serial port driven as a DMA channel.
pub struct SerialChannel {
	port: serial2::SerialPort,
	armed_len: usize,
	filled: usize,
	hardware_flow_control: bool,
}

impl SerialChannel {
	/// Wrap an open serial port.
	///
	/// The serial port must already be configured in raw mode with the correct baud rate,
	/// character size (8), parity (disabled) and stop bits (1).
	pub fn new(mut port: serial2::SerialPort) -> std::io::Result<Self> {
		port.set_read_timeout(Duration::ZERO)?;
		Ok(Self {
			port,
			armed_len: 0,
			filled: 0,
			hardware_flow_control: false,
		})
	}

	/// Open a serial port with the given baud rate.
	pub fn open(path: impl AsRef<Path>, baud_rate: u32) -> std::io::Result<Self> {
		Self::new(serial2::SerialPort::open(path, baud_rate)?)
	}

	/// Drive the RTS line for flow control when the stream buffer fills up.
	pub fn with_hardware_flow_control(mut self, enable: bool) -> Self {
		self.hardware_flow_control = enable;
		self
	}

	/// Get a reference to the underlying serial port.
	pub fn serial_port(&self) -> &serial2::SerialPort {
		&self.port
	}
}

impl core::fmt::Debug for SerialChannel {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("SerialChannel")
			.field("armed_len", &self.armed_len)
			.field("filled", &self.filled)
			.field("hardware_flow_control", &self.hardware_flow_control)
			.finish_non_exhaustive()
	}
}

impl HardwareChannel for SerialChannel {
	type Error = std::io::Error;

	fn arm(&mut self, len: usize) -> Result<(), Self::Error> {
		self.armed_len = len;
		self.filled = 0;
		Ok(())
	}

	fn remaining(&mut self, region: &mut [u8]) -> Result<usize, Self::Error> {
		let end = self.armed_len.min(region.len());
		if self.filled < end {
			match self.port.read(&mut region[self.filled..end]) {
				Ok(count) => self.filled += count,
				Err(e) if matches!(e.kind(), std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock) => (),
				Err(e) => return Err(e),
			}
		}
		Ok(self.armed_len - self.filled)
	}

	fn transmit_one(&mut self, byte: u8) -> Result<(), Self::Error> {
		self.port.write_all(&[byte])
	}

	fn has_hardware_flow_control(&self) -> bool {
		self.hardware_flow_control
	}

	fn set_receive_ready(&mut self, ready: bool) -> Result<(), Self::Error> {
		if self.hardware_flow_control {
			self.port.set_rts(ready)?;
		}
		Ok(())
	}

	fn deinit(&mut self) -> Result<(), Self::Error> {
		self.armed_len = 0;
		self.filled = 0;
		self.port.discard_buffers()
	}
}
