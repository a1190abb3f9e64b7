//! Construction-time configuration of a [`Uart`](crate::Uart) stream.

use core::time::Duration;

use crate::power::EnergyMode;
use crate::{ConfigurationError, InvalidWatermarks};

/// Bit times needed to transfer one byte with 1 start bit, 8 data bits, no parity and 1 stop bit.
pub const BITS_PER_BYTE: u64 = 10;

/// Configuration of a [`Uart`](crate::Uart) stream.
///
/// All options are fixed for the lifetime of the stream,
/// except for the line ending conversion and the receive energy mode restriction,
/// which only set the initial value of their runtime toggle.
#[derive(Debug, Clone)]
pub struct Config {
	/// Expand every `\n` not preceded by `\r` to `\r\n` on transmit.
	pub lf_to_crlf: bool,

	/// Keep reception running while the system sleeps (initial energy mode restriction).
	pub rx_when_sleeping: bool,

	/// Enable XON/XOFF software flow control.
	///
	/// When enabled, the XON and XOFF bytes are never delivered to the reader.
	pub sw_flow_control: bool,

	/// Occupancy thresholds for pausing and resuming the remote transmitter.
	pub watermarks: Watermarks,

	/// The baud rate and read latency the receive buffer must be able to absorb.
	///
	/// If set, construction fails if the buffer is too small.
	pub link_budget: Option<LinkBudget>,

	/// Timing characteristics of the peripheral and the reception re-arming.
	pub timing: ChannelTiming,

	/// Interrupt lines passed to the hardware channel.
	pub interrupts: Interrupts,

	/// The deepest energy mode that keeps reception running.
	pub rx_energy_mode: EnergyMode,

	/// The deepest energy mode that keeps transmission running.
	pub tx_energy_mode: EnergyMode,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			lf_to_crlf: false,
			rx_when_sleeping: false,
			sw_flow_control: false,
			watermarks: Watermarks::default(),
			link_budget: None,
			timing: ChannelTiming::USART,
			interrupts: Interrupts::default(),
			rx_energy_mode: EnergyMode::Em1,
			tx_energy_mode: EnergyMode::Em1,
		}
	}
}

/// Flow control thresholds in percent of the receive buffer capacity.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Watermarks {
	/// Pause the remote transmitter once the occupancy reaches this level.
	pub high_percent: u8,

	/// Resume the remote transmitter once the occupancy drops below this level.
	pub low_percent: u8,
}

impl Default for Watermarks {
	fn default() -> Self {
		Self {
			high_percent: 75,
			low_percent: 25,
		}
	}
}

impl Watermarks {
	/// Convert the percentages to byte thresholds for a buffer of the given capacity.
	///
	/// The high threshold is at least 1 byte and at most the capacity,
	/// so a full buffer always counts as above the high watermark.
	pub fn thresholds(&self, capacity: usize) -> Result<Thresholds, InvalidWatermarks> {
		InvalidWatermarks::check(self.high_percent, self.low_percent)?;
		let high = (capacity * usize::from(self.high_percent)).div_ceil(100).clamp(1, capacity.max(1));
		let low = (capacity * usize::from(self.low_percent) / 100).min(high - 1);
		Ok(Thresholds { high, low })
	}
}

/// Flow control thresholds in bytes.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Thresholds {
	pub high: usize,
	pub low: usize,
}

/// The data rate a receive buffer must absorb between two reads.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LinkBudget {
	/// The baud rate of the serial line.
	pub baud_rate: u32,

	/// The maximum time between two reads by the application.
	pub max_read_latency: Duration,
}

impl LinkBudget {
	/// The minimum buffer length that avoids data loss without flow control.
	pub fn min_rx_buffer_len(&self) -> usize {
		min_rx_buffer_len(self.baud_rate, self.max_read_latency)
	}

	pub(crate) fn check(&self, buffer_len: usize) -> Result<(), ConfigurationError> {
		crate::BufferTooSmall::check(buffer_len, self.min_rx_buffer_len())?;
		Ok(())
	}
}

/// Calculate the number of bytes that arrive during `max_read_latency` at the given baud rate.
///
/// This is `max_read_latency * baud_rate / 10`, rounded up.
/// For example, 1 ms at 921600 baud needs 93 bytes.
pub fn min_rx_buffer_len(baud_rate: u32, max_read_latency: Duration) -> usize {
	let bits = u128::from(baud_rate) * max_read_latency.as_nanos();
	let bytes = bits.div_ceil(u128::from(BITS_PER_BYTE) * 1_000_000_000);
	usize::try_from(bytes).unwrap_or(usize::MAX)
}

/// Timing characteristics of a peripheral.
///
/// While the reception is re-armed after a read, incoming bytes must fit in the hardware FIFO.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ChannelTiming {
	/// The depth of the receive FIFO of the peripheral in bytes.
	pub fifo_depth: usize,

	/// How long re-arming the reception takes.
	pub rearm_duration: Duration,
}

impl ChannelTiming {
	/// USART peripheral: 2 byte FIFO.
	pub const USART: Self = Self {
		fifo_depth: 2,
		rearm_duration: Duration::from_nanos(23_700),
	};

	/// EUSART peripheral: 16 byte FIFO.
	pub const EUSART: Self = Self {
		fifo_depth: 16,
		rearm_duration: Duration::from_nanos(23_700),
	};

	/// The highest baud rate at which the FIFO can cover a re-arm without flow control.
	///
	/// This solves `fifo_depth * 10 / baud_rate >= rearm_duration` for the baud rate.
	pub fn max_safe_baud_rate(&self) -> u32 {
		let nanos = self.rearm_duration.as_nanos();
		if nanos == 0 {
			return u32::MAX;
		}
		let bits = self.fifo_depth as u128 * u128::from(BITS_PER_BYTE) * 1_000_000_000;
		u32::try_from(bits / nanos).unwrap_or(u32::MAX)
	}

	/// Check if the FIFO can cover a re-arm at the given baud rate.
	pub fn supports_baud_rate(&self, baud_rate: u32) -> bool {
		baud_rate <= self.max_safe_baud_rate()
	}
}

/// Interrupt line identifiers of the peripheral.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct Interrupts {
	pub rx: u16,
	pub tx: u16,
}

/// Time needed to transfer `bytes` at `baud_rate`.
pub(crate) fn transfer_time(bytes: usize, baud_rate: u32) -> Duration {
	let bits = bytes as u128 * u128::from(BITS_PER_BYTE);
	let nanos = (bits * 1_000_000_000).div_ceil(u128::from(baud_rate.max(1)));
	Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}
