use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::{transfer_time, Thresholds};
use crate::flow::{FlowControl, FlowState, XOFF, XON};
use crate::power::{NoPower, OnIsrExit, PowerCapability, PowerCoordinator, PowerManager};
use crate::ring::RingBuffer;
use crate::scan::{Scanner, Token};
use crate::sync::{Event, NoScheduler, Scheduler, Synchronization};
use crate::transmit::LineEnding;
use crate::{Config, ConfigurationError, Error, HardwareChannel, InvalidState};

/// Receive side state, shared between the receive interrupt and the reader.
#[derive(Debug)]
struct Receiver<Buffer> {
	ring: RingBuffer<Buffer>,
	scanner: Scanner,
	overrun: bool,
}

/// Byte stream over a UART peripheral with a DMA fed receive ring buffer.
///
/// The platform must call [`Self::on_rx_interrupt()`] and [`Self::on_tx_interrupt()`] from the interrupt handlers of the peripheral.
/// All other functions are meant for tasks.
/// The stream can be shared between threads, for example in an [`Arc`](std::sync::Arc).
///
/// Optional capabilities are selected with the `Power` and `Sched` type arguments:
/// * With a [`PowerCoordinator`], the stream manages energy mode requirements and can prepare the peripheral for sleep.
/// * With a [`Scheduler`], reads block until data arrives and writes wait while the peer has paused us.
///   With [`NoScheduler`], both fail with [`Error::WouldBlock`] instead.
pub struct Uart<Channel, Buffer = Vec<u8>, Power = NoPower, Sched = NoScheduler> {
	rx: Mutex<Receiver<Buffer>>,
	tx: Mutex<LineEnding>,
	channel: Mutex<Channel>,
	flow: FlowControl,
	thresholds: Thresholds,
	sw_flow_control: bool,
	lf_to_crlf: AtomicBool,
	deinitialized: AtomicBool,
	power: Power,
	sched: Sched,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<Channel, Buffer, Power, Sched> core::fmt::Debug for Uart<Channel, Buffer, Power, Sched>
where
	Channel: core::fmt::Debug,
	Power: core::fmt::Debug,
{
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Uart")
			.field("channel", &self.channel)
			.field("flow", &self.flow.state())
			.field("thresholds", &self.thresholds)
			.field("sw_flow_control", &self.sw_flow_control)
			.field("power", &self.power)
			.finish_non_exhaustive()
	}
}

impl<Channel, Buffer> Uart<Channel, Buffer>
where
	Channel: HardwareChannel,
	Buffer: AsRef<[u8]> + AsMut<[u8]>,
{
	/// Create a non-blocking stream without power management.
	///
	/// Reception starts immediately into `buffer`.
	pub fn new(channel: Channel, buffer: Buffer, config: Config) -> Result<Self, Error<Channel::Error>> {
		Self::with_capabilities(channel, buffer, config, NoPower, NoScheduler)
	}
}

impl<Channel, Buffer, Power, Sched> Uart<Channel, Buffer, Power, Sched>
where
	Channel: HardwareChannel,
	Buffer: AsRef<[u8]> + AsMut<[u8]>,
	Power: PowerCapability,
	Sched: Synchronization,
{
	/// Create a stream with the given power and synchronization capabilities.
	///
	/// Fails with [`Error::Configuration`] if the buffer is empty, the watermarks are invalid,
	/// or the buffer is too small for the link budget of the configuration.
	pub fn with_capabilities(
		mut channel: Channel,
		buffer: Buffer,
		config: Config,
		mut power: Power,
		sched: Sched,
	) -> Result<Self, Error<Channel::Error>> {
		let capacity = buffer.as_ref().len();
		if capacity == 0 {
			return Err(ConfigurationError::EmptyBuffer.into());
		}
		let thresholds = config.watermarks.thresholds(capacity)?;
		if let Some(budget) = &config.link_budget {
			budget.check(capacity)?;
			if !config.timing.supports_baud_rate(budget.baud_rate) && !channel.has_hardware_flow_control() {
				warn!(
					"{} baud overflows the {} byte FIFO in {:?}, but re-arming reception takes {:?}: bytes may be dropped without flow control",
					budget.baud_rate,
					config.timing.fifo_depth,
					transfer_time(config.timing.fifo_depth, budget.baud_rate),
					config.timing.rearm_duration,
				);
			}
		}

		channel.route_interrupts(config.interrupts).map_err(Error::Channel)?;
		let mut ring = RingBuffer::new(buffer);
		ring.arm(&mut channel).map_err(Error::Channel)?;
		power.configure(&config);
		debug!(
			"stream ready: {} byte ring, watermarks {}/{} bytes, software flow control {}",
			capacity, thresholds.high, thresholds.low, config.sw_flow_control
		);

		Ok(Self {
			rx: Mutex::new(Receiver {
				ring,
				scanner: Scanner::new(config.sw_flow_control),
				overrun: false,
			}),
			tx: Mutex::new(LineEnding::default()),
			channel: Mutex::new(channel),
			flow: FlowControl::new(),
			thresholds,
			sw_flow_control: config.sw_flow_control,
			lf_to_crlf: AtomicBool::new(config.lf_to_crlf),
			deinitialized: AtomicBool::new(false),
			power,
			sched,
		})
	}

	/// The capacity of the receive ring buffer.
	pub fn capacity(&self) -> usize {
		lock(&self.rx).ring.capacity()
	}

	/// The number of received bytes that can be read without waiting.
	///
	/// Only counts bytes accounted by the last receive interrupt or read.
	/// Bytes the DMA engine transferred since then are not included.
	pub fn available(&self) -> usize {
		let rx = lock(&self.rx);
		rx.scanner.deliverable(&rx.ring)
	}

	/// The current flow control state.
	pub fn flow_state(&self) -> FlowState {
		self.flow.state()
	}

	/// Enable or disable automatic conversion of `\n` to `\r\n` on transmit.
	pub fn set_auto_cr_lf(&self, on: bool) {
		self.lf_to_crlf.store(on, Ordering::Relaxed);
	}

	/// Check if automatic line ending conversion is enabled.
	pub fn auto_cr_lf(&self) -> bool {
		self.lf_to_crlf.load(Ordering::Relaxed)
	}

	/// Check if [`Self::deinit()`] has been called.
	pub fn is_deinitialized(&self) -> bool {
		self.deinitialized.load(Ordering::Acquire)
	}

	/// Read received bytes into `buffer`.
	///
	/// Returns the number of bytes read, which is at most the number of available bytes.
	/// XON and XOFF bytes are never returned when software flow control is enabled.
	///
	/// If no bytes are available, the call blocks when the stream has a [`Scheduler`] in blocking mode,
	/// and fails with [`Error::WouldBlock`] otherwise.
	/// If the peripheral reported an overrun since the last read, this fails once with [`Error::Overrun`]
	/// and the data received around the loss can be read by the next call.
	pub fn read(&self, buffer: &mut [u8]) -> Result<usize, Error<Channel::Error>> {
		self.check_active()?;
		let _guard = self.sched.lock_read();
		loop {
			self.check_active()?;
			{
				let mut rx = lock(&self.rx);
				let rx = &mut *rx;
				let mut channel = lock(&self.channel);
				self.service(rx, &mut channel, false)?;
				if core::mem::take(&mut rx.overrun) {
					return Err(Error::Overrun);
				}

				let read_position = rx.ring.read_position();
				rx.scanner.skip_tokens(&mut rx.ring);
				let count = rx.scanner.consume(&mut rx.ring, buffer);
				if rx.ring.read_position() != read_position {
					// Hand the freed space back to the DMA engine.
					self.service(rx, &mut channel, true)?;
				}
				if count > 0 || buffer.is_empty() {
					return Ok(count);
				}
			}

			if !self.sched.read_blocks() {
				return Err(Error::WouldBlock);
			}
			self.sched.wait(Event::RxData);
		}
	}

	/// Write bytes to the stream.
	///
	/// Returns the number of input bytes handed to the peripheral.
	/// With line ending conversion enabled, more bytes than that may be transmitted.
	///
	/// While the peer has paused us with XOFF, the call waits for XON when the stream has a [`Scheduler`].
	/// Otherwise it returns the number of bytes written before the pause,
	/// or fails with [`Error::WouldBlock`] if nothing could be written.
	pub fn write(&self, data: &[u8]) -> Result<usize, Error<Channel::Error>> {
		self.check_active()?;
		if data.is_empty() {
			return Ok(0);
		}

		let _guard = self.sched.lock_write();
		let mut line_ending = lock(&self.tx);
		let lf_to_crlf = self.auto_cr_lf();
		self.power.transmit_started();

		let mut written = 0;
		let result = loop {
			if written == data.len() {
				break Ok(written);
			}
			if self.is_deinitialized() {
				break Err(InvalidState::Deinitialized.into());
			}
			if !self.flow.xon() {
				if !self.sched.write_blocks() {
					break if written > 0 { Ok(written) } else { Err(Error::WouldBlock) };
				}
				trace!("transmission paused by peer after {} bytes", written);
				self.sched.wait(Event::TxResume);
				continue;
			}

			let mut channel = lock(&self.channel);
			if let Err(e) = line_ending.transmit(&mut *channel, data[written], lf_to_crlf) {
				if written > 0 {
					// Report the progress, the error shows up again on the next write.
					debug!("transmit failed after {} bytes: {}", written, e);
					break Ok(written);
				}
				break Err(Error::Channel(e));
			}
			written += 1;
		};

		if written > 0 {
			// The transmit complete interrupt releases the transmit energy mode requirement.
			lock(&self.channel).set_tx_complete_interrupt(true);
		} else {
			self.power.transmit_completed();
		}
		result
	}

	/// Handle a receive interrupt of the peripheral.
	///
	/// Accounts for the bytes the DMA engine transferred, scans them for flow control tokens,
	/// and wakes up a blocked reader once per batch of new bytes.
	pub fn on_rx_interrupt(&self) -> Result<(), Error<Channel::Error>> {
		self.check_active()?;
		let (new, overrun) = {
			let mut rx = lock(&self.rx);
			let mut channel = lock(&self.channel);
			let new = self.service(&mut rx, &mut channel, false)?;
			(new, rx.overrun)
		};

		if new > 0 || overrun {
			trace!("received {} new bytes", new);
			self.sched.signal(Event::RxData);
		}
		self.power.rx_interrupt(new > 0 || overrun);
		Ok(())
	}

	/// Handle a transmit complete interrupt of the peripheral.
	pub fn on_tx_interrupt(&self) -> Result<(), Error<Channel::Error>> {
		self.check_active()?;
		lock(&self.channel).set_tx_complete_interrupt(false);
		self.power.transmit_completed();
		self.power.tx_interrupt();
		Ok(())
	}

	/// Deinitialize the stream.
	///
	/// Releases the receive energy mode requirement, then deinitializes the hardware channel.
	/// Blocked readers and writers wake up and fail with [`InvalidState::Deinitialized`].
	///
	/// Calling this more than once is a misuse and fails with [`InvalidState::Deinitialized`].
	pub fn deinit(&self) -> Result<(), Error<Channel::Error>> {
		if self.deinitialized.swap(true, Ordering::AcqRel) {
			return Err(InvalidState::Deinitialized.into());
		}
		self.power.deinit();
		let result = lock(&self.channel).deinit().map_err(Error::Channel);
		self.sched.signal(Event::RxData);
		self.sched.signal(Event::TxResume);
		debug!("stream deinitialized");
		result
	}

	/// Consume the stream to get ownership of the hardware channel.
	pub fn into_channel(self) -> Channel {
		self.channel.into_inner().unwrap_or_else(PoisonError::into_inner)
	}

	fn check_active(&self) -> Result<(), InvalidState> {
		if self.is_deinitialized() {
			Err(InvalidState::Deinitialized)
		} else {
			Ok(())
		}
	}

	/// Pull in pending bytes, scan them, and update the flow control of the peer.
	///
	/// Returns the number of new bytes for the reader.
	fn service(&self, rx: &mut Receiver<Buffer>, channel: &mut Channel, rearm: bool) -> Result<usize, Error<Channel::Error>> {
		if channel.take_overrun() {
			warn!("receive overrun, bytes were lost");
			rx.overrun = true;
		}

		let before = rx.scanner.deliverable(&rx.ring);
		if rearm {
			rx.ring.rearm(channel).map_err(Error::Channel)?;
		} else {
			rx.ring.sync(channel).map_err(Error::Channel)?;
		}

		let mut resumed = false;
		loop {
			rx.scanner.scan(&rx.ring, |token| match token {
				Token::Pause => {
					if self.flow.set_xon(false) {
						debug!("peer paused our transmission");
					}
				},
				Token::Resume => {
					if self.flow.set_xon(true) {
						debug!("peer resumed our transmission");
						resumed = true;
					}
				},
			});

			// Tokens at the read position are dropped right away,
			// so a buffer full of tokens does not stop reception.
			let position = rx.ring.read_position();
			rx.scanner.skip_tokens(&mut rx.ring);
			if rx.ring.read_position() == position {
				break;
			}
			rx.ring.rearm(channel).map_err(Error::Channel)?;
			rx.ring.sync(channel).map_err(Error::Channel)?;
		}
		if resumed {
			self.sched.signal(Event::TxResume);
		}

		// Tokens still in the buffer are dropped on the next read, they do not count towards the watermarks.
		self.update_peer_permission(rx.ring.len() - rx.scanner.tokens(), channel)?;
		Ok(rx.scanner.deliverable(&rx.ring).saturating_sub(before))
	}

	/// Pause or resume the peer based on the ring occupancy.
	fn update_peer_permission(&self, occupancy: usize, channel: &mut Channel) -> Result<(), Error<Channel::Error>> {
		if !self.sw_flow_control && !channel.has_hardware_flow_control() {
			return Ok(());
		}

		let ready = if occupancy >= self.thresholds.high {
			false
		} else if occupancy < self.thresholds.low {
			true
		} else {
			return Ok(());
		};
		if !self.flow.set_remote_xon(ready) {
			return Ok(());
		}

		debug!(
			"{} peer at {} buffered bytes",
			if ready { "resuming" } else { "pausing" },
			occupancy
		);
		let signalled = if self.sw_flow_control {
			channel.transmit_one(if ready { XON } else { XOFF })
		} else {
			channel.set_receive_ready(ready)
		};
		if let Err(e) = signalled {
			// Keep the state in line with what the peer was told.
			self.flow.set_remote_xon(!ready);
			return Err(Error::Channel(e));
		}
		Ok(())
	}
}

impl<Channel, Buffer, M, Sched> Uart<Channel, Buffer, PowerCoordinator<M>, Sched>
where
	Channel: HardwareChannel,
	Buffer: AsRef<[u8]> + AsMut<[u8]>,
	M: PowerManager,
	Sched: Synchronization,
{
	/// Keep reception running when the system sleeps, or allow it to stop.
	///
	/// With the restriction disabled, bytes arriving while the system is in a deep energy mode may be lost.
	pub fn set_rx_energy_mode_restriction(&self, on: bool) -> Result<(), InvalidState> {
		self.check_active()?;
		self.power.set_rx_restriction(on);
		Ok(())
	}

	/// Check if reception is kept running during sleep.
	pub fn rx_energy_mode_restriction(&self) -> bool {
		self.power.rx_restriction()
	}

	/// Arm the next byte interrupt so received data can wake the system.
	///
	/// Does nothing if reception is not kept running during sleep.
	pub fn prepare_for_sleep(&self) -> Result<(), InvalidState> {
		self.check_active()?;
		if self.power.rx_restriction() {
			lock(&self.channel).set_wake_interrupt(true);
		} else {
			debug!("reception is not kept running during sleep, not arming the wake interrupt");
		}
		Ok(())
	}

	/// Restore normal operation after a wakeup.
	pub fn wakeup(&self) -> Result<(), InvalidState> {
		self.check_active()?;
		lock(&self.channel).set_wake_interrupt(false);
		Ok(())
	}

	/// Get a reference to the power coordinator.
	pub fn power(&self) -> &PowerCoordinator<M> {
		&self.power
	}
}

impl<Channel, Buffer, M> Uart<Channel, Buffer, PowerCoordinator<M>, NoScheduler>
where
	Channel: HardwareChannel,
	Buffer: AsRef<[u8]> + AsMut<[u8]>,
	M: PowerManager,
{
	/// Get the decision of the peripheral for the interrupt exit hook of the power manager.
	///
	/// * [`OnIsrExit::Ignore`]: the peripheral did not raise an interrupt since the last call.
	/// * [`OnIsrExit::Wakeup`]: new data arrived, the system must wake up.
	/// * [`OnIsrExit::Sleep`]: the interrupt was handled, the system may go back to sleep.
	pub fn sleep_on_isr_exit(&self) -> OnIsrExit {
		self.power.take_isr_exit()
	}
}

impl<Channel, Buffer, Power> Uart<Channel, Buffer, Power, Scheduler>
where
	Channel: HardwareChannel,
	Buffer: AsRef<[u8]> + AsMut<[u8]>,
	Power: PowerCapability,
{
	/// Select blocking or non-blocking reads.
	///
	/// Disabling blocking wakes up a blocked reader, which then returns with the available data
	/// or fails with [`Error::WouldBlock`].
	pub fn set_read_block(&self, on: bool) {
		self.sched.set_read_block(on);
	}

	/// Check if reads block.
	pub fn read_block(&self) -> bool {
		self.sched.read_block()
	}
}

impl<Channel, Buffer, Power, Sched> std::io::Read for &Uart<Channel, Buffer, Power, Sched>
where
	Channel: HardwareChannel,
	Channel::Error: Send + Sync + 'static,
	Buffer: AsRef<[u8]> + AsMut<[u8]>,
	Power: PowerCapability,
	Sched: Synchronization,
{
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		Ok(Uart::read(*self, buf)?)
	}
}

impl<Channel, Buffer, Power, Sched> std::io::Write for &Uart<Channel, Buffer, Power, Sched>
where
	Channel: HardwareChannel,
	Channel::Error: Send + Sync + 'static,
	Buffer: AsRef<[u8]> + AsMut<[u8]>,
	Power: PowerCapability,
	Sched: Synchronization,
{
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		Ok(Uart::write(*self, buf)?)
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}

impl<Channel, Buffer, Power, Sched> std::io::Read for Uart<Channel, Buffer, Power, Sched>
where
	Channel: HardwareChannel,
	Channel::Error: Send + Sync + 'static,
	Buffer: AsRef<[u8]> + AsMut<[u8]>,
	Power: PowerCapability,
	Sched: Synchronization,
{
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		Ok(Uart::read(&*self, buf)?)
	}
}

impl<Channel, Buffer, Power, Sched> std::io::Write for Uart<Channel, Buffer, Power, Sched>
where
	Channel: HardwareChannel,
	Channel::Error: Send + Sync + 'static,
	Buffer: AsRef<[u8]> + AsMut<[u8]>,
	Power: PowerCapability,
	Sched: Synchronization,
{
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		Ok(Uart::write(&*self, buf)?)
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}
