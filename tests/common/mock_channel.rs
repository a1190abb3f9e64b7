use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use uartstream::HardwareChannel;

/// Shared state of the mock peripheral.
#[derive(Debug)]
pub struct MockState {
	/// Bytes received by the peripheral that did not fit in the armed region.
	pub fifo: VecDeque<u8>,

	/// The maximum number of bytes the FIFO holds before new bytes are dropped.
	pub fifo_depth: usize,

	/// Bytes accepted by the DMA transfer but not yet written to the region.
	dma: VecDeque<u8>,
	armed_len: usize,
	filled: usize,

	/// The length of every armed region, in order.
	pub armed: Vec<usize>,

	pub overrun: bool,
	pub sent: Vec<u8>,
	pub fail_transmit: bool,

	/// The number of bytes the transmitter accepts before it fails, if limited.
	pub transmit_budget: Option<usize>,

	pub hardware_flow_control: bool,
	pub receive_ready: bool,
	pub wake_interrupt: bool,
	pub tx_complete_interrupt: bool,
	pub deinit_count: usize,
}

impl Default for MockState {
	fn default() -> Self {
		Self {
			fifo: VecDeque::new(),
			fifo_depth: usize::MAX,
			dma: VecDeque::new(),
			armed_len: 0,
			filled: 0,
			armed: Vec::new(),
			overrun: false,
			sent: Vec::new(),
			fail_transmit: false,
			transmit_budget: None,
			hardware_flow_control: false,
			receive_ready: true,
			wake_interrupt: false,
			tx_complete_interrupt: false,
			deinit_count: 0,
		}
	}
}

/// Mock UART peripheral with a DMA engine.
///
/// Clones share the same state, so a test keeps one clone to play the peer.
#[derive(Debug, Clone, Default)]
pub struct MockChannel {
	state: Arc<Mutex<MockState>>,
}

impl MockChannel {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_fifo_depth(self, depth: usize) -> Self {
		self.state().fifo_depth = depth;
		self
	}

	pub fn with_hardware_flow_control(self) -> Self {
		self.state().hardware_flow_control = true;
		self
	}

	pub fn state(&self) -> MutexGuard<'_, MockState> {
		self.state.lock().unwrap()
	}

	/// Receive bytes from the peer.
	///
	/// Bytes go to the armed DMA region first, then to the FIFO.
	/// Bytes that fit in neither are dropped and flag an overrun.
	pub fn deliver(&self, data: &[u8]) {
		let mut state = self.state();
		for &byte in data {
			if state.filled + state.dma.len() < state.armed_len {
				state.dma.push_back(byte);
			} else if state.fifo.len() < state.fifo_depth {
				state.fifo.push_back(byte);
			} else {
				state.overrun = true;
			}
		}
	}

	/// Take all transmitted bytes.
	pub fn take_sent(&self) -> Vec<u8> {
		std::mem::take(&mut self.state().sent)
	}

	pub fn sent(&self) -> Vec<u8> {
		self.state().sent.clone()
	}
}

impl HardwareChannel for MockChannel {
	type Error = std::io::Error;

	fn arm(&mut self, len: usize) -> Result<(), Self::Error> {
		let mut state = self.state();
		let state = &mut *state;
		while let Some(byte) = state.dma.pop_back() {
			state.fifo.push_front(byte);
		}
		state.armed.push(len);
		state.armed_len = len;
		state.filled = 0;
		while state.dma.len() < len {
			let Some(byte) = state.fifo.pop_front() else { break };
			state.dma.push_back(byte);
		}
		Ok(())
	}

	fn remaining(&mut self, region: &mut [u8]) -> Result<usize, Self::Error> {
		let mut state = self.state();
		assert!(region.len() == state.armed_len);
		while let Some(byte) = state.dma.pop_front() {
			let index = state.filled;
			region[index] = byte;
			state.filled += 1;
		}
		Ok(state.armed_len - state.filled)
	}

	fn take_overrun(&mut self) -> bool {
		std::mem::take(&mut self.state().overrun)
	}

	fn transmit_one(&mut self, byte: u8) -> Result<(), Self::Error> {
		let mut state = self.state();
		if state.fail_transmit || state.transmit_budget == Some(0) {
			return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "transmitter failed"));
		}
		if let Some(budget) = &mut state.transmit_budget {
			*budget -= 1;
		}
		state.sent.push(byte);
		Ok(())
	}

	fn has_hardware_flow_control(&self) -> bool {
		self.state().hardware_flow_control
	}

	fn set_receive_ready(&mut self, ready: bool) -> Result<(), Self::Error> {
		self.state().receive_ready = ready;
		Ok(())
	}

	fn set_wake_interrupt(&mut self, enable: bool) {
		self.state().wake_interrupt = enable;
	}

	fn set_tx_complete_interrupt(&mut self, enable: bool) {
		self.state().tx_complete_interrupt = enable;
	}

	fn deinit(&mut self) -> Result<(), Self::Error> {
		self.state().deinit_count += 1;
		Ok(())
	}
}
