use assert2::{assert, let_assert};
use std::time::Duration;
use test_log::test;
use uartstream::{BufferTooSmall, Config, ConfigurationError, Error, InvalidState, LinkBudget, Uart, Watermarks};

mod common;
use common::MockChannel;

fn uart(channel: &MockChannel, capacity: usize, config: Config) -> Uart<MockChannel> {
	let_assert!(Ok(uart) = Uart::new(channel.clone(), vec![0; capacity], config));
	uart
}

fn read_all(uart: &Uart<MockChannel>) -> Vec<u8> {
	let mut data = vec![0; uart.capacity()];
	match uart.read(&mut data) {
		Ok(count) => data[..count].to_vec(),
		Err(Error::WouldBlock) => Vec::new(),
		Err(e) => panic!("read failed: {}", e),
	}
}

#[test]
fn test_read_returns_bytes_in_order() {
	let channel = MockChannel::new();
	let uart = uart(&channel, 16, Config::default());
	assert!(channel.state().armed == [16]);

	channel.deliver(b"hello");
	let_assert!(Ok(()) = uart.on_rx_interrupt());
	assert!(uart.available() == 5);
	assert!(read_all(&uart) == b"hello");
	assert!(uart.available() == 0);
}

#[test]
fn test_read_without_data_would_block() {
	let channel = MockChannel::new();
	let uart = uart(&channel, 16, Config::default());
	let mut data = [0; 4];
	let_assert!(Err(e) = uart.read(&mut data));
	assert!(e.is_would_block());
	assert!(let Ok(0) = uart.read(&mut []));
}

#[test]
fn test_read_picks_up_bytes_without_interrupt() {
	let channel = MockChannel::new();
	let uart = uart(&channel, 16, Config::default());
	channel.deliver(b"abc");
	// Nothing accounted the bytes yet.
	assert!(uart.available() == 0);
	assert!(read_all(&uart) == b"abc");
}

#[test]
fn test_partial_reads() {
	let channel = MockChannel::new();
	let uart = uart(&channel, 16, Config::default());
	channel.deliver(b"abcdef");
	let_assert!(Ok(()) = uart.on_rx_interrupt());

	let mut data = [0; 4];
	assert!(let Ok(4) = uart.read(&mut data));
	assert!(&data == b"abcd");
	assert!(uart.available() == 2);
	assert!(read_all(&uart) == b"ef");
}

#[test]
fn test_wrap_around_keeps_order() {
	let channel = MockChannel::new();
	let uart = uart(&channel, 8, Config::default());

	let message = b"the quick brown fox jumps over the lazy dog";
	let mut received = Vec::new();
	for chunk in message.chunks(5) {
		channel.deliver(chunk);
		let_assert!(Ok(()) = uart.on_rx_interrupt());
		received.extend(read_all(&uart));
	}
	assert!(received == message);
}

#[test]
fn test_full_ring_resumes_after_read() {
	let channel = MockChannel::new();
	let uart = uart(&channel, 4, Config::default());

	channel.deliver(b"abcdef");
	let_assert!(Ok(()) = uart.on_rx_interrupt());
	assert!(uart.available() == 4);
	assert!(channel.state().fifo.len() == 2);

	assert!(read_all(&uart) == b"abcd");
	assert!(read_all(&uart) == b"ef");
}

#[test]
fn test_overrun_is_reported_once() {
	let channel = MockChannel::new().with_fifo_depth(2);
	let uart = uart(&channel, 4, Config::default());

	channel.deliver(b"abcdefgh");
	let_assert!(Ok(()) = uart.on_rx_interrupt());

	let mut data = [0; 8];
	let_assert!(Err(Error::Overrun) = uart.read(&mut data));
	assert!(read_all(&uart) == b"abcd");
	assert!(read_all(&uart) == b"ef");
	assert!(read_all(&uart) == b"");
}

#[test]
fn test_lf_to_crlf() {
	let channel = MockChannel::new();
	let uart = uart(&channel, 16, Config { lf_to_crlf: true, ..Config::default() });
	assert!(uart.auto_cr_lf());

	assert!(let Ok(7) = uart.write(b"a\nb\r\nc\n"));
	assert!(channel.take_sent() == b"a\r\nb\r\nc\r\n");

	uart.set_auto_cr_lf(false);
	assert!(let Ok(2) = uart.write(b"d\n"));
	assert!(channel.take_sent() == b"d\n");
}

#[test]
fn test_write_arms_tx_complete_interrupt() {
	let channel = MockChannel::new();
	let uart = uart(&channel, 16, Config::default());
	assert!(let Ok(0) = uart.write(b""));
	assert!(!channel.state().tx_complete_interrupt);

	assert!(let Ok(3) = uart.write(b"abc"));
	assert!(channel.state().tx_complete_interrupt);
	let_assert!(Ok(()) = uart.on_tx_interrupt());
	assert!(!channel.state().tx_complete_interrupt);
}

#[test]
fn test_write_reports_channel_errors() {
	let channel = MockChannel::new();
	let uart = uart(&channel, 16, Config::default());
	channel.state().fail_transmit = true;
	let_assert!(Err(Error::Channel(_)) = uart.write(b"abc"));
}

#[test]
fn test_failed_write_reports_progress() {
	let channel = MockChannel::new();
	let uart = uart(&channel, 16, Config::default());
	uart.set_auto_cr_lf(true);

	// The transmitter fails between the `\r` and the `\n` of the expansion.
	channel.state().transmit_budget = Some(3);
	assert!(let Ok(2) = uart.write(b"ab\n"));
	let_assert!(Err(Error::Channel(_)) = uart.write(b"\n"));

	channel.state().transmit_budget = None;
	assert!(let Ok(1) = uart.write(b"\n"));
	assert!(channel.sent() == b"ab\r\n");
}

#[test]
fn test_buffer_capacity_boundary() {
	let config = Config {
		link_budget: Some(LinkBudget {
			baud_rate: 921_600,
			max_read_latency: Duration::from_millis(1),
		}),
		..Config::default()
	};

	let_assert!(
		Err(Error::Configuration(ConfigurationError::BufferTooSmall(e))) =
			Uart::new(MockChannel::new(), vec![0; 64], config.clone())
	);
	assert!(e == BufferTooSmall { actual: 64, required: 93 });
	assert!(let Ok(_) = Uart::new(MockChannel::new(), vec![0; 93], config));
}

#[test]
fn test_invalid_configuration() {
	let_assert!(
		Err(Error::Configuration(ConfigurationError::EmptyBuffer)) =
			Uart::new(MockChannel::new(), Vec::new(), Config::default())
	);

	let config = Config {
		watermarks: Watermarks { high_percent: 20, low_percent: 40 },
		..Config::default()
	};
	let_assert!(
		Err(Error::Configuration(ConfigurationError::InvalidWatermarks(_))) =
			Uart::new(MockChannel::new(), vec![0; 16], config)
	);
}

#[test]
fn test_borrowed_buffer() {
	let channel = MockChannel::new();
	let mut buffer = [0u8; 8];
	let_assert!(Ok(uart) = Uart::new(channel.clone(), &mut buffer[..], Config::default()));
	channel.deliver(b"xyz");

	let mut data = [0; 8];
	assert!(let Ok(3) = uart.read(&mut data));
	assert!(&data[..3] == b"xyz");
}

#[test]
fn test_deinit() {
	let channel = MockChannel::new();
	let uart = uart(&channel, 16, Config::default());
	channel.deliver(b"abc");

	let_assert!(Ok(()) = uart.deinit());
	assert!(uart.is_deinitialized());
	assert!(channel.state().deinit_count == 1);

	let_assert!(Err(Error::InvalidState(InvalidState::Deinitialized)) = uart.deinit());
	assert!(channel.state().deinit_count == 1);

	let mut data = [0; 4];
	let_assert!(Err(Error::InvalidState(InvalidState::Deinitialized)) = uart.read(&mut data));
	let_assert!(Err(Error::InvalidState(InvalidState::Deinitialized)) = uart.write(b"x"));
	let_assert!(Err(Error::InvalidState(_)) = uart.on_rx_interrupt());
	assert!(channel.sent().is_empty());
}

#[test]
fn test_io_traits() {
	use std::io::{Read, Write};

	let channel = MockChannel::new();
	let uart = uart(&channel, 16, Config::default());
	let_assert!(Ok(()) = (&uart).write_all(b"ping"));
	assert!(channel.take_sent() == b"ping");

	let mut data = [0; 4];
	let_assert!(Err(e) = Read::read(&mut &uart, &mut data));
	assert!(e.kind() == std::io::ErrorKind::WouldBlock);

	channel.deliver(b"pong");
	let_assert!(Ok(()) = (&uart).read_exact(&mut data));
	assert!(&data == b"pong");

	let_assert!(Ok(()) = uart.deinit());
	let_assert!(Err(e) = Read::read(&mut &uart, &mut data));
	assert!(e.kind() == std::io::ErrorKind::NotConnected);
}
