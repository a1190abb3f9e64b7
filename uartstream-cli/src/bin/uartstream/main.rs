use std::io::{Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use uartstream::{ChannelTiming, Config, LinkBudget, SerialChannel, Uart};

mod logging;
mod options;

use options::{Command, Options, StreamOptions};

/// How often the receive interrupt is emulated while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

fn main() {
	if let Err(()) = do_main(clap::Parser::parse()) {
		std::process::exit(1);
	}
}

fn do_main(options: Options) -> Result<(), ()> {
	logging::init(module_path!(), options.verbose);
	match &options.command {
		Command::Sizing {
			max_read_latency_us,
			fifo_depth,
			rearm_ns,
		} => {
			let budget = LinkBudget {
				baud_rate: options.baud_rate,
				max_read_latency: Duration::from_micros(*max_read_latency_us),
			};
			let timing = ChannelTiming {
				fifo_depth: *fifo_depth,
				rearm_duration: Duration::from_nanos(*rearm_ns),
			};
			log::info!("Link: {} baud, {:?} between reads", budget.baud_rate, budget.max_read_latency);
			log::info!(" ├─ Minimum receive buffer: {} bytes", budget.min_rx_buffer_len());
			log::info!(
				" └─ Highest baud rate without flow control: {} ({} byte FIFO, {:?} re-arm)",
				timing.max_safe_baud_rate(),
				timing.fifo_depth,
				timing.rearm_duration
			);
			if !timing.supports_baud_rate(budget.baud_rate) {
				log::warn!("{} baud can drop bytes while reception is re-armed, use flow control", budget.baud_rate);
			}
		},
		Command::Monitor { stream } => {
			let uart = open_stream(&options, stream)?;
			monitor(&uart)?;
		},
		Command::Send { stream, crlf, data } => {
			let uart = open_stream(&options, stream)?;
			uart.set_auto_cr_lf(*crlf);
			let data = if data.is_empty() {
				let mut buffer = Vec::new();
				std::io::stdin()
					.lock()
					.read_to_end(&mut buffer)
					.map_err(|e| log::error!("Failed to read from stdin: {}", e))?;
				buffer
			} else {
				data.join(" ").into_bytes()
			};
			let start = Instant::now();
			send(&uart, &data)?;
			log::info!("{:?}: sent {} bytes", start.elapsed(), data.len());
		},
		Command::ShellCompletion { shell, output } => {
			write_shell_completion(*shell, output.as_deref())?;
		},
	}

	Ok(())
}

fn open_stream(options: &Options, stream: &StreamOptions) -> Result<Uart<SerialChannel>, ()> {
	let port = serial2::SerialPort::open(&options.serial_port, options.baud_rate)
		.map_err(|e| log::error!("Failed to open serial port: {}: {}", options.serial_port.display(), e))?;
	let channel = SerialChannel::new(port)
		.map_err(|e| log::error!("Failed to configure serial port: {}: {}", options.serial_port.display(), e))?
		.with_hardware_flow_control(stream.rts);

	let config = Config {
		sw_flow_control: stream.sw_flow_control,
		link_budget: stream.max_read_latency_us.map(|latency| LinkBudget {
			baud_rate: options.baud_rate,
			max_read_latency: Duration::from_micros(latency),
		}),
		..Config::default()
	};
	let uart = Uart::new(channel, vec![0; stream.buffer_size], config).map_err(|e| log::error!("Failed to create stream: {}", e))?;
	log::debug!(
		"Using serial port {} with baud rate {} and a {} byte receive buffer",
		options.serial_port.display(),
		options.baud_rate,
		uart.capacity()
	);
	Ok(uart)
}

fn monitor(uart: &Uart<SerialChannel>) -> Result<(), ()> {
	let mut buffer = vec![0; uart.capacity()];
	loop {
		uart.on_rx_interrupt().map_err(|e| log::error!("Failed to receive: {}", e))?;
		match uart.read(&mut buffer) {
			Ok(count) => {
				let mut stdout = std::io::stdout().lock();
				stdout
					.write_all(&buffer[..count])
					.and_then(|()| stdout.flush())
					.map_err(|e| log::error!("Failed to write to stdout: {}", e))?;
			},
			Err(uartstream::Error::Overrun) => log::warn!("Receive overrun: bytes were lost"),
			Err(e) if e.is_would_block() => std::thread::sleep(POLL_INTERVAL),
			Err(e) => {
				log::error!("Failed to read: {}", e);
				return Err(());
			},
		}
	}
}

fn send(uart: &Uart<SerialChannel>, data: &[u8]) -> Result<(), ()> {
	let mut remaining = data;
	while !remaining.is_empty() {
		// Pick up XON and XOFF from the peer.
		uart.on_rx_interrupt().map_err(|e| log::error!("Failed to receive: {}", e))?;
		match uart.write(remaining) {
			Ok(count) => remaining = &remaining[count..],
			Err(e) if e.is_would_block() => {
				log::trace!("Paused by peer with {} bytes left", remaining.len());
				std::thread::sleep(POLL_INTERVAL);
			},
			Err(e) => {
				log::error!("Failed to write: {}", e);
				return Err(());
			},
		}
	}
	Ok(())
}

fn write_shell_completion(shell: clap_complete::Shell, path: Option<&Path>) -> Result<(), ()> {
	use clap::CommandFactory;

	let mut buffer = Vec::with_capacity(4 * 1024);

	let mut command = Options::command();
	clap_complete::generate(shell, &mut command, env!("CARGO_BIN_NAME"), &mut buffer);
	if !buffer.ends_with(b"\n") {
		buffer.push(b'\n');
	}

	let path = path.unwrap_or_else(|| Path::new("-"));
	if path == Path::new("-") {
		log::debug!("Writing shell completion for {} to stdout", shell);
		let stdout = std::io::stdout();
		stdout
			.lock()
			.write_all(&buffer)
			.map_err(|e| log::error!("Failed to write to stdout: {}", e))?;
	} else {
		log::debug!("Writing shell completion for {} to {}", shell, path.display());
		let mut output = std::fs::File::create(path).map_err(|e| log::error!("Failed to create {}: {}", path.display(), e))?;
		output
			.write_all(&buffer)
			.map_err(|e| log::error!("Failed to write to {}: {}", path.display(), e))?;
	}

	Ok(())
}
