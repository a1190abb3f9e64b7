use std::path::PathBuf;

/// Exchange bytes with a serial port through a ring buffered stream.
///
/// Received data is written to standard output, log messages go to standard error.
#[derive(clap::Parser)]
pub struct Options {
	/// Print more verbose messages. Can be used multiple times.
	#[arg(long, short, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// The serial port to use.
	#[arg(long, short, global = true)]
	#[cfg_attr(target_os = "windows", arg(default_value = "COM1"))]
	#[cfg_attr(not(target_os = "windows"), arg(default_value = "/dev/ttyUSB0"))]
	pub serial_port: PathBuf,

	/// The baud rate of the serial line.
	#[arg(long, short, global = true, default_value = "115200")]
	pub baud_rate: u32,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(clap::Subcommand)]
pub enum Command {
	/// Calculate the receive buffer size and baud rate limits for a link.
	///
	/// This does not open the serial port.
	Sizing {
		/// The maximum time between two reads, in microseconds.
		#[arg(long, default_value = "1000")]
		max_read_latency_us: u64,

		/// The depth of the receive FIFO of the peripheral in bytes.
		#[arg(long, default_value = "2")]
		fifo_depth: usize,

		/// How long re-arming the reception takes, in nanoseconds.
		#[arg(long, default_value = "23700")]
		rearm_ns: u64,
	},

	/// Print all received data to standard output.
	Monitor {
		#[command(flatten)]
		stream: StreamOptions,
	},

	/// Send data, waiting while the peer has paused us.
	///
	/// Without data arguments, standard input is sent.
	Send {
		#[command(flatten)]
		stream: StreamOptions,

		/// Expand every line feed to a carriage return and line feed.
		#[arg(long)]
		crlf: bool,

		/// The data to send, joined by spaces.
		#[arg(value_name = "DATA")]
		data: Vec<String>,
	},

	/// Write shell completions to standard output or a file.
	ShellCompletion {
		/// The shell for which to generate completions.
		#[arg(long)]
		shell: clap_complete::Shell,

		/// The file to write the generated completion file to.
		#[arg(long, short)]
		output: Option<PathBuf>,
	},
}

#[derive(clap::Args)]
pub struct StreamOptions {
	/// The size of the receive ring buffer in bytes.
	#[arg(long, default_value = "256")]
	pub buffer_size: usize,

	/// Use XON/XOFF software flow control.
	#[arg(long)]
	pub sw_flow_control: bool,

	/// Use the RTS line for hardware flow control.
	#[arg(long)]
	pub rts: bool,

	/// Reject buffers that can not absorb this many microseconds of data at the baud rate.
	#[arg(long, value_name = "MICROSECONDS")]
	pub max_read_latency_us: Option<u64>,
}
