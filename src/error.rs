/// An error that can occur while using a [`Uart`](crate::Uart) stream.
#[derive(Debug)]
pub enum Error<E> {
	/// A non-blocking read found no data, or a non-blocking write was paused by the peer.
	WouldBlock,

	/// The peripheral dropped received bytes because the consumer did not drain the ring buffer in time.
	///
	/// The lost data can not be recovered.
	/// Bytes received before and after the loss are still delivered in order.
	Overrun,

	/// The operation is not valid in the current state of the stream.
	InvalidState(InvalidState),

	/// The stream configuration was rejected at construction.
	Configuration(ConfigurationError),

	/// The hardware channel reported an error.
	Channel(E),
}

/// The stream is not in a state that allows the operation.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InvalidState {
	/// The stream has already been deinitialized.
	Deinitialized,
}

/// The configuration passed to [`Uart::new()`](crate::Uart::new) is unusable.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ConfigurationError {
	/// The receive buffer has no room for a single byte.
	EmptyBuffer,
	BufferTooSmall(BufferTooSmall),
	InvalidWatermarks(InvalidWatermarks),
}

/// The receive buffer can not absorb the declared baud rate for the declared read latency.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BufferTooSmall {
	/// The length of the provided buffer.
	pub actual: usize,

	/// The minimum length for the link budget.
	pub required: usize,
}

/// The flow control watermarks are out of range or out of order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InvalidWatermarks {
	/// The high watermark in percent of the buffer capacity.
	pub high: u8,

	/// The low watermark in percent of the buffer capacity.
	pub low: u8,
}

impl BufferTooSmall {
	pub fn check(actual: usize, required: usize) -> Result<(), Self> {
		if actual >= required {
			Ok(())
		} else {
			Err(Self { actual, required })
		}
	}
}

impl InvalidWatermarks {
	pub fn check(high: u8, low: u8) -> Result<(), Self> {
		if high > 0 && high <= 100 && low < high {
			Ok(())
		} else {
			Err(Self { high, low })
		}
	}
}

impl<E> Error<E> {
	/// Check if this error means the operation would have to block.
	pub fn is_would_block(&self) -> bool {
		matches!(self, Self::WouldBlock)
	}
}

impl<E> std::error::Error for Error<E> where E: std::fmt::Debug + std::fmt::Display {}
impl std::error::Error for InvalidState {}
impl std::error::Error for ConfigurationError {}
impl std::error::Error for BufferTooSmall {}
impl std::error::Error for InvalidWatermarks {}

impl<E> From<InvalidState> for Error<E> {
	fn from(other: InvalidState) -> Self {
		Self::InvalidState(other)
	}
}

impl<E> From<ConfigurationError> for Error<E> {
	fn from(other: ConfigurationError) -> Self {
		Self::Configuration(other)
	}
}

impl<E> From<BufferTooSmall> for Error<E> {
	fn from(other: BufferTooSmall) -> Self {
		Self::Configuration(other.into())
	}
}

impl<E> From<InvalidWatermarks> for Error<E> {
	fn from(other: InvalidWatermarks) -> Self {
		Self::Configuration(other.into())
	}
}

impl From<BufferTooSmall> for ConfigurationError {
	fn from(other: BufferTooSmall) -> Self {
		Self::BufferTooSmall(other)
	}
}

impl From<InvalidWatermarks> for ConfigurationError {
	fn from(other: InvalidWatermarks) -> Self {
		Self::InvalidWatermarks(other)
	}
}

impl<E> From<Error<E>> for std::io::Error
where
	E: std::fmt::Debug + std::fmt::Display + Send + Sync + 'static,
{
	fn from(other: Error<E>) -> Self {
		match other {
			Error::WouldBlock => std::io::ErrorKind::WouldBlock.into(),
			Error::InvalidState(e) => std::io::Error::new(std::io::ErrorKind::NotConnected, e),
			Error::Configuration(e) => std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
			e => std::io::Error::new(std::io::ErrorKind::Other, e),
		}
	}
}

impl<E> std::fmt::Display for Error<E>
where
	E: std::fmt::Display,
{
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::WouldBlock => write!(f, "operation would block"),
			Self::Overrun => write!(f, "receive overrun: bytes were lost before they could be buffered"),
			Self::InvalidState(e) => write!(f, "{}", e),
			Self::Configuration(e) => write!(f, "{}", e),
			Self::Channel(e) => write!(f, "hardware channel error: {}", e),
		}
	}
}

impl std::fmt::Display for InvalidState {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Deinitialized => write!(f, "the stream has been deinitialized"),
		}
	}
}

impl std::fmt::Display for ConfigurationError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::EmptyBuffer => write!(f, "the receive buffer is empty"),
			Self::BufferTooSmall(e) => write!(f, "{}", e),
			Self::InvalidWatermarks(e) => write!(f, "{}", e),
		}
	}
}

impl std::fmt::Display for BufferTooSmall {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"receive buffer too small for the link budget: need at least {} bytes, got {}",
			self.required, self.actual
		)
	}
}

impl std::fmt::Display for InvalidWatermarks {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"invalid flow control watermarks: high {}%, low {}% (need 0 < high <= 100 and low < high)",
			self.high, self.low
		)
	}
}
