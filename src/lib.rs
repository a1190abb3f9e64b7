//! Byte stream transport over a UART peripheral with a DMA fed receive ring buffer.
//!
//! The [`Uart`] stream receives into a caller provided ring buffer without CPU involvement,
//! optionally handles XON/XOFF or hardware flow control towards the peer,
//! and can expand `\n` to `\r\n` on transmit.
//!
//! The peripheral is abstracted by the [`HardwareChannel`] trait.
//! With the `serial2` feature, [`channel::serial2::SerialChannel`] drives a serial port of the host.
//!
//! Power management and blocking behaviour are capabilities selected with type arguments of [`Uart`]:
//! see [`PowerCoordinator`] and [`Scheduler`].
//!
//! # Optional features
//!
//! * `log`: emit log messages using the `log` crate (enabled by default).
//! * `serial2`: implement [`HardwareChannel`] for a [`serial2::SerialPort`](::serial2::SerialPort).

#[macro_use]
mod log;

pub mod channel;
pub mod config;
pub mod flow;
pub mod power;
pub mod sync;

mod error;
mod ring;
mod scan;
mod transmit;
mod uart;

pub use channel::HardwareChannel;
pub use config::{min_rx_buffer_len, ChannelTiming, Config, Interrupts, LinkBudget, Watermarks};
pub use error::{BufferTooSmall, ConfigurationError, Error, InvalidState, InvalidWatermarks};
pub use flow::{FlowState, XOFF, XON};
pub use power::{EnergyMode, NoPower, OnIsrExit, PowerCapability, PowerCoordinator, PowerManager};
pub use sync::{Event, NoScheduler, Scheduler, Synchronization};
pub use uart::Uart;

#[cfg(feature = "serial2")]
pub use channel::serial2::SerialChannel;
