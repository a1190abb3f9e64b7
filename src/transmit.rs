//! Outgoing line ending conversion.

use crate::HardwareChannel;

/// Tracks the last transmitted byte to expand bare line feeds.
///
/// The state carries over between writes, so a `\r` at the end of one write
/// and a `\n` at the start of the next are not expanded.
#[derive(Debug, Default)]
pub(crate) struct LineEnding {
	last_was_cr: bool,
}

/// The one or two bytes to transmit for a single input byte.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct Units {
	data: [u8; 2],
	len: usize,
}

impl Units {
	fn one(byte: u8) -> Self {
		Self { data: [byte, 0], len: 1 }
	}

	fn crlf() -> Self {
		Self { data: *b"\r\n", len: 2 }
	}

	pub fn as_slice(&self) -> &[u8] {
		&self.data[..self.len]
	}
}

impl LineEnding {
	/// Get the bytes to transmit for `byte`.
	pub fn translate(&self, byte: u8, lf_to_crlf: bool) -> Units {
		if lf_to_crlf && byte == b'\n' && !self.last_was_cr {
			Units::crlf()
		} else {
			Units::one(byte)
		}
	}

	/// Record that `unit` was handed to the channel.
	fn commit(&mut self, unit: u8) {
		self.last_was_cr = unit == b'\r';
	}

	/// Hand the units of one input byte to the channel.
	///
	/// The state follows the units that were actually transmitted,
	/// so retrying `byte` after an error does not send a second `\r`.
	pub fn transmit<C>(&mut self, channel: &mut C, byte: u8, lf_to_crlf: bool) -> Result<(), C::Error>
	where
		C: HardwareChannel + ?Sized,
	{
		for &unit in self.translate(byte, lf_to_crlf).as_slice() {
			channel.transmit_one(unit)?;
			self.commit(unit);
		}
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use assert2::assert;

	fn translate(state: &mut LineEnding, data: &[u8], lf_to_crlf: bool) -> Vec<u8> {
		let mut output = Vec::new();
		for &byte in data {
			for &unit in state.translate(byte, lf_to_crlf).as_slice() {
				state.commit(unit);
				output.push(unit);
			}
		}
		output
	}

	#[test]
	fn test_expand_bare_line_feeds() {
		let mut state = LineEnding::default();
		assert!(translate(&mut state, b"a\nb\r\nc\n", true) == b"a\r\nb\r\nc\r\n");
	}

	#[test]
	fn test_state_persists_across_writes() {
		let mut state = LineEnding::default();
		assert!(translate(&mut state, b"line\r", true) == b"line\r");
		assert!(translate(&mut state, b"\nnext\n", true) == b"\nnext\r\n");
	}

	#[test]
	fn test_disabled_is_verbatim() {
		let mut state = LineEnding::default();
		assert!(translate(&mut state, b"a\nb\r\n", false) == b"a\nb\r\n");
	}

	#[test]
	fn test_double_line_feed() {
		let mut state = LineEnding::default();
		assert!(translate(&mut state, b"\n\n", true) == b"\r\n\r\n");
	}

	#[test]
	fn test_interrupted_expansion_is_not_repeated() {
		let mut state = LineEnding::default();
		assert!(state.translate(b'\n', true).as_slice() == b"\r\n");

		// Only the carriage return made it out.
		state.commit(b'\r');
		assert!(state.translate(b'\n', true).as_slice() == b"\n");
	}
}
