//! Incremental scan of received bytes for XON/XOFF tokens.

use crate::flow::{XOFF, XON};
use crate::ring::RingBuffer;

/// A flow control token received from the peer.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Token {
	Pause,
	Resume,
}

impl Token {
	fn from_byte(byte: u8) -> Option<Self> {
		match byte {
			XOFF => Some(Self::Pause),
			XON => Some(Self::Resume),
			_ => None,
		}
	}
}

/// Scans every received byte exactly once, in order.
///
/// The cursor is a logical ring position between the read and the write position.
/// Bytes before the cursor have been scanned and may be delivered to the reader,
/// except for the tokens, which are counted and skipped on delivery.
#[derive(Debug)]
pub(crate) struct Scanner {
	enabled: bool,
	cursor: usize,
	tokens: usize,
}

impl Scanner {
	pub fn new(enabled: bool) -> Self {
		Self {
			enabled,
			cursor: 0,
			tokens: 0,
		}
	}

	/// The number of scanned tokens that are still in the ring.
	pub fn tokens(&self) -> usize {
		self.tokens
	}

	#[cfg(test)]
	pub fn cursor(&self) -> usize {
		self.cursor
	}

	/// Scan the bytes between the cursor and the write position of the ring.
	///
	/// Calls `on_token` for every token, in the order they were received.
	/// Without software flow control, the cursor jumps straight to the write position.
	pub fn scan<Buffer>(&mut self, ring: &RingBuffer<Buffer>, mut on_token: impl FnMut(Token))
	where
		Buffer: AsRef<[u8]> + AsMut<[u8]>,
	{
		let end = ring.write_position();
		if !self.enabled {
			self.cursor = end;
			return;
		}

		while self.cursor != end {
			if let Some(token) = Token::from_byte(ring.byte_at(self.cursor)) {
				self.tokens += 1;
				on_token(token);
			}
			self.cursor = self.cursor.wrapping_add(1);
		}
	}

	/// The number of scanned bytes that can be delivered to the reader.
	pub fn deliverable<Buffer>(&self, ring: &RingBuffer<Buffer>) -> usize
	where
		Buffer: AsRef<[u8]> + AsMut<[u8]>,
	{
		self.cursor.wrapping_sub(ring.read_position()) - self.tokens
	}

	/// Move up to `dest.len()` deliverable bytes out of the ring, dropping tokens.
	///
	/// Returns the number of bytes written to `dest`.
	pub fn consume<Buffer>(&mut self, ring: &mut RingBuffer<Buffer>, dest: &mut [u8]) -> usize
	where
		Buffer: AsRef<[u8]> + AsMut<[u8]>,
	{
		let count = dest.len().min(self.deliverable(ring));
		if !self.enabled {
			// Without scanning there are no tokens, so every byte before the cursor is data.
			let consumed = ring.consume(&mut dest[..count]);
			debug_assert!(consumed.is_ok());
			return count;
		}

		let mut written = 0;
		while written < count {
			let Some(byte) = ring.pop() else { break };
			if Token::from_byte(byte).is_some() {
				self.tokens -= 1;
			} else {
				dest[written] = byte;
				written += 1;
			}
		}
		self.skip_tokens(ring);
		written
	}

	/// Drop tokens at the read position, so they do not occupy the buffer.
	pub fn skip_tokens<Buffer>(&mut self, ring: &mut RingBuffer<Buffer>)
	where
		Buffer: AsRef<[u8]> + AsMut<[u8]>,
	{
		while self.tokens > 0 && ring.read_position() != self.cursor {
			if Token::from_byte(ring.byte_at(ring.read_position())).is_none() {
				break;
			}
			ring.pop();
			self.tokens -= 1;
		}
	}
}
