//! Circular receive buffer filled by the DMA engine of a [`HardwareChannel`].

use crate::HardwareChannel;

/// A region of the ring buffer handed to the DMA engine.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct Descriptor {
	/// Index of the first byte of the region.
	start: usize,

	/// Length of the region.
	len: usize,

	/// Number of bytes of the region that have been accounted for in the write position.
	done: usize,
}

/// Tried to consume more bytes than are buffered.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct Empty;

/// Circular receive buffer.
///
/// The read and write positions only ever increase, and are reduced modulo the capacity to index the buffer.
/// That makes `write - read` the occupancy, without ambiguity between a full and an empty buffer.
///
/// The free space is covered by at most two descriptors:
/// the resume descriptor from the write position to the end of the buffer (or to the read position),
/// and the wrap descriptor from the start of the buffer to the read position.
/// Only the resume descriptor is ever armed in the channel.
/// When the DMA engine exhausts it, the wrap descriptor is armed in its place.
#[derive(Debug)]
pub(crate) struct RingBuffer<Buffer> {
	buffer: Buffer,
	read: usize,
	write: usize,
	resume: Option<Descriptor>,
	wrap: Option<Descriptor>,
}

impl<Buffer> RingBuffer<Buffer>
where
	Buffer: AsRef<[u8]> + AsMut<[u8]>,
{
	pub fn new(buffer: Buffer) -> Self {
		Self {
			buffer,
			read: 0,
			write: 0,
			resume: None,
			wrap: None,
		}
	}

	pub fn capacity(&self) -> usize {
		self.buffer.as_ref().len()
	}

	/// The number of buffered bytes that have not been consumed yet.
	pub fn len(&self) -> usize {
		self.write.wrapping_sub(self.read)
	}

	#[cfg(test)]
	pub fn is_full(&self) -> bool {
		self.len() == self.capacity()
	}

	/// The logical read position.
	pub fn read_position(&self) -> usize {
		self.read
	}

	/// The logical write position, as last reported by the hardware.
	pub fn write_position(&self) -> usize {
		self.write
	}

	/// Check if the DMA engine currently has a region to write to.
	#[cfg(test)]
	pub fn is_armed(&self) -> bool {
		self.resume.is_some()
	}

	/// Get the byte at a logical position between the read and the write position.
	pub fn byte_at(&self, position: usize) -> u8 {
		debug_assert!(position.wrapping_sub(self.read) < self.len());
		self.buffer.as_ref()[position % self.capacity()]
	}

	/// Arm the channel for all free space of the buffer.
	///
	/// Any previously armed region is replaced, so call [`Self::sync()`] first to account for bytes written to it.
	/// If the buffer is full, nothing is armed and reception stops until bytes are consumed.
	pub fn arm<C: HardwareChannel + ?Sized>(&mut self, channel: &mut C) -> Result<(), C::Error> {
		self.resume = None;
		self.wrap = None;

		let capacity = self.capacity();
		let free = capacity - self.len();
		if free == 0 {
			return Ok(());
		}

		let start = self.write % capacity;
		let first = free.min(capacity - start);
		channel.arm(first)?;
		self.resume = Some(Descriptor { start, len: first, done: 0 });
		if free > first {
			self.wrap = Some(Descriptor {
				start: 0,
				len: free - first,
				done: 0,
			});
		}
		Ok(())
	}

	/// Advance the write position to the progress reported by the channel.
	///
	/// Chains to the wrap descriptor when the resume descriptor is exhausted.
	/// Returns the number of new bytes.
	pub fn sync<C: HardwareChannel + ?Sized>(&mut self, channel: &mut C) -> Result<usize, C::Error> {
		let mut total = 0;
		while let Some(mut desc) = self.resume {
			let region = &mut self.buffer.as_mut()[desc.start..][..desc.len];
			let remaining = channel.remaining(region)?.min(desc.len);
			let progress = desc.len - remaining;
			let new = progress.saturating_sub(desc.done);
			desc.done = desc.done.max(progress);
			self.write = self.write.wrapping_add(new);
			total += new;

			if desc.done < desc.len {
				self.resume = Some(desc);
				break;
			}

			self.resume = self.wrap.take();
			if let Some(next) = &self.resume {
				trace!("DMA wrapped, arming {} bytes at the start of the ring", next.len);
				channel.arm(next.len)?;
			}
		}
		Ok(total)
	}

	/// Collect pending bytes and re-arm the channel to cover all free space.
	///
	/// The channel does not transfer to memory while it is being re-armed,
	/// so bytes arriving in the meantime must fit in the peripheral FIFO.
	pub fn rearm<C: HardwareChannel + ?Sized>(&mut self, channel: &mut C) -> Result<usize, C::Error> {
		let new = self.sync(channel)?;
		self.arm(channel)?;
		Ok(new)
	}

	/// Copy exactly `dest.len()` bytes out of the buffer and advance the read position.
	pub fn consume(&mut self, dest: &mut [u8]) -> Result<(), Empty> {
		if dest.len() > self.len() {
			return Err(Empty);
		}

		let capacity = self.capacity();
		let start = self.read % capacity;
		let first = dest.len().min(capacity - start);
		let buffer = self.buffer.as_ref();
		let rest = dest.len() - first;
		dest[..first].copy_from_slice(&buffer[start..][..first]);
		dest[first..].copy_from_slice(&buffer[..rest]);
		self.read = self.read.wrapping_add(dest.len());
		Ok(())
	}

	/// Remove and return the oldest byte.
	pub fn pop(&mut self) -> Option<u8> {
		if self.len() == 0 {
			return None;
		}
		let byte = self.byte_at(self.read);
		self.read = self.read.wrapping_add(1);
		Some(byte)
	}
}
