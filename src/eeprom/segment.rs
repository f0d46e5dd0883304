use std::ops::Range;

use crate::clock::Clock;
use crate::transport::Transport;
use crate::Error;

use super::{
	Eeprom,
	Geometry,
};

/// Part of a write request that stays within one page.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Chunk {
	pub address: u16,
	/// offset into the caller's data
	pub offset: usize,
	pub len: u16,
}

impl Chunk {
	pub fn data_range(&self) -> Range<usize> {
		self.offset..self.offset + self.len as usize
	}
}

/// Splits `[address, address + length)` at page boundaries, in increasing
/// address order.
///
/// The first chunk fills up the first page (or takes everything if it fits),
/// followed by full pages and a trailing remainder.
#[derive(Clone, Debug)]
pub struct Chunks {
	page_size: u32,
	// u32: the last chunk may end at 0x10000
	address: u32,
	offset: usize,
	remaining: usize,
}

impl Chunks {
	pub fn new(geometry: Geometry, address: u16, length: usize) -> Self {
		Chunks {
			page_size: u32::from(geometry.page_size()),
			address: u32::from(address),
			offset: 0,
			remaining: length,
		}
	}
}

impl Iterator for Chunks {
	type Item = Chunk;

	fn next(&mut self) -> Option<Self::Item> {
		if 0 == self.remaining {
			return None;
		}
		let page_remaining = (self.page_size - self.address % self.page_size) as usize;
		let len = self.remaining.min(page_remaining);
		let chunk = Chunk {
			address: self.address as u16,
			offset: self.offset,
			len: len as u16,
		};
		self.address += len as u32;
		self.offset += len;
		self.remaining -= len;
		Some(chunk)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let page_size = self.page_size as usize;
		let page_offset = (self.address % self.page_size) as usize;
		let count = if 0 == self.remaining {
			0
		} else {
			(page_offset + self.remaining + page_size - 1) / page_size
		};
		(count, Some(count))
	}
}

impl ExactSizeIterator for Chunks {
}

impl<T: Transport, C: Clock> Eeprom<T, C> {
	/// Write data at any address and of any length within the device.
	///
	/// The request is split into page writes, executed in order; the first
	/// failing page aborts the write and its error is returned. Pages written
	/// before the failure keep the new data.
	pub fn write(&mut self, address: u16, data: &[u8]) -> Result<(), Error> {
		if data.is_empty() {
			return Err(Error::invalid("nothing to write"));
		}
		self.geometry.check_range(address, data.len())?;

		let chunks = Chunks::new(self.geometry, address, data.len());
		debug!("Writing {} bytes at 0x{:04x} in {} page writes", data.len(), address, chunks.len());
		for chunk in chunks {
			self.write_page(chunk.address, &data[chunk.data_range()])?;
		}
		Ok(())
	}
}
