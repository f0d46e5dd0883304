use crate::Error;

/// Page size and capacity of the addressed part.
///
/// The page size is a power of two, so the offset inside a page is a mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Geometry {
	page_size: u16,
	capacity: u32,
}

impl Geometry {
	/// Atmel AT25160: 16 kbit (2048 x 8), 32-byte pages
	pub const AT25160: Geometry = Geometry {
		page_size: 32,
		capacity: 2048,
	};

	pub const ADDRESS_LIMIT: u32 = 1 << 16;

	pub fn new(page_size: u16, capacity: u32) -> Result<Self, Error> {
		if !page_size.is_power_of_two() {
			return Err(Error::invalid(format!("page size must be a power of two: {}", page_size)));
		}
		// addresses wrap at the end of the device, so the capacity is a mask too
		if !capacity.is_power_of_two() || capacity > Self::ADDRESS_LIMIT {
			return Err(Error::invalid(format!("capacity must be a power of two up to 0x{:x}: 0x{:x}", Self::ADDRESS_LIMIT, capacity)));
		}
		if capacity < u32::from(page_size) {
			return Err(Error::invalid(format!("capacity 0x{:x} is smaller than the page size {}", capacity, page_size)));
		}
		Ok(Geometry {
			page_size,
			capacity,
		})
	}

	pub fn page_size(&self) -> u16 {
		self.page_size
	}

	pub fn capacity(&self) -> u32 {
		self.capacity
	}

	pub fn page_offset(&self, address: u16) -> u16 {
		address & (self.page_size - 1)
	}

	pub fn page_start(&self, address: u16) -> u16 {
		address & !(self.page_size - 1)
	}

	/// `[address, address + len)` must lie within the device
	pub fn check_range(&self, address: u16, len: usize) -> Result<(), Error> {
		let end = (len as u64).checked_add(u64::from(address));
		if end.map_or(true, |end| end > u64::from(self.capacity)) {
			return Err(Error::invalid(format!(
				"{} bytes at 0x{:04x} exceed the device capacity 0x{:x}", len, address, self.capacity,
			)));
		}
		Ok(())
	}
}

impl Default for Geometry {
	fn default() -> Self {
		Geometry::AT25160
	}
}
