use std::fmt;

// status register bits
const STATUS_WIP:  u8 = 0x01; // write in progress; read only
const STATUS_WEL:  u8 = 0x02; // write enable latch; read only
const STATUS_BP0:  u8 = 0x04; // block protect
const STATUS_BP1:  u8 = 0x08; // block protect
const STATUS_SRWD: u8 = 0x80; // status register write disable (together with /WP)

const BLOCK_PROTECT_SHIFT: u8 = 2;
const BLOCK_PROTECT_MASK: u8 = STATUS_BP0 | STATUS_BP1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockProtect {
	None,
	UpperQuarter,
	UpperHalf,
	All,
}

impl BlockProtect {
	/// first protected address for a device of the given capacity
	/// (`capacity` if nothing is protected)
	pub fn protected_from(self, capacity: u32) -> u32 {
		match self {
			BlockProtect::None => capacity,
			BlockProtect::UpperQuarter => capacity - capacity / 4,
			BlockProtect::UpperHalf => capacity / 2,
			BlockProtect::All => 0,
		}
	}
}

/// Snapshot of the status register, read by RDSR.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StatusRegister(pub u8);

impl StatusRegister {
	/// bits the WRSR instruction can change
	pub const WRITABLE_MASK: u8 = BLOCK_PROTECT_MASK | STATUS_SRWD;

	pub fn is_write_in_progress(&self) -> bool {
		0 != self.0 & STATUS_WIP
	}
	pub fn is_write_enabled(&self) -> bool {
		0 != self.0 & STATUS_WEL
	}
	pub fn is_status_write_disabled(&self) -> bool {
		0 != self.0 & STATUS_SRWD
	}

	pub fn block_protect(&self) -> BlockProtect {
		match (self.0 >> BLOCK_PROTECT_SHIFT) & 0b11 {
			0b00 => BlockProtect::None,
			0b01 => BlockProtect::UpperQuarter,
			0b10 => BlockProtect::UpperHalf,
			_ => BlockProtect::All,
		}
	}

	pub fn set_block_protect(&mut self, bp: BlockProtect) -> &mut Self {
		let bits = match bp {
			BlockProtect::None => 0b00,
			BlockProtect::UpperQuarter => 0b01,
			BlockProtect::UpperHalf => 0b10,
			BlockProtect::All => 0b11,
		};
		self.0 = (self.0 & !BLOCK_PROTECT_MASK) | (bits << BLOCK_PROTECT_SHIFT);
		self
	}

	pub fn set_status_write_disable(&mut self, disable: bool) -> &mut Self {
		if disable {
			self.0 |= STATUS_SRWD;
		} else {
			self.0 &= !STATUS_SRWD;
		}
		self
	}

	pub(crate) fn set_write_in_progress(&mut self, wip: bool) -> &mut Self {
		if wip {
			self.0 |= STATUS_WIP;
		} else {
			self.0 &= !STATUS_WIP;
		}
		self
	}

	pub(crate) fn set_write_enabled(&mut self, wel: bool) -> &mut Self {
		if wel {
			self.0 |= STATUS_WEL;
		} else {
			self.0 &= !STATUS_WEL;
		}
		self
	}

	/// only the bits WRSR can change
	pub fn writable(&self) -> u8 {
		self.0 & Self::WRITABLE_MASK
	}
}

impl fmt::Display for StatusRegister {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x}", self.0)
	}
}

impl fmt::Debug for StatusRegister {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x} (block protect: {:?}", self.0, self.block_protect())?;
		if self.is_write_in_progress() { write!(f, " [WIP]")?; }
		if self.is_write_enabled() { write!(f, " [WEL]")?; }
		if self.is_status_write_disabled() { write!(f, " [SRWD]")?; }
		write!(f, ")")
	}
}
