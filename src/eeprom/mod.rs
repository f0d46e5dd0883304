/// Driver for AT25-class SPI EEPROMs (e.g. Atmel AT25160, 2048 x 8 with
/// 32-byte pages), SPI mode 0.
///
/// Instructions (each framed by chip select):
/// - 0x01 WRSR: opcode, status byte
/// - 0x02 WRITE: opcode, address (16-bit big endian), 1..=page size data bytes
/// - 0x03 READ: opcode, address (16-bit big endian), then data for as long
///   as the clock runs (address increments, wraps at the end)
/// - 0x04 WRDI: opcode only; clears WEL
/// - 0x05 RDSR: opcode, then status bytes for as long as the clock runs
/// - 0x06 WREN: opcode only; sets WEL
///
/// WRITE and WRSR need WEL set, start an internal write cycle when chip
/// select is released, and clear WEL again when done. While the write cycle
/// runs (WIP in the status register) only RDSR is accepted. Data written
/// past the end of a page wraps to the start of the same page, so writes
/// have to be split at page boundaries.

use std::time::Duration;

use crate::clock::{
	Clock,
	SystemClock,
};
use crate::transport::{
	Transport,
	TransportExt,
};
use crate::{
	Error,
	TransportError,
};

mod geometry;
mod page;
mod poll;
mod segment;
mod status;

pub use self::geometry::Geometry;
pub use self::segment::{
	Chunk,
	Chunks,
};
pub use self::status::{
	BlockProtect,
	StatusRegister,
};

#[allow(dead_code)]
pub mod consts {
	pub const WRITE_STATUS_OPCODE: u8 = 0x01; // "WRSR"
	pub const WRITE_OPCODE:        u8 = 0x02; // write data; clears WEL after the write cycle
	pub const READ_OPCODE:         u8 = 0x03; // read data
	pub const WRDI_OPCODE:         u8 = 0x04; // write disable (clears WEL)
	pub const READ_STATUS_OPCODE:  u8 = 0x05; // "RDSR"
	pub const WREN_OPCODE:         u8 = 0x06; // write enable (sets WEL)
}

use self::consts::*;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Timing {
	/// how long a write cycle may take (datasheet: 5 ms max)
	pub write_timeout: Duration,
	/// sleep between status samples; zero polls as fast as the bus allows
	pub poll_interval: Duration,
	/// readiness polls (each up to `write_timeout`) before enabling writes
	pub ready_attempts: u32,
	pub connect_attempts: u32,
	pub connect_delay: Duration,
}

impl Default for Timing {
	fn default() -> Self {
		Timing {
			write_timeout: Duration::from_millis(20),
			poll_interval: Duration::from_millis(0),
			ready_attempts: 2,
			connect_attempts: 5,
			connect_delay: Duration::from_millis(50),
		}
	}
}

pub(crate) fn duration_millis(d: Duration) -> u64 {
	d.as_secs() * 1000 + u64::from(d.subsec_millis())
}

/// Handle for one EEPROM; owns its transport and clock.
///
/// All operations block until done; the handle is not meant to be shared
/// between threads without external locking.
pub struct Eeprom<T: Transport, C: Clock = SystemClock> {
	transport: T,
	clock: C,
	geometry: Geometry,
	timing: Timing,
}

impl<T: Transport> Eeprom<T, SystemClock> {
	pub fn new(transport: T, geometry: Geometry) -> Self {
		Self::with_clock(transport, SystemClock::new(), geometry)
	}
}

impl<T: Transport, C: Clock> Eeprom<T, C> {
	pub fn with_clock(transport: T, clock: C, geometry: Geometry) -> Self {
		Eeprom {
			transport,
			clock,
			geometry,
			timing: Timing::default(),
		}
	}

	pub fn geometry(&self) -> Geometry {
		self.geometry
	}

	pub fn timing(&self) -> Timing {
		self.timing
	}

	pub fn set_timing(&mut self, timing: Timing) -> &mut Self {
		self.timing = timing;
		self
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}

	pub fn transport_mut(&mut self) -> &mut T {
		&mut self.transport
	}

	pub fn clock(&self) -> &C {
		&self.clock
	}

	pub fn into_parts(self) -> (T, C) {
		(self.transport, self.clock)
	}

	pub fn read_status(&mut self) -> Result<StatusRegister, Error> {
		let mut frame = self.transport.frame()?;
		frame.send(&[READ_STATUS_OPCODE])?;
		Ok(StatusRegister(frame.receive_byte()?))
	}

	pub fn read(&mut self, address: u16, target: &mut [u8]) -> Result<(), Error> {
		if target.is_empty() {
			return Err(Error::invalid("nothing to read"));
		}
		self.geometry.check_range(address, target.len())?;

		trace!("Reading {} bytes at 0x{:04x}", target.len(), address);
		let data = {
			let mut frame = self.transport.frame()?;
			frame.transfer(&[READ_OPCODE, (address >> 8) as u8, address as u8], target.len())?
		};
		if data.len() != target.len() {
			return Err(TransportError::Bus(format!("short read: {} of {} bytes", data.len(), target.len())).into());
		}
		target.copy_from_slice(&data);
		Ok(())
	}

	pub fn read_vec(&mut self, address: u16, len: usize) -> Result<Vec<u8>, Error> {
		// validate before allocating
		if 0 == len {
			return Err(Error::invalid("nothing to read"));
		}
		self.geometry.check_range(address, len)?;
		let mut buf = vec![0u8; len];
		self.read(address, &mut buf)?;
		Ok(buf)
	}

	pub fn read_byte(&mut self, address: u16) -> Result<u8, Error> {
		let mut buf = [0u8];
		self.read(address, &mut buf)?;
		Ok(buf[0])
	}

	pub fn write_byte(&mut self, address: u16, data: u8) -> Result<(), Error> {
		self.write_page(address, &[data])
	}

	/// Single poll with the write timeout; doesn't change any status bits.
	pub fn is_ready(&mut self) -> bool {
		let timeout = self.timing.write_timeout;
		match self.wait_until_ready(timeout) {
			Ok(_) => true,
			Err(e) => {
				debug!("EEPROM not ready: {}", e);
				false
			}
		}
	}

	/// Probes readiness up to `connect_attempts` times.
	///
	/// A missing chip usually leaves the data input pulled up, which reads
	/// as "write in progress" forever.
	pub fn is_connected(&mut self) -> bool {
		for attempt in 1..=self.timing.connect_attempts {
			if self.is_ready() {
				return true;
			}
			debug!("EEPROM probe {}/{} failed", attempt, self.timing.connect_attempts);
			if attempt < self.timing.connect_attempts {
				let delay = self.timing.connect_delay;
				self.clock.sleep(delay);
			}
		}
		false
	}
}
