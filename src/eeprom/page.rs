use crate::clock::Clock;
use crate::transport::{
	Transport,
	TransportExt,
};
use crate::Error;

use super::consts::*;
use super::{
	Eeprom,
	StatusRegister,
};

impl<T: Transport, C: Clock> Eeprom<T, C> {
	/// Write data that doesn't cross a page boundary.
	///
	/// Waits for the write cycle to finish; any failure is reported as
	/// `Error::WriteFailed` and not retried.
	pub fn write_page(&mut self, address: u16, data: &[u8]) -> Result<(), Error> {
		let page_size = self.geometry.page_size() as usize;
		if data.is_empty() {
			return Err(Error::invalid("nothing to write"));
		}
		if self.geometry.page_offset(address) as usize + data.len() > page_size {
			return Err(Error::invalid(format!(
				"{} bytes at 0x{:04x} cross a page boundary (page size {})", data.len(), address, page_size,
			)));
		}
		self.geometry.check_range(address, data.len())?;

		let mut out = Vec::with_capacity(3 + data.len());
		out.extend_from_slice(&[WRITE_OPCODE, (address >> 8) as u8, address as u8]);
		out.extend_from_slice(data);

		trace!("Writing page chunk: {} bytes at 0x{:04x}", data.len(), address);
		self.program(&out).map_err(|e| Error::write_failed(address, data.len() as u16, e))
	}

	/// Write the block protect and SRWD bits; other bits are read only.
	pub fn write_status_register(&mut self, status: StatusRegister) -> Result<(), Error> {
		debug!("Writing status register: {:?}", status);
		self.program(&[WRITE_STATUS_OPCODE, status.writable()])
	}

	// write enable, `frame` as a single transfer, wait for the write cycle,
	// write disable
	fn program(&mut self, frame: &[u8]) -> Result<(), Error> {
		self.ensure_ready()?;
		self.transport.command(&[WREN_OPCODE])?;
		self.transport.command(frame)?;

		let timeout = self.timing.write_timeout;
		self.wait_until_ready(timeout)?;

		// WEL should be cleared by the chip already; the data is written, so
		// don't fail here.
		if let Err(e) = self.transport.command(&[WRDI_OPCODE]) {
			warn!("Couldn't disable writes: {}", e);
		}
		Ok(())
	}
}
