/// Byte transports for SPI EEPROMs.
///
/// A logical command is framed by chip select: `select`, one or more
/// `transfer`s, `deselect`. Use `TransportExt::frame` to get a guard that
/// releases chip select on every exit path.
///
/// Two physical variants exist:
/// - `linux::SpidevTransport`: kernel SPI controller (`/dev/spidevB.C`)
/// - `BitBang`: software SPI on top of four GPIO lines (`Pins`), e.g.
///   `linux::GpioPins`

use std::ops::{
	Deref,
	DerefMut,
};

use crate::TransportError;

mod bitbang;
pub mod linux;

pub use self::bitbang::{
	BitBang,
	OutPins,
	Pins,
};

pub trait Transport {
	fn select(&mut self) -> Result<(), TransportError>;
	fn deselect(&mut self) -> Result<(), TransportError>;

	// send all bytes from `out`, then clock in `in_len` bytes; chip select
	// is not touched.
	fn transfer(&mut self, out: &[u8], in_len: usize) -> Result<Vec<u8>, TransportError>;
}

impl<'a, T: ?Sized + Transport> Transport for &'a mut T {
	fn select(&mut self) -> Result<(), TransportError> {
		T::select(*self)
	}
	fn deselect(&mut self) -> Result<(), TransportError> {
		T::deselect(*self)
	}
	fn transfer(&mut self, out: &[u8], in_len: usize) -> Result<Vec<u8>, TransportError> {
		T::transfer(*self, out, in_len)
	}
}

impl<T: ?Sized + Transport> Transport for Box<T> {
	fn select(&mut self) -> Result<(), TransportError> {
		T::select(self)
	}
	fn deselect(&mut self) -> Result<(), TransportError> {
		T::deselect(self)
	}
	fn transfer(&mut self, out: &[u8], in_len: usize) -> Result<Vec<u8>, TransportError> {
		T::transfer(self, out, in_len)
	}
}

/// Chip select is asserted while this lives.
pub struct Frame<'a, T: ?Sized + Transport + 'a>(&'a mut T);

impl<'a, T: ?Sized + Transport> Frame<'a, T> {
	pub fn send(&mut self, out: &[u8]) -> Result<(), TransportError> {
		self.0.transfer(out, 0)?;
		Ok(())
	}

	pub fn receive(&mut self, len: usize) -> Result<Vec<u8>, TransportError> {
		self.0.transfer(&[], len)
	}

	pub fn receive_byte(&mut self) -> Result<u8, TransportError> {
		let data = self.receive(1)?;
		data.first().cloned().ok_or_else(|| {
			TransportError::Bus("transport returned no data".into())
		})
	}
}

impl<'a, T: ?Sized + Transport> Drop for Frame<'a, T> {
	fn drop(&mut self) {
		if let Err(e) = self.0.deselect() {
			warn!("Couldn't deselect EEPROM: {}", e);
		}
	}
}

impl<'a, T: ?Sized + Transport> Deref for Frame<'a, T> {
	type Target = T;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl<'a, T: ?Sized + Transport> DerefMut for Frame<'a, T> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.0
	}
}

pub trait TransportExt: Transport {
	fn frame(&mut self) -> Result<Frame<Self>, TransportError> {
		self.select()?;
		Ok(Frame(self))
	}

	// single frame with a single outgoing transfer
	fn command(&mut self, out: &[u8]) -> Result<(), TransportError> {
		self.frame()?.send(out)
	}
}

impl<T: Transport + ?Sized> TransportExt for T {
}
