use std::time::Duration;

use crate::clock::reliable_sleep;
use crate::TransportError;

use super::Transport;

// at most 5 MHz: the slowest parts want 100 ns per clock phase, leave some margin
const CLOCK_EDGE: Duration = Duration::from_nanos(250);

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct OutPins {
	// logical state; active-low wiring is the job of the `Pins` implementation
	pub chip_select: bool,
	pub clock: bool,
	pub data: bool,
}

impl OutPins {
	fn idle() -> Self {
		OutPins {
			chip_select: false,
			clock: false,
			data: false,
		}
	}
}

/// The four lines of an SPI bus: chip select, clock and data out (MOSI)
/// are driven, data in (MISO) is read.
pub trait Pins {
	fn set_pins(&mut self, pins: OutPins) -> Result<(), TransportError>;
	fn read_pin(&mut self) -> Result<bool, TransportError>;

	// delay for (at least) one clock edge
	fn delay(&mut self) {
		reliable_sleep(CLOCK_EDGE);
	}
}

impl<'a, P: ?Sized + Pins> Pins for &'a mut P {
	fn set_pins(&mut self, pins: OutPins) -> Result<(), TransportError> {
		P::set_pins(*self, pins)
	}
	fn read_pin(&mut self) -> Result<bool, TransportError> {
		P::read_pin(*self)
	}
	fn delay(&mut self) {
		P::delay(*self)
	}
}

/// Software SPI (mode 0, MSB first).
pub struct BitBang<P: Pins> {
	pins: P,
	selected: bool,
}

impl<P: Pins> BitBang<P> {
	pub fn new(mut pins: P) -> Result<Self, TransportError> {
		pins.set_pins(OutPins::idle())?;
		pins.delay();
		Ok(BitBang {
			pins,
			selected: false,
		})
	}

	pub fn pins(&self) -> &P {
		&self.pins
	}

	pub fn pins_mut(&mut self) -> &mut P {
		&mut self.pins
	}

	pub fn into_pins(self) -> P {
		self.pins
	}

	// shift one byte out and one byte in.
	//
	// data is prepared while CLK is low; the chip shifts its output on the
	// falling edge, so the input is read right before bringing CLK up again.
	fn exchange_byte(&mut self, out: u8) -> Result<u8, TransportError> {
		let mut result = 0u8;
		for bit in (0..8).rev() {
			let bit_mask = 1u8 << bit;
			let data = 0 != (out & bit_mask);

			self.pins.set_pins(OutPins { chip_select: true, clock: false, data })?;
			self.pins.delay(); // wait for pins to be stable

			if self.pins.read_pin()? {
				result |= bit_mask;
			}

			self.pins.set_pins(OutPins { chip_select: true, clock: true, data })?;
			self.pins.delay(); // wait for chip reading the pins
		}
		Ok(result)
	}
}

impl<P: Pins> Transport for BitBang<P> {
	fn select(&mut self) -> Result<(), TransportError> {
		if self.selected {
			return Err(TransportError::Bus("chip select already asserted".into()));
		}
		self.pins.set_pins(OutPins { chip_select: true, clock: false, data: false })?;
		self.pins.delay();
		self.selected = true;
		Ok(())
	}

	fn deselect(&mut self) -> Result<(), TransportError> {
		// always drive the idle state, even if we think we're not selected
		self.selected = false;
		self.pins.set_pins(OutPins { chip_select: true, clock: false, data: false })?;
		self.pins.delay();
		self.pins.set_pins(OutPins::idle())?;
		self.pins.delay();
		Ok(())
	}

	fn transfer(&mut self, out: &[u8], in_len: usize) -> Result<Vec<u8>, TransportError> {
		if !self.selected {
			return Err(TransportError::Bus("transfer without chip select".into()));
		}
		for b in out {
			self.exchange_byte(*b)?;
		}
		let mut result = Vec::with_capacity(in_len);
		for _ in 0..in_len {
			result.push(self.exchange_byte(0x00)?);
		}
		Ok(result)
	}
}
