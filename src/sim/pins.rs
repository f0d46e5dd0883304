use std::time::Duration;

use crate::transport::{
	OutPins,
	Pins,
};
use crate::TransportError;

use super::SimEeprom;

/// Pin level view of a `SimEeprom` (SPI mode 0).
///
/// Input is sampled on the rising clock edge; the output bit for the
/// current clock cycle is visible on the data pin until the next rising
/// edge. With chip select released the data pin reads high (pull-up).
pub struct SimPins {
	device: SimEeprom,
	last: OutPins,
	selected: bool,
	bit: u8,
	shift_in: u8,
	// byte the chip is shifting out, latched at the first bit
	shift_out: Option<u8>,
	clock_time: Duration,
	edges: usize,
}

impl SimPins {
	pub fn new(device: SimEeprom) -> Self {
		SimPins {
			device,
			last: OutPins::default(),
			selected: false,
			bit: 0,
			shift_in: 0,
			shift_out: None,
			// 1 MHz
			clock_time: Duration::from_micros(1),
			edges: 0,
		}
	}

	pub fn device(&self) -> &SimEeprom {
		&self.device
	}

	pub fn device_mut(&mut self) -> &mut SimEeprom {
		&mut self.device
	}

	pub fn into_device(self) -> SimEeprom {
		self.device
	}

	/// rising clock edges while selected
	pub fn edges(&self) -> usize {
		self.edges
	}

	fn output_byte(&mut self) -> u8 {
		match self.shift_out {
			Some(b) => b,
			None => {
				let b = self.device.next_output();
				self.shift_out = Some(b);
				b
			}
		}
	}
}

impl Pins for SimPins {
	fn set_pins(&mut self, pins: OutPins) -> Result<(), TransportError> {
		if !pins.chip_select {
			if self.selected {
				// incomplete bytes are dropped, like the real chip does
				self.selected = false;
				self.device.deselect();
			}
		} else {
			if !self.selected {
				self.selected = true;
				self.bit = 0;
				self.shift_in = 0;
				self.shift_out = None;
				self.device.select();
			}
			if pins.clock && !self.last.clock {
				self.edges += 1;
				self.device.clock().advance(self.clock_time);
				self.output_byte();
				self.shift_in = (self.shift_in << 1) | (pins.data as u8);
				self.bit += 1;
				if self.bit == 8 {
					self.device.accept(self.shift_in);
					self.bit = 0;
					self.shift_in = 0;
					self.shift_out = None;
				}
			}
		}
		self.last = pins;
		Ok(())
	}

	fn read_pin(&mut self) -> Result<bool, TransportError> {
		if !self.selected {
			return Ok(true);
		}
		let out = self.output_byte();
		Ok(0 != out & (0x80 >> self.bit))
	}

	fn delay(&mut self) {
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::eeprom::consts::*;
	use crate::sim::SimClock;
	use crate::transport::{
		BitBang,
		TransportExt,
	};
	use crate::Geometry;

	#[test]
	fn bit_banged_status_and_read() {
		let mut device = SimEeprom::new(Geometry::AT25160, SimClock::new());
		device.memory_mut()[0x123] = 0b1010_0110;
		device.memory_mut()[0x124] = 0x5a;
		let mut bb = BitBang::new(SimPins::new(device)).unwrap();

		{
			let mut frame = bb.frame().unwrap();
			frame.send(&[READ_OPCODE, 0x01, 0x23]).unwrap();
			assert_eq!(frame.receive(2).unwrap(), vec![0b1010_0110, 0x5a]);
		}
		assert_eq!(bb.pins().edges(), 5 * 8);

		bb.command(&[WREN_OPCODE]).unwrap();
		{
			let mut frame = bb.frame().unwrap();
			frame.send(&[READ_STATUS_OPCODE]).unwrap();
			assert_eq!(frame.receive_byte().unwrap(), 0x02);
		}
		assert_eq!(bb.pins().device().frames(), 3);
	}

	#[test]
	fn released_bus_reads_high() {
		let device = SimEeprom::new(Geometry::AT25160, SimClock::new());
		let mut pins = SimPins::new(device);
		assert!(pins.read_pin().unwrap());
	}
}
