use std::str;

use rppal::gpio::{
	Gpio,
	InputPin,
	Level,
	OutputPin,
};

use crate::transport::{
	OutPins,
	Pins,
};
use crate::TransportError;

/// GPIO line numbers (BCM numbering) of the bit-banged bus.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct GpioLines {
	pub chip_select: u8,
	pub clock: u8,
	pub mosi: u8,
	pub miso: u8,
}

impl str::FromStr for GpioLines {
	type Err = ::failure::Error;

	// "CS,SCK,MOSI,MISO"
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let parts: Vec<&str> = s.split(',').map(str::trim).collect();
		ensure!(parts.len() == 4, "expected 4 GPIO lines (CS,SCK,MOSI,MISO), got: {:?}", s);

		let mut lines = [0u8; 4];
		for (line, part) in lines.iter_mut().zip(parts.iter()) {
			*line = with_context!(("invalid GPIO line: {:?}", part),
				Ok(part.parse::<u8>()?)
			)?;
		}

		Ok(GpioLines {
			chip_select: lines[0],
			clock: lines[1],
			mosi: lines[2],
			miso: lines[3],
		})
	}
}

fn level(high: bool) -> Level {
	if high { Level::High } else { Level::Low }
}

/// GPIO pins claimed through `rppal`; chip select is active low.
pub struct GpioPins {
	chip_select: OutputPin,
	clock: OutputPin,
	mosi: OutputPin,
	miso: InputPin,
	last: Option<OutPins>,
}

impl Pins for GpioPins {
	fn set_pins(&mut self, pins: OutPins) -> Result<(), TransportError> {
		// only touch lines that change
		let last = self.last;
		let changed = |f: fn(&OutPins) -> bool| last.map_or(true, |l| f(&l) != f(&pins));

		if changed(|p| p.chip_select) {
			self.chip_select.write(level(!pins.chip_select));
		}
		if changed(|p| p.data) {
			self.mosi.write(level(pins.data));
		}
		if changed(|p| p.clock) {
			self.clock.write(level(pins.clock));
		}
		self.last = Some(pins);
		Ok(())
	}

	fn read_pin(&mut self) -> Result<bool, TransportError> {
		Ok(self.miso.is_high())
	}
}

pub fn inner_open(lines: GpioLines) -> crate::AResult<GpioPins> {
	let gpio = Gpio::new()?;
	// chip select starts high (inactive), so it never glitches low
	let pins = GpioPins {
		chip_select: gpio.get(lines.chip_select)?.into_output_high(),
		clock: gpio.get(lines.clock)?.into_output_low(),
		mosi: gpio.get(lines.mosi)?.into_output_low(),
		miso: gpio.get(lines.miso)?.into_input(),
		last: None,
	};
	debug!("Using GPIO lines {:?} for software SPI", lines);
	Ok(pins)
}
