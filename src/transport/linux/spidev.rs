use std::str;

use rppal::spi::{
	self,
	Bus,
	Mode,
	Segment,
	SlaveSelect,
	Spi,
};

use crate::transport::Transport;
use crate::TransportError;

pub const DEFAULT_SPEED_HZ: u32 = 1_000_000;

/// Kernel SPI device `/dev/spidevB.C`: bus B, chip select C.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SpiAddress {
	pub bus: u8,
	pub chip_select: u8,
}

impl SpiAddress {
	fn bus(&self) -> crate::AResult<Bus> {
		Ok(match self.bus {
			0 => Bus::Spi0,
			1 => Bus::Spi1,
			2 => Bus::Spi2,
			3 => Bus::Spi3,
			4 => Bus::Spi4,
			5 => Bus::Spi5,
			6 => Bus::Spi6,
			n => bail!("unknown SPI bus {}", n),
		})
	}

	fn slave_select(&self) -> crate::AResult<SlaveSelect> {
		Ok(match self.chip_select {
			0 => SlaveSelect::Ss0,
			1 => SlaveSelect::Ss1,
			2 => SlaveSelect::Ss2,
			3 => SlaveSelect::Ss3,
			4 => SlaveSelect::Ss4,
			5 => SlaveSelect::Ss5,
			6 => SlaveSelect::Ss6,
			7 => SlaveSelect::Ss7,
			8 => SlaveSelect::Ss8,
			9 => SlaveSelect::Ss9,
			10 => SlaveSelect::Ss10,
			11 => SlaveSelect::Ss11,
			12 => SlaveSelect::Ss12,
			13 => SlaveSelect::Ss13,
			14 => SlaveSelect::Ss14,
			15 => SlaveSelect::Ss15,
			n => bail!("unknown SPI chip select {}", n),
		})
	}
}

impl str::FromStr for SpiAddress {
	type Err = ::failure::Error;

	// "B.C" or "/dev/spidevB.C"
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let short = s.trim_start_matches("/dev/spidev");
		let parts: Vec<&str> = short.split('.').collect();
		ensure!(parts.len() == 2, "expected SPI device as BUS.CS or /dev/spidevBUS.CS, got: {:?}", s);

		let bus = with_context!(("invalid SPI bus: {:?}", parts[0]), Ok(parts[0].parse::<u8>()?))?;
		let chip_select = with_context!(("invalid SPI chip select: {:?}", parts[1]), Ok(parts[1].parse::<u8>()?))?;
		Ok(SpiAddress { bus, chip_select })
	}
}

impl From<spi::Error> for TransportError {
	fn from(e: spi::Error) -> Self {
		match e {
			spi::Error::Io(e) => TransportError::Io(e),
			e => TransportError::Bus(e.to_string()),
		}
	}
}

/// Kernel SPI controller (through `rppal`), mode 0.
///
/// The kernel asserts chip select for the duration of a message; to keep it
/// asserted across several `transfer` calls the last segment of each message
/// sets `ss_change`, and `deselect` sends an empty message without it.
pub struct SpidevTransport {
	spi: Spi,
	address: SpiAddress,
	speed_hz: u32,
	selected: bool,
	// kernel is holding chip select after an `ss_change` message
	holding: bool,
}

impl SpidevTransport {
	pub fn address(&self) -> SpiAddress {
		self.address
	}

	pub fn speed_hz(&self) -> u32 {
		self.speed_hz
	}
}

impl Transport for SpidevTransport {
	fn select(&mut self) -> Result<(), TransportError> {
		if self.selected {
			return Err(TransportError::Bus("chip select already asserted".into()));
		}
		// the kernel asserts chip select with the first segment
		self.selected = true;
		Ok(())
	}

	fn deselect(&mut self) -> Result<(), TransportError> {
		self.selected = false;
		if self.holding {
			self.holding = false;
			self.spi.transfer_segments(&[Segment::with_write(&[])])?;
		}
		Ok(())
	}

	fn transfer(&mut self, out: &[u8], in_len: usize) -> Result<Vec<u8>, TransportError> {
		if !self.selected {
			return Err(TransportError::Bus("transfer without chip select".into()));
		}
		if out.is_empty() && 0 == in_len {
			return Ok(Vec::new());
		}

		let mut input = vec![0u8; in_len];
		{
			let mut segments = Vec::with_capacity(2);
			if !out.is_empty() {
				segments.push(Segment::with_write(out));
			}
			if in_len > 0 {
				segments.push(Segment::with_read(&mut input));
			}
			if let Some(last) = segments.last_mut() {
				last.set_ss_change(true);
			}
			self.spi.transfer_segments(&segments)?;
		}
		self.holding = true;
		Ok(input)
	}
}

pub fn inner_open(address: SpiAddress, speed_hz: u32) -> crate::AResult<SpidevTransport> {
	let spi = Spi::new(address.bus()?, address.slave_select()?, speed_hz, Mode::Mode0)?;
	spi.set_bits_per_word(8)?;

	debug!("Opened /dev/spidev{}.{} at {} Hz", address.bus, address.chip_select, speed_hz);
	Ok(SpidevTransport {
		spi,
		address,
		speed_hz,
		selected: false,
		holding: false,
	})
}
