mod gpio;
mod spidev;

pub use self::gpio::{
	GpioLines,
	GpioPins,
};

pub use self::spidev::{
	DEFAULT_SPEED_HZ,
	SpiAddress,
	SpidevTransport,
};

use super::BitBang;

pub fn open_spidev(address: SpiAddress, speed_hz: u32) -> crate::AResult<SpidevTransport> {
	with_context!(("couldn't open SPI device /dev/spidev{}.{}", address.bus, address.chip_select), {
		spidev::inner_open(address, speed_hz)
	})
}

pub fn open_gpio_bitbang(lines: GpioLines) -> crate::AResult<BitBang<GpioPins>> {
	let pins = with_context!(("couldn't claim GPIO lines {:?}", lines), {
		gpio::inner_open(lines)
	})?;
	Ok(BitBang::new(pins)?)
}
