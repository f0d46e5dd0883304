/// Simulated AT25-class EEPROM for tests and dry runs.
///
/// `SimEeprom` models the chip at the byte level; `SimTransport` talks to it
/// directly, `SimPins` at the pin level (for `transport::BitBang`). Time is
/// simulated by `SimClock`, which the buses advance for every byte or clock
/// cycle.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::clock::Clock;
use crate::eeprom::duration_millis;
use crate::transport::Transport;
use crate::{
	Eeprom,
	Geometry,
	TransportError,
};

mod device;
mod pins;

pub use self::device::SimEeprom;
pub use self::pins::SimPins;

/// Manually advanced time, shared by all clones.
#[derive(Clone, Debug, Default)]
pub struct SimClock {
	elapsed: Rc<Cell<Duration>>,
}

impl SimClock {
	pub fn new() -> Self {
		SimClock::default()
	}

	pub fn elapsed(&self) -> Duration {
		self.elapsed.get()
	}

	pub fn advance(&self, duration: Duration) {
		self.elapsed.set(self.elapsed.get() + duration);
	}
}

impl Clock for SimClock {
	fn now_millis(&self) -> u64 {
		duration_millis(self.elapsed())
	}

	fn sleep(&mut self, duration: Duration) {
		self.advance(duration);
	}
}

/// Byte level bus to a `SimEeprom`.
pub struct SimTransport {
	device: SimEeprom,
	selected: bool,
	byte_time: Duration,
}

impl SimTransport {
	pub fn new(device: SimEeprom) -> Self {
		SimTransport {
			device,
			selected: false,
			// 8 clocks at 1 MHz
			byte_time: Duration::from_micros(8),
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

	pub fn is_selected(&self) -> bool {
		self.selected
	}

	fn exchange(&mut self, out: u8) -> u8 {
		self.device.clock().advance(self.byte_time);
		self.device.exchange(out)
	}
}

impl Transport for SimTransport {
	fn select(&mut self) -> Result<(), TransportError> {
		if self.selected {
			return Err(TransportError::Bus("chip select already asserted".into()));
		}
		self.selected = true;
		self.device.select();
		Ok(())
	}

	fn deselect(&mut self) -> Result<(), TransportError> {
		if !self.selected {
			return Err(TransportError::Bus("chip select not asserted".into()));
		}
		self.selected = false;
		self.device.deselect();
		Ok(())
	}

	fn transfer(&mut self, out: &[u8], in_len: usize) -> Result<Vec<u8>, TransportError> {
		if !self.selected {
			return Err(TransportError::Bus("transfer without chip select".into()));
		}
		for b in out {
			self.exchange(*b);
		}
		Ok((0..in_len).map(|_| self.exchange(0x00)).collect())
	}
}

/// A fresh (all 0xff) simulated EEPROM behind a `SimTransport`.
pub fn open_simulated(geometry: Geometry) -> Eeprom<SimTransport, SimClock> {
	let clock = SimClock::new();
	let device = SimEeprom::new(geometry, clock.clone());
	Eeprom::with_clock(SimTransport::new(device), clock, geometry)
}
