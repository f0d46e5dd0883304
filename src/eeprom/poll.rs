use std::time::Duration;

use crate::clock::Clock;
use crate::transport::{
	Transport,
	TransportExt,
};
use crate::Error;

use super::consts::READ_STATUS_OPCODE;
use super::{
	duration_millis,
	Eeprom,
	StatusRegister,
};

impl<T: Transport, C: Clock> Eeprom<T, C> {
	/// Wait until the write cycle is done (WIP cleared).
	///
	/// Sends RDSR once and keeps clocking status bytes within the same frame.
	/// Gives up when more than `timeout` passed since the call; chip select
	/// is released on every exit.
	pub fn wait_until_ready(&mut self, timeout: Duration) -> Result<StatusRegister, Error> {
		let timeout_ms = duration_millis(timeout);
		let start = self.clock.now_millis();

		let mut frame = self.transport.frame()?;
		frame.send(&[READ_STATUS_OPCODE])?;
		loop {
			let status = StatusRegister(frame.receive_byte()?);
			if !status.is_write_in_progress() {
				return Ok(status);
			}

			let elapsed = self.clock.now_millis().saturating_sub(start);
			if elapsed > timeout_ms {
				debug!("Still busy after {} ms: {:?}", elapsed, status);
				return Err(Error::Timeout { timeout_ms });
			}

			if self.timing.poll_interval > Duration::from_millis(0) {
				self.clock.sleep(self.timing.poll_interval);
			}
		}
	}

	// bounded readiness check before a write enable
	pub(super) fn ensure_ready(&mut self) -> Result<(), Error> {
		let timeout = self.timing.write_timeout;
		let attempts = self.timing.ready_attempts.max(1);
		let mut attempt = 1;
		loop {
			match self.wait_until_ready(timeout) {
				Ok(_) => return Ok(()),
				Err(ref e) if e.is_timeout() && attempt < attempts => {
					debug!("EEPROM busy before write (attempt {}/{})", attempt, attempts);
					attempt += 1;
				},
				Err(e) => return Err(e),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use crate::clock::Clock;
	use crate::sim::{
		self,
		SimClock,
		SimTransport,
	};
	use crate::{
		Eeprom,
		Error,
		Geometry,
	};

	fn eeprom() -> Eeprom<SimTransport, SimClock> {
		sim::open_simulated(Geometry::AT25160)
	}

	#[test]
	fn ready_when_idle() {
		let mut ee = eeprom();
		let status = ee.wait_until_ready(Duration::from_millis(20)).unwrap();
		assert!(!status.is_write_in_progress());
		assert!(!ee.transport().is_selected());
	}

	#[test]
	fn timeout_is_bounded_by_wall_clock() {
		let mut ee = eeprom();
		ee.transport_mut().device_mut().set_stuck_busy(true);
		let start = ee.clock().now_millis();
		match ee.wait_until_ready(Duration::from_millis(20)) {
			Err(Error::Timeout { timeout_ms }) => assert_eq!(timeout_ms, 20),
			r => panic!("expected timeout, got {:?}", r),
		}
		let elapsed = ee.clock().now_millis() - start;
		// timeout plus one poll (a status byte takes a few µs on the simulated bus)
		assert!(elapsed > 20 && elapsed <= 21, "elapsed: {}", elapsed);
		assert!(!ee.transport().is_selected());
	}

	#[test]
	fn timeout_with_poll_interval() {
		let mut ee = eeprom();
		let mut timing = ee.timing();
		timing.poll_interval = Duration::from_millis(3);
		ee.set_timing(timing);
		ee.transport_mut().device_mut().set_stuck_busy(true);
		let start = ee.clock().now_millis();
		assert!(ee.wait_until_ready(Duration::from_millis(10)).is_err());
		let elapsed = ee.clock().now_millis() - start;
		assert!(elapsed > 10 && elapsed <= 13, "elapsed: {}", elapsed);
	}

	#[test]
	fn waits_for_write_cycle() {
		let mut ee = eeprom();
		ee.transport_mut().device_mut().set_write_cycle(Duration::from_millis(5));
		ee.write_byte(0x10, 0x42).unwrap();
		// `write_byte` returned only after the cycle finished
		assert!(!ee.read_status().unwrap().is_write_in_progress());
		assert_eq!(ee.read_byte(0x10).unwrap(), 0x42);
	}
}
