use std::thread;
use std::time::{
	Duration,
	Instant,
};

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

/// Monotonic time source used for all timeouts.
pub trait Clock {
	fn now_millis(&self) -> u64;

	fn sleep(&mut self, duration: Duration);
}

impl<'a, C: ?Sized + Clock> Clock for &'a mut C {
	fn now_millis(&self) -> u64 {
		C::now_millis(*self)
	}

	fn sleep(&mut self, duration: Duration) {
		C::sleep(*self, duration)
	}
}

#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
	start: Instant,
}

impl SystemClock {
	pub fn new() -> Self {
		SystemClock {
			start: Instant::now(),
		}
	}
}

impl Default for SystemClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for SystemClock {
	fn now_millis(&self) -> u64 {
		let elapsed = self.start.elapsed();
		elapsed.as_secs() * 1000 + u64::from(elapsed.subsec_millis())
	}

	fn sleep(&mut self, duration: Duration) {
		reliable_sleep(duration);
	}
}
