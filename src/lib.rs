#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

#[macro_export]
macro_rules! with_context {
	(( $fmt:tt $($t:tt)* ), $e:expr) => {{
		use failure::Error;

		match (|| { $e })() {
			Ok(v) => Ok(v),
			Err(e) => {
				let e: Error = e;
				let msg = format!(concat!($fmt, ": {}") $($t)*, e);
				Err(Error::from(e.context(msg)))
			}
		}
	}};

	($msg:expr, $e:expr) => {
		$crate::with_context!(("{}", $msg), $e)
	};
}

pub type AResult<T> = Result<T, failure::Error>;

pub mod clock;
pub mod eeprom;
mod error;
pub mod selftest;
pub mod sim;
pub mod transport;

pub use self::clock::{
	Clock,
	SystemClock,
};

pub use self::eeprom::{
	Eeprom,
	Geometry,
	Timing,
};

pub use self::error::{
	Error,
	TransportError,
};
