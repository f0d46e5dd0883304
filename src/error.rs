use std::io;

/// Failure of the underlying byte exchange.
#[derive(Debug, Fail)]
pub enum TransportError {
	#[fail(display = "{}", _0)]
	Io(#[cause] io::Error),
	#[fail(display = "{}", _0)]
	Bus(String),
}

impl From<io::Error> for TransportError {
	fn from(e: io::Error) -> Self {
		TransportError::Io(e)
	}
}

#[derive(Debug, Fail)]
pub enum Error {
	#[fail(display = "transport failure: {}", _0)]
	Transport(#[cause] TransportError),

	#[fail(display = "EEPROM still busy after {} ms", timeout_ms)]
	Timeout {
		timeout_ms: u64,
	},

	#[fail(display = "invalid argument: {}", _0)]
	InvalidArgument(String),

	// not using #[cause]: a boxed `Error` doesn't implement `Fail`
	#[fail(display = "writing {} bytes at 0x{:04x} failed: {}", length, address, source)]
	WriteFailed {
		address: u16,
		length: u16,
		source: Box<Error>,
	},
}

impl Error {
	pub(crate) fn invalid<S: Into<String>>(msg: S) -> Self {
		Error::InvalidArgument(msg.into())
	}

	pub(crate) fn write_failed(address: u16, length: u16, source: Error) -> Self {
		Error::WriteFailed {
			address,
			length,
			source: Box::new(source),
		}
	}

	/// innermost error, looking through `WriteFailed`
	pub fn root(&self) -> &Error {
		match self {
			Error::WriteFailed { source, .. } => source.root(),
			e => e,
		}
	}

	pub fn is_timeout(&self) -> bool {
		match self.root() {
			Error::Timeout { .. } => true,
			_ => false,
		}
	}
}

impl From<TransportError> for Error {
	fn from(e: TransportError) -> Self {
		Error::Transport(e)
	}
}
