/// Read/write self tests: dump the test area, overwrite it with a pattern,
/// read it back and verify.
///
/// The test area (40 bytes at address 0) is left with the pattern, so
/// `Pattern::Erase` is the way to clean up afterwards.

use std::fmt::Write;

use crate::clock::Clock;
use crate::transport::Transport;
use crate::Eeprom;

const TEST_ADDRESS: u16 = 0;
const TEST_LENGTH: usize = 40;
const PATTERN_SEED: u32 = 0x1237;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Pattern {
	/// pseudo random bytes, same sequence on every run
	Random,
	/// 0xff, the state of an erased chip
	Erase,
}

impl Pattern {
	pub fn generate(self, len: usize) -> Vec<u8> {
		match self {
			Pattern::Erase => vec![0xff; len],
			Pattern::Random => {
				// xorshift32
				let mut state = PATTERN_SEED;
				(0..len).map(|_| {
					state ^= state << 13;
					state ^= state >> 17;
					state ^= state << 5;
					(state % 255) as u8
				}).collect()
			}
		}
	}
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Report {
	pub before: Vec<u8>,
	pub written: Vec<u8>,
	pub after: Vec<u8>,
}

pub fn hex_dump(data: &[u8]) -> String {
	let mut s = String::new();
	for (i, b) in data.iter().enumerate() {
		if i > 0 {
			s.push(if 0 == i % 16 { '\n' } else { ' ' });
		}
		let _ = write!(s, "{:02x}", b);
	}
	s
}

fn verify(report: &Report) -> crate::AResult<()> {
	for (i, (expected, read)) in report.written.iter().zip(report.after.iter()).enumerate() {
		ensure!(expected == read,
			"Verify failed at {:04x}: expected {:02x}, EEPROM has {:02x}", TEST_ADDRESS as usize + i, expected, read
		);
	}
	Ok(())
}

/// Byte by byte: every byte is a separate read or page write.
pub fn single_read_write_test<T, C>(eeprom: &mut Eeprom<T, C>, pattern: Pattern) -> crate::AResult<Report>
where
	T: Transport,
	C: Clock,
{
	ensure!(eeprom.is_ready(), "EEPROM not ready");
	info!("EEPROM is ready");

	let mut before = Vec::with_capacity(TEST_LENGTH);
	for i in 0..TEST_LENGTH {
		before.push(eeprom.read_byte(TEST_ADDRESS + i as u16)?);
	}
	info!("EEPROM data read out:\n{}", hex_dump(&before));

	let written = pattern.generate(TEST_LENGTH);
	info!("EEPROM data write in:\n{}", hex_dump(&written));
	for (i, b) in written.iter().enumerate() {
		let address = TEST_ADDRESS + i as u16;
		with_context!(("single byte write at 0x{:04x}", address),
			Ok(eeprom.write_byte(address, *b)?)
		)?;
	}

	let mut after = Vec::with_capacity(TEST_LENGTH);
	for i in 0..TEST_LENGTH {
		after.push(eeprom.read_byte(TEST_ADDRESS + i as u16)?);
	}
	info!("EEPROM data read out again:\n{}", hex_dump(&after));

	let report = Report { before, written, after };
	verify(&report)?;
	Ok(report)
}

/// Buffered: one read and one (page split) write for the whole area.
pub fn multiple_read_write_test<T, C>(eeprom: &mut Eeprom<T, C>, pattern: Pattern) -> crate::AResult<Report>
where
	T: Transport,
	C: Clock,
{
	ensure!(eeprom.is_ready(), "EEPROM not ready");
	info!("EEPROM is ready");

	let before = eeprom.read_vec(TEST_ADDRESS, TEST_LENGTH)?;
	info!("EEPROM data read out:\n{}", hex_dump(&before));

	let written = pattern.generate(TEST_LENGTH);
	info!("EEPROM data write in:\n{}", hex_dump(&written));
	with_context!("buffer write",
		Ok(eeprom.write(TEST_ADDRESS, &written)?)
	)?;

	let after = eeprom.read_vec(TEST_ADDRESS, TEST_LENGTH)?;
	info!("EEPROM data read out again:\n{}", hex_dump(&after));

	let report = Report { before, written, after };
	verify(&report)?;
	Ok(report)
}
