use std::time::Duration;

use crate::eeprom::consts::*;
use crate::eeprom::StatusRegister;
use crate::Geometry;

use super::SimClock;

// datasheet maximum
const DEFAULT_WRITE_CYCLE: Duration = Duration::from_millis(5);

#[derive(Clone, Debug, PartialEq, Eq)]
enum State {
	Opcode,
	// WREN / WRDI: take effect on deselect, if nothing followed
	Instruction(u8),
	Address {
		opcode: u8,
		high: Option<u8>,
	},
	Read {
		address: usize,
	},
	ReadStatus,
	Write {
		page: usize,
		column: usize,
		latched: Vec<Option<u8>>,
	},
	WriteStatus {
		value: Option<u8>,
	},
	Ignore,
}

/// Byte level model of an AT25-class EEPROM.
///
/// Bytes are exchanged full duplex: `next_output` is what the chip shifts out
/// while the next byte is shifted in with `accept`.
#[derive(Clone, Debug)]
pub struct SimEeprom {
	geometry: Geometry,
	memory: Vec<u8>,
	status: StatusRegister,
	clock: SimClock,
	busy_until: Duration,
	stuck_busy: bool,
	write_cycle: Duration,
	state: State,
	frames: usize,
	page_writes: usize,
}

impl SimEeprom {
	pub fn new(geometry: Geometry, clock: SimClock) -> Self {
		SimEeprom {
			geometry,
			memory: vec![0xff; geometry.capacity() as usize],
			status: StatusRegister::default(),
			clock,
			busy_until: Duration::from_millis(0),
			stuck_busy: false,
			write_cycle: DEFAULT_WRITE_CYCLE,
			state: State::Opcode,
			frames: 0,
			page_writes: 0,
		}
	}

	pub fn clock(&self) -> &SimClock {
		&self.clock
	}

	pub fn memory(&self) -> &[u8] {
		&self.memory
	}

	pub fn memory_mut(&mut self) -> &mut [u8] {
		&mut self.memory
	}

	/// number of chip select frames seen
	pub fn frames(&self) -> usize {
		self.frames
	}

	/// number of started write cycles for data
	pub fn page_writes(&self) -> usize {
		self.page_writes
	}

	pub fn set_write_cycle(&mut self, duration: Duration) {
		self.write_cycle = duration;
	}

	/// keep WIP set forever (e.g. a broken chip or a floating data line)
	pub fn set_stuck_busy(&mut self, stuck: bool) {
		self.stuck_busy = stuck;
	}

	pub fn is_busy(&self) -> bool {
		self.stuck_busy || self.clock.elapsed() < self.busy_until
	}

	pub fn status(&self) -> StatusRegister {
		let mut status = self.status;
		status.set_write_in_progress(self.is_busy());
		status
	}

	pub fn select(&mut self) {
		self.frames += 1;
		self.state = State::Opcode;
	}

	pub fn deselect(&mut self) {
		match std::mem::replace(&mut self.state, State::Opcode) {
			State::Instruction(WREN_OPCODE) => {
				self.status.set_write_enabled(true);
			},
			State::Instruction(WRDI_OPCODE) => {
				self.status.set_write_enabled(false);
			},
			State::Write { page, latched, .. } => {
				if latched.iter().any(Option::is_some) {
					self.commit_page(page, &latched);
				}
			},
			State::WriteStatus { value: Some(value) } => {
				self.status.0 = (self.status.0 & !StatusRegister::WRITABLE_MASK) | (value & StatusRegister::WRITABLE_MASK);
				self.start_write_cycle();
			},
			_ => (),
		}
	}

	pub fn next_output(&self) -> u8 {
		match self.state {
			State::Read { address } => self.memory[address],
			State::ReadStatus => self.status().0,
			_ => 0xff,
		}
	}

	pub fn accept(&mut self, data: u8) {
		let capacity = self.memory.len();
		let page_size = self.geometry.page_size() as usize;
		let busy = self.is_busy();
		let write_enabled = self.status.is_write_enabled();

		let next = match &mut self.state {
			State::Opcode => Some(match data {
				READ_STATUS_OPCODE => State::ReadStatus,
				_ if busy => State::Ignore,
				WREN_OPCODE | WRDI_OPCODE => State::Instruction(data),
				READ_OPCODE => State::Address { opcode: data, high: None },
				WRITE_OPCODE if write_enabled => State::Address { opcode: data, high: None },
				WRITE_STATUS_OPCODE if write_enabled => State::WriteStatus { value: None },
				_ => State::Ignore,
			}),
			// instructions without arguments are void if more bits follow
			State::Instruction(_) => Some(State::Ignore),
			State::Address { high: high @ None, .. } => {
				*high = Some(data);
				None
			},
			State::Address { opcode, high: Some(high) } => {
				let address = ((usize::from(*high) << 8) | usize::from(data)) & (capacity - 1);
				if *opcode == READ_OPCODE {
					Some(State::Read { address })
				} else {
					Some(State::Write {
						page: address & !(page_size - 1),
						column: address & (page_size - 1),
						latched: vec![None; page_size],
					})
				}
			},
			State::Read { address } => {
				*address = (*address + 1) % capacity;
				None
			},
			State::Write { column, latched, .. } => {
				// wraps within the page
				latched[*column] = Some(data);
				*column = (*column + 1) % page_size;
				None
			},
			State::WriteStatus { value: value @ None } => {
				*value = Some(data);
				None
			},
			State::WriteStatus { .. } => Some(State::Ignore),
			State::ReadStatus | State::Ignore => None,
		};
		if let Some(next) = next {
			self.state = next;
		}
	}

	pub fn exchange(&mut self, data: u8) -> u8 {
		let out = self.next_output();
		self.accept(data);
		out
	}

	fn commit_page(&mut self, page: usize, latched: &[Option<u8>]) {
		let protected_from = self.status.block_protect().protected_from(self.geometry.capacity()) as usize;
		if page >= protected_from {
			self.status.set_write_enabled(false);
			return;
		}
		for (i, data) in latched.iter().enumerate() {
			if let Some(data) = data {
				self.memory[page + i] = *data;
			}
		}
		self.page_writes += 1;
		self.start_write_cycle();
	}

	fn start_write_cycle(&mut self) {
		self.busy_until = self.clock.elapsed() + self.write_cycle;
		self.status.set_write_enabled(false);
	}
}
