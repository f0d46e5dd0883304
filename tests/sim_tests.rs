use std::time::Duration;

use at25_eeprom::eeprom::consts::*;
use at25_eeprom::eeprom::StatusRegister;
use at25_eeprom::sim::{
	self,
	SimClock,
	SimEeprom,
	SimPins,
	SimTransport,
};
use at25_eeprom::transport::{
	BitBang,
	Transport,
	TransportExt,
};
use at25_eeprom::{
	Clock,
	Eeprom,
	Error,
	Geometry,
	TransportError,
};

/// Records every frame and can break the bus at the n-th WRITE frame.
struct Recording<T: Transport> {
	inner: T,
	selects: usize,
	deselects: usize,
	frames: Vec<Vec<u8>>,
	fail_write_frame: Option<usize>,
	write_frames: usize,
}

impl<T: Transport> Recording<T> {
	fn new(inner: T) -> Self {
		Recording {
			inner,
			selects: 0,
			deselects: 0,
			frames: Vec::new(),
			fail_write_frame: None,
			write_frames: 0,
		}
	}

	fn write_frames(&self) -> Vec<&Vec<u8>> {
		self.frames.iter().filter(|f| f.first() == Some(&WRITE_OPCODE)).collect()
	}
}

impl<T: Transport> Transport for Recording<T> {
	fn select(&mut self) -> Result<(), TransportError> {
		self.selects += 1;
		self.frames.push(Vec::new());
		self.inner.select()
	}

	fn deselect(&mut self) -> Result<(), TransportError> {
		self.deselects += 1;
		self.inner.deselect()
	}

	fn transfer(&mut self, out: &[u8], in_len: usize) -> Result<Vec<u8>, TransportError> {
		let frame = self.frames.last_mut().expect("transfer outside of frame");
		if frame.is_empty() && out.first() == Some(&WRITE_OPCODE) {
			self.write_frames += 1;
			if self.fail_write_frame == Some(self.write_frames) {
				return Err(TransportError::Bus("injected failure".into()));
			}
		}
		frame.extend_from_slice(out);
		self.inner.transfer(out, in_len)
	}
}

fn simulated() -> Eeprom<Recording<SimTransport>, SimClock> {
	let clock = SimClock::new();
	let device = SimEeprom::new(Geometry::AT25160, clock.clone());
	Eeprom::with_clock(Recording::new(SimTransport::new(device)), clock, Geometry::AT25160)
}

fn bit_banged() -> Eeprom<BitBang<SimPins>, SimClock> {
	let clock = SimClock::new();
	let device = SimEeprom::new(Geometry::AT25160, clock.clone());
	let bus = BitBang::new(SimPins::new(device)).unwrap();
	Eeprom::with_clock(bus, clock, Geometry::AT25160)
}

fn payload(len: usize) -> Vec<u8> {
	(0..len).map(|i| (i * 7 + 3) as u8).collect()
}

#[test]
fn round_trip_aligned() {
	let mut ee = simulated();
	let data = payload(64);
	ee.write(0, &data).unwrap();
	assert_eq!(ee.read_vec(0, 64).unwrap(), data);

	let spans: Vec<(u16, usize)> = ee.transport().write_frames().iter()
		.map(|f| ((u16::from(f[1]) << 8) | u16::from(f[2]), f.len() - 3))
		.collect();
	assert_eq!(spans, vec![(0, 32), (32, 32)]);
}

#[test]
fn round_trip_misaligned() {
	let mut ee = simulated();
	let data = payload(50);
	ee.write(20, &data).unwrap();
	assert_eq!(ee.read_vec(20, 50).unwrap(), data);
	// neighbours untouched
	assert_eq!(ee.read_byte(19).unwrap(), 0xff);
	assert_eq!(ee.read_byte(70).unwrap(), 0xff);

	let spans: Vec<(u16, usize)> = ee.transport().write_frames().iter()
		.map(|f| ((u16::from(f[1]) << 8) | u16::from(f[2]), f.len() - 3))
		.collect();
	assert_eq!(spans, vec![(20, 12), (32, 32), (64, 6)]);
	assert_eq!(ee.transport().inner.device().page_writes(), 3);
}

#[test]
fn round_trip_over_bit_banged_bus() {
	let mut ee = bit_banged();
	let data = payload(75);
	ee.write(0x7f0, &data[..16]).unwrap();
	ee.write(100, &data).unwrap();
	assert_eq!(ee.read_vec(100, 75).unwrap(), data);
	assert_eq!(ee.read_vec(0x7f0, 16).unwrap(), &data[..16]);
	assert_eq!(ee.transport().pins().device().page_writes(), 1 + 3);
}

#[test]
fn whole_device_round_trip() {
	let mut ee = simulated();
	let data = payload(2048);
	ee.write(0, &data).unwrap();
	assert_eq!(ee.read_vec(0, 2048).unwrap(), data);
	assert_eq!(ee.transport().inner.device().page_writes(), 64);
	assert_eq!(&ee.transport().inner.device().memory()[..], &data[..]);
}

#[test]
fn page_write_wire_format() {
	let mut ee = simulated();
	ee.write(0x0123, &[0xde, 0xad]).unwrap();
	let frames = &ee.transport().frames;
	// readiness check, WREN, WRITE, completion poll, WRDI
	assert_eq!(frames.len(), 5);
	assert_eq!(frames[0], vec![READ_STATUS_OPCODE]);
	assert_eq!(frames[1], vec![WREN_OPCODE]);
	assert_eq!(frames[2], vec![WRITE_OPCODE, 0x01, 0x23, 0xde, 0xad]);
	assert_eq!(frames[3], vec![READ_STATUS_OPCODE]);
	assert_eq!(frames[4], vec![WRDI_OPCODE]);

	ee.read_vec(0x0123, 2).unwrap();
	assert_eq!(ee.transport().frames[5], vec![READ_OPCODE, 0x01, 0x23]);
}

#[test]
fn zero_length_is_invalid() {
	let mut ee = simulated();
	match ee.write(20, &[]) {
		Err(Error::InvalidArgument(_)) => (),
		r => panic!("expected invalid argument, got {:?}", r),
	}
	match ee.read_vec(20, 0) {
		Err(Error::InvalidArgument(_)) => (),
		r => panic!("expected invalid argument, got {:?}", r),
	}
	assert_eq!(ee.transport().selects, 0);
}

#[test]
fn out_of_range_is_invalid() {
	let mut ee = simulated();
	match ee.write(2040, &[0u8; 9]) {
		Err(Error::InvalidArgument(_)) => (),
		r => panic!("expected invalid argument, got {:?}", r),
	}
	match ee.read_vec(0xffff, 1) {
		Err(Error::InvalidArgument(_)) => (),
		r => panic!("expected invalid argument, got {:?}", r),
	}
	assert_eq!(ee.transport().selects, 0);
	ee.write(2040, &[0u8; 8]).unwrap();
}

#[test]
fn huge_read_is_rejected_before_allocating() {
	let mut ee = simulated();
	for &(address, len) in &[(0u16, usize::max_value()), (16, usize::max_value() / 2), (0, 2049)] {
		match ee.read_vec(address, len) {
			Err(Error::InvalidArgument(_)) => (),
			r => panic!("expected invalid argument for {} bytes at {}, got {:?}", len, address, r.map(|v| v.len())),
		}
	}
	assert_eq!(ee.transport().selects, 0);
}

#[test]
fn fails_fast_on_transport_error() {
	let mut ee = simulated();
	ee.transport_mut().fail_write_frame = Some(2);
	let data = payload(70);
	let err = ee.write(20, &data).unwrap_err();

	match err {
		Error::WriteFailed { address: 32, length: 32, .. } => (),
		ref e => panic!("unexpected error: {:?}", e),
	}
	match err.root() {
		Error::Transport(_) => (),
		e => panic!("unexpected root: {:?}", e),
	}

	let rec = ee.transport();
	// chunk 3 never attempted
	assert_eq!(rec.write_frames, 2);
	assert_eq!(rec.inner.device().page_writes(), 1);
	assert_eq!(&rec.inner.device().memory()[20..32], &data[..12]);
	assert_eq!(&rec.inner.device().memory()[32..90], &[0xff; 58][..]);
	assert_eq!(rec.selects, rec.deselects);
	assert!(!rec.inner.is_selected());
}

#[test]
fn fails_fast_on_timeout() {
	let mut ee = simulated();
	ee.transport_mut().inner.device_mut().set_write_cycle(Duration::from_secs(1));
	let err = ee.write(0, &payload(64)).unwrap_err();
	assert!(err.is_timeout());
	match err {
		Error::WriteFailed { address: 0, length: 32, .. } => (),
		ref e => panic!("unexpected error: {:?}", e),
	}
	let rec = ee.transport();
	assert_eq!(rec.write_frames, 1);
	assert_eq!(rec.selects, rec.deselects);
}

#[test]
fn is_ready_has_no_side_effects() {
	let mut ee = simulated();
	let mut status = StatusRegister::default();
	status.set_status_write_disable(true);
	ee.write_status_register(status).unwrap();
	let before = ee.read_status().unwrap();

	assert!(ee.is_ready());
	assert!(ee.is_ready());
	assert_eq!(ee.read_status().unwrap(), before);
	assert!(before.is_status_write_disabled());
	assert!(!before.is_write_enabled());

	let frames = &ee.transport().frames;
	let n = frames.len();
	assert_eq!(frames[n - 3], vec![READ_STATUS_OPCODE]);
	assert_eq!(frames[n - 2], vec![READ_STATUS_OPCODE]);
}

#[test]
fn is_connected_gives_up_after_bounded_attempts() {
	let mut ee = simulated();
	assert!(ee.is_connected());
	assert_eq!(ee.transport().selects, 1);

	ee.transport_mut().inner.device_mut().set_stuck_busy(true);
	let start = ee.clock().now_millis();
	assert!(!ee.is_connected());
	let elapsed = ee.clock().now_millis() - start;
	assert_eq!(ee.transport().selects, 1 + 5);
	// 5 polls of ~21 ms and 4 pauses of 50 ms
	assert!(elapsed >= 5 * 20 + 4 * 50 && elapsed <= 5 * 22 + 4 * 50, "elapsed: {}", elapsed);
}

// start a write cycle behind the driver's back
fn start_raw_write_cycle(ee: &mut Eeprom<Recording<SimTransport>, SimClock>, cycle: Duration, address: u8, data: u8) {
	let t = ee.transport_mut();
	t.inner.device_mut().set_write_cycle(cycle);
	t.command(&[WREN_OPCODE]).unwrap();
	t.command(&[WRITE_OPCODE, 0x00, address, data]).unwrap();
	t.inner.device_mut().set_write_cycle(Duration::from_millis(5));
}

#[test]
fn readiness_check_retries_once_before_write_enable() {
	let mut ee = simulated();

	// first readiness poll gives up after ~21 ms, the second one succeeds
	start_raw_write_cycle(&mut ee, Duration::from_millis(30), 0x00, 0x01);
	ee.write(1, &[2]).unwrap();
	assert_eq!(ee.read_vec(0, 2).unwrap(), vec![1, 2]);

	// still busy after both attempts: WREN is never sent
	start_raw_write_cycle(&mut ee, Duration::from_millis(50), 0x05, 0x05);
	let frames_before = ee.transport().frames.len();
	let page_writes = ee.transport().inner.device().page_writes();
	let err = ee.write(2, &[3]).unwrap_err();
	assert!(err.is_timeout());
	let new_frames = &ee.transport().frames[frames_before..];
	assert_eq!(new_frames, &[vec![READ_STATUS_OPCODE], vec![READ_STATUS_OPCODE]][..]);
	assert_eq!(ee.transport().inner.device().page_writes(), page_writes);
}

#[test]
fn boxed_transport_handle() {
	let clock = SimClock::new();
	let device = SimEeprom::new(Geometry::AT25160, clock.clone());
	let transport: Box<dyn Transport> = Box::new(SimTransport::new(device));
	let mut ee = Eeprom::with_clock(transport, clock, Geometry::AT25160);
	ee.write(30, &[9, 8, 7, 6]).unwrap();
	assert_eq!(ee.read_vec(30, 4).unwrap(), vec![9, 8, 7, 6]);
}

#[test]
fn open_simulated_round_trip() {
	let mut ee = sim::open_simulated(Geometry::new(64, 0x1_0000).unwrap());
	let data = payload(200);
	ee.write(0xff00, &data).unwrap();
	assert_eq!(ee.read_vec(0xff00, 200).unwrap(), data);
	assert_eq!(ee.transport().device().page_writes(), 4);
}
