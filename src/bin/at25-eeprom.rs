#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate at25_eeprom;
use at25_eeprom::*;

use std::fs;
use std::io::{
	self,
	Read,
};
use std::process::exit;
use std::time::Duration;

use at25_eeprom::eeprom::StatusRegister;
use at25_eeprom::selftest::Pattern;
use at25_eeprom::transport::{
	linux,
	Transport,
};

// accepts decimal and 0x-prefixed hex
fn parse_number(s: &str) -> AResult<u64> {
	let r = if s.starts_with("0x") || s.starts_with("0X") {
		u64::from_str_radix(&s[2..], 16)
	} else {
		s.parse::<u64>()
	};
	Ok(r?)
}

fn get_number(matches: &clap::ArgMatches, name: &str, max: u64) -> AResult<Option<u64>> {
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => return Ok(None),
	};
	let value = with_context!(("invalid parameter {}", name), parse_number(param))?;
	ensure!(value <= max, "invalid parameter {}: {} is larger than {}", name, value, max);
	Ok(Some(value))
}

fn get_required_number(matches: &clap::ArgMatches, name: &str, max: u64) -> AResult<u64> {
	match get_number(matches, name, max)? {
		Some(v) => Ok(v),
		None => bail!("missing parameter {}", name),
	}
}

type Device = Eeprom<Box<dyn Transport>>;

fn open_device(matches: &clap::ArgMatches) -> AResult<Device> {
	let defaults = Geometry::default();
	let page_size = get_number(matches, "page_size", 0x8000)?.unwrap_or(defaults.page_size() as u64);
	let capacity = get_number(matches, "capacity", 0x1_0000)?.unwrap_or(defaults.capacity() as u64);
	let geometry = Geometry::new(page_size as u16, capacity as u32)?;

	let transport: Box<dyn Transport> = if matches.is_present("sim") {
		info!("Using simulated EEPROM");
		Box::new(sim::SimTransport::new(sim::SimEeprom::new(geometry, sim::SimClock::new())))
	} else if let Some(device) = matches.value_of("spidev") {
		let address: linux::SpiAddress = device.parse()?;
		let speed = get_number(matches, "speed", u32::max_value() as u64)?
			.unwrap_or(linux::DEFAULT_SPEED_HZ as u64);
		Box::new(linux::open_spidev(address, speed as u32)?)
	} else if let Some(lines) = matches.value_of("gpio") {
		let lines: linux::GpioLines = lines.parse()?;
		Box::new(linux::open_gpio_bitbang(lines)?)
	} else {
		bail!("need one of --sim, --spidev or --gpio");
	};

	let mut eeprom = Eeprom::new(transport, geometry);
	if let Some(timeout) = get_number(matches, "timeout", 60_000)? {
		let mut timing = eeprom.timing();
		timing.write_timeout = Duration::from_millis(timeout);
		eeprom.set_timing(timing);
	}
	Ok(eeprom)
}

fn print_hex(address: u16, data: &[u8]) {
	for (i, b) in data.iter().enumerate() {
		if 0 == i % 16 {
			print!("{:04x} ", address as usize + i);
		} else if 0 == i % 8 {
			print!(" ");
		}
		print!(" {:02x}", b);
		if 15 == i % 16 {
			println!("");
		}
	}
	if 0 != data.len() % 16 {
		println!("");
	}
}

fn probe(ee: &mut Device) -> AResult<()> {
	if !ee.is_connected() {
		error!("No EEPROM responding");
		exit(2);
	}
	println!("EEPROM ready: {:?}", ee.read_status()?);
	Ok(())
}

fn status(ee: &mut Device) -> AResult<()> {
	println!("{:?}", ee.read_status()?);
	Ok(())
}

fn read(ee: &mut Device, sub_m: &clap::ArgMatches) -> AResult<()> {
	let address = get_required_number(sub_m, "ADDRESS", 0xffff)? as u16;
	let length = get_required_number(sub_m, "LENGTH", 0x1_0000)? as usize;

	let data = ee.read_vec(address, length)?;
	match sub_m.value_of("output") {
		Some(path) => {
			with_context!(("couldn't write {}", path), Ok(fs::write(path, &data)?))?;
			info!("Read {} bytes at 0x{:04x} into {}", data.len(), address, path);
		},
		None => print_hex(address, &data),
	}
	Ok(())
}

fn write(ee: &mut Device, sub_m: &clap::ArgMatches) -> AResult<()> {
	let address = get_required_number(sub_m, "ADDRESS", 0xffff)? as u16;
	let path = sub_m.value_of("FILE").unwrap_or("-");

	let data = with_context!(("couldn't read {}", path), {
		if path == "-" {
			let mut data = Vec::new();
			io::stdin().read_to_end(&mut data)?;
			Ok(data)
		} else {
			Ok(fs::read(path)?)
		}
	})?;

	ee.write(address, &data)?;
	let verify = ee.read_vec(address, data.len())?;
	ensure!(verify == data, "Verify failed after writing {} bytes at 0x{:04x}", data.len(), address);
	info!("Wrote and verified {} bytes at 0x{:04x}", data.len(), address);
	Ok(())
}

fn write_status(ee: &mut Device, sub_m: &clap::ArgMatches) -> AResult<()> {
	let value = get_required_number(sub_m, "VALUE", 0xff)? as u8;
	let status = StatusRegister(value);
	if status.writable() != value {
		warn!("Only block protect and SRWD bits can be written, using 0x{:02x}", status.writable());
	}
	ee.write_status_register(status)?;
	println!("{:?}", ee.read_status()?);
	Ok(())
}

fn self_test(ee: &mut Device, sub_m: &clap::ArgMatches) -> AResult<()> {
	let pattern = if sub_m.is_present("erase") { Pattern::Erase } else { Pattern::Random };
	if sub_m.is_present("single") {
		selftest::single_read_write_test(ee, pattern)?;
	} else {
		selftest::multiple_read_write_test(ee, pattern)?;
	}
	info!("Self test passed");
	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg sim: --sim conflicts_with[spidev gpio] "use a simulated EEPROM")
		(@arg spidev: --spidev +takes_value conflicts_with[gpio] "SPI device to use (e.g. /dev/spidev0.0 or 0.0)")
		(@arg gpio: --gpio +takes_value "software SPI on GPIO lines CS,SCK,MOSI,MISO (BCM numbers)")
		(@arg speed: --speed +takes_value "SPI clock in Hz for --spidev (default: 1000000)")
		(@arg page_size: --page_size +takes_value "page size in bytes (default: 32)")
		(@arg capacity: --capacity +takes_value "capacity in bytes (default: 2048)")
		(@arg timeout: --timeout +takes_value "write cycle timeout in ms (default: 20)")
		(@subcommand probe =>
			(about: "check whether an EEPROM responds")
		)
		(@subcommand status =>
			(about: "show status register")
		)
		(@subcommand read =>
			(about: "read data, as hex dump to stdout or into a file")
			(@arg output: -o --output +takes_value "file to write the data to")
			(@arg ADDRESS: +required "start address")
			(@arg LENGTH: +required "number of bytes")
		)
		(@subcommand write =>
			(about: "write data from a file and verify it")
			(@arg ADDRESS: +required "start address")
			(@arg FILE: +required "file with data (- for stdin)")
		)
		(@subcommand write_status =>
			(about: "write status register (block protect and SRWD bits)")
			(@arg VALUE: +required "new status register value")
		)
		(@subcommand self_test =>
			(about: "overwrite 40 bytes at address 0 with a test pattern and verify")
			(@arg single: -s --single "use single byte reads and writes")
			(@arg erase: -e --erase "write 0xff instead of random data")
		)
	).get_matches();

	let mut ee = open_device(&matches)?;

	match matches.subcommand() {
		("probe", _) => {
			probe(&mut ee)
		}
		("status", _) => {
			status(&mut ee)
		}
		("read", Some(sub_m)) => {
			read(&mut ee, sub_m)
		}
		("write", Some(sub_m)) => {
			write(&mut ee, sub_m)
		}
		("write_status", Some(sub_m)) => {
			write_status(&mut ee, sub_m)
		}
		("self_test", Some(sub_m)) => {
			self_test(&mut ee, sub_m)
		}
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
