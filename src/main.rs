use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crc_transfer::codec::{bits_to_text_lossy, text_to_bits};
use crc_transfer::config::Config;
use crc_transfer::noise::{Corruption, NoiseModel};
use crc_transfer::{logging, Divisor, Link, Loopback, Received, SerialTransfer, CRC};

const RULE : &str = "-----------------------------------------------------------";
const RECEIVE_TIMEOUT : Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "crc_transfer")]
#[command(about = "CRC by polynomial long division, with a noisy sender/receiver demo", long_about = None)]
struct Args {
	/// Generator polynomial, a bit string or a 0x-prefixed integer
	#[arg(short, long)]
	divisor : Option<String>,
	/// Plaintext to send
	#[arg(short, long)]
	message : Option<String>,
	/// Per-bit noise probability
	#[arg(short, long)]
	probability : Option<f64>,
	/// Invert hit bits instead of re-rolling them
	#[arg(long)]
	flip : bool,
	/// Seed for the noise generator
	#[arg(short, long)]
	seed : Option<u64>,
	/// Transmit over this serial port (TX wired to RX) instead of in memory
	#[arg(long)]
	port : Option<String>,
	#[arg(short, long)]
	baud_rate : Option<u32>,
	/// Bits per character
	#[arg(short, long)]
	width : Option<usize>,
	#[command(subcommand)]
	command : Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print the remainder of a bit string
	Compute { bits : String },
	/// Check a bit string that ends in its remainder
	Verify { bits : String },
}

fn parse_divisor(s : &str) -> Result<Divisor> {
	match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
		Some(hex) => {
			let value = u64::from_str_radix(hex, 16)
				.with_context(|| format!("invalid divisor {s}"))?;
			Ok(Divisor::Integer(value))
		},
		None => Ok(Divisor::Bits(s.to_string())),
	}
}

fn main() -> Result<()> {
	let args = Args::parse();
	let (mut config, warnings) = Config::load();
	if let Some(divisor) = args.divisor {
		config.divisor = divisor;
	}
	if let Some(message) = args.message {
		config.message = message;
	}
	if let Some(probability) = args.probability {
		config.probability = probability;
	}
	if args.flip {
		config.policy = Corruption::Flip;
	}
	if args.seed.is_some() {
		config.seed = args.seed;
	}
	if args.port.is_some() {
		config.port = args.port;
	}
	if let Some(baud_rate) = args.baud_rate {
		config.baud_rate = baud_rate;
	}
	if let Some(width) = args.width {
		config.width = width;
	}

	logging::init(config.log_level);
	for w in &warnings {
		warn!("{w}");
	}

	let crc = CRC::new(parse_divisor(&config.divisor)?)
		.with_context(|| format!("invalid divisor {}", config.divisor))?;

	match args.command {
		Some(Command::Compute { bits }) => {
			println!("{}", crc.compute(&bits)?);
			Ok(())
		},
		Some(Command::Verify { bits }) => {
			println!("{}", crc.verify(&bits)?);
			Ok(())
		},
		None => demo(&config, crc),
	}
}

fn demo(config : &Config, crc : CRC) -> Result<()> {
	let noise = NoiseModel::new(config.probability, config.policy)?;
	info!(probability = noise.probability(), policy = ?noise.policy(), "noise model");
	let message = text_to_bits(&config.message, config.width)?;
	let remainder = crc.compute(&message)?;

	println!("{RULE}");
	println!("Divisor used for computing CRC: {}", crc.divisor());
	println!("Message being sent: {}", config.message);
	println!("Message in Binary: {}", message);
	println!("CRC Value: {}", remainder);

	let frame = format!("{message}{remainder}");

	println!("{RULE}");
	println!("Transmitting message........");
	println!("{RULE}");

	let mut rng = match config.seed {
		Some(seed) => StdRng::seed_from_u64(seed),
		None => StdRng::from_entropy(),
	};
	let transmitted = noise.perturb(&frame, &mut rng);

	let received = match &config.port {
		Some(path) => {
			info!(path = %path, baud_rate = config.baud_rate, "opening serial port");
			let port = serialport::new(path, config.baud_rate)
				.timeout(Duration::from_millis(100))
				.open()
				.with_context(|| format!("failed to open serial port {path}"))?;
			transmit(port, crc, &transmitted)?
		},
		None => transmit(Loopback::new(), crc, &transmitted)?,
	};

	let text = bits_to_text_lossy(received.message_bits(), config.width)
		.context("received message is not a whole number of characters")?;
	println!("Receiver received the message: {}", text);
	println!("Message in Binary: {}", received.message_bits());
	println!("Data Corrupted: {}", !received.intact);
	println!("{RULE}");

	Ok(())
}

fn transmit<L : Link>(link : L, crc : CRC, bits : &str) -> Result<Received> {
	let mut transfer = SerialTransfer::new(link, crc);
	transfer.send(bits)?;

	let deadline = Instant::now() + RECEIVE_TIMEOUT;
	loop {
		if let Some(received) = transfer.available()? {
			return Ok(received);
		}
		if Instant::now() >= deadline {
			bail!("no packet received within {:?} ({:?})", RECEIVE_TIMEOUT, transfer.status());
		}
		thread::sleep(Duration::from_millis(10));
	}
}
