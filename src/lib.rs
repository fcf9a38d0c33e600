use std::collections::VecDeque;
use std::io::{Read, Write};
use serialport::SerialPort;
use tracing::{debug, warn};

pub mod codec;
pub mod config;
pub mod crc;
mod error;
pub mod logging;
pub mod noise;

pub use crc::{compute_crc, verify_crc, CrcError, Divisor, CRC};
pub use error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
	Continue = 3,
	NewData = 2,
	NoData = 1,
	CrcError = 0,
	PayloadError = -1,
	StopByteError = -2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferState {
	FindStartByte,
	FindIdByte,
	FindLengthHigh,
	FindLengthLow,
	FindPayload,
	FindStopByte,
}

const START_BYTE : u8 = 0x7E;
const STOP_BYTE : u8 = 0x81;

/// Largest frame, in bits, that one packet can carry.
pub const MAX_FRAME_BITS : usize = u16::MAX as usize;

/// A byte transport packets are written to and read from.
pub trait Link : Read + Write {
	fn bytes_to_read(&mut self) -> Result<u32, Error>;
}

impl Link for Box<dyn SerialPort> {
	fn bytes_to_read(&mut self) -> Result<u32, Error> {
		Ok(SerialPort::bytes_to_read(&**self)?)
	}
}

/// In-memory link: everything written is read back in order.
#[derive(Debug, Default)]
pub struct Loopback {
	buffer : VecDeque<u8>,
}

impl Loopback {
	pub fn new() -> Loopback {
		Loopback::default()
	}
}

impl Read for Loopback {
	fn read(&mut self, buf : &mut [u8]) -> std::io::Result<usize> {
		let n = buf.len().min(self.buffer.len());
		for (slot, byte) in buf.iter_mut().zip(self.buffer.drain(..n)) {
			*slot = byte;
		}
		Ok(n)
	}
}

impl Write for Loopback {
	fn write(&mut self, buf : &[u8]) -> std::io::Result<usize> {
		self.buffer.extend(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}

impl Link for Loopback {
	fn bytes_to_read(&mut self) -> Result<u32, Error> {
		Ok(self.buffer.len().min(u32::MAX as usize) as u32)
	}
}

/// A frame taken off the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
	pub id : u8,
	/// Message bits followed by the remainder, as received.
	pub bits : String,
	/// Whether the frame passed the CRC check.
	pub intact : bool,
	remainder_width : usize,
}

impl Received {
	/// The frame without its trailing remainder bits.
	pub fn message_bits(&self) -> &str {
		let end = self.bits.len().saturating_sub(self.remainder_width);
		&self.bits[..end]
	}
}

fn pack(bits : &str) -> Result<Vec<u8>, Error> {
	let bits = crc::parse_bits(bits)?;
	Ok(bits
		.chunks(8)
		.map(|chunk| {
			chunk.iter().enumerate().fold(0u8, |byte, (i, &bit)| {
				if bit { byte | (0x80 >> i) } else { byte }
			})
		})
		.collect())
}

fn unpack(bytes : &[u8], len : usize) -> String {
	let bits : Vec<bool> = bytes
		.iter()
		.flat_map(|byte| (0..8).map(move |i| byte & (0x80 >> i) != 0))
		.take(len)
		.collect();
	crc::render(&bits)
}

pub struct SerialTransfer<L : Link> {
	crc : CRC,

	link : L,
	status : TransferStatus,
	transfer_state : TransferState,

	next_id : u8,
	id_byte : u8,
	frame_length : usize,
	payload : Vec<u8>,
}

impl<L : Link> SerialTransfer<L> {

	pub fn new(link : L, crc : CRC) -> SerialTransfer<L> {
		SerialTransfer {
			crc,

			status : TransferStatus::Continue,
			transfer_state : TransferState::FindStartByte,
			link,

			next_id : 0,
			id_byte : 0,
			frame_length : 0,
			payload : Vec::new(),
		}
	}

	pub fn crc(&self) -> &CRC {
		&self.crc
	}

	pub fn status(&self) -> TransferStatus {
		self.status
	}

	pub fn link_mut(&mut self) -> &mut L {
		&mut self.link
	}

	/// Writes one packet carrying `bits`, which must not be empty. Returns the packet id.
	pub fn send(&mut self, bits : &str) -> Result<u8, Error> {
		if bits.is_empty() {
			return Err(Error::EmptyFrame);
		}
		if bits.len() > MAX_FRAME_BITS {
			return Err(Error::FrameTooLong(bits.len()));
		}
		let mut buffer = pack(bits)?;
		let id = self.next_id;
		self.next_id = self.next_id.wrapping_add(1);

		let mut packet : Vec<u8> = Vec::with_capacity(buffer.len() + 5);
		packet.push(START_BYTE);
		packet.push(id);
		packet.extend_from_slice(&(bits.len() as u16).to_be_bytes());
		packet.append(&mut buffer);
		packet.push(STOP_BYTE);

		self.link.write_all(&packet)?;
		self.link.flush()?;
		debug!(id, bits = bits.len(), bytes = packet.len(), "sent packet");

		Ok(id)
	}

	/// Consumes pending bytes until a packet completes or the link runs dry.
	pub fn available(&mut self) -> Result<Option<Received>, Error> {
		if self.link.bytes_to_read()? == 0 {
			// An error status stays until the next start byte.
			if self.transfer_state == TransferState::FindStartByte
				&& matches!(self.status, TransferStatus::Continue | TransferStatus::NewData | TransferStatus::NoData)
			{
				self.status = TransferStatus::NoData;
			}
			return Ok(None);
		}

		while self.link.bytes_to_read()? > 0 {
			let mut byte : [u8;1] = [0;1];
			self.link.read_exact(&mut byte)?;

			match self.transfer_state {
				TransferState::FindStartByte => {
					if byte[0] == START_BYTE {
						self.status = TransferStatus::Continue;
						self.transfer_state = TransferState::FindIdByte;
					}
				},
				TransferState::FindIdByte => {
					self.id_byte = byte[0];
					self.transfer_state = TransferState::FindLengthHigh;
				},
				TransferState::FindLengthHigh => {
					self.frame_length = (byte[0] as usize) << 8;
					self.transfer_state = TransferState::FindLengthLow;
				},
				TransferState::FindLengthLow => {
					self.frame_length |= byte[0] as usize;
					self.payload.clear();
					if self.frame_length > 0 {
						self.transfer_state = TransferState::FindPayload;
					} else {
						warn!(id = self.id_byte, "empty packet");
						self.transfer_state = TransferState::FindStartByte;
						self.status = TransferStatus::PayloadError;
					}
				},
				TransferState::FindPayload => {
					self.payload.push(byte[0]);
					if self.payload.len() == self.frame_length.div_ceil(8) {
						self.transfer_state = TransferState::FindStopByte;
					}
				},
				TransferState::FindStopByte => {
					self.transfer_state = TransferState::FindStartByte;

					if byte[0] == STOP_BYTE {
						return Ok(Some(self.finish()));
					} else {
						warn!(id = self.id_byte, found = byte[0], "bad stop byte, packet dropped");
						self.status = TransferStatus::StopByteError;
					}
				},
			}
		}

		Ok(None)
	}

	fn finish(&mut self) -> Received {
		let bits = unpack(&self.payload, self.frame_length);
		let intact = match self.crc.verify(&bits) {
			Ok(intact) => intact,
			Err(e) => {
				warn!(id = self.id_byte, "frame not checkable: {}", e);
				false
			},
		};
		self.status = if intact { TransferStatus::NewData } else { TransferStatus::CrcError };
		debug!(id = self.id_byte, bits = bits.len(), intact, "received packet");

		Received {
			id : self.id_byte,
			bits,
			intact,
			remainder_width : self.crc.width(),
		}
	}
}
