use thiserror::Error;

use crate::crc::CrcError;

#[derive(Error, Debug)]
pub enum Error {
	#[error(transparent)]
	Crc(#[from] CrcError),
	#[error("empty frame")]
	EmptyFrame,
	#[error("frame of {0} bits does not fit in one packet")]
	FrameTooLong(usize),
	#[error("serial port: {0}")]
	Serial(#[from] serialport::Error),
	#[error("link: {0}")]
	Io(#[from] std::io::Error),
}
