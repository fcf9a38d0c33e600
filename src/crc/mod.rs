//! CRC by binary polynomial long division over explicit bit strings.
//!
//! Bit strings are `'0'`/`'1'` characters, most significant bit first. Both the
//! data and the divisor have their leading zeros stripped before dividing, the
//! remainder is a fixed-width field of `width()` bits.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrcError {
	#[error("divisor has no set bit")]
	InvalidDivisor,
	#[error("received {actual} bits, need at least {needed}")]
	InsufficientData { needed : usize, actual : usize },
	#[error("invalid bit {found:?} at index {index}")]
	InvalidBit { index : usize, found : char },
}

/// Generator polynomial, as a bit string or as an integer whose binary
/// encoding gives the coefficients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Divisor {
	Bits(String),
	Integer(u64),
}

impl Divisor {
	/// Binary encoding of the divisor. Integers are written without leading zeros.
	pub fn to_bit_string(&self) -> String {
		match self {
			Divisor::Bits(bits) => bits.clone(),
			Divisor::Integer(value) => format!("{:b}", value),
		}
	}
}

impl From<&str> for Divisor {
	fn from(bits : &str) -> Divisor {
		Divisor::Bits(bits.to_string())
	}
}

impl From<String> for Divisor {
	fn from(bits : String) -> Divisor {
		Divisor::Bits(bits)
	}
}

impl From<u64> for Divisor {
	fn from(value : u64) -> Divisor {
		Divisor::Integer(value)
	}
}

pub(crate) fn parse_bits(bits : &str) -> Result<Vec<bool>, CrcError> {
	bits.chars()
		.enumerate()
		.map(|(index, c)| match c {
			'0' => Ok(false),
			'1' => Ok(true),
			found => Err(CrcError::InvalidBit { index, found }),
		})
		.collect()
}

pub(crate) fn render(bits : &[bool]) -> String {
	bits.iter().map(|&bit| if bit { '1' } else { '0' }).collect()
}

fn strip_leading_zeros(bits : &[bool]) -> &[bool] {
	let start = bits.iter().position(|&bit| bit).unwrap_or(bits.len());
	&bits[start..]
}

/// A reusable CRC engine for one divisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CRC {
	divisor : Vec<bool>,
}

impl CRC {
	pub fn new(divisor : impl Into<Divisor>) -> Result<CRC, CrcError> {
		let bits = parse_bits(&divisor.into().to_bit_string())?;
		let divisor = strip_leading_zeros(&bits).to_vec();
		if divisor.is_empty() {
			return Err(CrcError::InvalidDivisor);
		}
		Ok(CRC { divisor })
	}

	/// The stripped divisor as a bit string.
	pub fn divisor(&self) -> String {
		render(&self.divisor)
	}

	/// Number of remainder bits, `len(divisor) - 1`.
	pub fn width(&self) -> usize {
		self.divisor.len() - 1
	}

	/// Remainder of `data` padded with `width()` zero bits.
	pub fn compute(&self, data : &str) -> Result<String, CrcError> {
		let bits = parse_bits(data)?;
		let mut padded = strip_leading_zeros(&bits).to_vec();
		padded.resize(padded.len() + self.width(), false);
		Ok(render(&self.divide(&padded)))
	}

	/// True if `received` (message followed by its remainder) divides evenly.
	pub fn verify(&self, received : &str) -> Result<bool, CrcError> {
		let bits = parse_bits(received)?;
		if bits.len() < self.width() {
			return Err(CrcError::InsufficientData {
				needed : self.width(),
				actual : bits.len(),
			});
		}
		let remainder = self.divide(strip_leading_zeros(&bits));
		Ok(remainder.iter().all(|&bit| !bit))
	}

	/// `message` followed by its remainder.
	pub fn frame(&self, message : &str) -> Result<String, CrcError> {
		let remainder = self.compute(message)?;
		Ok(format!("{}{}", message, remainder))
	}

	fn divide(&self, data : &[bool]) -> Vec<bool> {
		let width = self.width();
		// Nothing to bring down: the whole input is the remainder.
		if data.len() < width {
			return data.to_vec();
		}

		let mut window : Vec<bool> = data[..width].to_vec();
		for &bit in &data[width..] {
			window.push(bit);
			let lead = window[0];
			for j in 0..width {
				window[j] = window[j + 1] ^ (lead && self.divisor[j + 1]);
			}
			window.truncate(width);
		}
		window
	}
}

/// Remainder of `data` for `divisor`, see [`CRC::compute`].
pub fn compute_crc(data : &str, divisor : impl Into<Divisor>) -> Result<String, CrcError> {
	CRC::new(divisor)?.compute(data)
}

/// Integrity check of a received frame, see [`CRC::verify`].
pub fn verify_crc(received : &str, divisor : impl Into<Divisor>) -> Result<bool, CrcError> {
	CRC::new(divisor)?.verify(received)
}
