//! Text to bit string conversion with fixed-width fields.

use thiserror::Error;

pub const DEFAULT_WIDTH : usize = 8;

const MAX_WIDTH : usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
	#[error("field width must be between 1 and 32, got {0}")]
	InvalidWidth(usize),
	#[error("character {found:?} does not fit in {width} bits")]
	CharTooWide { found : char, width : usize },
	#[error("{len} bits is not a multiple of the field width {width}")]
	Misaligned { len : usize, width : usize },
	#[error("invalid bit {found:?} at index {index}")]
	InvalidBit { index : usize, found : char },
	#[error("field {0:#x} is not a character")]
	InvalidChar(u32),
}

fn check_width(width : usize) -> Result<(), CodecError> {
	if width == 0 || width > MAX_WIDTH {
		return Err(CodecError::InvalidWidth(width));
	}
	Ok(())
}

/// Each character's code point as a big-endian `width`-bit field.
pub fn text_to_bits(text : &str, width : usize) -> Result<String, CodecError> {
	check_width(width)?;
	let mut bits = String::with_capacity(text.len() * width);
	for c in text.chars() {
		let code = c as u32;
		if width < MAX_WIDTH && code >> width != 0 {
			return Err(CodecError::CharTooWide { found : c, width });
		}
		bits.push_str(&format!("{:0width$b}", code, width = width));
	}
	Ok(bits)
}

fn fields(bits : &str, width : usize) -> Result<Vec<u32>, CodecError> {
	check_width(width)?;
	if bits.len() % width != 0 || !bits.is_ascii() {
		if let Some((index, found)) = bits.chars().enumerate().find(|(_, c)| *c != '0' && *c != '1') {
			return Err(CodecError::InvalidBit { index, found });
		}
		return Err(CodecError::Misaligned { len : bits.len(), width });
	}

	bits.as_bytes()
		.chunks(width)
		.enumerate()
		.map(|(n, chunk)| {
			chunk.iter().enumerate().try_fold(0u32, |acc, (i, &b)| match b {
				b'0' => Ok(acc << 1),
				b'1' => Ok((acc << 1) | 1),
				found => Err(CodecError::InvalidBit { index : n * width + i, found : found as char }),
			})
		})
		.collect()
}

/// Inverse of [`text_to_bits`].
pub fn bits_to_text(bits : &str, width : usize) -> Result<String, CodecError> {
	fields(bits, width)?
		.into_iter()
		.map(|code| char::from_u32(code).ok_or(CodecError::InvalidChar(code)))
		.collect()
}

/// Like [`bits_to_text`], but fields that are not characters decode to U+FFFD.
pub fn bits_to_text_lossy(bits : &str, width : usize) -> Result<String, CodecError> {
	Ok(fields(bits, width)?
		.into_iter()
		.map(|code| char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
		.collect())
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn encodes_big_endian_fields() {
		assert_eq!(text_to_bits("a", 8).unwrap(), "01100001");
		assert_eq!(text_to_bits("He", 8).unwrap(), "0100100001100101");
		assert_eq!(text_to_bits("a", 7).unwrap(), "1100001");
		assert_eq!(text_to_bits("", 8).unwrap(), "");
	}

	#[test]
	fn decodes() {
		assert_eq!(bits_to_text("0100100001101001", 8).unwrap(), "Hi");
	}

	#[test]
	fn wide_characters() {
		assert_eq!(
			text_to_bits("é", 7),
			Err(CodecError::CharTooWide { found : 'é', width : 7 })
		);
		let bits = text_to_bits("é€", 16).unwrap();
		assert_eq!(bits.len(), 32);
		assert_eq!(bits_to_text(&bits, 16).unwrap(), "é€");
	}

	#[test]
	fn misaligned() {
		assert_eq!(
			bits_to_text("0110000", 8),
			Err(CodecError::Misaligned { len : 7, width : 8 })
		);
	}

	#[test]
	fn invalid_input() {
		assert_eq!(
			bits_to_text("0110200101100001", 8),
			Err(CodecError::InvalidBit { index : 4, found : '2' })
		);
		assert_eq!(text_to_bits("a", 0), Err(CodecError::InvalidWidth(0)));
		assert_eq!(bits_to_text("1", 33), Err(CodecError::InvalidWidth(33)));
	}

	#[test]
	fn surrogate_fields() {
		let bits = format!("{:016b}", 0xD800u32);
		assert_eq!(bits_to_text(&bits, 16), Err(CodecError::InvalidChar(0xD800)));
		assert_eq!(bits_to_text_lossy(&bits, 16).unwrap(), "\u{FFFD}");
	}

	proptest! {
		#[test]
		fn ascii_round_trip(text in "[ -~]{0,64}") {
			let bits = text_to_bits(&text, DEFAULT_WIDTH).unwrap();
			prop_assert_eq!(bits.len(), text.len() * DEFAULT_WIDTH);
			prop_assert_eq!(bits_to_text(&bits, DEFAULT_WIDTH).unwrap(), text);
		}
	}
}
