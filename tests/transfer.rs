use rand::rngs::StdRng;
use rand::SeedableRng;

use crc_transfer::codec::{bits_to_text, text_to_bits, DEFAULT_WIDTH};
use crc_transfer::noise::{Corruption, NoiseModel};
use crc_transfer::{compute_crc, verify_crc, Loopback, SerialTransfer, TransferStatus, CRC};

fn send_text(text : &str, divisor : &str, noise : NoiseModel, seed : u64) -> (String, crc_transfer::Received) {
	let crc = CRC::new(divisor).unwrap();
	let message = text_to_bits(text, DEFAULT_WIDTH).unwrap();
	let frame = crc.frame(&message).unwrap();
	let transmitted = noise.perturb(&frame, &mut StdRng::seed_from_u64(seed));

	let mut transfer = SerialTransfer::new(Loopback::new(), crc);
	transfer.send(&transmitted).unwrap();
	let received = transfer.available().unwrap().unwrap();
	(frame, received)
}

#[test]
fn hello_world_clean_channel() {
	let noise = NoiseModel::new(0.0, Corruption::Randomize).unwrap();
	let (frame, received) = send_text("Hello World!", "1011", noise, 0);
	assert_eq!(&frame[frame.len() - 3..], "110");
	assert_eq!(received.bits, frame);
	assert!(received.intact);
	assert_eq!(bits_to_text(received.message_bits(), DEFAULT_WIDTH).unwrap(), "Hello World!");
}

#[test]
fn fully_flipped_frame_is_detected() {
	let noise = NoiseModel::new(1.0, Corruption::Flip).unwrap();
	let (frame, received) = send_text("Hello World!", "1011", noise, 0);
	assert_ne!(received.bits, frame);
	assert!(!received.intact);
}

#[test]
fn reported_integrity_matches_engine() {
	let noise = NoiseModel::new(0.05, Corruption::Flip).unwrap();
	for seed in 0..32 {
		let (frame, received) = send_text("CRC over a noisy link", "10011", noise, seed);
		assert_eq!(received.intact, verify_crc(&received.bits, "10011").unwrap());
		if received.bits == frame {
			assert!(received.intact);
		}
	}
}

#[test]
fn integer_and_string_divisors_agree() {
	let message = text_to_bits("m", DEFAULT_WIDTH).unwrap();
	assert_eq!(compute_crc(&message, "10011").unwrap(), compute_crc(&message, 0b10011u64).unwrap());
	assert_eq!(compute_crc(&message, "10011").unwrap(), "1001");
}

#[test]
fn several_packets_in_one_read() {
	let crc = CRC::new("1011").unwrap();
	let mut transfer = SerialTransfer::new(Loopback::new(), crc.clone());
	for text in ["a", "bc", "def"] {
		let frame = crc.frame(&text_to_bits(text, DEFAULT_WIDTH).unwrap()).unwrap();
		transfer.send(&frame).unwrap();
	}
	let mut texts = Vec::new();
	while let Some(received) = transfer.available().unwrap() {
		assert!(received.intact);
		texts.push(bits_to_text(received.message_bits(), DEFAULT_WIDTH).unwrap());
	}
	assert_eq!(texts, ["a", "bc", "def"]);
	assert_eq!(transfer.status(), TransferStatus::NoData);
}
