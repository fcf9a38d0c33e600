//! Transmission noise: each bit is hit independently with a fixed probability.

use rand::Rng;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_PROBABILITY : f64 = 0.01;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NoiseError {
	#[error("probability must be within [0, 1], got {0}")]
	InvalidProbability(f64),
}

/// What happens to a bit that is hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Corruption {
	/// Replaced by a fair random bit, so it keeps its value half of the time.
	#[default]
	Randomize,
	/// Inverted.
	Flip,
}

impl std::str::FromStr for Corruption {
	type Err = String;

	fn from_str(s : &str) -> Result<Corruption, String> {
		match s.to_ascii_lowercase().as_str() {
			"randomize" => Ok(Corruption::Randomize),
			"flip" => Ok(Corruption::Flip),
			other => Err(format!("unknown corruption policy {:?}", other)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseModel {
	probability : f64,
	policy : Corruption,
}

impl Default for NoiseModel {
	fn default() -> NoiseModel {
		NoiseModel {
			probability : DEFAULT_PROBABILITY,
			policy : Corruption::Randomize,
		}
	}
}

impl NoiseModel {
	pub fn new(probability : f64, policy : Corruption) -> Result<NoiseModel, NoiseError> {
		if !(0.0..=1.0).contains(&probability) {
			return Err(NoiseError::InvalidProbability(probability));
		}
		Ok(NoiseModel { probability, policy })
	}

	pub fn probability(&self) -> f64 {
		self.probability
	}

	pub fn policy(&self) -> Corruption {
		self.policy
	}

	/// Returns a possibly corrupted copy of `bits`. Characters other than
	/// `'0'` and `'1'` are passed through.
	pub fn perturb<R : Rng + ?Sized>(&self, bits : &str, rng : &mut R) -> String {
		let mut altered = 0usize;
		let out : String = bits
			.chars()
			.map(|c| {
				if c != '0' && c != '1' {
					return c;
				}
				if !rng.gen_bool(self.probability) {
					return c;
				}
				let hit = match self.policy {
					Corruption::Flip => if c == '0' { '1' } else { '0' },
					Corruption::Randomize => if rng.gen::<bool>() { '1' } else { '0' },
				};
				if hit != c {
					altered += 1;
				}
				hit
			})
			.collect();
		debug!(len = bits.len(), altered, policy = ?self.policy, "perturbed bits");
		out
	}
}

/// [`NoiseModel::perturb`] with the default 1% randomizing model.
pub fn perturb<R : Rng + ?Sized>(bits : &str, rng : &mut R) -> String {
	NoiseModel::default().perturb(bits, rng)
}
