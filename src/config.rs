//! Configuration Management
//!
//! Sources, later ones winning: built-in defaults, the user config
//! (`<config dir>/crc_transfer/config.toml`), `config.toml` in the working
//! directory, and `CRC_TRANSFER_*` environment variables.
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat, Source, Value};
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

use crate::codec;
use crate::noise::{self, Corruption};

/// Configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
	/// Generator polynomial as a bit string
	pub divisor : String,
	/// Plaintext sent by the demonstration
	pub message : String,
	/// Per-bit probability of transmission noise
	pub probability : f64,
	/// What noise does to a bit it hits
	pub policy : Corruption,
	/// Seed for the noise generator, random when unset
	pub seed : Option<u64>,
	/// Serial port to transmit over, in-memory loopback when unset
	pub port : Option<String>,
	/// Serial port baud rate
	pub baud_rate : u32,
	/// Bits per character
	pub width : usize,
	/// Log level
	pub log_level : LevelFilter,
}

impl Default for Config {
	fn default() -> Config {
		Config {
			divisor : "1011".to_string(),
			message : "Hello World!".to_string(),
			probability : noise::DEFAULT_PROBABILITY,
			policy : Corruption::Randomize,
			seed : None,
			port : None,
			baud_rate : 115_200,
			width : codec::DEFAULT_WIDTH,
			log_level : if cfg!(debug_assertions) { LevelFilter::DEBUG } else { LevelFilter::INFO },
		}
	}
}

impl Config {
	/// Loads the layered configuration. Also returns the problems found on the
	/// way, since this runs before logging is set up.
	pub fn load() -> (Config, Vec<String>) {
		let mut settings = ::config::Config::builder();

		// user config
		if let Some(mut path) = dirs::config_dir() {
			path.push("crc_transfer");
			path.push("config.toml");
			settings = settings.add_source(File::from(path).required(false));
		}

		// project config
		settings = settings.add_source(File::new("config.toml", FileFormat::Toml).required(false));

		// env config
		settings = settings.add_source(Environment::with_prefix("crc_transfer"));

		Config::from_sources(settings)
	}

	fn from_sources(settings : ConfigBuilder<DefaultState>) -> (Config, Vec<String>) {
		let mut c = Config::default();
		let mut warnings = Vec::new();
		match settings.build() {
			Ok(settings) => match settings.collect() {
				Ok(values) => {
					for (k, v) in values.iter() {
						if let Err(w) = c.set_value(k, v) {
							warnings.push(w);
						}
					}
				},
				Err(e) => warnings.push(format!("error parsing config {e:?}")),
			},
			Err(e) => warnings.push(format!("error reading config {e:?}")),
		}
		(c, warnings)
	}

	fn set_value(&mut self, name : &str, value : &Value) -> Result<(), String> {
		match name {
			"divisor" => self.divisor = value.to_string(),
			"message" => self.message = value.to_string(),
			"probability" => self.probability = config_parse(name, value)?,
			"policy" => self.policy = config_parse(name, value)?,
			"seed" => self.seed = Some(config_parse(name, value)?),
			"port" => self.port = Some(value.to_string()),
			"baud_rate" => self.baud_rate = config_parse(name, value)?,
			"width" => self.width = config_parse(name, value)?,
			"log_level" => self.log_level = config_parse(name, value)?,
			// CRC_TRANSFER_LOG, read by the logging setup
			"log" => {},
			_ => return Err(format!("unknown config key {name}")),
		}
		Ok(())
	}
}

fn config_parse<T : FromStr>(name : &str, v : &Value) -> Result<T, String> {
	v.clone()
		.into_string()
		.ok()
		.and_then(|s| s.parse::<T>().ok())
		.ok_or_else(|| format!("invalid config value for {name}: {v:?}"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use ::config::Map;

	#[test]
	fn defaults() {
		let c = Config::default();
		assert_eq!(c.divisor, "1011");
		assert_eq!(c.message, "Hello World!");
		assert_eq!(c.probability, 0.01);
		assert_eq!(c.width, 8);
		assert_eq!(c.seed, None);
	}

	#[test]
	fn set_values() {
		let mut c = Config::default();
		c.set_value("divisor", &Value::from("10011")).unwrap();
		c.set_value("probability", &Value::from(0.5)).unwrap();
		c.set_value("policy", &Value::from("flip")).unwrap();
		c.set_value("seed", &Value::from(42i64)).unwrap();
		c.set_value("log_level", &Value::from("warn")).unwrap();
		assert_eq!(c.divisor, "10011");
		assert_eq!(c.probability, 0.5);
		assert_eq!(c.policy, Corruption::Flip);
		assert_eq!(c.seed, Some(42));
		assert_eq!(c.log_level, LevelFilter::WARN);
	}

	#[test]
	fn invalid_value_keeps_default() {
		let mut c = Config::default();
		assert!(c.set_value("baud_rate", &Value::from("fast")).is_err());
		assert!(c.set_value("seed", &Value::from("none")).is_err());
		assert_eq!(c.baud_rate, 115_200);
		assert_eq!(c.seed, None);
	}

	fn env(vars : &[(&str, &str)]) -> Environment {
		let map : Map<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
		Environment::with_prefix("crc_transfer").source(Some(map))
	}

	#[test]
	fn environment_overrides_file() {
		let settings = ::config::Config::builder()
			.add_source(File::from_str("divisor = \"10011\"\nbaud_rate = 9600\nwidth = 7", FileFormat::Toml))
			.add_source(env(&[("CRC_TRANSFER_DIVISOR", "1011"), ("CRC_TRANSFER_SEED", "3")]));
		let (c, warnings) = Config::from_sources(settings);
		assert!(warnings.is_empty(), "{:?}", warnings);
		assert_eq!(c.divisor, "1011");
		assert_eq!(c.baud_rate, 9600);
		assert_eq!(c.width, 7);
		assert_eq!(c.seed, Some(3));
	}

	#[test]
	fn reports_bad_values_and_skips_log_filter() {
		let settings = ::config::Config::builder()
			.add_source(env(&[
				("CRC_TRANSFER_BAUD_RATE", "fast"),
				("CRC_TRANSFER_LOG", "crc_transfer=trace"),
				("CRC_TRANSFER_COLOR", "blue"),
			]));
		let (c, warnings) = Config::from_sources(settings);
		assert_eq!(c.baud_rate, 115_200);
		assert_eq!(warnings.len(), 2, "{:?}", warnings);
		assert!(warnings.iter().any(|w| w.contains("baud_rate")));
		assert!(warnings.iter().any(|w| w.contains("unknown config key color")));
	}
}
