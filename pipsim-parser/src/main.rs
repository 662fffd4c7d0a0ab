mod parser;

use std::path::PathBuf;
use anyhow::{anyhow, Result};
use parser::DatasetParser;
use pipsim_common::get_ini;

fn main() -> Result<()> {
	tracing_subscriber::fmt::init();
	let ini = get_ini("config/pipsim-parser.ini")?;
	let section = "data";
	let get_value = |key| -> Result<String> {
		match ini.get(section, key) {
			Some(value) => Ok(value),
			None => Err(anyhow!("Missing value \"{key}\" in configuration file"))
		}
	};
	let input_directory = PathBuf::from(get_value("input_directory")?);
	let output_directory = PathBuf::from(get_value("output_directory")?);
	let aggregate_h1_string = get_value("aggregate_h1")?;
	let aggregate_h1 = aggregate_h1_string.parse::<bool>()?;
	let min_valid_minutes_string = get_value("min_valid_minutes")?;
	let min_valid_minutes = min_valid_minutes_string.parse::<u32>()?;
	let parser = DatasetParser::new(input_directory, output_directory, aggregate_h1, min_valid_minutes);
	parser.run()
}
