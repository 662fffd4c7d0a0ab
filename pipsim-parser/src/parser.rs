use std::fs;
use std::path::PathBuf;
use anyhow::{anyhow, bail, Context, Result};
use rayon::prelude::*;
use stopwatch::Stopwatch;
use pipsim_common::dataset::{get_archive_file_name, load_dataset, parse_dataset_file_name, write_dataset};
use pipsim_common::ohlc::TIME_FRAME_M1;

/*
Batch-converts raw dataset files into compressed archives. Every file in
the input directory whose name matches the canonical dataset form is
ingested, optionally aggregated to H1, and written to the output directory
as a .zrk archive. Files are independent, so they are processed in
parallel.
*/
pub struct DatasetParser {
	input_directory: PathBuf,
	output_directory: PathBuf,
	aggregate_h1: bool,
	min_valid_minutes: u32,
}

impl DatasetParser {
	pub fn new(input_directory: PathBuf, output_directory: PathBuf, aggregate_h1: bool, min_valid_minutes: u32) -> DatasetParser {
		DatasetParser {
			input_directory,
			output_directory,
			aggregate_h1,
			min_valid_minutes
		}
	}

	pub fn run(&self) -> Result<()> {
		let stopwatch = Stopwatch::start_new();
		let paths = self.get_dataset_paths()?;
		if paths.is_empty() {
			bail!("No dataset files found in \"{}\"", self.input_directory.display());
		}
		fs::create_dir_all(&self.output_directory)
			.with_context(|| anyhow!("Unable to create output directory \"{}\"", self.output_directory.display()))?;
		let results: Result<Vec<()>> = paths
			.par_iter()
			.map(|path| self.process_file(path))
			.collect();
		results?;
		println!("Processed {} dataset file(s) in {} ms", paths.len(), stopwatch.elapsed_ms());
		Ok(())
	}

	fn get_dataset_paths(&self) -> Result<Vec<PathBuf>> {
		let entries = fs::read_dir(&self.input_directory)
			.with_context(|| anyhow!("Unable to read input directory \"{}\"", self.input_directory.display()))?;
		let mut paths: Vec<PathBuf> = entries
			.filter_map(|x| x.ok())
			.map(|x| x.path())
			.filter(|x| x.is_file())
			.filter(|x| x.file_name()
				.and_then(|name| name.to_str())
				.and_then(parse_dataset_file_name)
				.is_some())
			.collect();
		paths.sort();
		Ok(paths)
	}

	fn process_file(&self, path: &PathBuf) -> Result<()> {
		let stopwatch = Stopwatch::start_new();
		let loaded = load_dataset(path)?;
		// Ingestion counters describe the raw file, not the aggregate
		let duplicates = loaded.duplicates;
		let out_of_range = loaded.out_of_range;
		let bad_lines = loaded.bad_lines;
		let set = if self.aggregate_h1 && loaded.time_frame == TIME_FRAME_M1 {
			loaded.aggregate_h1(self.min_valid_minutes)?
		} else {
			loaded
		};
		let stats = set.stats();
		let file_name = get_archive_file_name(&set.instrument.name, set.time_frame);
		let archive_path = self.output_directory.join(file_name);
		write_dataset(&archive_path, &set)?;
		println!(
			"Loaded {} of {} slots from \"{}\" ({} duplicates, {} out of range, {} bad lines, {} gaps, longest {}) and wrote \"{}\" in {} ms",
			stats.present,
			stats.total,
			path.display(),
			duplicates,
			out_of_range,
			bad_lines,
			stats.gaps,
			stats.longest_gap,
			archive_path.display(),
			stopwatch.elapsed_ms()
		);
		Ok(())
	}
}
