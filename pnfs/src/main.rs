//! `pnfs` is an interactive shell for creating and exploring a PNFS filesystem image held
//! entirely in memory.

mod commands;
mod shell;

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::exit;

use pnfs_core::superblock::Superblock;

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
	/// The name of the current program used in command line.
	prog: String,

	/// If true, print command line help.
	help: bool,

	/// The path to a host image file to load on startup, if any.
	image_path: Option<PathBuf>,
}

fn parse_args() -> Args {
	let mut args: Args = Default::default();
	let mut iter = env::args();

	args.prog = iter.next().unwrap_or("pnfs".to_owned());

	for arg in iter {
		match arg.as_str() {
			"-h" | "--help" => args.help = true,
			_ => args.image_path = Some(PathBuf::from(arg)),
		}
	}

	args
}

/// Prints command help.
fn print_help(prog: &str) {
	println!();
	println!("Usage:");
	println!(" {} [options] [image]", prog);
	println!();
	println!("Starts an interactive shell on a PNFS filesystem.");
	println!("If `image` is given, the filesystem is loaded from that host file; otherwise a");
	println!("freshly formatted, empty filesystem is used.");
	println!();
	println!("Options:");
	println!(" -h, --help\tPrints help.");
}

fn main() {
	let args = parse_args();

	if args.help {
		print_help(&args.prog);
		exit(0);
	}

	let sb = match &args.image_path {
		Some(path) => match fs::read(path) {
			Ok(bytes) => Superblock::load_image(&bytes).unwrap_or_else(|| {
				eprintln!(
					"{}: {}: image size does not match the device size",
					args.prog,
					path.display()
				);
				exit(1);
			}),
			Err(e) => {
				eprintln!("{}: {}: {}", args.prog, path.display(), e);
				exit(1);
			}
		},
		None => Superblock::format(),
	};

	shell::run(&args.prog, sb);
}
