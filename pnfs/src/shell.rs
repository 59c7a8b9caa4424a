//! The interactive command loop.

use pnfs_core::node::NODE_ROOT;
use pnfs_core::path::absolute_path;
use pnfs_core::superblock::Superblock;
use utils::prompt::prompt;

use crate::commands;

/// Shell state: the mounted filesystem and the current working directory.
pub struct Shell {
	pub prog: String,
	pub sb: Superblock,
	pub cwd: pnfs_core::node::NodeId,
}

/// Runs the interactive shell until the user quits or standard input reaches EOF.
pub fn run(prog: &str, sb: Superblock) {
	let mut shell = Shell {
		prog: prog.to_owned(),
		sb,
		cwd: NODE_ROOT,
	};

	loop {
		let cwd_path = absolute_path(&shell.sb, shell.cwd);
		let line = match prompt(Some(&format!("{}:{}$ ", shell.prog, cwd_path))) {
			Some(line) => line,
			None => break,
		};
		let line = line.trim();
		if line.is_empty() {
			continue;
		}
		if !commands::execute(&mut shell, line) {
			break;
		}
	}
}
