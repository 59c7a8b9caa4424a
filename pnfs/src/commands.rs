//! Shell command implementations.

use std::fs;
use std::io::{self, BufRead, Read, Write};

use pnfs_core::dir::directory_entries;
use pnfs_core::file_data::{read_data, write_data};
use pnfs_core::node::{NodeType, NODE_ROOT};
use pnfs_core::path::{absolute_path, resolve, resolve_parent};
use pnfs_core::superblock::Superblock;

use crate::shell::Shell;

/// Parses and runs one command line. Returns `false` if the shell should exit.
pub fn execute(shell: &mut Shell, line: &str) -> bool {
	let mut words = line.split_whitespace();
	let cmd = words.next().unwrap_or("");
	let args: Vec<&str> = words.collect();

	let result = match cmd {
		"cat" => cat(shell, &args),
		"cd" => cd(shell, &args),
		"copy" => copy(shell, &args),
		"create" => create(shell, &args),
		"createImage" => create_image(shell, &args),
		"restoreImage" => restore_image(shell, &args),
		"format" => {
			shell.sb = Superblock::format();
			shell.cwd = NODE_ROOT;
			Ok(())
		}
		"ls" => ls(shell),
		"mkdir" => mkdir(shell, &args),
		"pwd" => {
			println!("{}", absolute_path(&shell.sb, shell.cwd));
			Ok(())
		}
		"rm" => rm(shell, &args),
		"exit" | "quit" => return false,
		_ => Err(format!("{}: command not found", cmd)),
	};

	if let Err(msg) = result {
		eprintln!("{}: {}", cmd, msg);
	}
	true
}

fn cat(shell: &mut Shell, args: &[&str]) -> Result<(), String> {
	let path = args.first().ok_or("missing path")?;
	let id = resolve(&shell.sb, shell.cwd, path).map_err(|e| e.to_string())?;
	let node = shell.sb.get_node(id);
	if node.node_type() != NodeType::File {
		return Err("not a file".to_string());
	}
	let mut buf = vec![0u8; node.size() as usize];
	read_data(&shell.sb, &node, 0, &mut buf);
	io::stdout().write_all(&buf).map_err(|e| e.to_string())?;
	Ok(())
}

fn cd(shell: &mut Shell, args: &[&str]) -> Result<(), String> {
	let path = args.first().ok_or("missing path")?;
	let id = resolve(&shell.sb, shell.cwd, path).map_err(|e| e.to_string())?;
	let node = shell.sb.get_node(id);
	if node.node_type() != NodeType::Directory {
		return Err("not a directory".to_string());
	}
	shell.cwd = id;
	Ok(())
}

/// Prints the current directory's entries: id, name, type name, size.
fn ls(shell: &mut Shell) -> Result<(), String> {
	let dir = shell.sb.get_node(shell.cwd);
	let mut entries = directory_entries(&shell.sb, &dir);
	entries.sort_by(|a, b| a.1.cmp(&b.1));
	for (child_id, name) in entries {
		let child = shell.sb.get_node(child_id);
		let kind = match child.node_type() {
			NodeType::Directory => "DIRECTORY",
			NodeType::File => "FILE",
			_ => "INVALID",
		};
		println!("{}\t{}\t{}\t{}", child_id, name, kind, child.size());
	}
	Ok(())
}

fn mkdir(shell: &mut Shell, args: &[&str]) -> Result<(), String> {
	let path = args.first().ok_or("missing path")?;
	let (parent_id, name) = resolve_parent(&shell.sb, shell.cwd, path).map_err(|e| e.to_string())?;
	let mut parent = shell.sb.get_node(parent_id);
	shell.sb.add_node(&mut parent, name, NodeType::Directory).map_err(|e| e.to_string())?;
	Ok(())
}

/// Creates an empty file, then reads lines from standard input until EOF, appending each line
/// and its trailing newline to the new file's content.
fn create(shell: &mut Shell, args: &[&str]) -> Result<(), String> {
	let path = args.first().ok_or("missing path")?;
	let (parent_id, name) = resolve_parent(&shell.sb, shell.cwd, path).map_err(|e| e.to_string())?;
	let mut parent = shell.sb.get_node(parent_id);
	let id = shell.sb.add_node(&mut parent, name, NodeType::File).map_err(|e| e.to_string())?;

	let mut file = shell.sb.get_node(id);
	for line in io::stdin().lines() {
		let mut bytes = line.map_err(|e| e.to_string())?.into_bytes();
		bytes.push(b'\n');
		let offset = file.size() as u32;
		write_data(&mut shell.sb, &mut file, offset, &bytes).map_err(|e| e.to_string())?;
	}
	Ok(())
}

fn rm(shell: &mut Shell, args: &[&str]) -> Result<(), String> {
	let path = args.first().ok_or("missing path")?;
	let (parent_id, name) = resolve_parent(&shell.sb, shell.cwd, path).map_err(|e| e.to_string())?;
	let mut parent = shell.sb.get_node(parent_id);
	shell.sb.remove_node(&mut parent, name).map_err(|e| e.to_string())?;
	Ok(())
}

/// Copies an existing file within the image to a new path.
fn copy(shell: &mut Shell, args: &[&str]) -> Result<(), String> {
	let [src, dst] = args else {
		return Err("usage: copy <src> <dst>".to_string());
	};
	let src_id = resolve(&shell.sb, shell.cwd, src).map_err(|e| e.to_string())?;
	let src_node = shell.sb.get_node(src_id);
	if src_node.node_type() != NodeType::File {
		return Err("source is not a file".to_string());
	}
	let mut data = vec![0u8; src_node.size() as usize];
	read_data(&shell.sb, &src_node, 0, &mut data);

	let (parent_id, name) = resolve_parent(&shell.sb, shell.cwd, dst).map_err(|e| e.to_string())?;
	let mut parent = shell.sb.get_node(parent_id);
	let dst_id = shell.sb.add_node(&mut parent, name, NodeType::File).map_err(|e| e.to_string())?;
	let mut dst_node = shell.sb.get_node(dst_id);
	write_data(&mut shell.sb, &mut dst_node, 0, &data).map_err(|e| e.to_string())?;
	Ok(())
}

/// Dumps the whole device image to a file on the host filesystem.
fn create_image(shell: &mut Shell, args: &[&str]) -> Result<(), String> {
	let path = args.first().ok_or("missing path")?;
	fs::write(path, shell.sb.save_image()).map_err(|e| e.to_string())
}

/// Replaces the mounted filesystem with one loaded from a host image file. Reformats in place
/// if the host file's magic doesn't match.
fn restore_image(shell: &mut Shell, args: &[&str]) -> Result<(), String> {
	let path = args.first().ok_or("missing path")?;
	let mut file = fs::File::open(path).map_err(|e| e.to_string())?;
	let mut bytes = Vec::new();
	file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;
	shell.sb = Superblock::load_image(&bytes).ok_or("image size does not match the device size")?;
	shell.cwd = NODE_ROOT;
	Ok(())
}
