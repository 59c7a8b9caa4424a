//! Directory contents: a directory's data is simply a flat array of fixed-size directory
//! entries, read and written through the same engine as file data.

use std::io;

use crate::block_chain::remove_blocks;
use crate::file_data::{read_data, write_data};
use crate::node::{Node, NodeId, NODE_INVALID};

/// The on-disk size of one directory entry, in bytes.
pub const DIRENTRY_SIZE: usize = 64;
/// The maximum length of a path component's name, not counting the NUL terminator implied by
/// zero-padding.
pub const NAME_MAX: usize = DIRENTRY_SIZE - 2;

/// One directory entry: a child node id paired with the name it's known by in this directory.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawDirEntry {
	pub id: NodeId,
	pub name: [u8; NAME_MAX],
}

const _: () = assert!(core::mem::size_of::<RawDirEntry>() == DIRENTRY_SIZE);

impl RawDirEntry {
	/// Builds an entry for `id` named `name`, truncating silently if `name` is longer than
	/// [`NAME_MAX`].
	pub fn new(id: NodeId, name: &str) -> Self {
		let mut raw = [0u8; NAME_MAX];
		let bytes = name.as_bytes();
		let n = bytes.len().min(NAME_MAX);
		raw[..n].copy_from_slice(&bytes[..n]);
		Self { id, name: raw }
	}

	/// Returns this entry's name, stopping at the first NUL byte.
	pub fn name(&self) -> String {
		let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
		String::from_utf8_lossy(&self.name[..end]).into_owned()
	}

	fn from_bytes(bytes: &[u8]) -> Self {
		let mut raw = RawDirEntry { id: NODE_INVALID, name: [0; NAME_MAX] };
		utils::util::reinterpret_mut(&mut raw).copy_from_slice(bytes);
		raw
	}

	fn write_to(&self, bytes: &mut [u8]) {
		bytes.copy_from_slice(utils::util::reinterpret(self));
	}
}

/// Lists the `(child id, name)` pairs held directly in `dir`.
pub fn directory_entries(sb: &crate::superblock::Superblock, dir: &Node) -> Vec<(NodeId, String)> {
	let count = dir.size() as usize / DIRENTRY_SIZE;
	let mut out = Vec::with_capacity(count);
	let mut buf = [0u8; DIRENTRY_SIZE];
	for i in 0..count {
		read_data(sb, dir, (i * DIRENTRY_SIZE) as u32, &mut buf);
		let entry = RawDirEntry::from_bytes(&buf);
		out.push((entry.id, entry.name()));
	}
	out
}

/// Looks up `name` directly inside `dir`.
pub fn find_entry(sb: &crate::superblock::Superblock, dir: &Node, name: &str) -> Option<NodeId> {
	directory_entries(sb, dir).into_iter().find(|(_, n)| n == name).map(|(id, _)| id)
}

/// Appends a `(id, name)` entry to `dir`.
pub fn insert_dir_entry(
	sb: &mut crate::superblock::Superblock,
	dir: &mut Node,
	id: NodeId,
	name: &str,
) -> io::Result<()> {
	let entry = RawDirEntry::new(id, name);
	let mut buf = [0u8; DIRENTRY_SIZE];
	entry.write_to(&mut buf);
	let offset = dir.size() as u32;
	write_data(sb, dir, offset, &buf)?;
	Ok(())
}

/// Removes the entry named `name` from `dir`, if present, compacting the entry array by moving
/// the last entry into the freed slot.
///
/// Returns the removed child's node id, or `None` if no such entry existed.
pub fn remove_dir_entry(sb: &mut crate::superblock::Superblock, dir: &mut Node, name: &str) -> Option<NodeId> {
	let entries = directory_entries(sb, dir);
	let index = entries.iter().position(|(_, n)| n == name)?;
	let removed_id = entries[index].0;
	let last = entries.len() - 1;

	if index != last {
		let (last_id, last_name) = &entries[last];
		let entry = RawDirEntry::new(*last_id, last_name);
		let mut buf = [0u8; DIRENTRY_SIZE];
		entry.write_to(&mut buf);
		write_data(sb, dir, (index * DIRENTRY_SIZE) as u32, &buf).ok()?;
	}

	// Shrink and persist the size ourselves: `remove_blocks` early-returns without touching
	// `size` whenever no block crosses out of the new range, which is the common case (a
	// directory with room to spare in its current block). Still call it afterwards so a removal
	// that does cross a block boundary reclaims the trailing block.
	let new_size = (last * DIRENTRY_SIZE) as u16;
	dir.raw.size = new_size;
	sb.save_node(dir);
	remove_blocks(sb, dir, new_size);
	Some(removed_id)
}
