//! The read/write engine: maps a node's logical byte range onto its data blocks, allocating new
//! blocks on demand as a write grows past the current end of file.

use std::io;

use crate::block_chain::{add_block, logical_to_physical};
use crate::block_device::BLOCK_SIZE;
use crate::node::Node;
use crate::superblock::Superblock;

/// Reads up to `buf.len()` bytes starting at `offset` into `buf`.
///
/// Returns the number of bytes actually read, which is less than `buf.len()` once `offset` nears
/// the node's size. Reads past the end of file return `0`. A logical block with no physical block
/// mapped to it (a "hole") stops the read short, returning the bytes read so far: a correctly
/// grown file never has holes before its end, so hitting one means the caller's size tracking is
/// wrong and continuing would hand back bytes that were never written.
pub fn read_data(sb: &Superblock, node: &Node, offset: u32, buf: &mut [u8]) -> usize {
	let size = node.raw.size as u32;
	if offset >= size {
		return 0;
	}
	let to_read = (size - offset).min(buf.len() as u32) as usize;
	let mut done = 0;
	let mut pos = offset as usize;
	while done < to_read {
		let v = pos / BLOCK_SIZE;
		let off_in_block = pos % BLOCK_SIZE;
		let chunk = (BLOCK_SIZE - off_in_block).min(to_read - done);
		let id = match logical_to_physical(sb, node, v) {
			Some(id) => id,
			None => break,
		};
		let block = sb.device().read(id);
		buf[done..done + chunk].copy_from_slice(&block[off_in_block..off_in_block + chunk]);
		done += chunk;
		pos += chunk;
	}
	done
}

/// Writes `data` at `offset`, allocating blocks as needed and growing the node's size to cover
/// the write if it extends past the current end of file.
///
/// Returns the number of bytes written, which is less than `data.len()` only if the device runs
/// out of free blocks partway through.
pub fn write_data(sb: &mut Superblock, node: &mut Node, offset: u32, data: &[u8]) -> io::Result<usize> {
	let mut pos = offset as usize;
	let mut done = 0;
	while done < data.len() {
		let v = pos / BLOCK_SIZE;
		let off_in_block = pos % BLOCK_SIZE;
		let chunk = (BLOCK_SIZE - off_in_block).min(data.len() - done);

		let id = match logical_to_physical(sb, node, v) {
			Some(id) => id,
			None => {
				while node.raw.block_count as usize <= v {
					if add_block(sb, node).is_none() {
						node.raw.size = node.raw.size.max((offset as usize + done) as u16);
						sb.save_node(node);
						return Err(io::Error::new(io::ErrorKind::OutOfMemory, "no free blocks left on device"));
					}
				}
				logical_to_physical(sb, node, v).expect("block was just allocated")
			}
		};

		let mut block = sb.device().read(id);
		block[off_in_block..off_in_block + chunk].copy_from_slice(&data[done..done + chunk]);
		sb.device_mut().write(id, &block);

		done += chunk;
		pos += chunk;
	}
	let new_size = (offset as usize + done).max(node.raw.size as usize);
	node.raw.size = new_size as u16;
	sb.save_node(node);
	Ok(done)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::node::{NodeType, NODE_BLOCKCOUNT, NODE_ROOT};

	fn fresh_file(sb: &mut Superblock) -> Node {
		let mut node = sb.get_node(sb.get_free_node_id().unwrap());
		node.clear();
		node.set_node_type(NodeType::File);
		sb.save_node(&node);
		node
	}

	#[test]
	fn write_then_read_small() {
		let mut sb = Superblock::format();
		let mut node = fresh_file(&mut sb);
		let written = write_data(&mut sb, &mut node, 0, b"hello world").unwrap();
		assert_eq!(written, 11);
		assert_eq!(node.size(), 11);

		let mut buf = [0u8; 11];
		let read = read_data(&sb, &node, 0, &mut buf);
		assert_eq!(read, 11);
		assert_eq!(&buf, b"hello world");
	}

	#[test]
	fn read_past_end_is_zero() {
		let mut sb = Superblock::format();
		let mut node = fresh_file(&mut sb);
		write_data(&mut sb, &mut node, 0, b"abc").unwrap();
		let mut buf = [0xffu8; 10];
		let read = read_data(&sb, &node, 1, &mut buf);
		assert_eq!(read, 2);
		assert_eq!(&buf[..2], b"bc");
	}

	#[test]
	fn write_spans_multiple_blocks_and_chains() {
		let mut sb = Superblock::format();
		let mut node = fresh_file(&mut sb);
		let data = vec![0xabu8; (NODE_BLOCKCOUNT + 2) * BLOCK_SIZE + 10];
		let written = write_data(&mut sb, &mut node, 0, &data).unwrap();
		assert_eq!(written, data.len());
		assert_eq!(node.size() as usize, data.len());
		assert_ne!(node.raw.next, 0);

		let mut readback = vec![0u8; data.len()];
		let read = read_data(&sb, &node, 0, &mut readback);
		assert_eq!(read, data.len());
		assert_eq!(readback, data);
	}

	#[test]
	fn overwrite_does_not_shrink_size() {
		let mut sb = Superblock::format();
		let mut node = fresh_file(&mut sb);
		write_data(&mut sb, &mut node, 0, b"0123456789").unwrap();
		write_data(&mut sb, &mut node, 2, b"XX").unwrap();
		assert_eq!(node.size(), 10);
		let mut buf = [0u8; 10];
		read_data(&sb, &node, 0, &mut buf);
		assert_eq!(&buf, b"01XX456789");
	}

	#[test]
	fn root_unaffected_by_unrelated_file_writes() {
		let mut sb = Superblock::format();
		let root_before = sb.get_node(NODE_ROOT);
		let mut node = fresh_file(&mut sb);
		write_data(&mut sb, &mut node, 0, b"x").unwrap();
		let root_after = sb.get_node(NODE_ROOT);
		assert_eq!(root_before.raw.data_blocks, root_after.raw.data_blocks);
	}
}
