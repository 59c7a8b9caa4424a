//! The superblock: owns the block device, the free-block bitmap, and the node-level operations
//! (allocation, directory linking) built on top of it.

use crate::block_chain::remove_blocks;
use crate::block_device::{BlockDevice, BlockId, BLOCK_SIZE};
use crate::dir::{directory_entries, find_entry, insert_dir_entry, remove_dir_entry};
use crate::node::{Node, NodeId, NodeType, NODE_COUNT, NODE_INVALID, NODE_RECORD_SIZE, NODE_ROOT};

/// Magic number stamped into block 0, identifying a formatted image: the bytes `P`, `N`, `F`,
/// `S` in little-endian order.
pub const PNFS_MAGIC: u32 = 0x5346_4e50;

/// The first block of the node table.
const NODE_TABLE_FIRST: BlockId = 1;
/// The last block of the node table (8 nodes per block, 128 nodes total).
const NODE_TABLE_LAST: BlockId = 16;
/// Node records per node-table block.
const NODES_PER_BLOCK: usize = BLOCK_SIZE / NODE_RECORD_SIZE;

/// An error returned by a node-mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
	/// A name already exists in the directory.
	AlreadyExists,
	/// No entry by that name exists in the directory.
	NotFound,
	/// The device has no free node slots left.
	NoFreeNodes,
	/// The device has no free blocks left.
	NoFreeBlocks,
	/// Attempted an operation that requires a directory on a file, or vice versa.
	WrongNodeType,
	/// Attempted to remove the root directory or a `.`/`..` self-entry.
	Protected,
}

impl std::fmt::Display for FsError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let msg = match self {
			FsError::AlreadyExists => "an entry with that name already exists",
			FsError::NotFound => "no such entry",
			FsError::NoFreeNodes => "no free node slots left",
			FsError::NoFreeBlocks => "no free blocks left",
			FsError::WrongNodeType => "wrong node type for this operation",
			FsError::Protected => "cannot remove the root directory or a self-entry",
		};
		f.write_str(msg)
	}
}

impl std::error::Error for FsError {}

/// The filesystem superblock: block 0's magic and free-block bitmap, plus the block device they
/// describe.
pub struct Superblock {
	device: BlockDevice,
	bitmap: [u8; 32],
}

impl Superblock {
	/// Formats a fresh device: a root directory containing only `.` and `..`.
	pub fn format() -> Self {
		let mut sb = Self {
			device: BlockDevice::new(),
			bitmap: [0; 32],
		};
		sb.device.clear();
		sb.bitmap = [0; 32];
		sb.persist_header();
		sb.set_block_used(0);
		for b in NODE_TABLE_FIRST..=NODE_TABLE_LAST {
			sb.set_block_used(b);
		}

		let mut never_valid = sb.get_node(NODE_INVALID);
		never_valid.set_node_type(NodeType::NeverValid);
		sb.save_node(&never_valid);

		let mut root = sb.get_node(NODE_ROOT);
		root.set_node_type(NodeType::Directory);
		sb.save_node(&root);
		insert_dir_entry(&mut sb, &mut root, NODE_ROOT, ".").expect("fresh device has free blocks");
		insert_dir_entry(&mut sb, &mut root, NODE_ROOT, "..").expect("fresh device has free blocks");

		sb
	}

	/// Loads a superblock from a raw device image. Fails only if `image` isn't exactly one
	/// device's worth of bytes; an image whose magic doesn't match is reformatted in place,
	/// mirroring what a corrupted or foreign image would get on mount.
	pub fn load_image(image: &[u8]) -> Option<Self> {
		let mut device = BlockDevice::new();
		if !device.load_from_image(image) {
			return None;
		}
		let mut sb = Self { device, bitmap: [0; 32] };
		if !sb.read_header() {
			return Some(Self::format());
		}
		Some(sb)
	}

	/// Dumps the current device state to a raw image.
	pub fn save_image(&self) -> Vec<u8> {
		self.device.save_to_image()
	}

	pub fn device(&self) -> &BlockDevice {
		&self.device
	}

	pub fn device_mut(&mut self) -> &mut BlockDevice {
		&mut self.device
	}

	/// The number of blocks not currently marked used in the bitmap.
	pub fn free_block_count(&self) -> usize {
		self.bitmap.iter().map(|b| b.count_zeros() as usize).sum()
	}

	fn persist_header(&mut self) {
		let mut block = [0u8; BLOCK_SIZE];
		block[0..4].copy_from_slice(&PNFS_MAGIC.to_le_bytes());
		block[4..36].copy_from_slice(&self.bitmap);
		self.device.write(0, &block);
	}

	fn read_header(&mut self) -> bool {
		let block = self.device.read(0);
		let magic = u32::from_le_bytes(block[0..4].try_into().unwrap());
		self.bitmap.copy_from_slice(&block[4..36]);
		magic == PNFS_MAGIC
	}

	/// Reads the node record at slot `id`. The returned handle's id always matches `id`,
	/// regardless of what's stored in the slot's bytes.
	pub fn get_node(&self, id: NodeId) -> Node {
		let block_id = NODE_TABLE_FIRST + (id as usize / NODES_PER_BLOCK) as BlockId;
		let block = self.device.read(block_id);
		let slot = (id as usize % NODES_PER_BLOCK) * NODE_RECORD_SIZE;
		let mut raw = crate::node::RawNode::from_bytes(&block[slot..slot + NODE_RECORD_SIZE]);
		raw.id = id;
		Node::new(id, raw)
	}

	/// Persists `node` to its slot.
	pub fn save_node(&mut self, node: &Node) {
		let block_id = NODE_TABLE_FIRST + (node.id as usize / NODES_PER_BLOCK) as BlockId;
		let mut block = self.device.read(block_id);
		let slot = (node.id as usize % NODES_PER_BLOCK) * NODE_RECORD_SIZE;
		node.raw.write_to(&mut block[slot..slot + NODE_RECORD_SIZE]);
		self.device.write(block_id, &block);
	}

	/// Finds the first node slot whose type is `Invalid`. Never returns [`NODE_INVALID`], since
	/// that slot's type is `NeverValid`, not `Invalid`.
	pub fn get_free_node_id(&self) -> Option<NodeId> {
		(0..NODE_COUNT as NodeId).find(|&id| self.get_node(id).node_type() == NodeType::Invalid)
	}

	/// Finds the first block id not marked used in the bitmap.
	///
	/// The bitmap has room for 256 blocks but the device only has [`crate::block_device::BLOCK_COUNT`];
	/// the trailing bits are never valid block ids and must not be returned.
	pub fn get_free_block_id(&self) -> Option<BlockId> {
		for (i, byte) in self.bitmap.iter().enumerate() {
			if *byte != 0xff {
				let j = (0..8).find(|j| byte & (1 << j) == 0).unwrap();
				let id = i * 8 + j;
				if id >= crate::block_device::BLOCK_COUNT {
					return None;
				}
				return Some(id as BlockId);
			}
		}
		None
	}

	/// Marks a block id used in the bitmap and persists the superblock.
	pub fn set_block_used(&mut self, id: BlockId) {
		self.bitmap[id as usize / 8] |= 1 << (id as usize % 8);
		self.persist_header();
	}

	/// Marks a block id free in the bitmap and persists the superblock.
	pub fn set_block_free(&mut self, id: BlockId) {
		self.bitmap[id as usize / 8] &= !(1 << (id as usize % 8));
		self.persist_header();
	}

	/// Creates a new node of type `kind` named `name` inside `parent`.
	///
	/// `parent`'s in-memory handle is updated (and persisted) to reflect the new directory
	/// entry's storage.
	pub fn add_node(&mut self, parent: &mut Node, name: &str, kind: NodeType) -> Result<NodeId, FsError> {
		if !matches!(kind, NodeType::File | NodeType::Directory) {
			return Err(FsError::WrongNodeType);
		}
		if parent.node_type() != NodeType::Directory {
			return Err(FsError::WrongNodeType);
		}
		if find_entry(self, parent, name).is_some() {
			return Err(FsError::AlreadyExists);
		}
		let id = self.get_free_node_id().ok_or(FsError::NoFreeNodes)?;
		let mut node = self.get_node(id);
		node.set_node_type(kind);
		self.save_node(&node);

		let rollback = |sb: &mut Self| {
			let mut slot = sb.get_node(id);
			remove_blocks(sb, &mut slot, 0);
			slot.clear();
			sb.save_node(&slot);
		};

		if kind == NodeType::Directory {
			let dots = insert_dir_entry(self, &mut node, id, ".").and_then(|_| insert_dir_entry(self, &mut node, parent.id, ".."));
			if dots.is_err() {
				rollback(self);
				return Err(FsError::NoFreeBlocks);
			}
		}

		if insert_dir_entry(self, parent, id, name).is_err() {
			rollback(self);
			return Err(FsError::NoFreeBlocks);
		}
		Ok(id)
	}

	/// Removes the entry named `name` from `parent`, freeing the child node's blocks and slot.
	///
	/// A directory is removed recursively: every entry other than `.` and `..` is removed first.
	/// Rejects removing the root, or a `.`/`..` self-entry.
	pub fn remove_node(&mut self, parent: &mut Node, name: &str) -> Result<(), FsError> {
		if name == "." || name == ".." {
			return Err(FsError::Protected);
		}
		let id = find_entry(self, parent, name).ok_or(FsError::NotFound)?;
		if id == NODE_ROOT {
			return Err(FsError::Protected);
		}
		let mut child = self.get_node(id);
		if child.node_type() == NodeType::Directory {
			for (_, child_name) in directory_entries(self, &child) {
				if child_name == "." || child_name == ".." {
					continue;
				}
				self.remove_node(&mut child, &child_name)?;
			}
		}

		remove_blocks(self, &mut child, 0);
		child.clear();
		self.save_node(&child);
		remove_dir_entry(self, parent, name);
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn format_marks_header_and_node_table_used() {
		let sb = Superblock::format();
		assert!(sb.bitmap[0] & 1 != 0); // block 0
		for b in NODE_TABLE_FIRST..=NODE_TABLE_LAST {
			assert!(sb.bitmap[b as usize / 8] & (1 << (b as usize % 8)) != 0);
		}
	}

	#[test]
	fn root_is_a_directory_with_dot_entries() {
		let sb = Superblock::format();
		let root = sb.get_node(NODE_ROOT);
		assert_eq!(root.node_type(), NodeType::Directory);
		assert_eq!(directory_entries(&sb, &root).len(), 2);
	}

	#[test]
	fn image_roundtrip_preserves_magic_and_bitmap() {
		let sb = Superblock::format();
		let image = sb.save_image();
		let restored = Superblock::load_image(&image).unwrap();
		assert_eq!(restored.bitmap, sb.bitmap);
	}

	#[test]
	fn foreign_image_is_reformatted() {
		let image = vec![0u8; crate::block_device::BLOCK_COUNT * BLOCK_SIZE];
		let sb = Superblock::load_image(&image).unwrap();
		let root = sb.get_node(NODE_ROOT);
		assert_eq!(root.node_type(), NodeType::Directory);
	}

	#[test]
	fn add_then_remove_node_round_trips_bitmap() {
		let mut sb = Superblock::format();
		let mut root = sb.get_node(NODE_ROOT);
		let free_before = sb.free_block_count();

		let id = sb.add_node(&mut root, "file.txt", NodeType::File).unwrap();
		assert_eq!(find_entry(&sb, &root, "file.txt"), Some(id));

		sb.remove_node(&mut root, "file.txt").unwrap();
		assert_eq!(find_entry(&sb, &root, "file.txt"), None);
		assert_eq!(sb.free_block_count(), free_before);
	}

	#[test]
	fn cannot_add_duplicate_name() {
		let mut sb = Superblock::format();
		let mut root = sb.get_node(NODE_ROOT);
		sb.add_node(&mut root, "dup", NodeType::File).unwrap();
		assert_eq!(sb.add_node(&mut root, "dup", NodeType::File), Err(FsError::AlreadyExists));
	}

	#[test]
	fn remove_directory_recurses_into_children() {
		let mut sb = Superblock::format();
		let mut root = sb.get_node(NODE_ROOT);
		let free_before = sb.free_block_count();
		sb.add_node(&mut root, "sub", NodeType::Directory).unwrap();
		let sub_id = find_entry(&sb, &root, "sub").unwrap();
		let mut sub = sb.get_node(sub_id);
		sb.add_node(&mut sub, "inner.txt", NodeType::File).unwrap();

		sb.remove_node(&mut root, "sub").unwrap();
		assert_eq!(find_entry(&sb, &root, "sub"), None);
		assert_eq!(sb.free_block_count(), free_before);
	}

	#[test]
	fn cannot_remove_root() {
		let mut sb = Superblock::format();
		let mut root = sb.get_node(NODE_ROOT);
		assert_eq!(sb.remove_node(&mut root, "."), Err(FsError::Protected));
		assert_eq!(sb.remove_node(&mut root, ".."), Err(FsError::Protected));
	}

	#[test]
	fn cannot_add_node_of_invalid_type() {
		let mut sb = Superblock::format();
		let mut root = sb.get_node(NODE_ROOT);
		assert_eq!(sb.add_node(&mut root, "x", NodeType::Invalid), Err(FsError::WrongNodeType));
	}
}
