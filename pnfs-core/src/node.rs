//! Node records: files and directories.
//!
//! A node's on-disk shape (`RawNode`) is separated from its in-memory handle (`Node`), per the
//! "pointer-arithmetic persistence hack" design note: the original C packs a node record by
//! copying past a vtable pointer it never persists. Here, `RawNode` holds only what is written to
//! disk, and `Node` pairs it with the node's id.

use crate::block_device::BlockId;

/// The node identity type.
pub type NodeId = u16;

/// The reserved, never-valid node id.
pub const NODE_INVALID: NodeId = 0;
/// The id of the filesystem root directory.
pub const NODE_ROOT: NodeId = 1;

/// The number of node slots in the node table (blocks 1..16, 8 nodes per block).
pub const NODE_COUNT: usize = 128;

/// The on-disk size of one node record, in bytes.
pub const NODE_RECORD_SIZE: usize = 64;

/// The number of inline data-block ids a node carries, derived from the 64-byte node budget:
/// `id`, `type`, `size`, `blockCount` and `next` are 2 bytes each (10 bytes), leaving 54 bytes,
/// i.e. 27 `u16` slots, for the inline block vector.
pub const NODE_BLOCKCOUNT: usize = (NODE_RECORD_SIZE - 2 * 5) / 2;

/// A node's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum NodeType {
	/// The node's slot is empty and may be allocated.
	Invalid = 0,
	/// A regular file.
	File = 1,
	/// A directory.
	Directory = 2,
	/// A reserved slot which must never be allocated (slot 0, [`NODE_INVALID`]).
	NeverValid = 3,
}

impl NodeType {
	/// Decodes a raw on-disk type value, treating anything unrecognized as `Invalid`: a
	/// corrupt or never-written slot is never mistaken for a live node.
	pub fn from_raw(v: u16) -> Self {
		match v {
			1 => NodeType::File,
			2 => NodeType::Directory,
			3 => NodeType::NeverValid,
			_ => NodeType::Invalid,
		}
	}
}

/// The on-disk layout of a node record: exactly [`NODE_RECORD_SIZE`] bytes.
///
/// Every field is a `u16`, so `#[repr(C)]` already produces the packed, padding-free layout the
/// format requires without needing `#[repr(C, packed)]` (which would make every field access an
/// unaligned reference).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawNode {
	pub id: NodeId,
	pub kind: u16,
	pub size: u16,
	pub block_count: u16,
	pub data_blocks: [BlockId; NODE_BLOCKCOUNT],
	pub next: BlockId,
}

const _: () = assert!(core::mem::size_of::<RawNode>() == NODE_RECORD_SIZE);

impl Default for RawNode {
	fn default() -> Self {
		Self {
			id: NODE_INVALID,
			kind: NodeType::Invalid as u16,
			size: 0,
			block_count: 0,
			data_blocks: [0; NODE_BLOCKCOUNT],
			next: 0,
		}
	}
}

impl RawNode {
	/// Reinterprets the given 64-byte slot as a node record.
	pub fn from_bytes(bytes: &[u8]) -> Self {
		debug_assert_eq!(bytes.len(), NODE_RECORD_SIZE);
		let mut raw = RawNode::default();
		let dst = utils::util::reinterpret_mut(&mut raw);
		dst.copy_from_slice(bytes);
		raw
	}

	/// Writes this record's bytes into the given 64-byte slot.
	pub fn write_to(&self, bytes: &mut [u8]) {
		debug_assert_eq!(bytes.len(), NODE_RECORD_SIZE);
		bytes.copy_from_slice(utils::util::reinterpret(self));
	}
}

/// An in-memory handle to a node: a detached value copy of its on-disk slot.
///
/// Per the ownership model, the on-disk state is the single source of truth; this handle is a
/// cache. Mutations are only visible to other handles, or persisted across a reload, once
/// [`crate::superblock::Superblock::save_node`] is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
	pub id: NodeId,
	pub raw: RawNode,
}

impl Node {
	/// Wraps a raw record loaded from slot `id`.
	pub fn new(id: NodeId, raw: RawNode) -> Self {
		Self { id, raw }
	}

	/// Returns the node's type.
	pub fn node_type(&self) -> NodeType {
		NodeType::from_raw(self.raw.kind)
	}

	/// Sets the node's type.
	pub fn set_node_type(&mut self, t: NodeType) {
		self.raw.kind = t as u16;
	}

	/// Returns the node's logical byte size.
	pub fn size(&self) -> u16 {
		self.raw.size
	}

	/// Returns the number of data blocks currently owned by this node (inline + chained).
	pub fn block_count(&self) -> u16 {
		self.raw.block_count
	}

	/// Returns the block id of the first block-block, or `0` if none is chained.
	pub fn next(&self) -> BlockId {
		self.raw.next
	}

	/// Tells whether this node's slot holds a live file or directory.
	pub fn is_valid(&self) -> bool {
		matches!(self.node_type(), NodeType::File | NodeType::Directory)
	}

	/// Resets this node to an empty, invalid slot.
	pub fn clear(&mut self) {
		let id = self.id;
		self.raw = RawNode::default();
		self.raw.id = id;
	}
}
