//! Core library for PNFS: a small, self-contained on-disk filesystem held in a fixed-size block
//! device and (de)serialized to a single host image file.

pub mod block_chain;
pub mod block_device;
pub mod dir;
pub mod file_data;
pub mod node;
pub mod path;
pub mod superblock;

pub use block_device::{BlockDevice, BlockId, BLOCK_COUNT, BLOCK_SIZE};
pub use node::{Node, NodeId, NodeType, NODE_INVALID, NODE_ROOT};
pub use superblock::{FsError, Superblock, PNFS_MAGIC};
