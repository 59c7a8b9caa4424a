//! End-to-end scenarios exercising the public API the way a shell front-end would: format,
//! create, write, grow past the inline block budget, remove, and round-trip through an image.

use pnfs_core::block_device::BLOCK_SIZE;
use pnfs_core::dir::directory_entries;
use pnfs_core::file_data::{read_data, write_data};
use pnfs_core::node::{NodeType, NODE_BLOCKCOUNT, NODE_ROOT};
use pnfs_core::path::resolve;
use pnfs_core::superblock::Superblock;

#[test]
fn fresh_format_has_only_root() {
	let sb = Superblock::format();
	let root = sb.get_node(NODE_ROOT);
	assert_eq!(root.node_type(), NodeType::Directory);
	let entries = directory_entries(&sb, &root);
	assert_eq!(entries.len(), 2);
}

#[test]
fn mkdir_then_cd_resolves_subdirectory() {
	let mut sb = Superblock::format();
	let mut root = sb.get_node(NODE_ROOT);
	let docs_id = sb.add_node(&mut root, "docs", NodeType::Directory).unwrap();

	let resolved = resolve(&sb, NODE_ROOT, "docs").unwrap();
	assert_eq!(resolved, docs_id);

	let docs = sb.get_node(docs_id);
	let entries = directory_entries(&sb, &docs);
	assert_eq!(entries.len(), 2); // just . and ..
}

#[test]
fn create_write_and_read_back_a_file() {
	let mut sb = Superblock::format();
	let mut root = sb.get_node(NODE_ROOT);
	let id = sb.add_node(&mut root, "notes.txt", NodeType::File).unwrap();

	let mut file = sb.get_node(id);
	write_data(&mut sb, &mut file, 0, b"hello pnfs").unwrap();

	let file = sb.get_node(id);
	assert_eq!(file.size(), 10);
	let mut buf = [0u8; 10];
	read_data(&sb, &file, 0, &mut buf);
	assert_eq!(&buf, b"hello pnfs");
}

#[test]
fn large_file_grows_block_count_past_inline_budget() {
	let mut sb = Superblock::format();
	let mut root = sb.get_node(NODE_ROOT);
	let id = sb.add_node(&mut root, "big.bin", NodeType::File).unwrap();

	let mut file = sb.get_node(id);
	let payload = vec![0x5au8; 40_000];
	write_data(&mut sb, &mut file, 0, &payload).unwrap();

	let file = sb.get_node(id);
	assert_eq!(file.size() as usize, 40_000);
	let expected_blocks = utils::util::ceil_division(40_000, BLOCK_SIZE as u32) as usize;
	assert_eq!(file.block_count() as usize, expected_blocks);
	assert!(file.block_count() as usize > NODE_BLOCKCOUNT);

	let mut readback = vec![0u8; 40_000];
	read_data(&sb, &file, 0, &mut readback);
	assert_eq!(readback, payload);
}

#[test]
fn remove_then_re_add_keeps_bitmap_balanced() {
	let mut sb = Superblock::format();
	let mut root = sb.get_node(NODE_ROOT);
	let free_before = sb.free_block_count();

	let id = sb.add_node(&mut root, "scratch.bin", NodeType::File).unwrap();
	let mut scratch = sb.get_node(id);
	write_data(&mut sb, &mut scratch, 0, &vec![1u8; 30_000]).unwrap();

	sb.remove_node(&mut root, "scratch.bin").unwrap();
	assert_eq!(sb.free_block_count(), free_before);

	let id2 = sb.add_node(&mut root, "scratch.bin", NodeType::File).unwrap();
	let scratch2 = sb.get_node(id2);
	assert_eq!(scratch2.size(), 0);
}

#[test]
fn image_round_trip_preserves_tree_and_contents() {
	let mut sb = Superblock::format();
	let mut root = sb.get_node(NODE_ROOT);
	sb.add_node(&mut root, "docs", NodeType::Directory).unwrap();
	let file_id = sb.add_node(&mut root, "readme.txt", NodeType::File).unwrap();
	let mut file = sb.get_node(file_id);
	write_data(&mut sb, &mut file, 0, b"pnfs image round trip").unwrap();

	let image = sb.save_image();
	let restored = Superblock::load_image(&image).unwrap();

	let restored_root = restored.get_node(NODE_ROOT);
	let names: Vec<_> = directory_entries(&restored, &restored_root).into_iter().map(|(_, n)| n).collect();
	assert!(names.contains(&"docs".to_string()));
	assert!(names.contains(&"readme.txt".to_string()));

	let restored_file_id = resolve(&restored, NODE_ROOT, "readme.txt").unwrap();
	let restored_file = restored.get_node(restored_file_id);
	let mut buf = vec![0u8; restored_file.size() as usize];
	read_data(&restored, &restored_file, 0, &mut buf);
	assert_eq!(buf, b"pnfs image round trip");
}
