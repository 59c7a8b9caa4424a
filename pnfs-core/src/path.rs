//! Path resolution: turning a slash-separated path string into a node id, relative to a current
//! working directory.

use crate::dir::find_entry;
use crate::node::{Node, NodeId, NodeType, NODE_ROOT};
use crate::superblock::{FsError, Superblock};

/// Splits a path into its non-empty `/`-separated components.
///
/// A path beginning with `/` is absolute; callers should start resolution from the root in that
/// case rather than the current working directory.
pub fn components(path: &str) -> Vec<&str> {
	path.split('/').filter(|c| !c.is_empty()).collect()
}

/// Tells whether `path` is rooted, i.e. begins with `/`.
pub fn is_absolute(path: &str) -> bool {
	path.starts_with('/')
}

/// Resolves `path` to a node id, starting from `cwd` for relative paths and from the root for
/// absolute ones.
///
/// Fails with [`FsError::NotFound`] if any component doesn't exist, or [`FsError::WrongNodeType`]
/// if a non-final component isn't a directory.
pub fn resolve(sb: &Superblock, cwd: NodeId, path: &str) -> Result<NodeId, FsError> {
	let mut current = if is_absolute(path) { NODE_ROOT } else { cwd };
	for component in components(path) {
		let dir = sb.get_node(current);
		if dir.node_type() != NodeType::Directory {
			return Err(FsError::WrongNodeType);
		}
		current = find_entry(sb, &dir, component).ok_or(FsError::NotFound)?;
	}
	Ok(current)
}

/// Resolves `path` to its parent directory's node id and its final component's name.
///
/// `path` must have at least one component.
pub fn resolve_parent<'a>(sb: &Superblock, cwd: NodeId, path: &'a str) -> Result<(NodeId, &'a str), FsError> {
	let parts = components(path);
	let (name, parent_parts) = parts.split_last().ok_or(FsError::NotFound)?;
	let parent_path = parent_parts.join("/");
	let parent = if is_absolute(path) {
		resolve(sb, NODE_ROOT, &parent_path)?
	} else {
		resolve(sb, cwd, &parent_path)?
	};
	Ok((parent, name))
}

/// Builds the absolute path of `target`, walking `..` links up to the root.
///
/// Returns `/` for the root itself. Detached subtrees (unreachable from the root through `..`
/// chains) resolve as far as they can and stop; this can only happen on a corrupted image, since
/// every live directory is reachable from the root by construction.
pub fn absolute_path(sb: &Superblock, target: NodeId) -> String {
	let mut parts = Vec::new();
	let mut current = target;
	loop {
		if current == NODE_ROOT {
			break;
		}
		let dir: Node = sb.get_node(current);
		if dir.node_type() != NodeType::Directory {
			break;
		}
		let parent = match find_entry(sb, &dir, "..") {
			Some(id) => id,
			None => break,
		};
		let parent_dir = sb.get_node(parent);
		let name = crate::dir::directory_entries(sb, &parent_dir)
			.into_iter()
			.find(|(id, n)| *id == current && n != "." && n != "..")
			.map(|(_, n)| n);
		match name {
			Some(n) => parts.push(n),
			None => break,
		}
		if parent == current {
			break;
		}
		current = parent;
	}
	if parts.is_empty() {
		"/".to_string()
	} else {
		parts.reverse();
		format!("/{}", parts.join("/"))
	}
}
