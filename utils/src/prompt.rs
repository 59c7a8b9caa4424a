//! This module implements prompting.

use std::io;
use std::io::BufRead;
use std::io::Write;

// TODO Add line edition
/// Shows a prompt and reads a line from standard input. Returns `None` on EOF.
///
/// `prompt` is the prompt's text. If `None`, the function uses the default text.
pub fn prompt(prompt: Option<&str>) -> Option<String> {
	let prompt = prompt.unwrap_or("> ");

	print!("{}", prompt);
	let _ = io::stdout().flush();

	io::stdin().lock().lines().next()?.ok()
}
