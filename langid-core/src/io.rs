use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8, UTF_16LE};
use tempfile::NamedTempFile;

/// Byte order mark written in front of UTF-16LE profile files.
const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];

/// Decodes a profile file's bytes.
///
/// - A BOM selects UTF-8, UTF-16LE or UTF-16BE
/// - Without a BOM, a zero second byte means UTF-16LE, anything else UTF-8
pub(crate) fn decode_profile_bytes(bytes: &[u8]) -> String {
	if Encoding::for_bom(bytes).is_none() && bytes.len() >= 2 && bytes[0] != 0 && bytes[1] == 0 {
		let (text, _) = UTF_16LE.decode_without_bom_handling(bytes);
		return text.into_owned();
	}
	let (text, _, _) = UTF_8.decode(bytes);
	text.into_owned()
}

/// Encodes text as UTF-16LE with a BOM.
pub(crate) fn encode_utf16le(text: &str) -> Vec<u8> {
	let mut bytes = Vec::with_capacity(2 + text.len() * 2);
	bytes.extend_from_slice(&UTF16LE_BOM);
	for unit in text.encode_utf16() {
		bytes.extend_from_slice(&unit.to_le_bytes());
	}
	bytes
}

/// Reads a corpus article as text.
///
/// Honors a BOM when present and replaces invalid UTF-8 sequences instead of
/// failing.
pub(crate) fn read_text_lossy<P: AsRef<Path>>(path: P) -> io::Result<String> {
	let bytes = fs::read(path)?;
	let (text, _, _) = UTF_8.decode(&bytes);
	Ok(text.into_owned())
}

/// Writes `bytes` to `path` through a temporary file in the same directory,
/// so readers only ever see the previous or the new content.
pub(crate) fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<()> {
	let path = path.as_ref();
	let parent = match path.parent() {
		Some(p) if !p.as_os_str().is_empty() => p,
		_ => Path::new("."),
	};
	fs::create_dir_all(parent)?;

	let mut temp_file = NamedTempFile::new_in(parent)?;
	temp_file.write_all(bytes)?;
	temp_file.flush()?;
	temp_file.persist(path)?;
	Ok(())
}

fn missing_stem(path: &Path) -> io::Error {
	io::Error::new(io::ErrorKind::InvalidInput, format!("{} has no file stem", path.display()))
}

/// The file next to `path` sharing its stem, with `extension`
/// (`profiles/en.json` + `"bin"` gives `profiles/en.bin`).
pub(crate) fn sibling_path<P: AsRef<Path>>(path: P, extension: &str) -> io::Result<PathBuf> {
	let path = path.as_ref();
	if path.file_stem().is_none() {
		return Err(missing_stem(path));
	}
	Ok(path.with_extension(extension))
}

/// Language code carried by a profile file name: its stem.
pub(crate) fn language_code<P: AsRef<Path>>(path: P) -> io::Result<String> {
	let path = path.as_ref();
	path.file_stem()
		.map(|stem| stem.to_string_lossy().into_owned())
		.ok_or_else(|| missing_stem(path))
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub(crate) fn normalize_folder<P: AsRef<Path>>(input: P) -> PathBuf {
	let input = input.as_ref();
	if input == Path::new(".") || input == Path::new("./") {
		std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		input.to_path_buf()
	}
}

/// Lists the files directly inside `dir`, optionally filtered by extension.
///
/// Returns full paths sorted by name.
pub(crate) fn list_files<P: AsRef<Path>>(dir: P, extension: Option<&str>) -> io::Result<Vec<PathBuf>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if !path.is_file() {
			continue;
		}
		match extension {
			Some(ext) if path.extension() != Some(std::ffi::OsStr::new(ext)) => continue,
			_ => files.push(path),
		}
	}

	files.sort();
	Ok(files)
}

/// Lists the subdirectories directly inside `dir`, sorted by name.
pub(crate) fn list_dirs<P: AsRef<Path>>(dir: P) -> io::Result<Vec<PathBuf>> {
	let mut dirs = Vec::new();
	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_dir() {
			dirs.push(path);
		}
	}
	dirs.sort();
	Ok(dirs)
}
