use std::io::{self, BufRead};

use encoding_rs::UTF_8;
use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;

use super::{RejectReason, body_rejection, title_rejection};

const PAGE_OPEN: &str = "<page>";
const PAGE_CLOSE: &str = "</page>";

/// A record that could not be parsed. The record is skipped and the run goes on.
#[derive(Debug, Error)]
pub enum RecordError {
	#[error("malformed page XML: {0}")]
	Xml(#[from] quick_xml::Error),

	#[error("page has no title")]
	MissingTitle,
}

/// Title and article body of one dump page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
	pub title: String,
	pub text: String,
}

impl Page {
	/// Parses one `<page>…</page>` block.
	///
	/// # Notes
	/// - Only `page/title` and the first `page/revision/text` are kept.
	/// - Entities are unescaped, so markup arrives in its wiki form.
	pub fn parse(block: &str) -> Result<Self, RecordError> {
		let mut reader = Reader::from_str(block);
		let mut path: Vec<Vec<u8>> = Vec::new();
		let mut title: Option<String> = None;
		let mut text = String::new();
		let mut text_done = false;

		loop {
			match reader.read_event()? {
				Event::Start(e) => path.push(e.name().as_ref().to_vec()),
				Event::End(_) => {
					if is_text_path(&path) {
						text_done = true;
					}
					path.pop();
				}
				Event::Text(t) => {
					let value = t.unescape()?;
					push_field(&path, &value, &mut title, &mut text, text_done);
				}
				Event::CData(c) => {
					let raw = c.into_inner();
					let value = String::from_utf8_lossy(&raw);
					push_field(&path, &value, &mut title, &mut text, text_done);
				}
				Event::Eof => break,
				_ => {}
			}
		}

		let title = title.ok_or(RecordError::MissingTitle)?;
		Ok(Self { title, text })
	}

	/// Returns why this page must not be counted, if anything.
	pub fn rejection(&self, min_body_length: usize) -> Option<RejectReason> {
		title_rejection(&self.title).or_else(|| body_rejection(&self.text, min_body_length))
	}
}

fn is_title_path(path: &[Vec<u8>]) -> bool {
	matches!(path, [page, title] if page == b"page" && title == b"title")
}

fn is_text_path(path: &[Vec<u8>]) -> bool {
	matches!(path, [page, revision, text]
		if page == b"page" && revision == b"revision" && text == b"text")
}

fn push_field(path: &[Vec<u8>], value: &str, title: &mut Option<String>, text: &mut String, text_done: bool) {
	if is_title_path(path) {
		title.get_or_insert_with(String::new).push_str(value);
	} else if is_text_path(path) && !text_done {
		text.push_str(value);
	}
}

/// Splits a line-oriented XML dump into `<page>` blocks.
///
/// A block starts at the line containing `<page>` and ends at the line
/// containing `</page>`; its lines are joined with `'\n'`. Lines outside a
/// block are ignored, and an unterminated block at end of input is dropped.
///
/// Lines are decoded as UTF-8 with invalid sequences replaced by U+FFFD, so a
/// stray byte only degrades the record that contains it.
///
/// # Errors
/// Yields the underlying `io::Error` when a line cannot be read; the caller
/// must stop the run.
pub struct DumpReader<R> {
	reader: R,
	line: Vec<u8>,
}

impl<R: BufRead> DumpReader<R> {
	/// Wraps a buffered reader positioned at the start of the dump.
	pub fn new(reader: R) -> Self {
		Self { reader, line: Vec::new() }
	}
}

impl<R: BufRead> Iterator for DumpReader<R> {
	type Item = io::Result<String>;

	fn next(&mut self) -> Option<Self::Item> {
		let mut block: Option<String> = None;

		loop {
			self.line.clear();
			match self.reader.read_until(b'\n', &mut self.line) {
				Ok(0) => {
					if block.is_some() {
						log::warn!("dump ended inside a <page> block; dropping it");
					}
					return None;
				}
				Ok(_) => {}
				Err(e) => return Some(Err(e)),
			}

			let (decoded, _) = UTF_8.decode_without_bom_handling(&self.line);
			let line = decoded.trim_end_matches(['\n', '\r']);
			if block.is_none() && line.contains(PAGE_OPEN) {
				block = Some(String::new());
			}

			if let Some(current) = block.as_mut() {
				if !current.is_empty() {
					current.push('\n');
				}
				current.push_str(line);

				if line.contains(PAGE_CLOSE) {
					return block.map(Ok);
				}
			}
		}
	}
}
