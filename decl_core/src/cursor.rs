//! Character cursors feeding the tokenizer.
//!
//! The tokenizer is written once against [`CharCursor`] and runs unchanged
//! over in-memory text ([`StrCursor`]) or a streamed file ([`ReaderCursor`]).

use std::io;
use std::io::BufRead;

/// Minimal forward-only view over a character sequence.
pub trait CharCursor {
	/// The character under the cursor, `None` at end of input.
	fn current(&self) -> Option<char>;
	/// Move past the current character. No-op at end of input.
	fn advance(&mut self);
	/// The character after [`current`](Self::current), if any.
	fn peek(&self) -> Option<char>;

	fn is_at_end(&self) -> bool {
		self.current().is_none()
	}
}

/// Cursor over a borrowed string slice.
#[derive(Debug, Clone)]
pub struct StrCursor<'a> {
	source: &'a str,
	offset: usize,
}

impl<'a> StrCursor<'a> {
	pub fn new(source: &'a str) -> Self {
		Self { source, offset: 0 }
	}

	/// Byte offset of the current character.
	pub fn offset(&self) -> usize {
		self.offset
	}

	fn remaining(&self) -> &'a str {
		&self.source[self.offset..]
	}
}

impl CharCursor for StrCursor<'_> {
	fn current(&self) -> Option<char> {
		self.remaining().chars().next()
	}

	fn advance(&mut self) {
		if let Some(ch) = self.current() {
			self.offset += ch.len_utf8();
		}
	}

	fn peek(&self) -> Option<char> {
		self.remaining().chars().nth(1)
	}
}

/// Cursor over a buffered byte stream, decoding UTF-8 as it goes.
///
/// Malformed sequences decode to `U+FFFD`. The first I/O error terminates the
/// stream; it can be retrieved with [`take_error`](Self::take_error).
#[derive(Debug)]
pub struct ReaderCursor<R> {
	reader: R,
	current: Option<char>,
	next: Option<char>,
	error: Option<io::Error>,
}

impl<R: BufRead> ReaderCursor<R> {
	pub fn new(reader: R) -> Self {
		let mut cursor = Self {
			reader,
			current: None,
			next: None,
			error: None,
		};
		cursor.current = cursor.read_char();
		cursor.next = cursor.read_char();
		cursor
	}

	/// The I/O error that ended the stream early, if one occurred.
	pub fn take_error(&mut self) -> Option<io::Error> {
		self.error.take()
	}

	fn peek_byte(&mut self) -> Option<u8> {
		if self.error.is_some() {
			return None;
		}

		loop {
			match self.reader.fill_buf() {
				Ok(buffer) => return buffer.first().copied(),
				Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
				Err(error) => {
					self.error = Some(error);
					return None;
				}
			}
		}
	}

	fn read_byte(&mut self) -> Option<u8> {
		let byte = self.peek_byte()?;
		self.reader.consume(1);
		Some(byte)
	}

	fn read_char(&mut self) -> Option<char> {
		let first = self.read_byte()?;
		let width = match first {
			0x00..=0x7f => return Some(char::from(first)),
			0xc2..=0xdf => 2,
			0xe0..=0xef => 3,
			0xf0..=0xf4 => 4,
			_ => return Some(char::REPLACEMENT_CHARACTER),
		};

		let mut bytes = [first, 0, 0, 0];
		for slot in bytes.iter_mut().take(width).skip(1) {
			match self.peek_byte() {
				Some(byte) if byte & 0xc0 == 0x80 => {
					self.reader.consume(1);
					*slot = byte;
				}
				_ => return Some(char::REPLACEMENT_CHARACTER),
			}
		}

		Some(
			std::str::from_utf8(&bytes[..width])
				.ok()
				.and_then(|decoded| decoded.chars().next())
				.unwrap_or(char::REPLACEMENT_CHARACTER),
		)
	}
}

impl<R: BufRead> CharCursor for ReaderCursor<R> {
	fn current(&self) -> Option<char> {
		self.current
	}

	fn advance(&mut self) {
		if self.current.is_none() {
			return;
		}

		self.current = self.next.take();
		if self.current.is_some() {
			self.next = self.read_char();
		}
	}

	fn peek(&self) -> Option<char> {
		self.next
	}
}
