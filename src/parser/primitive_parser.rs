use crate::MidiError;
use encoding_rs::WINDOWS_1252;
use nom::combinator::map;
use nom::{bytes, number, IResult, Parser};

/// MIDI never encodes a variable-length quantity on more than 4 bytes
pub const MAX_VARIABLE_LENGTH_BYTES: usize = 4;

/// Parse unsigned byte
pub fn parse_u8(i: &[u8]) -> IResult<&[u8], u8> {
    number::complete::be_u8(i)
}

/// Parse big-endian unsigned 16
pub fn parse_u16(i: &[u8]) -> IResult<&[u8], u16> {
    number::complete::be_u16(i)
}

/// Parse big-endian unsigned 24 (tempo payload)
pub fn parse_u24(i: &[u8]) -> IResult<&[u8], u32> {
    number::complete::be_u24(i)
}

/// Parse big-endian unsigned 32
pub fn parse_u32(i: &[u8]) -> IResult<&[u8], u32> {
    number::complete::be_u32(i)
}

/// Parse a 4 bytes chunk tag such as `MThd` or `MTrk`
pub fn parse_tag(i: &[u8]) -> IResult<&[u8], [u8; 4]> {
    map(bytes::complete::take(4usize), |tag: &[u8]| {
        [tag[0], tag[1], tag[2], tag[3]]
    })
    .parse(i)
}

/// Materialize a text meta event.
/// Falls back to Windows-1252 for legacy files that are not UTF-8.
pub fn make_string(i: &[u8]) -> String {
    match std::str::from_utf8(i) {
        Ok(s) => s.to_string(),
        Err(e) => {
            log::debug!("Text is not UTF-8 ({e}), decoding as {}", WINDOWS_1252.name());
            let (cow, _encoding_used, _had_errors) = WINDOWS_1252.decode(i);
            cow.into_owned()
        }
    }
}

/// Sequential reader over an in-memory buffer.
///
/// Every read advances the position by the number of bytes consumed.
/// Reads past the end fail with [`MidiError::UnexpectedEndOfStream`]
/// carrying the absolute offset in the file, even for sub cursors.
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
    // offset of `data[0]` within the whole file
    base: usize,
}

impl<'a> ByteCursor<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            base: 0,
        }
    }

    /// Position relative to the start of this cursor
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Absolute position within the file
    pub const fn offset(&self) -> usize {
        self.base + self.position
    }

    /// Absolute position just past the last byte of this cursor
    pub const fn end_offset(&self) -> usize {
        self.base + self.data.len()
    }

    pub const fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub const fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Run a nom parser on the remaining input and advance past what it consumed.
    fn apply<T, P>(&mut self, requested: usize, parser: P) -> Result<T, MidiError>
    where
        P: FnOnce(&'a [u8]) -> IResult<&'a [u8], T>,
    {
        let data = self.data;
        let input = &data[self.position..];
        match parser(input) {
            Ok((rest, value)) => {
                self.position += input.len() - rest.len();
                Ok(value)
            }
            Err(_) => Err(MidiError::UnexpectedEndOfStream {
                offset: self.offset(),
                requested,
            }),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, MidiError> {
        self.apply(1, parse_u8)
    }

    pub fn read_u16_be(&mut self) -> Result<u16, MidiError> {
        self.apply(2, parse_u16)
    }

    pub fn read_u24_be(&mut self) -> Result<u32, MidiError> {
        self.apply(3, parse_u24)
    }

    pub fn read_u32_be(&mut self) -> Result<u32, MidiError> {
        self.apply(4, parse_u32)
    }

    pub fn read_tag(&mut self) -> Result<[u8; 4], MidiError> {
        self.apply(4, parse_tag)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], MidiError> {
        self.apply(n, |i| bytes::complete::take(n)(i))
    }

    pub fn read_string(&mut self, n: usize) -> Result<String, MidiError> {
        self.read_bytes(n).map(make_string)
    }

    /// Skip `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<(), MidiError> {
        log::debug!("skip: {n}");
        self.read_bytes(n).map(|_| ())
    }

    /// Carve the next `len` bytes into their own cursor.
    /// Reads on the returned cursor can never go past those `len` bytes.
    pub fn sub_cursor(&mut self, len: usize) -> Result<ByteCursor<'a>, MidiError> {
        let base = self.offset();
        let data = self.read_bytes(len)?;
        Ok(ByteCursor {
            data,
            position: 0,
            base,
        })
    }

    /// Decode a MIDI variable-length quantity.
    /// 7 bits per byte, most significant first, high bit set on all bytes but the last.
    pub fn read_variable_length(&mut self) -> Result<u32, MidiError> {
        let start = self.offset();
        let mut value: u32 = 0;
        for _ in 0..MAX_VARIABLE_LENGTH_BYTES {
            let byte = self.read_u8()?;
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(MidiError::MalformedValue { offset: start })
    }
}
