use crate::parser::primitive_parser::ByteCursor;
use crate::MidiError;

pub const HEADER_TAG: [u8; 4] = *b"MThd";

/// Length of the header fields: format, track count and division
pub const HEADER_LENGTH: u32 = 6;

/// High bit of the division selects SMPTE timing
const SMPTE_FLAG: u16 = 0x8000;

/// Decoded `MThd` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiHeader {
    /// 0, 1 or 2, passed through without interpretation
    pub format: u16,
    pub track_count: u16,
    /// Ticks per quarter note, always > 0
    pub division: u16,
}

/// Decode the header chunk.
///
/// The declared chunk length is honored: bytes past the 6 known fields are skipped.
pub fn parse_header(cursor: &mut ByteCursor<'_>) -> Result<MidiHeader, MidiError> {
    let tag = cursor.read_tag().map_err(|_| {
        MidiError::InvalidHeader("file too short to hold a header chunk".to_string())
    })?;
    if tag != HEADER_TAG {
        return Err(MidiError::InvalidHeader(format!(
            "expected MThd tag, found {tag:02X?}"
        )));
    }

    let length = cursor.read_u32_be()?;
    if length < HEADER_LENGTH {
        return Err(MidiError::InvalidHeader(format!(
            "header chunk length {length} is shorter than {HEADER_LENGTH}"
        )));
    }
    let mut chunk = cursor.sub_cursor(length as usize)?;
    let format = chunk.read_u16_be()?;
    let track_count = chunk.read_u16_be()?;
    let division = chunk.read_u16_be()?;
    if length > HEADER_LENGTH {
        log::debug!("Ignoring {} extra header bytes", length - HEADER_LENGTH);
    }

    if division & SMPTE_FLAG != 0 {
        return Err(MidiError::UnsupportedTimeFormat(division));
    }
    if division == 0 {
        return Err(MidiError::InvalidHeader(
            "division must be greater than zero".to_string(),
        ));
    }

    log::debug!("MIDI format: {format}, tracks: {track_count}, division: {division}");
    Ok(MidiHeader {
        format,
        track_count,
        division,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(tag: &[u8; 4], length: u32, fields: &[u16], extra: &[u8]) -> Vec<u8> {
        let mut data = tag.to_vec();
        data.extend_from_slice(&length.to_be_bytes());
        for field in fields {
            data.extend_from_slice(&field.to_be_bytes());
        }
        data.extend_from_slice(extra);
        data
    }

    fn parse(data: &[u8]) -> Result<MidiHeader, MidiError> {
        parse_header(&mut ByteCursor::new(data))
    }

    #[test]
    fn test_parse_header() {
        let data = header_bytes(b"MThd", 6, &[1, 3, 480], &[]);
        let header = parse(&data).unwrap();
        assert_eq!(
            header,
            MidiHeader {
                format: 1,
                track_count: 3,
                division: 480
            }
        );
    }

    #[test]
    fn test_header_extension_is_skipped() {
        let data = header_bytes(b"MThd", 8, &[0, 1, 96], &[0xDE, 0xAD, b'M']);
        let mut cursor = ByteCursor::new(&data);
        let header = parse_header(&mut cursor).unwrap();
        assert_eq!(header.division, 96);
        assert_eq!(cursor.offset(), 16);
        assert_eq!(cursor.read_u8(), Ok(b'M'));
    }

    #[test]
    fn test_corrupted_tag_is_invalid_header() {
        for tag in [b"MThD", b"MTrk", b"RIFF", b"\0\0\0\0"] {
            let data = header_bytes(tag, 6, &[0, 1, 480], &[]);
            assert!(
                matches!(parse(&data), Err(MidiError::InvalidHeader(_))),
                "tag {tag:?}"
            );
        }
        assert!(matches!(parse(b"MT"), Err(MidiError::InvalidHeader(_))));
    }

    #[test]
    fn test_short_header_length_is_invalid() {
        let data = header_bytes(b"MThd", 4, &[0, 1, 480], &[]);
        assert!(matches!(parse(&data), Err(MidiError::InvalidHeader(_))));
    }

    #[test]
    fn test_truncated_header_fields() {
        let data = header_bytes(b"MThd", 6, &[0, 1], &[]);
        assert!(matches!(
            parse(&data),
            Err(MidiError::UnexpectedEndOfStream { offset: 8, .. })
        ));
    }

    #[test]
    fn test_smpte_division_is_unsupported() {
        // -25 fps, 40 ticks per frame
        let data = header_bytes(b"MThd", 6, &[0, 1, 0xE728], &[]);
        assert_eq!(parse(&data), Err(MidiError::UnsupportedTimeFormat(0xE728)));
        for division in [1u16, 96, 480, 0x7FFF] {
            let data = header_bytes(b"MThd", 6, &[0, 1, division], &[]);
            assert_eq!(parse(&data).unwrap().division, division);
        }
    }

    #[test]
    fn test_zero_division_is_rejected() {
        let data = header_bytes(b"MThd", 6, &[0, 1, 0], &[]);
        assert!(matches!(parse(&data), Err(MidiError::InvalidHeader(_))));
    }
}
