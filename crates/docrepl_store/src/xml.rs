//! XML well-formedness checking.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Checks that `content` is a well-formed XML document.
///
/// A well-formed document has exactly one root element, matching start and
/// end tags, and no character data outside the root element other than
/// whitespace. Entity and character references in text and attribute
/// values must resolve to one of the predefined entities or a valid
/// character.
///
/// # Errors
///
/// Returns a human-readable description of the first problem found.
pub fn check_well_formed(content: &[u8]) -> Result<(), String> {
    let mut reader = Reader::from_reader(content);
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut roots = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            format!("{e} at byte {}", reader.buffer_position())
        })?;

        match event {
            Event::Start(start) => {
                check_attributes(&start)?;
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Event::End(_) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "end tag without matching start tag".to_string())?;
            }
            Event::Empty(start) => {
                check_attributes(&start)?;
                if depth == 0 {
                    roots += 1;
                }
            }
            Event::Text(text) => {
                if depth == 0 && !text.iter().all(u8::is_ascii_whitespace) {
                    return Err("character data outside the root element".to_string());
                }
                text.unescape()
                    .map_err(|e| format!("{e} at byte {}", reader.buffer_position()))?;
            }
            Event::CData(_) => {
                if depth == 0 {
                    return Err("CDATA section outside the root element".to_string());
                }
            }
            Event::Eof => break,
            _ => {}
        }

        if roots > 1 {
            return Err("more than one root element".to_string());
        }
        buf.clear();
    }

    if depth != 0 {
        return Err(format!("{depth} element(s) not closed at end of input"));
    }
    if roots == 0 {
        return Err("no root element".to_string());
    }
    Ok(())
}

fn check_attributes(start: &BytesStart<'_>) -> Result<(), String> {
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        attribute.unescape_value().map_err(|e| e.to_string())?;
    }
    Ok(())
}
