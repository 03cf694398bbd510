//! Small quick-xml helpers shared by the package and sheet readers.
//!
//! Element and attribute names are matched by local name so that prefixed
//! SpreadsheetML (`<x:row>`) is handled like the default namespace.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Result, TransferError};

pub(crate) fn is_element(element: &BytesStart<'_>, local: &[u8]) -> bool {
    element.local_name().as_ref() == local
}

/// Unescaped value of the first attribute with this local name.
pub(crate) fn attr_value(element: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == local {
            let raw = std::str::from_utf8(&attr.value)?;
            return Ok(Some(unescape(raw)?.into_owned()));
        }
    }
    Ok(None)
}

/// Namespace prefix of an element name, if any.
pub(crate) fn element_prefix(element: &BytesStart<'_>) -> Option<String> {
    element
        .name()
        .prefix()
        .map(|prefix| String::from_utf8_lossy(prefix.as_ref()).into_owned())
}

/// Copy of `element` without attributes whose local name is `local`.
pub(crate) fn without_attribute(element: &BytesStart<'_>, local: &[u8]) -> Result<BytesStart<'static>> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut copy = BytesStart::new(name);
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() != local {
            copy.push_attribute(attr);
        }
    }
    Ok(copy)
}

/// Appends the character data of a text-like event to `buffer`.
///
/// Returns false for events that carry no character data.
pub(crate) fn append_text(event: &Event<'_>, buffer: &mut String) -> Result<bool> {
    match event {
        Event::Text(text) => {
            buffer.push_str(&unescape(std::str::from_utf8(text)?)?);
            Ok(true)
        }
        Event::CData(data) => {
            buffer.push_str(std::str::from_utf8(data)?);
            Ok(true)
        }
        Event::GeneralRef(reference) => {
            let name = std::str::from_utf8(reference)?;
            buffer.push_str(&unescape(&format!("&{name};"))?);
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Streams `xml` through unchanged except for elements named `local` for
/// which `remove` returns true; those are dropped with their content.
pub(crate) fn remove_elements<F>(xml: &[u8], local: &[u8], mut remove: F) -> Result<Vec<u8>>
where
    F: FnMut(&BytesStart<'_>) -> Result<bool>,
{
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Empty(element) if is_element(&element, local) && remove(&element)? => {}
            Event::Start(element) if is_element(&element, local) && remove(&element)? => {
                skip_element(&mut reader)?;
            }
            event => writer.write_event(event)?,
        }
    }
    Ok(writer.into_inner())
}

/// Streams `xml` unchanged except that an empty `child` element is appended
/// as the last child of the first element named `parent`. The child takes
/// the parent's namespace prefix.
pub(crate) fn append_child(
    xml: &[u8],
    parent: &[u8],
    child: &str,
    attributes: &[(&str, &str)],
) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 128));
    let mut depth = 0usize;
    // Depth of the open parent element, once found.
    let mut parent_depth = None;
    let mut prefix = None;
    let mut appended = false;

    let build = |prefix: &Option<String>| {
        let name = match prefix {
            Some(prefix) => format!("{prefix}:{child}"),
            None => child.to_string(),
        };
        let mut element = BytesStart::new(name);
        for attribute in attributes {
            element.push_attribute(*attribute);
        }
        element
    };

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(element) => {
                depth += 1;
                if !appended && parent_depth.is_none() && is_element(&element, parent) {
                    parent_depth = Some(depth);
                    prefix = element_prefix(&element);
                }
                writer.write_event(Event::Start(element))?;
            }
            Event::Empty(element) if !appended && parent_depth.is_none() && is_element(&element, parent) => {
                let prefix = element_prefix(&element);
                writer.write_event(Event::Start(element.borrow()))?;
                writer.write_event(Event::Empty(build(&prefix)))?;
                writer.write_event(Event::End(element.to_end()))?;
                appended = true;
            }
            Event::End(element) => {
                if parent_depth == Some(depth) {
                    writer.write_event(Event::Empty(build(&prefix)))?;
                    parent_depth = None;
                    appended = true;
                }
                depth = depth.saturating_sub(1);
                writer.write_event(Event::End(element))?;
            }
            event => writer.write_event(event)?,
        }
    }

    if !appended {
        return Err(TransferError::InvalidWorkbook {
            reason: format!("no <{}> element to extend", String::from_utf8_lossy(parent)),
        });
    }
    Ok(writer.into_inner())
}

/// Consumes events up to and including the end tag of an element whose start
/// tag was just read. Returns true if a descendant element named `watch` was seen.
pub(crate) fn skip_element_watching(reader: &mut Reader<&[u8]>, watch: &[u8]) -> Result<bool> {
    let mut depth = 1usize;
    let mut seen = false;
    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                seen |= is_element(&element, watch);
                depth += 1;
            }
            Event::Empty(element) => seen |= is_element(&element, watch),
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(seen);
                }
            }
            Event::Eof => {
                return Err(TransferError::InvalidWorkbook {
                    reason: "unexpected end of XML inside an element".to_string(),
                });
            }
            _ => {}
        }
    }
}

pub(crate) fn skip_element(reader: &mut Reader<&[u8]>) -> Result<()> {
    skip_element_watching(reader, b"").map(|_| ())
}
