//! Element headers, element trees and typed leaf values.

use crate::catalog::{ElementId, ElementKind};
use crate::error::{EbmlError, Result};
use crate::vint::{read_element_id, read_element_size};
use bytes::Bytes;

/// Deepest master nesting accepted when reading a subtree.
pub const MAX_DEPTH: usize = 32;

/// Seconds between the Unix epoch and the Matroska epoch (2001-01-01).
pub const MATROSKA_EPOCH_OFFSET_SECS: i64 = 978_307_200;

/// Element ID, data size and header length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHeader {
    pub id: ElementId,
    /// Payload size; `None` for unknown-size elements.
    pub size: Option<u64>,
    /// Bytes taken by the ID and size fields.
    pub header_len: usize,
}

impl ElementHeader {
    /// Header plus payload, when the size is known.
    pub fn total_len(&self) -> Option<u64> {
        self.size.map(|size| self.header_len as u64 + size)
    }

    /// Catalog kind of this element.
    pub fn kind(&self) -> ElementKind {
        self.id.kind()
    }
}

/// Read an element header from the front of `data`.
pub fn read_element_header(data: &[u8]) -> Result<ElementHeader> {
    let (id, id_len) = read_element_id(data)?;
    let (size, size_len) = read_element_size(&data[id_len..])?;
    Ok(ElementHeader {
        id: ElementId(id),
        size,
        header_len: id_len + size_len,
    })
}

/// A decoded element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: ElementId,
    pub value: ElementValue,
}

/// Decoded element payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Master(Vec<Element>),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    TextAscii(String),
    TextUtf8(String),
    Binary(Bytes),
    /// Seconds since the Unix epoch.
    Date(i64),
}

impl Element {
    /// Catalog name of this element.
    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    /// Child elements; empty for leaves.
    pub fn children(&self) -> &[Element] {
        match &self.value {
            ElementValue::Master(children) => children,
            _ => &[],
        }
    }

    /// First child with the given ID.
    pub fn child(&self, id: ElementId) -> Option<&Element> {
        self.children().iter().find(|c| c.id == id)
    }

    /// All children with the given ID, in order.
    pub fn children_with(&self, id: ElementId) -> impl Iterator<Item = &Element> {
        self.children().iter().filter(move |c| c.id == id)
    }

    pub fn as_unsigned(&self) -> Option<u64> {
        match self.value {
            ElementValue::Unsigned(v) => Some(v),
            ElementValue::Signed(v) if v >= 0 => Some(v as u64),
            _ => None,
        }
    }

    pub fn as_signed(&self) -> Option<i64> {
        match self.value {
            ElementValue::Signed(v) => Some(v),
            ElementValue::Unsigned(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.value {
            ElementValue::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Text value of either string kind.
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            ElementValue::TextAscii(s) | ElementValue::TextUtf8(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&Bytes> {
        match &self.value {
            ElementValue::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<i64> {
        match self.value {
            ElementValue::Date(v) => Some(v),
            _ => None,
        }
    }

    pub fn child_unsigned(&self, id: ElementId) -> Option<u64> {
        self.child(id).and_then(Element::as_unsigned)
    }

    pub fn child_float(&self, id: ElementId) -> Option<f64> {
        self.child(id).and_then(Element::as_float)
    }

    pub fn child_str(&self, id: ElementId) -> Option<&str> {
        self.child(id).and_then(Element::as_str)
    }

    pub fn child_binary(&self, id: ElementId) -> Option<&Bytes> {
        self.child(id).and_then(Element::as_binary)
    }
}

/// Read a complete element (header and payload) from the front of `data`.
///
/// Returns the element and the number of bytes it occupied.
pub fn read_element(data: &[u8]) -> Result<(Element, usize)> {
    let header = read_element_header(data)?;
    let size = header.size.ok_or(EbmlError::UnknownSize(header.id.0))?;
    let end = header.header_len as u64 + size;
    if (data.len() as u64) < end {
        return Err(EbmlError::Incomplete {
            needed: (end - data.len() as u64) as usize,
        });
    }
    let payload = &data[header.header_len..end as usize];
    let value = read_body(header.id, payload, 0)?;
    let element = Element {
        id: header.id,
        value: value.unwrap_or(ElementValue::Binary(Bytes::new())),
    };
    Ok((element, end as usize))
}

/// Read the children of a master element whose payload is `total_size`
/// bytes long.
///
/// `data` starts at the first child and may be shorter than `total_size`;
/// a child running past the end of `data` yields `Incomplete`, one running
/// past `total_size` is malformed.
pub fn read_element_tree(data: &[u8], total_size: u64) -> Result<Vec<Element>> {
    read_children(data, total_size, 0)
}

fn read_children(data: &[u8], total_size: u64, depth: usize) -> Result<Vec<Element>> {
    if depth >= MAX_DEPTH {
        return Err(EbmlError::TooDeep(MAX_DEPTH));
    }

    let mut children = Vec::new();
    let mut pos = 0u64;

    while pos < total_size {
        let start = pos as usize;
        let left = total_size - pos;
        let header = match read_element_header(data.get(start..).unwrap_or_default()) {
            Ok(header) => header,
            // The parent is resident, so a cut-off child header overruns it.
            Err(EbmlError::Incomplete { .. }) if data.len() as u64 >= total_size => {
                return Err(EbmlError::ChildOverrun {
                    id: 0,
                    size: left + 1,
                    remaining: left,
                });
            }
            Err(e) => return Err(e),
        };
        let remaining = left
            .checked_sub(header.header_len as u64)
            .ok_or(EbmlError::ChildOverrun {
                id: header.id.0,
                size: header.header_len as u64,
                remaining: left,
            })?;

        let size = match header.size {
            Some(size) => size,
            // Unknown-size masters run to the end of their parent.
            None if header.kind().has_children() => remaining,
            None => return Err(EbmlError::UnknownSize(header.id.0)),
        };
        if size > remaining {
            return Err(EbmlError::ChildOverrun {
                id: header.id.0,
                size,
                remaining,
            });
        }

        let body_start = start + header.header_len;
        let body_end = body_start as u64 + size;
        if body_end > data.len() as u64 {
            return Err(EbmlError::Incomplete {
                needed: (body_end - data.len() as u64) as usize,
            });
        }
        let payload = &data[body_start..body_end as usize];

        if let Some(value) = read_body(header.id, payload, depth)? {
            children.push(Element {
                id: header.id,
                value,
            });
        }
        pos = body_end;
    }

    Ok(children)
}

fn read_body(id: ElementId, payload: &[u8], depth: usize) -> Result<Option<ElementValue>> {
    match id.kind() {
        ElementKind::Master | ElementKind::Container => Ok(Some(ElementValue::Master(
            read_children(payload, payload.len() as u64, depth + 1)?,
        ))),
        kind => read_leaf(id, kind, payload),
    }
}

/// Decode a leaf payload of the given kind.
///
/// Returns `None` for float payloads that are not 0, 4 or 8 bytes long.
/// Master kinds are returned as raw binary.
pub fn read_leaf(id: ElementId, kind: ElementKind, payload: &[u8]) -> Result<Option<ElementValue>> {
    let value = match kind {
        ElementKind::Unsigned => ElementValue::Unsigned(read_unsigned(id, payload)?),
        ElementKind::Signed => ElementValue::Signed(read_signed(id, payload)?),
        ElementKind::Float => match read_float(payload) {
            Some(v) => ElementValue::Float(v),
            None => {
                tracing::warn!(
                    element = %id,
                    len = payload.len(),
                    "Unsupported float length, ignoring element"
                );
                return Ok(None);
            }
        },
        ElementKind::Date => {
            let nanos = read_signed(id, payload)?;
            ElementValue::Date(nanos / 1_000_000_000 + MATROSKA_EPOCH_OFFSET_SECS)
        }
        ElementKind::TextAscii => ElementValue::TextAscii(read_text(payload)),
        ElementKind::TextUtf8 => ElementValue::TextUtf8(read_text(payload)),
        ElementKind::Binary | ElementKind::Master | ElementKind::Container => {
            ElementValue::Binary(Bytes::copy_from_slice(payload))
        }
    };
    Ok(Some(value))
}

/// Big-endian unsigned integer of 0 to 8 bytes.
pub fn read_unsigned(id: ElementId, payload: &[u8]) -> Result<u64> {
    if payload.len() > 8 {
        return Err(EbmlError::IntegerTooLong {
            id: id.0,
            len: payload.len() as u64,
        });
    }
    Ok(payload.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

/// Big-endian two's complement integer of 0 to 8 bytes.
pub fn read_signed(id: ElementId, payload: &[u8]) -> Result<i64> {
    let raw = read_unsigned(id, payload)?;
    let bits = payload.len() as u32 * 8;
    if bits == 0 || bits == 64 {
        return Ok(raw as i64);
    }
    let shift = 64 - bits;
    Ok(((raw << shift) as i64) >> shift)
}

fn read_float(payload: &[u8]) -> Option<f64> {
    match payload.len() {
        0 => Some(0.0),
        4 => {
            let bytes: [u8; 4] = payload.try_into().ok()?;
            Some(f32::from_be_bytes(bytes) as f64)
        }
        8 => {
            let bytes: [u8; 8] = payload.try_into().ok()?;
            Some(f64::from_be_bytes(bytes))
        }
        _ => None,
    }
}

/// Strings may be zero-padded.
fn read_text(payload: &[u8]) -> String {
    let end = payload
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |last| last + 1);
    String::from_utf8_lossy(&payload[..end]).into_owned()
}
