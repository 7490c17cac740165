//! Minimal JVM class file reading
//!
//! The dex task needs two facts about each compiled class: its binary
//! name and whether its constant pool mentions the entry-point marker
//! annotation. Nothing else of the format is interpreted; dexing is the
//! external compiler's job.

use plugkit_core::error::{Error, ErrorCode, Result};

const MAGIC: u32 = 0xCAFE_BABE;

/// The facts extracted from one class file
#[derive(Debug, Clone)]
pub struct ClassInfo {
    /// Binary name with dots, e.g. `io.example.HideTyping`
    pub name: String,
    utf8_constants: Vec<String>,
}

impl ClassInfo {
    /// Whether the constant pool carries the given annotation descriptor,
    /// e.g. `Lio/plugkit/annotations/PluginEntry;`.
    pub fn has_annotation_descriptor(&self, descriptor: &str) -> bool {
        self.utf8_constants.iter().any(|c| c == descriptor)
    }
}

/// Parse the header, constant pool, and this_class of a class file.
pub fn parse_class(bytes: &[u8]) -> Result<ClassInfo> {
    let mut reader = Reader::new(bytes);

    if reader.u32()? != MAGIC {
        return Err(parse_error("not a class file (bad magic)"));
    }
    reader.u16()?; // minor
    reader.u16()?; // major

    let pool_count = reader.u16()?;
    let mut utf8 = vec![None::<String>; pool_count as usize];
    let mut classes = vec![None::<u16>; pool_count as usize];

    let mut index = 1u16;
    while index < pool_count {
        let tag = reader.u8()?;
        match tag {
            // Utf8
            1 => {
                let len = reader.u16()? as usize;
                let data = reader.bytes(len)?;
                // Modified UTF-8; lossy is fine for descriptor comparison
                utf8[index as usize] = Some(String::from_utf8_lossy(data).to_string());
            }
            // Integer, Float
            3 | 4 => {
                reader.u32()?;
            }
            // Long, Double take two pool slots
            5 | 6 => {
                reader.u32()?;
                reader.u32()?;
                index += 1;
            }
            // Class
            7 => {
                classes[index as usize] = Some(reader.u16()?);
            }
            // String, MethodType, Module, Package
            8 | 16 | 19 | 20 => {
                reader.u16()?;
            }
            // Fieldref, Methodref, InterfaceMethodref, NameAndType,
            // Dynamic, InvokeDynamic
            9 | 10 | 11 | 12 | 17 | 18 => {
                reader.u16()?;
                reader.u16()?;
            }
            // MethodHandle
            15 => {
                reader.u8()?;
                reader.u16()?;
            }
            _ => {
                return Err(parse_error(format!("unknown constant pool tag {}", tag)));
            }
        }
        index += 1;
    }

    reader.u16()?; // access_flags
    let this_class = reader.u16()? as usize;

    let name_index = classes
        .get(this_class)
        .copied()
        .flatten()
        .ok_or_else(|| parse_error("this_class is not a Class constant"))? as usize;

    let internal_name = utf8
        .get(name_index)
        .cloned()
        .flatten()
        .ok_or_else(|| parse_error("class name is not a Utf8 constant"))?;

    Ok(ClassInfo {
        name: internal_name.replace('/', "."),
        utf8_constants: utf8.into_iter().flatten().collect(),
    })
}

fn parse_error(message: impl Into<String>) -> Error {
    Error::new(ErrorCode::ClassParseError, message.into())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&e| e <= self.bytes.len())
            .ok_or_else(|| parse_error("truncated class file"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}
