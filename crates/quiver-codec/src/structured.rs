// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine-native structured serialization (the `v8` content type).
//!
//! Writes the tag-based structured-clone wire format at a pinned version.
//! Every runtime reading from a queue must understand what any other runtime
//! writes, so [`FORMAT_VERSION`] only changes as a deliberate breaking change.
//! Readers accept any version up to the pinned one.

use std::collections::BTreeMap;

use quiver_core::QueueError;

use crate::value::Value;

/// Version written into every serialized header.
pub const FORMAT_VERSION: u32 = 15;

/// Oldest version this reader understands.
const MIN_READ_VERSION: u32 = 13;

/// Version from which array buffer views carry a flags varint.
const VIEW_FLAGS_VERSION: u32 = 14;

const MAX_DEPTH: usize = 256;

mod tag {
    pub const VERSION: u8 = 0xFF;
    pub const PADDING: u8 = 0x00;
    pub const UNDEFINED: u8 = b'_';
    pub const NULL: u8 = b'0';
    pub const TRUE: u8 = b'T';
    pub const FALSE: u8 = b'F';
    pub const INT32: u8 = b'I';
    pub const DOUBLE: u8 = b'N';
    pub const ONE_BYTE_STRING: u8 = b'"';
    pub const TWO_BYTE_STRING: u8 = b'c';
    pub const UTF8_STRING: u8 = b'S';
    pub const DATE: u8 = b'D';
    pub const BEGIN_OBJECT: u8 = b'o';
    pub const END_OBJECT: u8 = b'{';
    pub const BEGIN_DENSE_ARRAY: u8 = b'A';
    pub const END_DENSE_ARRAY: u8 = b'$';
    pub const HOLE: u8 = b'-';
    pub const ARRAY_BUFFER: u8 = b'B';
    pub const ARRAY_BUFFER_VIEW: u8 = b'V';
    pub const OBJECT_REFERENCE: u8 = b'^';
    pub const UINT8_ARRAY: u8 = b'B';
}

/// Serializes a value, header included.
pub fn serialize(value: &Value) -> Vec<u8> {
    let mut writer = Writer { buf: Vec::with_capacity(16) };
    writer.buf.push(tag::VERSION);
    writer.write_varint(u64::from(FORMAT_VERSION));
    writer.write_value(value);
    writer.buf
}

/// Deserializes a value written by [`serialize`] or by any compatible writer.
pub fn deserialize(data: &[u8]) -> Result<Value, QueueError> {
    let mut reader = Reader {
        data,
        pos: 0,
        version: 0,
    };
    reader.read_header()?;
    reader.read_value(0)
}

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn write_varint(&mut self, mut n: u64) {
        loop {
            let byte = (n & 0x7f) as u8;
            n >>= 7;
            if n == 0 {
                self.buf.push(byte);
                return;
            }
            self.buf.push(byte | 0x80);
        }
    }

    fn write_value(&mut self, value: &Value) {
        match value {
            Value::Undefined => self.buf.push(tag::UNDEFINED),
            Value::Null => self.buf.push(tag::NULL),
            Value::Bool(true) => self.buf.push(tag::TRUE),
            Value::Bool(false) => self.buf.push(tag::FALSE),
            Value::Number(n) => self.write_number(*n),
            Value::String(s) => self.write_string(s),
            Value::Date(ms) => {
                self.buf.push(tag::DATE);
                self.buf.extend_from_slice(&ms.to_le_bytes());
            }
            Value::Bytes(bytes) => {
                self.buf.push(tag::ARRAY_BUFFER);
                self.write_varint(bytes.len() as u64);
                self.buf.extend_from_slice(bytes);
                self.buf.push(tag::ARRAY_BUFFER_VIEW);
                self.buf.push(tag::UINT8_ARRAY);
                self.write_varint(0);
                self.write_varint(bytes.len() as u64);
                self.write_varint(0);
            }
            Value::Array(items) => {
                self.buf.push(tag::BEGIN_DENSE_ARRAY);
                self.write_varint(items.len() as u64);
                for item in items {
                    self.write_value(item);
                }
                self.buf.push(tag::END_DENSE_ARRAY);
                self.write_varint(0);
                self.write_varint(items.len() as u64);
            }
            Value::Object(map) => {
                self.buf.push(tag::BEGIN_OBJECT);
                for (key, item) in map {
                    self.write_string(key);
                    self.write_value(item);
                }
                self.buf.push(tag::END_OBJECT);
                self.write_varint(map.len() as u64);
            }
        }
    }

    fn write_number(&mut self, n: f64) {
        let is_small_int = n.fract() == 0.0
            && n >= f64::from(i32::MIN)
            && n <= f64::from(i32::MAX)
            && !(n == 0.0 && n.is_sign_negative());
        if is_small_int {
            let i = n as i32;
            self.buf.push(tag::INT32);
            self.write_varint(u64::from(((i << 1) ^ (i >> 31)) as u32));
        } else {
            self.buf.push(tag::DOUBLE);
            self.buf.extend_from_slice(&n.to_le_bytes());
        }
    }

    fn write_string(&mut self, s: &str) {
        if s.chars().all(|c| (c as u32) <= 0xff) {
            self.buf.push(tag::ONE_BYTE_STRING);
            self.write_varint(s.chars().count() as u64);
            self.buf.extend(s.chars().map(|c| c as u8));
            return;
        }

        let units: Vec<u16> = s.encode_utf16().collect();
        let byte_len = (units.len() * 2) as u64;
        // Two-byte payloads start on an even offset.
        if (self.buf.len() + 1 + varint_len(byte_len)) % 2 != 0 {
            self.buf.push(tag::PADDING);
        }
        self.buf.push(tag::TWO_BYTE_STRING);
        self.write_varint(byte_len);
        for unit in units {
            self.buf.extend_from_slice(&unit.to_le_bytes());
        }
    }
}

fn varint_len(mut n: u64) -> usize {
    let mut len = 1;
    while n >= 0x80 {
        n >>= 7;
        len += 1;
    }
    len
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    version: u32,
}

impl<'a> Reader<'a> {
    fn err(&self, message: impl std::fmt::Display) -> QueueError {
        QueueError::Decode(format!("{message} at offset {}", self.pos))
    }

    fn read_byte(&mut self) -> Result<u8, QueueError> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| self.err("unexpected end of data"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], QueueError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| self.err(format!("truncated payload of {len} bytes")))?;
        let data = self.data;
        let slice = &data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_varint(&mut self) -> Result<u64, QueueError> {
        let mut result = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_byte()?;
            if shift > 63 {
                return Err(self.err("varint overflow"));
            }
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    fn read_len(&mut self) -> Result<usize, QueueError> {
        let n = self.read_varint()?;
        usize::try_from(n).map_err(|_| self.err("length out of range"))
    }

    fn read_f64(&mut self) -> Result<f64, QueueError> {
        let bytes = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(raw))
    }

    fn read_tag(&mut self) -> Result<u8, QueueError> {
        loop {
            let byte = self.read_byte()?;
            if byte != tag::PADDING {
                return Ok(byte);
            }
        }
    }

    fn peek_tag(&mut self) -> Result<u8, QueueError> {
        let saved = self.pos;
        let tag = self.read_tag()?;
        self.pos = saved;
        Ok(tag)
    }

    fn read_header(&mut self) -> Result<(), QueueError> {
        if self.read_byte()? != tag::VERSION {
            return Err(self.err("missing structured format header"));
        }
        let version = u32::try_from(self.read_varint()?)
            .map_err(|_| self.err("format version out of range"))?;
        if version > FORMAT_VERSION {
            return Err(self.err(format!(
                "structured format version {version} is newer than supported version {FORMAT_VERSION}"
            )));
        }
        if version < MIN_READ_VERSION {
            return Err(self.err(format!(
                "structured format version {version} is no longer supported"
            )));
        }
        self.version = version;
        Ok(())
    }

    fn read_value(&mut self, depth: usize) -> Result<Value, QueueError> {
        if depth > MAX_DEPTH {
            return Err(self.err("value nested too deeply"));
        }
        let tag = self.read_tag()?;
        match tag {
            tag::UNDEFINED | tag::HOLE => Ok(Value::Undefined),
            tag::NULL => Ok(Value::Null),
            tag::TRUE => Ok(Value::Bool(true)),
            tag::FALSE => Ok(Value::Bool(false)),
            tag::INT32 => {
                let raw = u32::try_from(self.read_varint()?)
                    .map_err(|_| self.err("int32 out of range"))?;
                let i = ((raw >> 1) as i32) ^ -((raw & 1) as i32);
                Ok(Value::Number(f64::from(i)))
            }
            tag::DOUBLE => Ok(Value::Number(self.read_f64()?)),
            tag::DATE => Ok(Value::Date(self.read_f64()?)),
            tag::ONE_BYTE_STRING | tag::TWO_BYTE_STRING | tag::UTF8_STRING => {
                Ok(Value::String(self.read_string_body(tag)?))
            }
            tag::BEGIN_OBJECT => self.read_object(depth),
            tag::BEGIN_DENSE_ARRAY => self.read_dense_array(depth),
            tag::ARRAY_BUFFER => self.read_array_buffer(),
            tag::OBJECT_REFERENCE => Err(self.err("object back-references are not supported")),
            other => Err(self.err(format!("unknown tag 0x{other:02x}"))),
        }
    }

    fn read_string_body(&mut self, tag: u8) -> Result<String, QueueError> {
        let len = self.read_len()?;
        let bytes = self.read_bytes(len)?;
        match tag {
            tag::ONE_BYTE_STRING => Ok(bytes.iter().map(|b| char::from(*b)).collect()),
            tag::TWO_BYTE_STRING => {
                if len % 2 != 0 {
                    return Err(self.err("odd two-byte string length"));
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                Ok(String::from_utf16_lossy(&units))
            }
            _ => Ok(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    fn read_object(&mut self, depth: usize) -> Result<Value, QueueError> {
        let mut map = BTreeMap::new();
        let mut count = 0u64;
        loop {
            if self.peek_tag()? == tag::END_OBJECT {
                self.read_tag()?;
                let declared = self.read_varint()?;
                if declared != count {
                    return Err(self.err(format!(
                        "object declared {declared} properties but contained {count}"
                    )));
                }
                return Ok(Value::Object(map));
            }
            let key = match self.read_value(depth + 1)? {
                Value::String(s) => s,
                Value::Number(n) => format_key(n),
                other => {
                    return Err(self.err(format!(
                        "object key of type {} is not supported",
                        other.type_of()
                    )));
                }
            };
            let value = self.read_value(depth + 1)?;
            map.insert(key, value);
            count += 1;
        }
    }

    fn read_dense_array(&mut self, depth: usize) -> Result<Value, QueueError> {
        let len = self.read_len()?;
        // The length is untrusted; let the vector grow as elements decode.
        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            items.push(self.read_value(depth + 1)?);
        }
        if self.read_tag()? != tag::END_DENSE_ARRAY {
            return Err(self.err("unterminated dense array"));
        }
        let extra_props = self.read_varint()?;
        if extra_props != 0 {
            return Err(self.err("array properties are not supported"));
        }
        let declared = self.read_len()?;
        if declared != len {
            return Err(self.err("dense array length mismatch"));
        }
        Ok(Value::Array(items))
    }

    fn read_array_buffer(&mut self) -> Result<Value, QueueError> {
        let len = self.read_len()?;
        let buffer = self.read_bytes(len)?;

        let has_view = self.pos < self.data.len() && self.peek_tag()? == tag::ARRAY_BUFFER_VIEW;
        if !has_view {
            return Ok(Value::Bytes(buffer.to_vec()));
        }

        self.read_tag()?;
        let _subtag = self.read_byte()?;
        let offset = self.read_len()?;
        let length = self.read_len()?;
        if self.version >= VIEW_FLAGS_VERSION {
            self.read_varint()?;
        }
        let end = offset
            .checked_add(length)
            .filter(|end| *end <= buffer.len())
            .ok_or_else(|| self.err("array buffer view out of bounds"))?;
        Ok(Value::Bytes(buffer[offset..end].to_vec()))
    }
}

fn format_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
