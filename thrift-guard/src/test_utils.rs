//! Test, benchmark and fuzzing utilities.
//!
//! [FixtureWriter] assembles binary-encoded records byte by byte, including deliberately corrupt
//! ones, and [Profile] is a sample record exercising every wire type.

use alloc::{
    collections::{BTreeMap, BTreeSet},
    format,
    string::{String, ToString},
    vec::Vec,
};

use crate::{DecodeError, InputProtocol, Record, WireType};

// FIXTURE WRITER
// ================================================================================================

/// Builds binary-encoded record fixtures.
///
/// The writer does no validation: sizes are written as given, so fixtures can declare sizes
/// which do not match their contents.
#[derive(Debug, Default, Clone)]
pub struct FixtureWriter {
    bytes: Vec<u8>,
}

impl FixtureWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bytes written so far.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Writes a field header.
    pub fn field(&mut self, wire_type: WireType, id: i16) -> &mut Self {
        self.bytes.push(wire_type as u8);
        self.i16(id)
    }

    /// Writes the stop marker which terminates a struct.
    pub fn stop(&mut self) -> &mut Self {
        self.bytes.push(WireType::Stop as u8);
        self
    }

    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.bytes.push(value as u8);
        self
    }

    pub fn i8(&mut self, value: i8) -> &mut Self {
        self.raw(&value.to_be_bytes())
    }

    pub fn i16(&mut self, value: i16) -> &mut Self {
        self.raw(&value.to_be_bytes())
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.raw(&value.to_be_bytes())
    }

    pub fn i64(&mut self, value: i64) -> &mut Self {
        self.raw(&value.to_be_bytes())
    }

    pub fn double(&mut self, value: f64) -> &mut Self {
        self.raw(&value.to_bits().to_be_bytes())
    }

    /// Writes a length-prefixed byte string.
    pub fn binary(&mut self, value: &[u8]) -> &mut Self {
        self.i32(value.len() as i32);
        self.raw(value)
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        self.binary(value.as_bytes())
    }

    /// Writes a list or set header declaring `size` elements.
    pub fn list_header(&mut self, element_type: WireType, size: i32) -> &mut Self {
        self.bytes.push(element_type as u8);
        self.i32(size)
    }

    /// Writes a map header declaring `size` entries.
    pub fn map_header(&mut self, key_type: WireType, value_type: WireType, size: i32) -> &mut Self {
        self.bytes.push(key_type as u8);
        self.bytes.push(value_type as u8);
        self.i32(size)
    }

    /// Writes bytes verbatim.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }
}

// SAMPLE RECORDS
// ================================================================================================

/// A postal address, nested inside [Profile].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Address {
    pub city: String,
    pub zip: i32,
}

/// A user profile covering every value-carrying wire type.
///
/// Field `id` is required; every other field is optional.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub avatar: Option<Vec<u8>>,
    pub tags: Vec<String>,
    pub counters: BTreeMap<String, i64>,
    pub flags: BTreeSet<i32>,
    pub home: Option<Address>,
    pub active: bool,
    pub score: f64,
    pub level: i16,
    pub kind: i8,
}

impl Profile {
    /// Returns a deterministic profile whose encoding grows with `num_tags`.
    pub fn sample(id: i64, num_tags: usize) -> Self {
        let tags = (0..num_tags).map(|i| format!("tag-{id}-{i}")).collect();
        let counters = (0..num_tags.min(16))
            .map(|i| (format!("c{i}"), (i as i64).wrapping_mul(id)))
            .collect();
        let flags = (0..num_tags.min(8) as i32).collect();

        Self {
            id,
            name: format!("profile-{id}"),
            avatar: Some(id.to_le_bytes().to_vec()),
            tags,
            counters,
            flags,
            home: Some(Address { city: "Lisbon".to_string(), zip: 1100 }),
            active: id % 2 == 0,
            score: id as f64 / 3.0,
            level: (id % 100) as i16,
            kind: -((id % 7) as i8),
        }
    }

    /// Returns the binary encoding of this profile.
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = FixtureWriter::new();
        self.write_fields(&mut writer);
        writer.stop();
        writer.into_bytes()
    }

    /// Writes the fields of this profile, without the terminating stop marker.
    pub fn write_fields(&self, writer: &mut FixtureWriter) {
        writer.field(WireType::I64, 1).i64(self.id);
        writer.field(WireType::String, 2).string(&self.name);
        if let Some(avatar) = &self.avatar {
            writer.field(WireType::String, 3).binary(avatar);
        }

        writer.field(WireType::List, 4).list_header(WireType::String, self.tags.len() as i32);
        for tag in self.tags.iter() {
            writer.string(tag);
        }

        writer.field(WireType::Map, 5).map_header(
            WireType::String,
            WireType::I64,
            self.counters.len() as i32,
        );
        for (key, value) in self.counters.iter() {
            writer.string(key).i64(*value);
        }

        writer.field(WireType::Set, 6).list_header(WireType::I32, self.flags.len() as i32);
        for flag in self.flags.iter() {
            writer.i32(*flag);
        }

        if let Some(home) = &self.home {
            writer.field(WireType::Struct, 7);
            writer.field(WireType::String, 1).string(&home.city);
            writer.field(WireType::I32, 2).i32(home.zip);
            writer.stop();
        }

        writer.field(WireType::Bool, 8).bool(self.active);
        writer.field(WireType::Double, 9).double(self.score);
        writer.field(WireType::I16, 10).i16(self.level);
        writer.field(WireType::Byte, 11).i8(self.kind);
    }
}

impl Record for Address {
    fn read<P: InputProtocol>(&mut self, input: &mut P) -> Result<(), DecodeError> {
        input.read_struct_begin()?;
        loop {
            let field = input.read_field_begin()?;
            match (field.id, field.wire_type) {
                (_, WireType::Stop) => break,
                (1, WireType::String) => self.city = input.read_string()?,
                (2, WireType::I32) => self.zip = input.read_i32()?,
                (_, wire_type) => input.skip(wire_type)?,
            }
            input.read_field_end()?;
        }
        input.read_struct_end()
    }
}

impl Record for Profile {
    fn read<P: InputProtocol>(&mut self, input: &mut P) -> Result<(), DecodeError> {
        let mut has_id = false;

        input.read_struct_begin()?;
        loop {
            let field = input.read_field_begin()?;
            match (field.id, field.wire_type) {
                (_, WireType::Stop) => break,
                (1, WireType::I64) => {
                    self.id = input.read_i64()?;
                    has_id = true;
                },
                (2, WireType::String) => self.name = input.read_string()?,
                (3, WireType::String) => self.avatar = Some(input.read_binary()?),
                (4, WireType::List) => {
                    let header = input.read_list_begin()?;
                    expect_type("tags", header.element_type, WireType::String)?;
                    let capacity = input.max_alloc(WireType::String.min_serialized_size());
                    let mut tags = Vec::with_capacity(header.size.min(capacity));
                    for _ in 0..header.size {
                        tags.push(input.read_string()?);
                    }
                    input.read_list_end()?;
                    self.tags = tags;
                },
                (5, WireType::Map) => {
                    let header = input.read_map_begin()?;
                    expect_type("counters", header.key_type, WireType::String)?;
                    expect_type("counters", header.value_type, WireType::I64)?;
                    let mut counters = BTreeMap::new();
                    for _ in 0..header.size {
                        let key = input.read_string()?;
                        let value = input.read_i64()?;
                        counters.insert(key, value);
                    }
                    input.read_map_end()?;
                    self.counters = counters;
                },
                (6, WireType::Set) => {
                    let header = input.read_set_begin()?;
                    expect_type("flags", header.element_type, WireType::I32)?;
                    let mut flags = BTreeSet::new();
                    for _ in 0..header.size {
                        flags.insert(input.read_i32()?);
                    }
                    input.read_set_end()?;
                    self.flags = flags;
                },
                (7, WireType::Struct) => {
                    let mut home = Address::default();
                    home.read(input)?;
                    self.home = Some(home);
                },
                (8, WireType::Bool) => self.active = input.read_bool()?,
                (9, WireType::Double) => self.score = input.read_double()?,
                (10, WireType::I16) => self.level = input.read_i16()?,
                (11, WireType::Byte) => self.kind = input.read_i8()?,
                (_, wire_type) => input.skip(wire_type)?,
            }
            input.read_field_end()?;
        }
        input.read_struct_end()?;

        if !has_id {
            return Err(DecodeError::invalid_value("required field `id` is missing from profile"));
        }
        Ok(())
    }
}

// HELPER FUNCTIONS
// ================================================================================================

fn expect_type(field: &str, actual: WireType, expected: WireType) -> Result<(), DecodeError> {
    if actual != expected {
        return Err(DecodeError::InvalidValue(format!(
            "field `{field}` holds {actual:?} elements, expected {expected:?}"
        )));
    }
    Ok(())
}
