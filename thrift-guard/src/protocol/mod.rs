//! Structural decoding of type-tagged records.
//!
//! [InputProtocol] is the contract records decode against: it exposes the field and container
//! headers of the wire format and its primitive values. [BinaryInputProtocol] implements it for
//! the Thrift binary encoding and enforces the size and depth guards while doing so.

use alloc::{string::String, vec::Vec};

use crate::{DecodeError, TagContext};

mod binary;
pub use binary::{BinaryInputProtocol, DecoderLimits, DecoderState};


// WIRE TYPE
// ================================================================================================

/// Type tags of the binary wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Terminates the field list of a struct.
    Stop = 0,
    Void = 1,
    Bool = 2,
    Byte = 3,
    Double = 4,
    I16 = 6,
    I32 = 8,
    I64 = 10,
    /// Length-prefixed bytes; used for both strings and binary fields.
    String = 11,
    Struct = 12,
    Map = 13,
    Set = 14,
    List = 15,
}

impl WireType {
    /// Parses a tag read at the specified position of a record.
    ///
    /// # Errors
    /// Returns [DecodeError::MalformedTag] if `tag` is not a known type tag.
    pub fn from_tag(tag: u8, context: TagContext) -> Result<Self, DecodeError> {
        Self::try_from(tag).map_err(|tag| DecodeError::MalformedTag { tag, context })
    }

    /// Returns true if values of this type occupy bytes on the wire.
    ///
    /// Only such types may appear as elements of lists, sets and maps. A container of `void`
    /// elements would let a corrupt size prefix drive an arbitrarily long loop that consumes no
    /// input.
    pub fn is_value(&self) -> bool {
        !matches!(self, Self::Stop | Self::Void)
    }

    /// Returns the smallest number of bytes a value of this type occupies on the wire.
    pub fn min_serialized_size(&self) -> usize {
        match self {
            Self::Stop | Self::Void => 0,
            Self::Bool | Self::Byte | Self::Struct => 1,
            Self::I16 => 2,
            Self::I32 | Self::String => 4,
            Self::Set | Self::List => 5,
            Self::Map => 6,
            Self::Double | Self::I64 => 8,
        }
    }
}

impl TryFrom<u8> for WireType {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Stop),
            1 => Ok(Self::Void),
            2 => Ok(Self::Bool),
            3 => Ok(Self::Byte),
            4 => Ok(Self::Double),
            6 => Ok(Self::I16),
            8 => Ok(Self::I32),
            10 => Ok(Self::I64),
            11 => Ok(Self::String),
            12 => Ok(Self::Struct),
            13 => Ok(Self::Map),
            14 => Ok(Self::Set),
            15 => Ok(Self::List),
            _ => Err(tag),
        }
    }
}

// HEADERS
// ================================================================================================

/// Header of a struct field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    /// Type of the field value; [WireType::Stop] marks the end of the struct.
    pub wire_type: WireType,
    /// Field identifier from the schema; zero for the stop marker.
    pub id: i16,
}

impl FieldHeader {
    /// Returns the header which terminates a struct.
    pub const fn stop() -> Self {
        Self { wire_type: WireType::Stop, id: 0 }
    }

    /// Returns true if this header terminates the struct.
    pub fn is_stop(&self) -> bool {
        self.wire_type == WireType::Stop
    }
}

/// Header of a list or set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHeader {
    pub element_type: WireType,
    /// Number of elements; already checked against the container size guard.
    pub size: usize,
}

/// Header of a set; encoded exactly like a list header.
pub type SetHeader = ListHeader;

/// Header of a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapHeader {
    pub key_type: WireType,
    pub value_type: WireType,
    /// Number of entries; already checked against the container size guard.
    pub size: usize,
}

// INPUT PROTOCOL
// ================================================================================================

/// Reads the structure and values of a type-tagged record.
///
/// Whenever a value is read the protocol advances past it. If an error occurs the protocol is
/// not rolled back, and the record being decoded must be discarded.
pub trait InputProtocol {
    // REQUIRED METHODS
    // --------------------------------------------------------------------------------------------

    /// Enters a struct.
    ///
    /// # Errors
    /// Returns [DecodeError::DepthExceeded] if this exceeds the nesting bound.
    fn read_struct_begin(&mut self) -> Result<(), DecodeError>;

    /// Leaves the struct entered last.
    fn read_struct_end(&mut self) -> Result<(), DecodeError>;

    /// Reads the next field header of the current struct.
    fn read_field_begin(&mut self) -> Result<FieldHeader, DecodeError>;

    /// Enters a list, validating its element type and size.
    fn read_list_begin(&mut self) -> Result<ListHeader, DecodeError>;

    /// Leaves the list entered last.
    fn read_list_end(&mut self) -> Result<(), DecodeError>;

    /// Enters a set, validating its element type and size.
    fn read_set_begin(&mut self) -> Result<SetHeader, DecodeError>;

    /// Leaves the set entered last.
    fn read_set_end(&mut self) -> Result<(), DecodeError>;

    /// Enters a map, validating its key type, value type and size.
    fn read_map_begin(&mut self) -> Result<MapHeader, DecodeError>;

    /// Leaves the map entered last.
    fn read_map_end(&mut self) -> Result<(), DecodeError>;

    fn read_bool(&mut self) -> Result<bool, DecodeError>;

    fn read_i8(&mut self) -> Result<i8, DecodeError>;

    fn read_i16(&mut self) -> Result<i16, DecodeError>;

    fn read_i32(&mut self) -> Result<i32, DecodeError>;

    fn read_i64(&mut self) -> Result<i64, DecodeError>;

    fn read_double(&mut self) -> Result<f64, DecodeError>;

    /// Reads a length-prefixed byte string.
    ///
    /// # Errors
    /// Returns [DecodeError::GuardExceeded] if the declared length is above the container size
    /// guard; nothing is allocated in that case.
    fn read_binary(&mut self) -> Result<Vec<u8>, DecodeError>;

    /// Reads a length-prefixed UTF-8 string.
    fn read_string(&mut self) -> Result<String, DecodeError>;

    // PROVIDED METHODS
    // --------------------------------------------------------------------------------------------

    /// Finishes the field just read. The binary encoding has no field trailer.
    fn read_field_end(&mut self) -> Result<(), DecodeError> {
        Ok(())
    }

    /// Skips a length-prefixed byte string.
    ///
    /// The default implementation reads the bytes into a vector and drops it; implementations
    /// with direct access to the input should advance past the bytes instead.
    fn skip_binary(&mut self) -> Result<(), DecodeError> {
        self.read_binary().map(drop)
    }

    /// Skips a single value of the specified type, descending into structs and containers.
    ///
    /// Used by records to step over fields they do not know. Nested values count toward the
    /// nesting bound exactly as they would when read.
    ///
    /// # Errors
    /// Returns [DecodeError::MalformedTag] if `wire_type` is [WireType::Stop] or
    /// [WireType::Void], which carry no value.
    fn skip(&mut self, wire_type: WireType) -> Result<(), DecodeError> {
        match wire_type {
            WireType::Bool => self.read_bool().map(drop),
            WireType::Byte => self.read_i8().map(drop),
            WireType::I16 => self.read_i16().map(drop),
            WireType::I32 => self.read_i32().map(drop),
            WireType::I64 => self.read_i64().map(drop),
            WireType::Double => self.read_double().map(drop),
            WireType::String => self.skip_binary(),
            WireType::Struct => {
                self.read_struct_begin()?;
                loop {
                    let field = self.read_field_begin()?;
                    if field.is_stop() {
                        break;
                    }
                    self.skip(field.wire_type)?;
                    self.read_field_end()?;
                }
                self.read_struct_end()
            },
            WireType::Map => {
                let header = self.read_map_begin()?;
                for _ in 0..header.size {
                    self.skip(header.key_type)?;
                    self.skip(header.value_type)?;
                }
                self.read_map_end()
            },
            WireType::Set => {
                let header = self.read_set_begin()?;
                for _ in 0..header.size {
                    self.skip(header.element_type)?;
                }
                self.read_set_end()
            },
            WireType::List => {
                let header = self.read_list_begin()?;
                for _ in 0..header.size {
                    self.skip(header.element_type)?;
                }
                self.read_list_end()
            },
            WireType::Stop | WireType::Void => Err((wire_type, TagContext::Skip).into()),
        }
    }

    /// Returns the maximum number of elements of `element_size` bytes each that could still be
    /// read, for use as a capacity hint before decoding a container.
    ///
    /// The default implementation returns `usize::MAX`, meaning no bound is known.
    /// [BinaryInputProtocol] derives the bound from the bytes left in its window and budget.
    fn max_alloc(&self, _element_size: usize) -> usize {
        usize::MAX
    }
}
