use crate::{DescFlags, Handle, Value};
use derive_more::{Display, TryFrom};
use java_string::JavaStr;
use std::borrow::Cow;

/// Field type codes as they appear on the wire, one printable byte each.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, TryFrom)]
#[repr(u8)]
#[non_exhaustive]
#[try_from(repr)]
pub enum FieldType {
    Byte = b'B',
    Char = b'C',
    Double = b'D',
    Float = b'F',
    Int = b'I',
    Long = b'J',
    Short = b'S',
    Boolean = b'Z',
    Object = b'L',
    Array = b'[',
}

impl FieldType {
    pub fn from_u8(code: u8) -> Option<FieldType> {
        Self::try_from(code).ok()
    }

    /// Object and array fields carry a declared type name and their values
    /// are nested content items rather than fixed-width primitives.
    pub fn is_reference(self) -> bool {
        matches!(self, FieldType::Object | FieldType::Array)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDesc<'data> {
    pub type_code: FieldType,
    pub name: Cow<'data, JavaStr>,
    /// Declared type signature, present only for object and array fields.
    pub class_name: Option<Cow<'data, JavaStr>>,
}

/// One class in a descriptor chain: schema for the per-class data that
/// follows an object's descriptor on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDesc<'data> {
    pub name: Cow<'data, JavaStr>,
    /// Always 16 lowercase hex digits, leading zeroes retained.
    pub serial_version_uid: String,
    pub flags: DescFlags,
    /// Wire order, which is also field read order.
    pub fields: Vec<FieldDesc<'data>>,
    /// Content items from the class-level annotation block.
    pub annotations: Vec<Value<'data>>,
    /// Next link of the ancestor chain; `None` terminates it.
    pub super_desc: Option<Handle>,
}

impl ClassDesc<'_> {
    pub fn is_enum(&self) -> bool {
        self.flags.contains(DescFlags::Enum)
    }
}
