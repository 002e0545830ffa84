use crate::{ClassDesc, Handle};
use java_string::JavaStr;
use std::borrow::Cow;
use std::collections::HashMap;

/// Field name to value, for one class of an object's ancestor chain.
pub type FieldMap<'data> = HashMap<Cow<'data, JavaStr>, Value<'data>>;

/// Ancestor class name to that class's field map.
pub type Extends<'data> = HashMap<Cow<'data, JavaStr>, FieldMap<'data>>;

/// The universe of decoded values.
///
/// Handle-allocated values (strings, class descriptors, objects, arrays,
/// enum constants) live in their [`HandleTable`](crate::HandleTable) slot
/// and appear everywhere else as [`Value::Ref`] carrying the slot's handle.
/// Cycles in the decoded graph are therefore expressed as indices and never
/// as owned structure.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value<'data> {
    Null,
    Bool(bool),
    /// byte, short and int fields all land here.
    Int(i32),
    /// 64-bit values stay distinguishable from the 32-bit-or-narrower ones.
    Long(i64),
    Float(f32),
    Double(f64),
    /// A single UTF-16 code unit; may be an unpaired surrogate.
    Char(u16),
    Str(Cow<'data, JavaStr>),
    /// An opaque block-data run, borrowed from the input buffer.
    Bytes(&'data [u8]),
    /// Reference to a handle-table slot.
    Ref(Handle),
    Class(Box<ClassDesc<'data>>),
    Object(Box<ObjectDesc<'data>>),
    Array(Box<ArrayDesc<'data>>),
    Enum(Box<EnumConstant<'data>>),
    /// A plain ordered sequence: the `"@"` annotation list of a custom
    /// write method, or the list/set shape produced by a post-processor.
    Seq(Vec<Value<'data>>),
    /// Order-preserving key/value pairs produced by the map post-processors.
    /// Keys are arbitrary values, so no native map type fits.
    Map(Vec<(Value<'data>, Value<'data>)>),
    /// Terminates annotation blocks; never exposed in a parse result.
    EndBlock,
}

impl<'data> Value<'data> {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&JavaStr> {
        match self {
            Value::Str(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&'data [u8]> {
        match self {
            Value::Bytes(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<Handle> {
        match self {
            Value::Ref(handle) => Some(*handle),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value<'data>]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }
}

impl PartialEq<str> for Value<'_> {
    fn eq(&self, other: &str) -> bool {
        match self {
            Value::Str(text) => **text == *JavaStr::from_str(other),
            _ => false,
        }
    }
}

impl PartialEq<&str> for Value<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.eq(*other)
    }
}

/// A decoded object instance.
///
/// `extends` keeps one field map per class of the ancestor chain and is the
/// source of truth; `fields` is the flattened projection over the whole
/// chain, filled ancestor-first so the most-derived value wins on name
/// collisions. Both are materialized once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDesc<'data> {
    /// The most-derived class descriptor.
    pub class: Handle,
    pub extends: Extends<'data>,
    pub fields: FieldMap<'data>,
}

impl<'data> ObjectDesc<'data> {
    /// Looks a field up in the flattened view.
    pub fn field(&self, name: &str) -> Option<&Value<'data>> {
        self.fields.get(JavaStr::from_str(name))
    }

    /// The field map written by one specific class of the ancestor chain.
    pub fn group(&self, class_name: &str) -> Option<&FieldMap<'data>> {
        self.extends.get(JavaStr::from_str(class_name))
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// A decoded array: an ordered sequence plus the auxiliary `class` and
/// `extends` attributes every handle value carries (`extends` stays empty
/// for arrays).
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDesc<'data> {
    /// Descriptor whose name starts with `[` followed by the element type
    /// code.
    pub class: Handle,
    pub items: Vec<Value<'data>>,
    pub extends: Extends<'data>,
}

impl<'data> ArrayDesc<'data> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value<'data>> {
        self.items.get(index)
    }
}

/// An enum constant: string-like by value, but still carrying its class.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumConstant<'data> {
    pub class: Handle,
    pub constant: Cow<'data, JavaStr>,
    pub extends: Extends<'data>,
}

impl PartialEq<str> for EnumConstant<'_> {
    fn eq(&self, other: &str) -> bool {
        *self.constant == *JavaStr::from_str(other)
    }
}

impl PartialEq<&str> for EnumConstant<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.eq(*other)
    }
}
