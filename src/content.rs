use strum::{Display, FromRepr};

/// Wire type codes for content items, 0x70 through 0x7e.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, FromRepr)]
#[repr(u8)]
#[non_exhaustive]
pub enum ContentKind {
    Null = 0x70,
    Reference = 0x71,
    ClassDesc = 0x72,
    Object = 0x73,
    String = 0x74,
    Array = 0x75,
    Class = 0x76,
    BlockData = 0x77,
    EndBlockData = 0x78,
    Reset = 0x79,
    BlockDataLong = 0x7a,
    Exception = 0x7b,
    LongString = 0x7c,
    ProxyClassDesc = 0x7d,
    Enum = 0x7e,
}

impl ContentKind {
    pub fn from_u8(code: u8) -> Option<ContentKind> {
        Self::from_repr(code)
    }
}

/// Content kinds accepted at a class descriptor position.
pub(crate) const CLASS_DESC_SITE: &[ContentKind] = &[
    ContentKind::ClassDesc,
    ContentKind::ProxyClassDesc,
    ContentKind::Null,
    ContentKind::Reference,
];

/// Content kinds accepted where a string is required, such as the declared
/// type of an object field.
pub(crate) const STRING_SITE: &[ContentKind] = &[
    ContentKind::String,
    ContentKind::LongString,
    ContentKind::Reference,
];
