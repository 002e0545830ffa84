use crate::content::{CLASS_DESC_SITE, STRING_SITE};
use crate::{
    ArrayDesc, ByteCursor, ClassDesc, ContentKind, DescFlags, EnumConstant, ErrorKind, Extends,
    FieldDesc, FieldMap, FieldType, Handle, HandleTable, ObjectDesc, Registry, StreamError,
    StreamResult, Value,
};
use java_string::JavaStr;
use log::{debug, trace};
use std::borrow::Cow;

pub const STREAM_MAGIC: u16 = 0xaced;
pub const STREAM_VERSION: u16 = 5;

/// Decodes one serialization stream with the builtin post-processor table.
pub fn parse(data: &[u8]) -> StreamResult<Stream<'_>> {
    Parser::new(data, Registry::builtin()).run()
}

/// Decodes one serialization stream with a caller-supplied post-processor
/// table.
pub fn parse_with(data: &[u8], registry: Registry) -> StreamResult<Stream<'_>> {
    Parser::new(data, registry).run()
}

/// The result of a successful parse: the top-level content sequence plus the
/// handle table it refers into.
#[derive(Debug)]
pub struct Stream<'data> {
    contents: Vec<Value<'data>>,
    table: HandleTable<'data>,
}

impl<'data> Stream<'data> {
    /// The top-level content items, in wire order. Handle-allocated values
    /// appear as [`Value::Ref`]; see [`resolve`](Self::resolve).
    pub fn contents(&self) -> &[Value<'data>] {
        &self.contents
    }

    /// The value stored at a handle-table slot, if the slot was allocated.
    pub fn handle(&self, handle: Handle) -> Option<&Value<'data>> {
        self.table.get(handle)
    }

    /// Follows [`Value::Ref`] indirections down to the referenced value.
    pub fn resolve<'s>(&'s self, value: &'s Value<'data>) -> &'s Value<'data> {
        let mut value = value;
        while let Value::Ref(handle) = value {
            match self.table.get(*handle) {
                Some(stored) => value = stored,
                None => break,
            }
        }
        value
    }

    pub fn string<'s>(&'s self, value: &'s Value<'data>) -> Option<&'s JavaStr> {
        self.resolve(value).as_str()
    }

    pub fn object<'s>(&'s self, value: &'s Value<'data>) -> Option<&'s ObjectDesc<'data>> {
        match self.resolve(value) {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn array<'s>(&'s self, value: &'s Value<'data>) -> Option<&'s ArrayDesc<'data>> {
        match self.resolve(value) {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn enum_constant<'s>(&'s self, value: &'s Value<'data>) -> Option<&'s EnumConstant<'data>> {
        match self.resolve(value) {
            Value::Enum(constant) => Some(constant),
            _ => None,
        }
    }

    /// The class descriptor stored at `handle`, following Ref slots such as
    /// the wrapper a serialized `Class` item allocates.
    pub fn class_desc(&self, handle: Handle) -> Option<&ClassDesc<'data>> {
        let mut value = self.table.get(handle)?;
        while let Value::Ref(next) = value {
            value = self.table.get(*next)?;
        }
        match value {
            Value::Class(desc) => Some(desc),
            _ => None,
        }
    }

    pub fn super_class(&self, desc: &ClassDesc<'data>) -> Option<&ClassDesc<'data>> {
        self.class_desc(desc.super_desc?)
    }
}

struct Parser<'data> {
    cursor: ByteCursor<'data>,
    table: HandleTable<'data>,
    registry: Registry,
}

impl<'data> Parser<'data> {
    fn new(data: &'data [u8], registry: Registry) -> Parser<'data> {
        Parser {
            cursor: ByteCursor::new(data),
            table: HandleTable::new(),
            registry,
        }
    }

    fn run(mut self) -> StreamResult<Stream<'data>> {
        let magic = self.cursor.read_u16()?;
        if magic != STREAM_MAGIC {
            return Err(self.err_at(0, ErrorKind::BadMagic(magic)));
        }
        let version = self.cursor.read_u16()?;
        if version != STREAM_VERSION {
            return Err(self.err_at(2, ErrorKind::UnsupportedVersion(version)));
        }
        debug!("decoding object stream, {} bytes", self.cursor.remaining());

        let mut contents = Vec::new();
        while !self.cursor.is_at_end() {
            let at = self.cursor.pos();
            let item = self.content(None)?;
            if matches!(item, Value::EndBlock) {
                return Err(self.err_at(at, ErrorKind::UnexpectedEndBlock));
            }
            contents.push(item);
        }
        Ok(Stream {
            contents,
            table: self.table,
        })
    }

    fn err(&self, kind: ErrorKind) -> StreamError {
        self.err_at(self.cursor.pos(), kind)
    }

    fn err_at(&self, offset: usize, kind: ErrorKind) -> StreamError {
        StreamError { kind, offset }
    }

    /// Reads one content item. With an allow-list, kinds outside it fail
    /// before any of their payload is consumed.
    fn content(&mut self, allowed: Option<&'static [ContentKind]>) -> StreamResult<Value<'data>> {
        let at = self.cursor.pos();
        let code = self.cursor.read_u8()?;
        let kind = ContentKind::from_u8(code)
            .ok_or_else(|| self.err_at(at, ErrorKind::UnknownTypeCode(code)))?;
        if let Some(allowed) = allowed {
            if !allowed.contains(&kind) {
                return Err(self.err_at(at, ErrorKind::DisallowedContent { kind, allowed }));
            }
        }
        trace!("{kind} at offset {at}");
        match kind {
            ContentKind::Null => Ok(Value::Null),
            ContentKind::Reference => self.reference(),
            ContentKind::ClassDesc => self.new_class_desc().map(Value::Ref),
            ContentKind::Object => self.object(),
            ContentKind::String => {
                let text = self.cursor.read_utf()?;
                Ok(Value::Ref(self.table.append(Value::Str(text))))
            }
            ContentKind::Array => self.array(),
            ContentKind::Class => self.class_object(),
            ContentKind::BlockData => {
                let len = self.cursor.read_u8()? as usize;
                Ok(Value::Bytes(self.cursor.read_bytes(len)?))
            }
            ContentKind::EndBlockData => Ok(Value::EndBlock),
            ContentKind::BlockDataLong => {
                let len = self.cursor.read_u32()? as usize;
                Ok(Value::Bytes(self.cursor.read_bytes(len)?))
            }
            ContentKind::LongString => {
                let text = self.cursor.read_long_utf()?;
                Ok(Value::Ref(self.table.append(Value::Str(text))))
            }
            ContentKind::Enum => self.enum_constant(),
            ContentKind::Reset | ContentKind::Exception | ContentKind::ProxyClassDesc => {
                Err(self.err_at(at, ErrorKind::Unsupported(kind)))
            }
        }
    }

    fn reference(&mut self) -> StreamResult<Value<'data>> {
        let at = self.cursor.pos();
        let raw = self.cursor.read_u32()?;
        let handle = Handle::new(raw);
        if !self.table.contains(handle) {
            return Err(self.err_at(at, ErrorKind::InvalidHandle(raw)));
        }
        Ok(Value::Ref(handle))
    }

    /// A class descriptor position: exactly {ClassDesc, ProxyClassDesc,
    /// Null, Reference}, with proxies rejected as unsupported.
    fn class_desc_position(&mut self) -> StreamResult<Option<Handle>> {
        match self.content(Some(CLASS_DESC_SITE))? {
            Value::Null => Ok(None),
            Value::Ref(handle) => Ok(Some(handle)),
            _ => Err(self.err(ErrorKind::InvalidReference("class descriptor"))),
        }
    }

    fn require_class_desc(&mut self) -> StreamResult<Handle> {
        let at = self.cursor.pos();
        self.class_desc_position()?
            .ok_or_else(|| self.err_at(at, ErrorKind::InvalidReference("non-null class descriptor")))
    }

    fn new_class_desc(&mut self) -> StreamResult<Handle> {
        let name = self.cursor.read_utf()?;
        let serial_version_uid = self.cursor.read_hex(8)?;
        // the handle exists before fields, annotations and the super chain
        // are read, so any of them may refer back to this descriptor
        let handle = self.table.reserve();
        let flags = DescFlags::from_bits_retain(self.cursor.read_u8()?);
        let field_count = self.cursor.read_u16()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            fields.push(self.field_desc()?);
        }
        let annotations = self.annotation_block()?;
        let super_desc = self.class_desc_position()?;
        trace!("class descriptor {name}, {} fields", fields.len());
        self.table.assign(
            handle,
            Value::Class(Box::new(ClassDesc {
                name,
                serial_version_uid,
                flags,
                fields,
                annotations,
                super_desc,
            })),
        );
        Ok(handle)
    }

    fn field_desc(&mut self) -> StreamResult<FieldDesc<'data>> {
        let at = self.cursor.pos();
        let code = self.cursor.read_u8()?;
        let type_code = FieldType::from_u8(code)
            .ok_or_else(|| self.err_at(at, ErrorKind::UnknownFieldType(code)))?;
        let name = self.cursor.read_utf()?;
        let class_name = if type_code.is_reference() {
            Some(self.string_content()?)
        } else {
            None
        };
        Ok(FieldDesc {
            type_code,
            name,
            class_name,
        })
    }

    /// An inline string or a back-reference to one.
    fn string_content(&mut self) -> StreamResult<Cow<'data, JavaStr>> {
        let at = self.cursor.pos();
        match self.content(Some(STRING_SITE))? {
            Value::Ref(handle) => match self.table.get(handle) {
                Some(Value::Str(text)) => Ok(text.clone()),
                _ => Err(self.err_at(at, ErrorKind::InvalidReference("string"))),
            },
            _ => Err(self.err_at(at, ErrorKind::InvalidReference("string"))),
        }
    }

    /// Content items up to, and consuming, the end-of-block marker.
    fn annotation_block(&mut self) -> StreamResult<Vec<Value<'data>>> {
        let mut items = Vec::new();
        loop {
            let item = self.content(None)?;
            if matches!(item, Value::EndBlock) {
                return Ok(items);
            }
            items.push(item);
        }
    }

    fn object(&mut self) -> StreamResult<Value<'data>> {
        let class = self.require_class_desc()?;
        let handle = self.table.reserve();
        let mut extends = Extends::new();
        let mut fields = FieldMap::new();
        for ancestor in self.ancestor_chain(class)? {
            let desc = self.class_desc_ref(ancestor)?.clone();
            let group = self.class_data(&desc)?;
            for (name, value) in &group {
                fields.insert(name.clone(), value.clone());
            }
            extends.insert(desc.name.clone(), group);
        }
        self.table.assign(
            handle,
            Value::Object(Box::new(ObjectDesc {
                class,
                extends,
                fields,
            })),
        );
        Ok(Value::Ref(handle))
    }

    /// The descriptor chain of `head`, oldest ancestor first. Chains that
    /// loop back on themselves (expressible with hostile back-references)
    /// are a fatal error.
    fn ancestor_chain(&self, head: Handle) -> StreamResult<Vec<Handle>> {
        let mut chain = Vec::new();
        let mut next = Some(head);
        while let Some(handle) = next {
            if chain.contains(&handle) {
                return Err(self.err(ErrorKind::CyclicSuperChain));
            }
            chain.push(handle);
            next = self.class_desc_ref(handle)?.super_desc;
        }
        chain.reverse();
        Ok(chain)
    }

    fn class_desc_ref(&self, handle: Handle) -> StreamResult<&ClassDesc<'data>> {
        let mut value = self.table.get(handle);
        while let Some(Value::Ref(next)) = value {
            value = self.table.get(*next);
        }
        match value {
            Some(Value::Class(desc)) => Ok(desc),
            _ => Err(self.err(ErrorKind::InvalidReference("class descriptor"))),
        }
    }

    /// Per-class data, shaped by the low nibble of the descriptor flags.
    fn class_data(&mut self, desc: &ClassDesc<'data>) -> StreamResult<FieldMap<'data>> {
        match desc.flags.data_layout() {
            0x02 => self.default_fields(desc),
            0x03 => {
                let mut group = self.default_fields(desc)?;
                let annotations = self.annotation_block()?;
                group.insert(
                    Cow::Borrowed(JavaStr::from_str("@")),
                    Value::Seq(annotations.clone()),
                );
                if let Some(processor) = self
                    .registry
                    .lookup(&desc.name, &desc.serial_version_uid)
                {
                    trace!("post-processing {}", desc.name);
                    group = processor(desc, group, &annotations);
                }
                Ok(group)
            }
            0x04 => Err(self.err(ErrorKind::ExternalizableUnsupported)),
            // block-framed externalizable data is opaque; the declared
            // fields are not on the wire
            0x0c => {
                let annotations = self.annotation_block()?;
                let mut group = FieldMap::with_capacity(1);
                group.insert(
                    Cow::Borrowed(JavaStr::from_str("@")),
                    Value::Seq(annotations),
                );
                Ok(group)
            }
            _ => Err(self.err(ErrorKind::UnknownClassFlags(desc.flags.bits()))),
        }
    }

    fn default_fields(&mut self, desc: &ClassDesc<'data>) -> StreamResult<FieldMap<'data>> {
        let mut group = FieldMap::with_capacity(desc.fields.len());
        for field in &desc.fields {
            let value = self.field_value(field.type_code)?;
            group.insert(field.name.clone(), value);
        }
        Ok(group)
    }

    fn field_value(&mut self, type_code: FieldType) -> StreamResult<Value<'data>> {
        Ok(match type_code {
            FieldType::Byte => Value::Int(self.cursor.read_i8()? as i32),
            FieldType::Char => Value::Char(self.cursor.read_u16()?),
            FieldType::Double => Value::Double(self.cursor.read_f64()?),
            FieldType::Float => Value::Float(self.cursor.read_f32()?),
            FieldType::Int => Value::Int(self.cursor.read_i32()?),
            FieldType::Long => Value::Long(self.cursor.read_i64()?),
            FieldType::Short => Value::Int(self.cursor.read_i16()? as i32),
            FieldType::Boolean => Value::Bool(self.cursor.read_i8()? != 0),
            FieldType::Object | FieldType::Array => self.content(None)?,
        })
    }

    fn array(&mut self) -> StreamResult<Value<'data>> {
        let class = self.require_class_desc()?;
        let handle = self.table.reserve();
        // element type code is the second character of the descriptor name
        let code = {
            let desc = self.class_desc_ref(class)?;
            desc.name.as_bytes().get(1).copied().unwrap_or(0)
        };
        let element_type = FieldType::from_u8(code)
            .ok_or_else(|| self.err(ErrorKind::UnknownFieldType(code)))?;
        let at = self.cursor.pos();
        let len = self.cursor.read_i32()?;
        if len < 0 {
            return Err(self.err_at(at, ErrorKind::InvalidArrayLength(len)));
        }
        let mut items = Vec::with_capacity((len as usize).min(self.cursor.remaining()));
        for _ in 0..len {
            items.push(self.field_value(element_type)?);
        }
        self.table.assign(
            handle,
            Value::Array(Box::new(ArrayDesc {
                class,
                items,
                extends: Extends::new(),
            })),
        );
        Ok(Value::Ref(handle))
    }

    /// A serialized `Class` item: a nested descriptor with a handle of its
    /// own wrapping it.
    fn class_object(&mut self) -> StreamResult<Value<'data>> {
        let wrapped = match self.class_desc_position()? {
            Some(desc) => Value::Ref(desc),
            None => Value::Null,
        };
        Ok(Value::Ref(self.table.append(wrapped)))
    }

    /// Enum constants reserve their slot between the descriptor and the
    /// constant name so handle numbering follows wire position, then
    /// back-fill it.
    fn enum_constant(&mut self) -> StreamResult<Value<'data>> {
        let class = self.require_class_desc()?;
        let handle = self.table.reserve();
        let at = self.cursor.pos();
        let constant = match self.content(None)? {
            Value::Ref(name) => match self.table.get(name) {
                Some(Value::Str(text)) => text.clone(),
                _ => return Err(self.err_at(at, ErrorKind::InvalidReference("enum constant name"))),
            },
            _ => return Err(self.err_at(at, ErrorKind::InvalidReference("enum constant name"))),
        };
        self.table.assign(
            handle,
            Value::Enum(Box::new(EnumConstant {
                class,
                constant,
                extends: Extends::new(),
            })),
        );
        Ok(Value::Ref(handle))
    }
}
