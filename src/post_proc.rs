use crate::{ClassDesc, FieldMap, Value};
use java_string::{JavaStr, JavaString};
use std::borrow::Cow;
use std::collections::HashMap;
use thiserror::Error;

/// Converts the raw `(class, fields, annotations)` of a class with a custom
/// write method into the field map that replaces the raw group in the
/// object's per-class entry and flattened view. The `fields` argument
/// already contains the `"@"` annotation sequence.
pub type PostProcessor =
    for<'data> fn(&ClassDesc<'data>, FieldMap<'data>, &[Value<'data>]) -> FieldMap<'data>;

#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("serial version uid must be exactly 16 hex digits: {0:?}")]
    BadUid(String),
}

/// Lookup from `(class name, serialVersionUID)` to a post-processor.
/// Built once, read-only while parsing.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    table: HashMap<(JavaString, String), PostProcessor>,
}

impl Registry {
    pub fn empty() -> Registry {
        Registry {
            table: HashMap::new(),
        }
    }

    /// The default table: the standard container classes whose custom write
    /// methods this crate understands.
    pub fn builtin() -> Registry {
        let entries: [(&str, &str, PostProcessor); 6] = [
            ("java.util.ArrayList", "7881d21d99c7619d", list),
            ("java.util.ArrayDeque", "207cda2e240da08b", list),
            ("java.util.Hashtable", "13bb0f25214ae4b8", map),
            ("java.util.HashMap", "0507dac1c31660d1", map),
            ("java.util.EnumMap", "065d7df7be907ca1", map),
            ("java.util.HashSet", "ba44859596b8b734", set),
        ];
        let mut registry = Registry::empty();
        for (class_name, uid, processor) in entries {
            registry
                .register(class_name, uid, processor)
                .expect("builtin registration is valid");
        }
        registry
    }

    /// Registers a processor for an exact `(class name, uid)` pair. The uid
    /// must be 16 hex digits; it is normalized to lowercase.
    pub fn register(
        &mut self,
        class_name: &str,
        uid: &str,
        processor: PostProcessor,
    ) -> Result<(), RegistryError> {
        if uid.len() != 16 || !uid.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(RegistryError::BadUid(uid.to_string()));
        }
        self.table
            .insert((JavaString::from(class_name), uid.to_ascii_lowercase()), processor);
        Ok(())
    }

    pub fn lookup(&self, class_name: &JavaStr, uid: &str) -> Option<PostProcessor> {
        self.table
            .get(&(class_name.to_owned(), uid.to_owned()))
            .copied()
    }
}

/// The container write methods interleave counts and capacities as raw
/// block-data runs before the element values; only the non-block items are
/// the written values.
fn written_values<'data, 'a>(
    annotations: &'a [Value<'data>],
) -> impl Iterator<Item = &'a Value<'data>> {
    annotations
        .iter()
        .filter(|item| !matches!(item, Value::Bytes(_)))
}

fn group_with<'data>(key: &'static str, value: Value<'data>) -> FieldMap<'data> {
    let mut group = FieldMap::with_capacity(1);
    group.insert(Cow::Borrowed(JavaStr::from_str(key)), value);
    group
}

fn elements<'data>(annotations: &[Value<'data>]) -> Vec<Value<'data>> {
    written_values(annotations).cloned().collect()
}

fn pairs<'data>(annotations: &[Value<'data>]) -> Vec<(Value<'data>, Value<'data>)> {
    let mut pairs = Vec::new();
    let mut values = written_values(annotations).cloned();
    while let (Some(key), Some(value)) = (values.next(), values.next()) {
        pairs.push((key, value));
    }
    pairs
}

fn list<'data>(
    _class: &ClassDesc<'data>,
    _raw: FieldMap<'data>,
    annotations: &[Value<'data>],
) -> FieldMap<'data> {
    group_with("list", Value::Seq(elements(annotations)))
}

fn map<'data>(
    _class: &ClassDesc<'data>,
    _raw: FieldMap<'data>,
    annotations: &[Value<'data>],
) -> FieldMap<'data> {
    group_with("map", Value::Map(pairs(annotations)))
}

fn set<'data>(
    _class: &ClassDesc<'data>,
    _raw: FieldMap<'data>,
    annotations: &[Value<'data>],
) -> FieldMap<'data> {
    group_with("set", Value::Seq(elements(annotations)))
}

#[cfg(test)]
mod test {
    use super::*;

    fn noop<'data>(
        _class: &ClassDesc<'data>,
        raw: FieldMap<'data>,
        _annotations: &[Value<'data>],
    ) -> FieldMap<'data> {
        raw
    }

    #[test]
    fn test_register_rejects_bad_uid() {
        let mut registry = Registry::empty();
        assert_eq!(
            Err(RegistryError::BadUid("123".to_string())),
            registry.register("a.B", "123", noop)
        );
        assert_eq!(
            Err(RegistryError::BadUid("00000000000000zz".to_string())),
            registry.register("a.B", "00000000000000zz", noop)
        );
    }

    #[test]
    fn test_register_normalizes_uid_case() {
        let mut registry = Registry::empty();
        registry.register("a.B", "0000123456789ABC", noop).unwrap();
        assert!(registry
            .lookup(JavaStr::from_str("a.B"), "0000123456789abc")
            .is_some());
    }

    #[test]
    fn test_lookup_is_by_exact_pair() {
        let registry = Registry::builtin();
        assert!(registry
            .lookup(JavaStr::from_str("java.util.ArrayList"), "7881d21d99c7619d")
            .is_some());
        assert!(registry
            .lookup(JavaStr::from_str("java.util.ArrayList"), "0000000000000000")
            .is_none());
        assert!(registry
            .lookup(JavaStr::from_str("java.util.Vector"), "7881d21d99c7619d")
            .is_none());
    }

    #[test]
    fn test_pairs_ignore_block_runs_and_trailing_key() {
        let annotations = vec![
            Value::Bytes(&[0, 0, 0, 2]),
            Value::Int(1),
            Value::Int(2),
            Value::Bytes(&[0]),
            Value::Int(3),
        ];
        assert_eq!(vec![(Value::Int(1), Value::Int(2))], pairs(&annotations));
    }
}
