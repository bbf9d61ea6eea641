//! Per-container property store.
//!
//! [`PropertyStore`] is pure data: a name-keyed, insertion-ordered map of
//! [`Property`] entries. It knows nothing about threads or links beyond
//! two bits of link state per property, which it needs to refuse external
//! writes to link-fed inputs. Locking is the owner's business.

use indexmap::IndexMap;

use crate::error::PropertyError;
use crate::flags::{PropertyFlags, Range};
use crate::value::{Value, ValueType};

/// Default documentation string for properties declared without one.
pub const NO_DOC: &str = "(Info not available)";

// ── PropertyDef ────────────────────────────────────────────────────

/// Declaration of a property, consumed by [`PropertyStore::add`].
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDef {
    /// Unique name within the container.
    pub name: String,
    /// Usage flags.
    pub flags: PropertyFlags,
    /// Initial value; fixes the property's type tag for its lifetime.
    pub value: Value,
    /// Human-readable documentation.
    pub doc: String,
    /// Optional inclusive numeric range.
    pub range: Option<Range>,
}

impl PropertyDef {
    /// A property with explicit flags and no documentation or range.
    pub fn new(name: impl Into<String>, flags: PropertyFlags, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            flags,
            value: value.into(),
            doc: NO_DOC.to_owned(),
            range: None,
        }
    }

    /// An input property.
    pub fn input(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, PropertyFlags::INPUT, value)
    }

    /// An output property.
    pub fn output(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, PropertyFlags::OUTPUT, value)
    }

    /// Attach documentation.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Attach an inclusive numeric range.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some(Range::new(min, max));
        self
    }

    /// Add flags on top of the current ones.
    pub fn with_flags(mut self, flags: PropertyFlags) -> Self {
        self.flags |= flags;
        self
    }
}

// ── Property ───────────────────────────────────────────────────────

/// A stored property.
#[derive(Clone, Debug)]
pub struct Property {
    value: Value,
    value_type: ValueType,
    flags: PropertyFlags,
    range: Option<Range>,
    doc: String,
    linked_input: bool,
    linked_outputs: usize,
}

impl Property {
    /// Current value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Type tag, fixed at declaration.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Usage flags.
    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    /// Declared range, if any.
    pub fn range(&self) -> Option<Range> {
        self.range
    }

    /// Documentation string.
    pub fn doc(&self) -> &str {
        &self.doc
    }

    /// Whether a live link currently feeds this property.
    pub fn is_linked_input(&self) -> bool {
        self.linked_input
    }

    /// Whether at least one live link reads this property.
    pub fn is_linked_output(&self) -> bool {
        self.linked_outputs > 0
    }
}

// ── PropertyStore ──────────────────────────────────────────────────

/// Insertion-ordered map of named properties.
#[derive(Clone, Debug, Default)]
pub struct PropertyStore {
    props: IndexMap<String, Property>,
}

impl PropertyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new property.
    ///
    /// Fails with `DuplicateProperty` if the name is taken. A declared
    /// range must be well-formed, the value numeric and inside it.
    pub fn add(&mut self, def: PropertyDef) -> Result<(), PropertyError> {
        if self.props.contains_key(&def.name) {
            return Err(PropertyError::DuplicateProperty { property: def.name });
        }
        let value_type = def.value.value_type();
        if let Some(range) = def.range {
            if !range.is_valid() {
                return Err(PropertyError::InvalidRange {
                    property: def.name,
                    range,
                });
            }
            let Some(v) = def.value.as_f64() else {
                return Err(PropertyError::NotNumeric {
                    property: def.name,
                    found: value_type,
                });
            };
            if !range.contains(v) {
                return Err(PropertyError::OutOfRange {
                    property: def.name,
                    value: v,
                    range,
                });
            }
        }
        self.props.insert(
            def.name,
            Property {
                value: def.value,
                value_type,
                flags: def.flags,
                range: def.range,
                doc: def.doc,
                linked_input: false,
                linked_outputs: 0,
            },
        );
        Ok(())
    }

    /// Remove a property, preserving the order of the others.
    pub fn remove(&mut self, name: &str) -> Result<Property, PropertyError> {
        self.props
            .shift_remove(name)
            .ok_or_else(|| unknown(name))
    }

    /// Current value of a property.
    pub fn get(&self, name: &str) -> Result<&Value, PropertyError> {
        self.entry(name).map(|p| &p.value)
    }

    /// Assign a new value from outside the link machinery.
    ///
    /// Rejected (store unchanged) for a different type tag, an
    /// out-of-range number, or an input currently fed by a live link.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), PropertyError> {
        let prop = self.props.get_mut(name).ok_or_else(|| unknown(name))?;
        let found = value.value_type();
        if found != prop.value_type {
            return Err(PropertyError::TypeMismatch {
                property: name.to_owned(),
                expected: prop.value_type,
                found,
            });
        }
        if prop.linked_input {
            return Err(PropertyError::NotWritable {
                property: name.to_owned(),
            });
        }
        if let (Some(range), Some(v)) = (prop.range, value.as_f64()) {
            if !range.contains(v) {
                return Err(PropertyError::OutOfRange {
                    property: name.to_owned(),
                    value: v,
                    range,
                });
            }
        }
        prop.value = value;
        Ok(())
    }

    /// Assign a value delivered over a link. Skips the write protection
    /// and the range check; the type tag was checked at connect time.
    pub fn assign_from_link(&mut self, name: &str, value: Value) -> Result<(), PropertyError> {
        let prop = self.props.get_mut(name).ok_or_else(|| unknown(name))?;
        debug_assert_eq!(prop.value_type, value.value_type());
        prop.value = value;
        Ok(())
    }

    /// Whether a property exists.
    pub fn contains(&self, name: &str) -> bool {
        self.props.contains_key(name)
    }

    /// Full entry for a property.
    pub fn entry(&self, name: &str) -> Result<&Property, PropertyError> {
        self.props.get(name).ok_or_else(|| unknown(name))
    }

    /// Flags of a property.
    pub fn flags(&self, name: &str) -> Result<PropertyFlags, PropertyError> {
        self.entry(name).map(Property::flags)
    }

    /// Declared range of a property (`Ok(None)` if it has none).
    pub fn range(&self, name: &str) -> Result<Option<Range>, PropertyError> {
        self.entry(name).map(Property::range)
    }

    /// Documentation of a property.
    pub fn doc(&self, name: &str) -> Result<&str, PropertyError> {
        self.entry(name).map(Property::doc)
    }

    /// Type tag of a property.
    pub fn value_type(&self, name: &str) -> Result<ValueType, PropertyError> {
        self.entry(name).map(Property::value_type)
    }

    /// Position of a property in creation order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.props.get_index_of(name)
    }

    /// Property names in creation order.
    pub fn names(&self) -> Vec<String> {
        self.props.keys().cloned().collect()
    }

    /// Names of properties carrying the given type tag, in creation order.
    pub fn names_of_type(&self, value_type: ValueType) -> Vec<String> {
        self.props
            .iter()
            .filter(|(_, p)| p.value_type == value_type)
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Iterate `(name, property)` in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.props.iter().map(|(n, p)| (n.as_str(), p))
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.props.len()
    }

    /// Whether the store has no properties.
    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    // ── Link state ─────────────────────────────────────────────────

    /// Record whether a live link feeds `name`.
    pub fn set_linked_input(&mut self, name: &str, linked: bool) {
        if let Some(p) = self.props.get_mut(name) {
            p.linked_input = linked;
        }
    }

    /// Record one more live link reading `name`.
    pub fn add_linked_output(&mut self, name: &str) {
        if let Some(p) = self.props.get_mut(name) {
            p.linked_outputs += 1;
        }
    }

    /// Record one fewer live link reading `name`.
    pub fn remove_linked_output(&mut self, name: &str) {
        if let Some(p) = self.props.get_mut(name) {
            p.linked_outputs = p.linked_outputs.saturating_sub(1);
        }
    }

    // ── Help output ────────────────────────────────────────────────

    /// Help text describing every visible input property.
    ///
    /// One line per input, in creation order, of the form
    /// `  --name=[type] (def. value) ......doc.` padded to 100 columns.
    /// Hidden and internal inputs, and inputs whose value has no short
    /// rendering, are skipped. Returns an empty string if nothing is listed.
    pub fn describe_inputs(&self, owner: &str) -> String {
        let mut lines = String::new();
        for (name, prop) in &self.props {
            if !prop.flags.is_input() || prop.flags.is_hidden() || prop.flags.is_internal() {
                continue;
            }
            if !prop.value.is_printable() {
                continue;
            }
            let kind = match (&prop.value, prop.range) {
                (Value::Bool(_), _) => "[true,false]".to_owned(),
                (Value::Int(_) | Value::Float(_), Some(range)) => range.to_string(),
                (_, _) => format!("[{}]", prop.value_type),
            };
            let head = format!("  --{name}={kind} (def. {}) ", prop.value);
            let width = 100usize.saturating_sub(head.chars().count());
            lines.push_str(&format!("{head}{:.>width$}.\n", prop.doc));
        }
        if lines.is_empty() {
            return String::new();
        }
        format!("Input parameters for {owner}:\n{lines}")
    }
}

fn unknown(name: &str) -> PropertyError {
    PropertyError::UnknownProperty {
        property: name.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn store_with(defs: Vec<PropertyDef>) -> PropertyStore {
        let mut s = PropertyStore::new();
        for d in defs {
            s.add(d).unwrap();
        }
        s
    }

    #[test]
    fn duplicate_property_rejected() {
        let mut s = store_with(vec![PropertyDef::input("x", 1)]);
        let err = s.add(PropertyDef::output("x", 2)).unwrap_err();
        assert_eq!(
            err,
            PropertyError::DuplicateProperty {
                property: "x".into()
            }
        );
        assert_eq!(s.get("x").unwrap(), &Value::Int(1));
        assert!(s.flags("x").unwrap().is_input());
    }

    #[test]
    fn unknown_property_errors() {
        let mut s = PropertyStore::new();
        assert!(matches!(
            s.get("nope"),
            Err(PropertyError::UnknownProperty { .. })
        ));
        assert!(matches!(
            s.set("nope", Value::Int(1)),
            Err(PropertyError::UnknownProperty { .. })
        ));
        assert!(matches!(
            s.remove("nope"),
            Err(PropertyError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn range_enforced_on_set() {
        let mut s = store_with(vec![PropertyDef::input("gain", 0.5).with_range(0.0, 1.0)]);
        let err = s.set("gain", Value::Float(1.5)).unwrap_err();
        assert!(matches!(err, PropertyError::OutOfRange { value, .. } if value == 1.5));
        assert_eq!(s.get("gain").unwrap(), &Value::Float(0.5));
        s.set("gain", Value::Float(1.0)).unwrap();
        assert_eq!(s.get("gain").unwrap(), &Value::Float(1.0));
    }

    #[test]
    fn range_declaration_checked() {
        let mut s = PropertyStore::new();
        assert!(matches!(
            s.add(PropertyDef::input("t", "a").with_range(0.0, 1.0)),
            Err(PropertyError::NotNumeric { .. })
        ));
        assert!(matches!(
            s.add(PropertyDef::input("n", 5).with_range(0.0, 1.0)),
            Err(PropertyError::OutOfRange { .. })
        ));
        assert!(matches!(
            s.add(PropertyDef::input("m", 0).with_range(3.0, 1.0)),
            Err(PropertyError::InvalidRange { .. })
        ));
        assert!(s.is_empty());
    }

    #[test]
    fn type_mismatch_on_set() {
        let mut s = store_with(vec![PropertyDef::output("x", 1)]);
        let err = s.set("x", Value::Float(1.0)).unwrap_err();
        assert_eq!(
            err,
            PropertyError::TypeMismatch {
                property: "x".into(),
                expected: ValueType::Int,
                found: ValueType::Float,
            }
        );
    }

    #[test]
    fn linked_input_is_not_writable() {
        let mut s = store_with(vec![PropertyDef::input("x", 1)]);
        s.set_linked_input("x", true);
        assert!(matches!(
            s.set("x", Value::Int(2)),
            Err(PropertyError::NotWritable { .. })
        ));
        s.assign_from_link("x", Value::Int(3)).unwrap();
        assert_eq!(s.get("x").unwrap(), &Value::Int(3));
        s.set_linked_input("x", false);
        s.set("x", Value::Int(4)).unwrap();
    }

    #[test]
    fn linked_output_counts() {
        let mut s = store_with(vec![PropertyDef::output("y", 0)]);
        s.add_linked_output("y");
        s.add_linked_output("y");
        s.remove_linked_output("y");
        assert!(s.entry("y").unwrap().is_linked_output());
        s.remove_linked_output("y");
        s.remove_linked_output("y");
        assert!(!s.entry("y").unwrap().is_linked_output());
    }

    #[test]
    fn removal_preserves_order() {
        let mut s = store_with(vec![
            PropertyDef::input("a", 1),
            PropertyDef::input("b", 2),
            PropertyDef::input("c", 3),
        ]);
        s.remove("b").unwrap();
        assert_eq!(s.names(), vec!["a", "c"]);
        assert_eq!(s.position("c"), Some(1));
        s.add(PropertyDef::input("b", 4)).unwrap();
        assert_eq!(s.names(), vec!["a", "c", "b"]);
    }

    #[test]
    fn names_of_type_filters() {
        let s = store_with(vec![
            PropertyDef::input("a", 1),
            PropertyDef::input("b", "x"),
            PropertyDef::output("c", 3),
        ]);
        assert_eq!(s.names_of_type(ValueType::Int), vec!["a", "c"]);
    }

    #[test]
    fn describe_inputs_lists_visible_printable_inputs() {
        let s = store_with(vec![
            PropertyDef::input("threshold", 5)
                .with_range(0.0, 10.0)
                .with_doc("Detection threshold"),
            PropertyDef::input("label", "cam").with_doc("Camera label"),
            PropertyDef::input("secret", true).with_flags(PropertyFlags::HIDDEN),
            PropertyDef::input("samples", vec![1.0, 2.0]),
            PropertyDef::output("result", 0),
            PropertyDef::input("enabled", true),
        ]);
        let help = s.describe_inputs("detector");
        let lines: Vec<&str> = help.lines().collect();
        assert_eq!(lines[0], "Input parameters for detector:");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("  --threshold=[0...10] (def. 5) "));
        assert!(lines[1].ends_with("Detection threshold."));
        assert!(lines[2].starts_with("  --label=[text] (def. 'cam') "));
        assert!(lines[3].starts_with("  --enabled=[true,false] (def. true) "));
        assert_eq!(lines[1].chars().count(), 101);
    }

    #[test]
    fn describe_inputs_empty_when_nothing_listed() {
        let s = store_with(vec![PropertyDef::output("y", 1)]);
        assert_eq!(s.describe_inputs("sink"), "");
    }

    proptest! {
        #[test]
        fn set_never_escapes_declared_range(v in -100.0f64..100.0) {
            let mut s = store_with(vec![PropertyDef::input("p", 0.0).with_range(-10.0, 10.0)]);
            let _ = s.set("p", Value::Float(v));
            let current = s.get("p").unwrap().as_f64().unwrap();
            prop_assert!((-10.0..=10.0).contains(&current));
        }

        #[test]
        fn listing_follows_insertion_order(names in proptest::collection::hash_set("[a-z]{1,6}", 1..12)) {
            let names: Vec<String> = names.into_iter().collect();
            let mut s = PropertyStore::new();
            for n in &names {
                s.add(PropertyDef::input(n.clone(), 0)).unwrap();
            }
            prop_assert_eq!(s.names(), names);
        }
    }
}
