//! Decrypted snapshot types handed back to callers.

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::field::Field;

/// Insertion-ordered fields of one section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    name: String,
    fields: Vec<Field>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Builds a section from `(name, value)` pairs. A repeated name replaces the
    /// earlier value but keeps its position.
    pub fn from_pairs<I, K, V>(name: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut section = Self::new(name);
        for (field, value) in pairs {
            section.insert(field, value);
        }
        section
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let field = Field::new(name, value);
        match self.fields.iter_mut().find(|f| f.name() == field.name()) {
            Some(existing) => existing.set_value(field.value().to_string()),
            None => self.fields.push(field),
        }
    }

    pub(crate) fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name() == name)
            .map(Field::value)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|field| (field.name(), field.value()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Section {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Full decrypted store, sections in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Store {
    sections: Vec<Section>,
}

impl Store {
    pub(crate) fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn get(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(Section::name)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Takes one section out of the snapshot, or an empty one if it is absent.
    pub fn take_section(mut self, name: &str) -> Section {
        match self.sections.iter().position(|section| section.name == name) {
            Some(index) => self.sections.swap_remove(index),
            None => Section::new(name),
        }
    }
}

impl Serialize for Store {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for section in &self.sections {
            map.serialize_entry(section.name(), section)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::{Section, Store};

    #[test]
    fn repeated_names_keep_first_position() {
        let section = Section::from_pairs("s", [("a", "1"), ("b", "2"), ("a", "3")]);
        let pairs: Vec<(&str, &str)> = section.iter().collect();
        assert_eq!(pairs, [("a", "3"), ("b", "2")]);
    }

    #[test]
    fn serializes_as_ordered_json() {
        let mut store = Store::default();
        store.push(Section::from_pairs("zeta", [("user", "z")]));
        store.push(Section::from_pairs("alpha", [("__token", "123"), ("a", "b")]));
        let json = serde_json::to_string(&store).unwrap();
        assert_eq!(
            json,
            r#"{"zeta":{"user":"z"},"alpha":{"__token":"123","a":"b"}}"#
        );
    }

    #[test]
    fn take_section_falls_back_to_empty() {
        let mut store = Store::default();
        store.push(Section::from_pairs("github", [("user", "ahmed")]));
        assert_eq!(store.clone().take_section("github").get("user"), Some("ahmed"));
        let missing = store.take_section("gitlab");
        assert!(missing.is_empty());
        assert_eq!(missing.name(), "gitlab");
    }
}
