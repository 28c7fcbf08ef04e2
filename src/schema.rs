//! Record schemas synthesized at runtime.
//!
//! A [`Schema`] is an ordered list of [`FieldSpec`]s, the registry entry each
//! field resolved to at build time, and a name-to-index map. When two fields
//! normalize to the same wire key the later one owns the key and the earlier
//! one is *shadowed*: it keeps its slot but is never encoded or decoded.

use crate::error::SchemaError;
use crate::names::{normalize_phrase, Babbler, NameSource};
use crate::registry::{KindEntry, Registry};
use crate::value::FieldKind;
use rand::RngCore;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    /// Wire key, unique among live fields.
    pub name: String,
    /// Internal identifier derived from the same phrase.
    pub ident: String,
    pub kind: FieldKind,
}

/// What to do when a generated name collides with an earlier field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Later field takes over the name.
    #[default]
    Overwrite,
    Reject,
}

#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    entries: Vec<KindEntry>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Builds a schema of `field_count` fields from the built-in registry and
    /// a default [`Babbler`].
    pub fn generate(field_count: usize, rng: &mut dyn RngCore) -> Result<Schema, SchemaError> {
        SchemaBuilder::new(Registry::builtin()).build(field_count, &mut Babbler::default(), rng)
    }

    /// Builds a schema from explicit `(phrase, kind)` pairs.
    pub fn from_fields<'a, I>(
        registry: &Registry,
        fields: I,
        policy: DuplicatePolicy,
    ) -> Result<Schema, SchemaError>
    where
        I: IntoIterator<Item = (&'a str, FieldKind)>,
    {
        let mut schema = Schema::empty();
        for (phrase, kind) in fields {
            schema.push(registry, phrase, kind, policy)?;
        }
        Ok(schema)
    }

    fn empty() -> Self {
        Self {
            fields: Vec::new(),
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn push(
        &mut self,
        registry: &Registry,
        phrase: &str,
        kind: FieldKind,
        policy: DuplicatePolicy,
    ) -> Result<(), SchemaError> {
        let name = normalize_phrase(phrase).ok_or_else(|| SchemaError::InvalidName {
            phrase: phrase.to_string(),
        })?;
        let entry = registry.entry(kind)?;
        let position = self.fields.len();

        if let Some(&first) = self.index.get(&name.wire_key) {
            match policy {
                DuplicatePolicy::Reject => {
                    return Err(SchemaError::DuplicateField {
                        name: name.wire_key,
                        first,
                        second: position,
                    });
                }
                DuplicatePolicy::Overwrite => {
                    tracing::warn!(field = %name.wire_key, shadowed = first, by = position, "duplicate field name");
                }
            }
        }

        self.index.insert(name.wire_key.clone(), position);
        self.fields.push(FieldSpec {
            name: name.wire_key,
            ident: name.ident,
            kind,
        });
        self.entries.push(entry);
        Ok(())
    }

    /// Every field, shadowed ones included.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_live(&self, position: usize) -> bool {
        self.fields
            .get(position)
            .is_some_and(|f| self.index.get(&f.name) == Some(&position))
    }

    /// Fields that own their wire key, in schema order.
    pub fn live_fields(&self) -> impl Iterator<Item = (usize, &FieldSpec)> + '_ {
        self.fields
            .iter()
            .enumerate()
            .filter(move |(i, _)| self.is_live(*i))
    }

    pub fn live_len(&self) -> usize {
        self.index.len()
    }

    /// Wire keys of the live fields, in schema order.
    pub fn field_names(&self) -> Vec<&str> {
        self.live_fields().map(|(_, f)| f.name.as_str()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub(crate) fn entry(&self, position: usize) -> KindEntry {
        self.entries[position]
    }

    /// Schema description for logs and reports.
    pub fn describe(&self) -> serde_json::Value {
        serde_json::json!(self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| serde_json::json!({
                "name": f.name,
                "ident": f.ident,
                "kind": f.kind,
                "live": self.is_live(i),
            }))
            .collect::<Vec<_>>())
    }
}

impl std::fmt::Display for Schema {
    /// Renders like a struct declaration: `struct { CopperRiver small_uint "copper_river"; ... }`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("struct {")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, " {} {} {:?}", field.ident, field.kind, field.name)?;
        }
        f.write_str(" }")
    }
}

pub struct SchemaBuilder<'r> {
    registry: &'r Registry,
    policy: DuplicatePolicy,
}

impl<'r> SchemaBuilder<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            policy: DuplicatePolicy::default(),
        }
    }

    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Draws one phrase and one kind per field.
    ///
    /// Deterministic for a fixed name sequence and RNG stream.
    pub fn build(
        &self,
        field_count: usize,
        names: &mut dyn NameSource,
        rng: &mut dyn RngCore,
    ) -> Result<Schema, SchemaError> {
        if self.registry.is_empty() {
            return Err(SchemaError::EmptyRegistry);
        }

        let mut schema = Schema::empty();
        schema.fields.reserve(field_count);
        schema.entries.reserve(field_count);

        for _ in 0..field_count {
            let phrase = names.next_phrase(rng);
            let kind = self.registry.pick_kind(rng)?;
            schema.push(self.registry, &phrase, kind, self.policy)?;
        }

        tracing::debug!(fields = schema.len(), live = schema.live_len(), "schema built");
        Ok(schema)
    }
}
