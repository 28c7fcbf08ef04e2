//! Type registry: one generator and one extractor per field kind.
//!
//! A [`RegistryBuilder`] collects entries at startup and freezes them into an
//! immutable [`Registry`]. The three built-in kinds live in a process-wide
//! instance returned by [`Registry::builtin`].

use crate::error::{ExtractError, SchemaError};
use crate::value::{FieldKind, Value};
use rand::{Rng, RngCore};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use uuid::Uuid;

/// Produces a fresh value of one kind.
pub type Generator = fn(&mut dyn RngCore) -> Value;

/// Parses a raw string into the destination slot.
pub type Extractor = fn(&str, &mut Value) -> Result<(), ExtractError>;

#[derive(Clone, Copy)]
pub struct KindEntry {
    pub kind: FieldKind,
    pub generator: Generator,
    pub extractor: Extractor,
}

impl std::fmt::Debug for KindEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindEntry").field("kind", &self.kind).finish()
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: BTreeMap<FieldKind, KindEntry>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `kind`, replacing any earlier entry for it.
    pub fn register(mut self, kind: FieldKind, generator: Generator, extractor: Extractor) -> Self {
        self.entries.insert(
            kind,
            KindEntry {
                kind,
                generator,
                extractor,
            },
        );
        self
    }

    pub fn with_builtins(self) -> Self {
        self.register(FieldKind::Identifier, gen_identifier, extract_identifier)
            .register(FieldKind::SmallUint, gen_small_uint, extract_small_uint)
            .register(FieldKind::Uuid, gen_uuid, extract_uuid)
    }

    pub fn build(self) -> Registry {
        let kinds = self.entries.keys().copied().collect();
        Registry {
            entries: self.entries,
            kinds,
        }
    }
}

/// Frozen kind table.
#[derive(Debug)]
pub struct Registry {
    entries: BTreeMap<FieldKind, KindEntry>,
    kinds: Vec<FieldKind>,
}

impl Registry {
    /// Process-wide registry holding every built-in kind.
    pub fn builtin() -> &'static Registry {
        static BUILTIN: OnceLock<Registry> = OnceLock::new();
        BUILTIN.get_or_init(|| RegistryBuilder::new().with_builtins().build())
    }

    /// Registered kinds in a stable order.
    pub fn kinds(&self) -> &[FieldKind] {
        &self.kinds
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn entry(&self, kind: FieldKind) -> Result<KindEntry, SchemaError> {
        self.entries
            .get(&kind)
            .copied()
            .ok_or(SchemaError::UnregisteredKind(kind))
    }

    pub fn generator_for(&self, kind: FieldKind) -> Result<Generator, SchemaError> {
        self.entry(kind).map(|e| e.generator)
    }

    pub fn extractor_for(&self, kind: FieldKind) -> Result<Extractor, SchemaError> {
        self.entry(kind).map(|e| e.extractor)
    }

    /// Picks a registered kind uniformly at random.
    pub fn pick_kind(&self, rng: &mut dyn RngCore) -> Result<FieldKind, SchemaError> {
        if self.kinds.is_empty() {
            return Err(SchemaError::EmptyRegistry);
        }
        Ok(self.kinds[rng.gen_range(0..self.kinds.len())])
    }
}

/// Version-4 UUID built from the injected random source.
pub fn random_v4(rng: &mut dyn RngCore) -> Uuid {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

fn gen_identifier(rng: &mut dyn RngCore) -> Value {
    Value::Identifier(random_v4(rng).hyphenated().to_string())
}

fn gen_small_uint(rng: &mut dyn RngCore) -> Value {
    Value::SmallUint(rng.gen::<u16>())
}

fn gen_uuid(rng: &mut dyn RngCore) -> Value {
    Value::Uuid(random_v4(rng))
}

const CANONICAL_UUID_LEN: usize = 36;

/// Accepts only the canonical rendering produced by [`gen_identifier`].
fn extract_identifier(src: &str, dest: &mut Value) -> Result<(), ExtractError> {
    let kind = FieldKind::Identifier;
    if src.is_empty() {
        return Err(ExtractError::new(kind, src, "empty identifier"));
    }
    if src.len() != CANONICAL_UUID_LEN {
        return Err(ExtractError::new(
            kind,
            src,
            format!("expected {CANONICAL_UUID_LEN} characters, got {}", src.len()),
        ));
    }
    let parsed = Uuid::try_parse(src).map_err(|e| ExtractError::new(kind, src, e.to_string()))?;
    if parsed.hyphenated().to_string() != src {
        return Err(ExtractError::new(kind, src, "not in canonical lowercase form"));
    }
    *dest = Value::Identifier(src.to_string());
    Ok(())
}

fn extract_small_uint(src: &str, dest: &mut Value) -> Result<(), ExtractError> {
    let n = src
        .parse::<u16>()
        .map_err(|e| ExtractError::new(FieldKind::SmallUint, src, e.to_string()))?;
    *dest = Value::SmallUint(n);
    Ok(())
}

fn extract_uuid(src: &str, dest: &mut Value) -> Result<(), ExtractError> {
    let u = Uuid::parse_str(src).map_err(|e| ExtractError::new(FieldKind::Uuid, src, e.to_string()))?;
    *dest = Value::Uuid(u);
    Ok(())
}
