//! Human-readable field names.
//!
//! Field names come from short multi-word phrases. [`Babbler`] draws them
//! from a fixed word list, and [`normalize_phrase`] turns a phrase into the
//! wire key and the internal identifier of a field.

use rand::seq::SliceRandom;
use rand::RngCore;

/// Source of candidate field-name phrases.
pub trait NameSource {
    fn next_phrase(&mut self, rng: &mut dyn RngCore) -> String;
}

impl<F: FnMut() -> String> NameSource for F {
    fn next_phrase(&mut self, _rng: &mut dyn RngCore) -> String {
        self()
    }
}

const WORDS: &[&str] = &[
    "amber", "anchor", "apple", "arch", "arrow", "aspen", "atlas", "autumn", "badger", "bamboo",
    "banner", "basin", "beacon", "birch", "bison", "blaze", "bloom", "bolt", "breeze", "brick",
    "bridge", "brook", "cabin", "cactus", "canyon", "cedar", "chalk", "cinder", "clover", "cobalt",
    "comet", "copper", "coral", "cotton", "crane", "creek", "crystal", "cypress", "dawn", "delta",
    "dune", "dusk", "eagle", "echo", "ember", "falcon", "fern", "fjord", "flint", "forest",
    "fossil", "fox", "frost", "garnet", "geyser", "glacier", "granite", "gravel", "grove", "harbor",
    "hazel", "heron", "hollow", "horizon", "iris", "island", "ivory", "jade", "jasper", "juniper",
    "kelp", "kestrel", "lagoon", "lantern", "larch", "lava", "lemon", "lichen", "lily", "linen",
    "lotus", "lynx", "magnet", "maple", "marble", "marsh", "meadow", "mesa", "meteor", "mist",
    "moss", "moth", "nectar", "nickel", "oak", "oasis", "ocean", "onyx", "orbit", "orchid",
    "otter", "owl", "pebble", "pepper", "pine", "plume", "polar", "poppy", "prairie", "quartz",
    "quill", "rain", "raven", "reed", "reef", "ridge", "river", "robin", "rust", "saddle",
    "saffron", "sage", "salmon", "sand", "sapphire", "shadow", "shale", "shell", "sierra", "silver",
    "slate", "sparrow", "spruce", "stone", "storm", "summit", "swallow", "tangle", "thistle", "thunder",
    "tide", "timber", "topaz", "tundra", "tulip", "valley", "velvet", "violet", "walnut", "willow",
    "winter", "wren", "yarrow", "zephyr", "zinc",
];

/// Random multi-word phrase generator.
#[derive(Debug, Clone)]
pub struct Babbler {
    pub count: usize,
    pub separator: String,
}

impl Default for Babbler {
    fn default() -> Self {
        Self {
            count: 3,
            separator: "_".to_string(),
        }
    }
}

impl Babbler {
    pub fn babble(&self, rng: &mut dyn RngCore) -> String {
        let mut words = Vec::with_capacity(self.count);
        for _ in 0..self.count {
            if let Some(w) = WORDS.choose(rng) {
                words.push(*w);
            }
        }
        words.join(&self.separator)
    }
}

impl NameSource for Babbler {
    fn next_phrase(&mut self, rng: &mut dyn RngCore) -> String {
        self.babble(rng)
    }
}

/// Normalized forms of one phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldName {
    /// Lowercase words joined by `_`.
    pub wire_key: String,
    /// Title-cased words with separators removed.
    pub ident: String,
}

/// Prefix for idents that would otherwise start with a digit.
const DIGIT_PREFIX: &str = "F";

/// Keeps ASCII letters and digits only. Returns `None` when nothing is left.
///
/// The ident always starts with a letter.
pub fn normalize_phrase(phrase: &str) -> Option<FieldName> {
    let words: Vec<String> = phrase
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .map(|w| w.chars().filter(char::is_ascii_alphanumeric).collect::<String>())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_lowercase())
        .collect();

    if words.is_empty() {
        return None;
    }

    let wire_key = words.join("_");
    let mut ident: String = words.iter().map(|w| title_case(w)).collect();
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert_str(0, DIGIT_PREFIX);
    }
    Some(FieldName { wire_key, ident })
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
