use std::collections::{BTreeMap, HashMap};
use std::fmt;

use lazy_static::lazy_static;
use serde::Serialize;

use crate::brands::BrandDictionary;
use crate::domain::Domain;

const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

lazy_static! {
    static ref KEYBOARD_PROXIMITY: HashMap<char, &'static str> = [
        ('a', "qwsz"), ('b', "vghn"), ('c', "xdfv"), ('d', "erfcxs"), ('e', "rdsw"),
        ('f', "rtgvcd"), ('g', "tyhbvf"), ('h', "yujnbg"), ('i', "uojk"), ('j', "uikmnh"),
        ('k', "iolmj"), ('l', "opk"), ('m', "njk"), ('n', "bhjm"), ('o', "pikl"),
        ('p', "ol"), ('q', "wa"), ('r', "etdf"), ('s', "wedxz"), ('t', "rfgy"),
        ('u', "yhji"), ('v', "cfgb"), ('w', "qase"), ('x', "zsdc"), ('y', "tghu"),
        ('z', "asx"),
    ]
    .into_iter()
    .collect();

    static ref PHONETIC: HashMap<char, &'static str> = [
        ('a', "4"), ('e', "3"), ('i', "1"), ('o', "0"), ('s', "5"), ('g', "9"),
    ]
    .into_iter()
    .collect();

    static ref HOMOGLYPHS: HashMap<char, &'static str> = [
        ('a', "@"), ('e', "3"), ('i', "1"), ('o', "0"), ('c', "("), ('l', "1"),
    ]
    .into_iter()
    .collect();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationFamily {
    Transposition,
    Deletion,
    Duplication,
    Insertion,
    Substitution,
    Keyboard,
    Phonetic,
    Homoglyph,
    BrandMisspelling,
}

impl MutationFamily {
    /// Application order; a domain reached by several families keeps the first.
    pub const ALL: [MutationFamily; 9] = [
        MutationFamily::Transposition,
        MutationFamily::Deletion,
        MutationFamily::Duplication,
        MutationFamily::Insertion,
        MutationFamily::Substitution,
        MutationFamily::Keyboard,
        MutationFamily::Phonetic,
        MutationFamily::Homoglyph,
        MutationFamily::BrandMisspelling,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MutationFamily::Transposition => "transposition",
            MutationFamily::Deletion => "deletion",
            MutationFamily::Duplication => "duplication",
            MutationFamily::Insertion => "insertion",
            MutationFamily::Substitution => "substitution",
            MutationFamily::Keyboard => "keyboard",
            MutationFamily::Phonetic => "phonetic",
            MutationFamily::Homoglyph => "homoglyph",
            MutationFamily::BrandMisspelling => "brand-misspelling",
        }
    }
}

impl fmt::Display for MutationFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Candidate {
    pub domain: String,
    pub family: MutationFamily,
}

#[derive(Debug, Clone, Default)]
pub struct Generator {
    brands: BrandDictionary,
}

impl Generator {
    pub fn new(brands: BrandDictionary) -> Self {
        Self { brands }
    }

    /// Union of every mutation family, sorted by domain, never containing
    /// the input domain itself.
    pub fn generate(&self, domain: &Domain) -> Vec<Candidate> {
        let original = domain.to_string();
        let mut variations: BTreeMap<String, MutationFamily> = BTreeMap::new();

        for family in MutationFamily::ALL {
            for variation in self.mutate(domain, family) {
                variations.entry(variation).or_insert(family);
            }
        }

        // Deleting the only character of a one-letter label leaves nothing to register.
        variations.remove(&original);
        variations.retain(|variation, _| !variation.starts_with('.'));

        variations
            .into_iter()
            .map(|(domain, family)| Candidate { domain, family })
            .collect()
    }

    /// Raw output of a single family, before deduplication.
    pub fn mutate(&self, domain: &Domain, family: MutationFamily) -> Vec<String> {
        let (name, tld) = (domain.label(), domain.extension());
        match family {
            MutationFamily::Transposition => generate_transpositions(name, tld),
            MutationFamily::Deletion => generate_omission(name, tld),
            MutationFamily::Duplication => generate_repetition(name, tld),
            MutationFamily::Insertion => generate_insertions(name, tld),
            MutationFamily::Substitution => generate_substitutions(name, tld),
            MutationFamily::Keyboard => generate_from_table(name, tld, &KEYBOARD_PROXIMITY),
            MutationFamily::Phonetic => generate_from_table(name, tld, &PHONETIC),
            MutationFamily::Homoglyph => generate_from_table(name, tld, &HOMOGLYPHS),
            MutationFamily::BrandMisspelling => generate_brand_misspellings(name, tld, &self.brands),
        }
    }
}

fn replace_at(chars: &[char], pos: usize, replacement: char) -> String {
    chars
        .iter()
        .enumerate()
        .map(|(i, &ch)| if i == pos { replacement } else { ch })
        .collect()
}

fn generate_transpositions(domain: &str, tld: &str) -> Vec<String> {
    let mut variations = Vec::new();
    let chars: Vec<char> = domain.chars().collect();

    for i in 0..chars.len().saturating_sub(1) {
        let mut swapped = chars.clone();
        swapped.swap(i, i + 1);
        let new_domain: String = swapped.into_iter().collect();
        variations.push(format!("{}.{}", new_domain, tld));
    }

    variations
}

fn generate_omission(domain: &str, tld: &str) -> Vec<String> {
    let mut variations = Vec::new();
    let chars: Vec<char> = domain.chars().collect();

    for i in 0..chars.len() {
        let new_domain: String = chars[..i].iter().chain(&chars[i + 1..]).collect();
        variations.push(format!("{}.{}", new_domain, tld));
    }

    variations
}

fn generate_repetition(domain: &str, tld: &str) -> Vec<String> {
    let mut variations = Vec::new();
    let chars: Vec<char> = domain.chars().collect();

    for (i, &ch) in chars.iter().enumerate() {
        let mut repeated = chars.clone();
        repeated.insert(i, ch);
        let new_domain: String = repeated.into_iter().collect();
        variations.push(format!("{}.{}", new_domain, tld));
    }

    variations
}

fn generate_insertions(domain: &str, tld: &str) -> Vec<String> {
    let mut variations = Vec::new();
    let chars: Vec<char> = domain.chars().collect();

    for i in 0..=chars.len() {
        for ch in ALPHABET.chars() {
            let mut inserted = chars.clone();
            inserted.insert(i, ch);
            let new_domain: String = inserted.into_iter().collect();
            variations.push(format!("{}.{}", new_domain, tld));
        }
    }

    variations
}

fn generate_substitutions(domain: &str, tld: &str) -> Vec<String> {
    let mut variations = Vec::new();
    let chars: Vec<char> = domain.chars().collect();

    for i in 0..chars.len() {
        for ch in ALPHABET.chars() {
            variations.push(format!("{}.{}", replace_at(&chars, i, ch), tld));
        }
    }

    variations
}

// One substitution per eligible position, one candidate per listed substitute.
fn generate_from_table(domain: &str, tld: &str, table: &HashMap<char, &'static str>) -> Vec<String> {
    let mut variations = Vec::new();
    let chars: Vec<char> = domain.chars().collect();

    for (i, ch) in chars.iter().enumerate() {
        if let Some(substitutes) = table.get(ch) {
            for substitute in substitutes.chars() {
                variations.push(format!("{}.{}", replace_at(&chars, i, substitute), tld));
            }
        }
    }

    variations
}

fn generate_brand_misspellings(domain: &str, tld: &str, brands: &BrandDictionary) -> Vec<String> {
    brands
        .misspellings(domain)
        .iter()
        .map(|misspelling| format!("{}.{}", misspelling, tld))
        .collect()
}
