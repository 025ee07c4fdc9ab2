//! Text folding and alias resolution for free-text country guesses.

use std::collections::HashMap;

use unicode_normalization::UnicodeNormalization;

/// Byte sequences produced by UTF-8 text decoded as Latin-1, paired with the intended character.
const MOJIBAKE_REPAIRS: &[(&str, &str)] = &[
    ("\u{00C3}\u{00A1}", "\u{00E1}"),
    ("\u{00C3}\u{00A9}", "\u{00E9}"),
    ("\u{00C3}\u{00AD}", "\u{00ED}"),
    ("\u{00C3}\u{00B3}", "\u{00F3}"),
    ("\u{00C3}\u{00BA}", "\u{00FA}"),
    ("\u{00C3}\u{00A3}", "\u{00E3}"),
    ("\u{00C3}\u{00B5}", "\u{00F5}"),
    ("\u{00C3}\u{00A7}", "\u{00E7}"),
    ("\u{00C3}\u{00B4}", "\u{00F4}"),
    ("\u{00C3}\u{00AB}", "\u{00EB}"),
    ("\u{00C3}\u{00BC}", "\u{00FC}"),
    ("\u{00C3}\u{00B1}", "\u{00F1}"),
    ("\u{00C5}\u{009F}", "\u{015F}"),
    ("\u{00C4}\u{0083}", "\u{0103}"),
];

/// Phrase rewrites applied, in order, after folding a country name.
const CANONICAL_REWRITES: &[(&str, &str)] = &[
    ("united states of america", "united states"),
    (
        "united kingdom of great britain and northern ireland",
        "united kingdom",
    ),
    ("republic of serbia", "serbia"),
    ("united republic of tanzania", "tanzania"),
    ("eswatini", "swaziland"),
    ("cabo verde", "cape verde"),
    ("saint", "st"),
    ("republic of the congo", "republic congo"),
    ("republic of congo", "republic congo"),
    ("democratic republic of the congo", "dr congo"),
    ("democratic republic of congo", "dr congo"),
];

/// Names used by the world map for some of the reference countries.
const WORLD_MAP_NAMES: &[(&str, &str)] = &[
    ("Czech Republic", "Czechia"),
    ("Macedonia", "North Macedonia"),
    ("Swaziland", "Eswatini"),
    ("Timor-Leste", "East Timor"),
    ("Cote d'Ivoire", "Ivory Coast"),
    ("C\u{00F4}te d'Ivoire", "Ivory Coast"),
    ("Cote dIvoire", "Ivory Coast"),
    ("Republic of the Congo", "Republic of Congo"),
    ("Vatican", "Vatican City"),
    ("Cape Verde", "Cabo Verde"),
    ("Tanzania", "United Republic of Tanzania"),
    ("United States", "United States of America"),
];

/// Extra spellings accepted for a reference country.
const NAME_VARIANTS: &[(&str, &[&str])] = &[
    ("Tanzania", &["United Republic of Tanzania"]),
    ("Swaziland", &["Eswatini", "eSwatini"]),
    (
        "Republic of the Congo",
        &["Republic of Congo", "Congo", "Congo Brazzaville"],
    ),
    (
        "Democratic Republic of the Congo",
        &[
            "Democratic Republic of Congo",
            "Dem Rep Congo",
            "Congo Kinshasa",
        ],
    ),
    ("Cape Verde", &["Cabo Verde"]),
    ("Sao Tome and Principe", &["Sao Tome & Principe"]),
    ("United States", &["United States of America", "USA", "US"]),
    (
        "United Kingdom",
        &[
            "United Kingdom of Great Britain and Northern Ireland",
            "Great Britain",
            "UK",
            "Britain",
            "England",
            "Scotland",
            "Wales",
            "Northern Ireland",
        ],
    ),
    ("Serbia", &["Republic of Serbia"]),
    ("Saint Lucia", &["St Lucia", "St. Lucia"]),
    ("Saint Kitts and Nevis", &["St Kitts and Nevis", "St. Kitts and Nevis"]),
    (
        "Saint Vincent and the Grenadines",
        &[
            "St Vincent and the Grenadines",
            "St. Vincent and the Grenadines",
        ],
    ),
    ("Kosovo", &["Republic of Kosovo"]),
    ("United Arab Emirates", &["UAE", "U.A.E."]),
    ("Central African Republic", &["CAR", "C.A.R."]),
];

/// Shorthand and native spellings players type, mapped to the reference name they mean.
///
/// An alias only becomes resolvable when its target is part of the candidate set.
const GUESS_ALIASES: &[(&str, &str)] = &[
    ("usa", "United States"),
    ("us", "United States"),
    ("united states of america", "United States"),
    ("uk", "United Kingdom"),
    ("ivory coast", "C\u{00F4}te d'Ivoire"),
    ("czechia", "Czech Republic"),
    ("north macedonia", "Macedonia"),
    ("eswatini", "Swaziland"),
    ("east timor", "Timor-Leste"),
    ("drc", "Democratic Republic of the Congo"),
    (
        "democratic republic of congo",
        "Democratic Republic of the Congo",
    ),
    ("dem rep congo", "Democratic Republic of the Congo"),
    ("congo kinshasa", "Democratic Republic of the Congo"),
    ("republic of congo", "Republic of the Congo"),
    ("republic of the congo", "Republic of the Congo"),
    ("congo brazzaville", "Republic of the Congo"),
    ("congo", "Republic of the Congo"),
    ("vatican city", "Vatican"),
    ("united republic of tanzania", "Tanzania"),
    ("tanzania united republic of", "Tanzania"),
    ("cape verde", "Cape Verde"),
    ("cabo verde", "Cape Verde"),
    ("st lucia", "Saint Lucia"),
    ("st kitts and nevis", "Saint Kitts and Nevis"),
    (
        "st vincent and the grenadines",
        "Saint Vincent and the Grenadines",
    ),
    ("uae", "United Arab Emirates"),
    ("u a e", "United Arab Emirates"),
    ("car", "Central African Republic"),
    ("c a r", "Central African Republic"),
    ("deutschland", "Germany"),
    ("espana", "Spain"),
    ("italia", "Italy"),
    ("osterreich", "Austria"),
    ("schweiz", "Switzerland"),
    ("suisse", "Switzerland"),
    ("nederland", "Netherlands"),
    ("holland", "Netherlands"),
    ("belgique", "Belgium"),
    ("sverige", "Sweden"),
    ("norge", "Norway"),
    ("danmark", "Denmark"),
    ("suomi", "Finland"),
    ("polska", "Poland"),
    ("hellas", "Greece"),
    ("brasil", "Brazil"),
    ("nippon", "Japan"),
];

/// Undo common double-encoding damage in reference strings.
pub fn repair_mojibake(input: &str) -> String {
    MOJIBAKE_REPAIRS
        .iter()
        .fold(input.to_owned(), |text, (broken, fixed)| {
            text.replace(broken, fixed)
        })
}

/// Lowercase, strip combining accents, and collapse whitespace.
///
/// Two answers are considered equal when their normalized forms are equal.
pub fn normalize_text(input: &str) -> String {
    let lowered = repair_mojibake(input).trim().to_lowercase();
    strip_accents(&lowered)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fold a country name (or a guess) into the key space used by [`CountryLookup`].
pub fn normalize_country_name(input: &str) -> String {
    let folded = strip_accents(&input.to_lowercase())
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>();
    let mut text = folded.split_whitespace().collect::<Vec<_>>().join(" ");

    for (from, to) in CANONICAL_REWRITES {
        text = replace_phrase(&text, from, to);
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_accents(input: &str) -> String {
    input
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect()
}

/// Replace whole-word occurrences of `from` in a single-space separated string.
fn replace_phrase(text: &str, from: &str, to: &str) -> String {
    let needle = format!(" {from} ");
    let replacement = format!(" {to} ");
    let mut padded = format!(" {text} ");
    let mut offset = 0;

    while let Some(found) = padded[offset..].find(&needle) {
        let start = offset + found;
        padded.replace_range(start..start + needle.len(), &replacement);
        // keep the trailing space so an adjacent match still sees its leading boundary
        offset = start + replacement.len() - 1;
    }

    padded.trim().to_owned()
}

/// Resolution table from folded spellings to canonical names within a candidate set.
#[derive(Debug, Clone, Default)]
pub struct CountryLookup {
    entries: HashMap<String, String>,
}

impl CountryLookup {
    /// Build the table for exactly these candidate names.
    pub fn build(candidates: &[String]) -> Self {
        let mut entries = HashMap::new();

        for name in candidates {
            entries.insert(normalize_country_name(name), name.clone());
            for variant in world_variants(name) {
                entries.insert(normalize_country_name(variant), name.clone());
            }
        }

        for (alias, target) in GUESS_ALIASES {
            if candidates.iter().any(|candidate| candidate == target) {
                entries.insert(normalize_country_name(alias), (*target).to_owned());
            }
        }

        Self { entries }
    }

    /// Map a free-text guess to the canonical candidate it names, if any.
    pub fn resolve(&self, guess: &str) -> Option<&str> {
        let key = normalize_country_name(guess);
        if key.is_empty() {
            return None;
        }
        self.entries.get(&key).map(String::as_str)
    }
}

fn world_variants(name: &str) -> impl Iterator<Item = &'static str> + '_ {
    let mapped = WORLD_MAP_NAMES
        .iter()
        .filter(move |(local, _)| *local == name)
        .map(|(_, world)| *world);
    let variants = NAME_VARIANTS
        .iter()
        .filter(move |(local, _)| *local == name)
        .flat_map(|(_, variants)| variants.iter().copied());
    mapped.chain(variants)
}
