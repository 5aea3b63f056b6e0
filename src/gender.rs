//! Contributor gender tally from given names.
//!
//! Names are guessed with the `gender_guesser` name dictionary. An optional
//! lexicon file of `name<TAB>gender` lines takes precedence over it.

use crate::error::{MetricsError, Result};
use gender_guesser::Detector;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
    /// Androgynous: used for both
    Andy,
    Unknown,
    MostlyMale,
    MostlyFemale,
}

impl Gender {
    /// Reporting order
    pub const ALL: [Gender; 6] = [
        Gender::Male,
        Gender::Female,
        Gender::Andy,
        Gender::Unknown,
        Gender::MostlyMale,
        Gender::MostlyFemale,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Andy => "andy",
            Gender::Unknown => "unknown",
            Gender::MostlyMale => "mostly_male",
            Gender::MostlyFemale => "mostly_female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self> {
        Gender::ALL
            .into_iter()
            .find(|g| g.as_str() == s.trim())
            .ok_or_else(|| MetricsError::Parse(format!("unknown gender category '{}'", s)))
    }
}

/// Anything that can guess a gender from given names
pub trait GenderGuess {
    fn guess(&self, given_names: &str) -> Gender;
}

impl From<gender_guesser::Gender> for Gender {
    fn from(gender: gender_guesser::Gender) -> Self {
        match gender {
            gender_guesser::Gender::Male => Gender::Male,
            gender_guesser::Gender::Female => Gender::Female,
            gender_guesser::Gender::MayBeMale => Gender::MostlyMale,
            gender_guesser::Gender::MayBeFemale => Gender::MostlyFemale,
            gender_guesser::Gender::BothMaleFemale => Gender::Andy,
            _ => Gender::Unknown,
        }
    }
}

/// Try the full given names, then the first word of a compound name
/// ("Krzysztof J." -> "Krzysztof").
fn guess_with<F>(given_names: &str, lookup: F) -> Option<Gender>
where
    F: Fn(&str) -> Option<Gender>,
{
    let full = given_names.trim();
    lookup(full).or_else(|| full.split_whitespace().next().and_then(lookup))
}

/// Case-insensitive name to gender lookup
#[derive(Debug, Clone, Default)]
pub struct GenderLexicon {
    names: HashMap<String, Gender>,
}

impl GenderLexicon {
    pub fn insert(&mut self, name: &str, gender: Gender) {
        self.names.insert(name.trim().to_lowercase(), gender);
    }

    /// Load `name<TAB>gender` lines. Lines starting with `#` are comments.
    pub fn from_tsv_path(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .from_path(path)?;

        let mut lexicon = GenderLexicon::default();
        for record in reader.records() {
            let record = record?;
            let (Some(name), Some(gender)) = (record.get(0), record.get(1)) else {
                return Err(MetricsError::Parse(format!(
                    "lexicon line {} needs a name and a gender",
                    record.position().map(|p| p.line()).unwrap_or_default()
                )));
            };
            lexicon.insert(name, gender.parse()?);
        }

        info!(path = %path.display(), names = lexicon.len(), "Loaded gender lexicon");
        Ok(lexicon)
    }

    pub fn get(&self, name: &str) -> Option<Gender> {
        self.names.get(&name.trim().to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl GenderGuess for GenderLexicon {
    fn guess(&self, given_names: &str) -> Gender {
        guess_with(given_names, |name| self.get(name)).unwrap_or(Gender::Unknown)
    }
}

/// The bundled name dictionary, with optional lexicon overrides
pub struct NameDictionary {
    detector: Detector,
    overrides: GenderLexicon,
}

impl NameDictionary {
    pub fn new() -> Self {
        Self {
            detector: Detector::new(),
            overrides: GenderLexicon::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: GenderLexicon) -> Self {
        self.overrides = overrides;
        self
    }

    fn lookup(&self, name: &str) -> Option<Gender> {
        self.overrides.get(name).or_else(|| {
            match Gender::from(self.detector.get_gender(name)) {
                Gender::Unknown => None,
                gender => Some(gender),
            }
        })
    }
}

impl Default for NameDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl GenderGuess for NameDictionary {
    fn guess(&self, given_names: &str) -> Gender {
        guess_with(given_names, |name| self.lookup(name)).unwrap_or(Gender::Unknown)
    }
}

/// Number of contributors per gender category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenderTally {
    counts: HashMap<Gender, usize>,
}

impl GenderTally {
    pub fn count(&self, gender: Gender) -> usize {
        self.counts.get(&gender).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Every category in reporting order, zero counts included
    pub fn entries(&self) -> impl Iterator<Item = (Gender, usize)> + '_ {
        Gender::ALL.into_iter().map(|g| (g, self.count(g)))
    }
}

pub fn tally<'a, G, I>(guesser: &G, given_names: I) -> GenderTally
where
    G: GenderGuess + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    let mut tally = GenderTally::default();
    for name in given_names {
        let guess = guesser.guess(name);
        debug!(name = name, guess = %guess, "Guessed gender");
        *tally.counts.entry(guess).or_insert(0) += 1;
    }
    tally
}
