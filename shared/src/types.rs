//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::errors::{SharedError, SharedResult};

/// Stable ontology identifier such as `HP:0001250`, `MAXO:0000451` or `OMIM:154700`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TermId(String);

/// Diseases are identified with the same `PREFIX:LOCAL` scheme as terms
pub type DiseaseId = TermId;

impl TermId {
    /// Parse a `PREFIX:LOCAL` identifier; both parts must be non-empty and free of whitespace
    pub fn parse(input: &str) -> SharedResult<Self> {
        let trimmed = input.trim();
        match trimmed.split_once(':') {
            Some((prefix, local))
                if !prefix.is_empty()
                    && !local.is_empty()
                    && !trimmed.chars().any(char::is_whitespace) =>
            {
                Ok(Self(trimmed.to_string()))
            }
            _ => Err(SharedError::InvalidTermId {
                input: input.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> &str {
        self.0.split_once(':').map(|(prefix, _)| prefix).unwrap_or_default()
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TermId {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TermId {
    type Error = SharedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TermId> for String {
    fn from(id: TermId) -> Self {
        id.0
    }
}

/// Ontology term with its display label; identity is the identifier alone
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    #[serde(default)]
    pub label: String,
}

impl Term {
    pub fn new(id: TermId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }

    /// `label [ID]`, or the bare identifier when no label is known
    pub fn display(&self) -> String {
        if self.label.is_empty() {
            self.id.to_string()
        } else {
            format!("{} [{}]", self.label, self.id)
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

/// Present and excluded phenotype terms observed in one patient
///
/// Profiles are immutable: augmenting a profile with revealed terms yields a
/// new value and leaves the original untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawProfile", into = "RawProfile")]
pub struct PhenotypeProfile {
    id: String,
    present: BTreeSet<TermId>,
    excluded: BTreeSet<TermId>,
}

#[derive(Serialize, Deserialize)]
struct RawProfile {
    id: String,
    #[serde(default)]
    present: BTreeSet<TermId>,
    #[serde(default)]
    excluded: BTreeSet<TermId>,
}

impl PhenotypeProfile {
    pub fn new(
        id: impl Into<String>,
        present: impl IntoIterator<Item = TermId>,
        excluded: impl IntoIterator<Item = TermId>,
    ) -> SharedResult<Self> {
        let present: BTreeSet<TermId> = present.into_iter().collect();
        let excluded: BTreeSet<TermId> = excluded.into_iter().collect();
        if let Some(conflict) = present.intersection(&excluded).next() {
            return Err(SharedError::InvalidProfile {
                reason: format!("{conflict} is both present and excluded"),
            });
        }
        Ok(Self {
            id: id.into(),
            present,
            excluded,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn present(&self) -> &BTreeSet<TermId> {
        &self.present
    }

    pub fn excluded(&self) -> &BTreeSet<TermId> {
        &self.excluded
    }

    /// True when the term is already recorded, either as present or as excluded
    pub fn mentions(&self, term: &TermId) -> bool {
        self.present.contains(term) || self.excluded.contains(term)
    }

    /// New profile with `revealed` added to the present terms
    pub fn augmented<'a>(&self, revealed: impl IntoIterator<Item = &'a TermId>) -> SharedResult<Self> {
        let mut present = self.present.clone();
        present.extend(revealed.into_iter().cloned());
        Self::new(self.id.clone(), present, self.excluded.iter().cloned())
    }
}

impl TryFrom<RawProfile> for PhenotypeProfile {
    type Error = SharedError;

    fn try_from(raw: RawProfile) -> Result<Self, Self::Error> {
        Self::new(raw.id, raw.present, raw.excluded)
    }
}

impl From<PhenotypeProfile> for RawProfile {
    fn from(profile: PhenotypeProfile) -> Self {
        Self {
            id: profile.id,
            present: profile.present,
            excluded: profile.excluded,
        }
    }
}

/// One ranked disease returned by a diagnosis oracle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisCandidate {
    pub disease_id: DiseaseId,
    pub posttest_probability: f64,
    pub likelihood_ratio: f64,
}

impl DiagnosisCandidate {
    pub fn new(disease_id: DiseaseId, posttest_probability: f64, likelihood_ratio: f64) -> Self {
        Self {
            disease_id,
            posttest_probability,
            likelihood_ratio,
        }
    }
}

/// Position of a disease inside an [`OracleResult`]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedPosition {
    /// 1-based rank
    pub rank: usize,
    pub posttest_probability: f64,
    pub likelihood_ratio: f64,
}

/// Diseases ordered by descending posttest probability
///
/// Ties keep the order in which the oracle produced them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<DiagnosisCandidate>", into = "Vec<DiagnosisCandidate>")]
pub struct OracleResult {
    candidates: Vec<DiagnosisCandidate>,
}

impl OracleResult {
    /// Order candidates by descending posttest probability with a stable sort
    pub fn from_unsorted(mut candidates: Vec<DiagnosisCandidate>) -> Self {
        candidates.sort_by(|a, b| b.posttest_probability.total_cmp(&a.posttest_probability));
        Self { candidates }
    }

    pub fn candidates(&self) -> &[DiagnosisCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagnosisCandidate> {
        self.candidates.iter()
    }

    pub fn disease_ids(&self) -> impl Iterator<Item = &DiseaseId> {
        self.candidates.iter().map(|c| &c.disease_id)
    }

    /// Rank and scores of `disease_id`, or `None` when the oracle did not rank it
    pub fn position_of(&self, disease_id: &DiseaseId) -> Option<RankedPosition> {
        self.candidates
            .iter()
            .position(|c| &c.disease_id == disease_id)
            .map(|idx| {
                let candidate = &self.candidates[idx];
                RankedPosition {
                    rank: idx + 1,
                    posttest_probability: candidate.posttest_probability,
                    likelihood_ratio: candidate.likelihood_ratio,
                }
            })
    }

    /// The first `n` candidates
    pub fn top(&self, n: usize) -> Self {
        Self {
            candidates: self.candidates.iter().take(n).cloned().collect(),
        }
    }

    /// Diseases ranked strictly above `disease_id`
    pub fn ranked_above(&self, disease_id: &DiseaseId) -> &[DiagnosisCandidate] {
        match self.candidates.iter().position(|c| &c.disease_id == disease_id) {
            Some(idx) => &self.candidates[..idx],
            None => &[],
        }
    }
}

impl From<Vec<DiagnosisCandidate>> for OracleResult {
    fn from(candidates: Vec<DiagnosisCandidate>) -> Self {
        Self::from_unsorted(candidates)
    }
}

impl From<OracleResult> for Vec<DiagnosisCandidate> {
    fn from(result: OracleResult) -> Self {
        result.candidates
    }
}
