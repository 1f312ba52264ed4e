//! Policies for choosing which discoverable phenotypes a repetition reveals

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::TermId;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SamplingPolicy {
    /// Reveal every discoverable term in every repetition
    #[default]
    FullReveal,
    /// Uniform subset size in `1..=n`, then a uniform subset of that size
    RandomSubset,
    /// Each term revealed independently with its reveal probability
    FrequencyWeighted,
}

impl fmt::Display for SamplingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingPolicy::FullReveal => write!(f, "full"),
            SamplingPolicy::RandomSubset => write!(f, "random"),
            SamplingPolicy::FrequencyWeighted => write!(f, "frequency"),
        }
    }
}

impl FromStr for SamplingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" | "fullreveal" => Ok(SamplingPolicy::FullReveal),
            "random" | "randomsubset" => Ok(SamplingPolicy::RandomSubset),
            "frequency" | "frequencyweighted" => Ok(SamplingPolicy::FrequencyWeighted),
            other => Err(format!(
                "unknown sampling policy '{other}', expected full, random or frequency"
            )),
        }
    }
}

/// Draws revealed subsets for one policy
///
/// `reveal_probabilities` is only consulted by
/// [`SamplingPolicy::FrequencyWeighted`]; terms missing from it are never
/// revealed unless the fallback picks them.
#[derive(Debug, Clone)]
pub struct RevealSampler {
    policy: SamplingPolicy,
    reveal_probabilities: BTreeMap<TermId, f64>,
}

impl RevealSampler {
    pub fn new(policy: SamplingPolicy) -> Self {
        Self {
            policy,
            reveal_probabilities: BTreeMap::new(),
        }
    }

    pub fn with_reveal_probabilities(mut self, probabilities: BTreeMap<TermId, f64>) -> Self {
        self.reveal_probabilities = probabilities;
        self
    }

    /// Draw a subset of `discoverable`; non-empty whenever `discoverable` is
    pub fn draw<R: Rng>(&self, discoverable: &BTreeSet<TermId>, rng: &mut R) -> BTreeSet<TermId> {
        if discoverable.is_empty() {
            return BTreeSet::new();
        }
        match self.policy {
            SamplingPolicy::FullReveal => discoverable.clone(),
            SamplingPolicy::RandomSubset => {
                let terms: Vec<&TermId> = discoverable.iter().collect();
                let size = rng.gen_range(1..=terms.len());
                terms.choose_multiple(rng, size).map(|t| (*t).clone()).collect()
            }
            SamplingPolicy::FrequencyWeighted => {
                let drawn: BTreeSet<TermId> = discoverable
                    .iter()
                    .filter(|t| rng.gen_bool(self.probability_of(t)))
                    .cloned()
                    .collect();
                if drawn.is_empty() {
                    self.most_probable(discoverable).into_iter().collect()
                } else {
                    drawn
                }
            }
        }
    }

    fn probability_of(&self, term: &TermId) -> f64 {
        match self.reveal_probabilities.get(term) {
            Some(p) if p.is_finite() => p.clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// Highest reveal probability, earliest term on ties
    fn most_probable(&self, discoverable: &BTreeSet<TermId>) -> Option<TermId> {
        let mut best: Option<(&TermId, f64)> = None;
        for term in discoverable {
            let p = self.probability_of(term);
            if best.map_or(true, |(_, best_p)| p > best_p) {
                best = Some((term, p));
            }
        }
        best.map(|(term, _)| term.clone())
    }
}
