//! Disease probability models used to weight phenotype reveals

use serde::{Deserialize, Serialize};
use shared::{DiseaseId, OracleResult, TermId};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::catalog::DiseaseCatalog;

/// Default decay rate of [`DiseaseProbabilityModel::ExponentialDecay`]
pub const DEFAULT_LAMBDA: f64 = 0.5;

/// How likely each target disease is taken to be the true diagnosis
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "camelCase")]
pub enum DiseaseProbabilityModel {
    /// Proportional to the baseline posttest probability
    #[default]
    Ranked,
    /// Proportional to exp(posttest probability)
    Softmax,
    /// Proportional to exp(-lambda * rank) among the targets
    ExponentialDecay { lambda: f64 },
}

impl fmt::Display for DiseaseProbabilityModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ranked => write!(f, "ranked"),
            Self::Softmax => write!(f, "softmax"),
            Self::ExponentialDecay { lambda } => write!(f, "expDecay(lambda={lambda})"),
        }
    }
}

impl FromStr for DiseaseProbabilityModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ranked" => Ok(Self::Ranked),
            "softmax" => Ok(Self::Softmax),
            "expdecay" => Ok(Self::ExponentialDecay {
                lambda: DEFAULT_LAMBDA,
            }),
            other => Err(format!(
                "unknown probability model '{other}', expected ranked, softmax or expDecay"
            )),
        }
    }
}

impl DiseaseProbabilityModel {
    /// Normalised probability of every target ranked in `baseline`
    ///
    /// Targets are weighted in baseline order; targets the baseline does not
    /// rank get no entry. Falls back to a uniform distribution when every
    /// weight is zero.
    pub fn probabilities(
        &self,
        baseline: &OracleResult,
        targets: &[DiseaseId],
    ) -> BTreeMap<DiseaseId, f64> {
        let ranked: Vec<_> = baseline
            .iter()
            .filter(|c| targets.contains(&c.disease_id))
            .collect();

        let weights: Vec<f64> = ranked
            .iter()
            .enumerate()
            .map(|(idx, candidate)| match self {
                Self::Ranked => candidate.posttest_probability.max(0.0),
                Self::Softmax => candidate.posttest_probability.exp(),
                Self::ExponentialDecay { lambda } => (-lambda * (idx + 1) as f64).exp(),
            })
            .collect();

        let total: f64 = weights.iter().sum();
        let uniform = 1.0 / ranked.len().max(1) as f64;
        ranked
            .into_iter()
            .zip(weights)
            .map(|(candidate, weight)| {
                let p = if total > 0.0 { weight / total } else { uniform };
                (candidate.disease_id.clone(), p)
            })
            .collect()
    }
}

/// Probability that ordering a test reveals `term`
///
/// Sum over diseases of P(disease) times the term's frequency in that
/// disease, clamped to [0, 1].
pub fn reveal_probability(
    term: &TermId,
    disease_probabilities: &BTreeMap<DiseaseId, f64>,
    catalog: &DiseaseCatalog,
) -> f64 {
    disease_probabilities
        .iter()
        .filter_map(|(disease, p)| catalog.frequency(disease, term).map(|f| p * f))
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::Disease;
    use shared::{DiagnosisCandidate, Term};

    fn id(s: &str) -> TermId {
        TermId::parse(s).unwrap()
    }

    fn baseline() -> OracleResult {
        OracleResult::from_unsorted(vec![
            DiagnosisCandidate::new(id("OMIM:1"), 0.6, 6.0),
            DiagnosisCandidate::new(id("OMIM:2"), 0.3, 3.0),
            DiagnosisCandidate::new(id("OMIM:3"), 0.1, 1.0),
        ])
    }

    #[test]
    fn test_ranked_model_normalises_over_targets() {
        let targets = [id("OMIM:1"), id("OMIM:2")];
        let probs = DiseaseProbabilityModel::Ranked.probabilities(&baseline(), &targets);
        assert_eq!(probs.len(), 2);
        assert!((probs[&id("OMIM:1")] - 2.0 / 3.0).abs() < 1e-12);
        assert!((probs.values().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_decay_and_softmax_prefer_higher_ranks() {
        let targets = [id("OMIM:1"), id("OMIM:2"), id("OMIM:3")];
        for model in [
            DiseaseProbabilityModel::Softmax,
            DiseaseProbabilityModel::ExponentialDecay { lambda: 1.0 },
        ] {
            let probs = model.probabilities(&baseline(), &targets);
            assert!(probs[&id("OMIM:1")] > probs[&id("OMIM:2")]);
            assert!(probs[&id("OMIM:2")] > probs[&id("OMIM:3")]);
            assert!((probs.values().sum::<f64>() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_weights_fall_back_to_uniform() {
        let baseline = OracleResult::from_unsorted(vec![
            DiagnosisCandidate::new(id("OMIM:1"), 0.0, 0.0),
            DiagnosisCandidate::new(id("OMIM:2"), 0.0, 0.0),
        ]);
        let probs = DiseaseProbabilityModel::Ranked.probabilities(&baseline, &[id("OMIM:1"), id("OMIM:2")]);
        assert_eq!(probs[&id("OMIM:2")], 0.5);
    }

    #[test]
    fn test_reveal_probability_weights_frequencies() {
        let catalog = DiseaseCatalog::new(
            vec![
                Disease::new(id("OMIM:1"), "A").with_annotation(Term::new(id("HP:1"), ""), Some(0.5)),
                Disease::new(id("OMIM:2"), "B").with_annotation(Term::new(id("HP:1"), ""), None),
            ],
            1.0,
        )
        .unwrap();
        let probs = BTreeMap::from([(id("OMIM:1"), 0.4), (id("OMIM:2"), 0.6)]);
        let p = reveal_probability(&id("HP:1"), &probs, &catalog);
        assert!((p - (0.4 * 0.5 + 0.6)).abs() < 1e-12);
        assert_eq!(reveal_probability(&id("HP:404"), &probs, &catalog), 0.0);
    }

    #[test]
    fn test_model_parsing() {
        assert_eq!(
            "expDecay".parse::<DiseaseProbabilityModel>(),
            Ok(DiseaseProbabilityModel::ExponentialDecay { lambda: DEFAULT_LAMBDA })
        );
        assert!("gaussian".parse::<DiseaseProbabilityModel>().is_err());
    }
}
