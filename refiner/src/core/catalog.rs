//! Disease catalog: diseases with their frequency-weighted phenotype annotations

use serde::{Deserialize, Serialize};
use shared::{DiseaseId, Term, TermId};
use std::collections::HashMap;

use crate::error::{RefinerError, RefinerResult};

/// A phenotype annotated to a disease with an optional frequency of occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhenotypeAnnotation {
    pub term: Term,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disease {
    pub id: DiseaseId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub annotations: Vec<PhenotypeAnnotation>,
}

impl Disease {
    pub fn new(id: DiseaseId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            annotations: Vec::new(),
        }
    }

    /// Builder-style helper used when assembling catalogs in code
    pub fn with_annotation(mut self, term: Term, frequency: Option<f64>) -> Self {
        self.annotations.push(PhenotypeAnnotation { term, frequency });
        self
    }

    pub fn phenotype_terms(&self) -> impl Iterator<Item = &Term> {
        self.annotations.iter().map(|a| &a.term)
    }

    fn annotation(&self, term: &TermId) -> Option<&PhenotypeAnnotation> {
        self.annotations.iter().find(|a| &a.term.id == term)
    }
}

/// Diseases keyed by identifier, kept in the order they were supplied
#[derive(Debug, Clone)]
pub struct DiseaseCatalog {
    diseases: Vec<Disease>,
    by_id: HashMap<DiseaseId, usize>,
    default_frequency: f64,
}

impl DiseaseCatalog {
    /// Build a catalog, rejecting duplicate identifiers and frequencies outside [0, 1]
    pub fn new(diseases: Vec<Disease>, default_frequency: f64) -> RefinerResult<Self> {
        let mut by_id = HashMap::with_capacity(diseases.len());
        for (idx, disease) in diseases.iter().enumerate() {
            if by_id.insert(disease.id.clone(), idx).is_some() {
                return Err(RefinerError::config(
                    "diseases",
                    format!("{} appears more than once", disease.id),
                ));
            }
            for annotation in &disease.annotations {
                if let Some(f) = annotation.frequency {
                    if !(0.0..=1.0).contains(&f) {
                        return Err(RefinerError::config(
                            "diseases",
                            format!(
                                "{} annotates {} with frequency {f} outside [0, 1]",
                                disease.id, annotation.term.id
                            ),
                        ));
                    }
                }
            }
        }
        Ok(Self {
            diseases,
            by_id,
            default_frequency,
        })
    }

    pub fn get(&self, id: &DiseaseId) -> Option<&Disease> {
        self.by_id.get(id).map(|&idx| &self.diseases[idx])
    }

    pub fn len(&self) -> usize {
        self.diseases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diseases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Disease> {
        self.diseases.iter()
    }

    /// Split `ids` into known diseases and identifiers the catalog lacks
    pub fn resolve<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a DiseaseId>,
    ) -> (Vec<&Disease>, Vec<DiseaseId>) {
        let mut resolved = Vec::new();
        let mut missing = Vec::new();
        for id in ids {
            match self.get(id) {
                Some(disease) => resolved.push(disease),
                None => missing.push(id.clone()),
            }
        }
        (resolved, missing)
    }

    /// Frequency of `term` in `disease`; `None` when the term is not annotated to it
    pub fn frequency(&self, disease: &DiseaseId, term: &TermId) -> Option<f64> {
        self.get(disease)
            .and_then(|d| d.annotation(term))
            .map(|a| a.frequency.unwrap_or(self.default_frequency))
    }
}
