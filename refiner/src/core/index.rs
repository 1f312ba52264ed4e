//! Bipartite annotation index linking diseases, phenotype terms and diagnostic tests
//!
//! The index is a pure function of a disease set and a phenotype-to-test
//! annotation table. It is built once per run and then shared read-only
//! between every worker.

use shared::{DiseaseId, PhenotypeProfile, Term, TermId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::catalog::Disease;

/// Phenotype-to-test annotation table as read from disk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationTable {
    phenotype_tests: BTreeMap<TermId, BTreeSet<TermId>>,
    labels: HashMap<TermId, String>,
    skipped_rows: usize,
}

impl AnnotationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that ordering `test` may reveal `phenotype`
    pub fn insert(&mut self, phenotype: Term, test: Term) {
        self.remember_label(&phenotype);
        self.remember_label(&test);
        self.phenotype_tests
            .entry(phenotype.id)
            .or_default()
            .insert(test.id);
    }

    pub(crate) fn record_skipped_row(&mut self) {
        self.skipped_rows += 1;
    }

    fn remember_label(&mut self, term: &Term) {
        if !term.label.is_empty() {
            self.labels.insert(term.id.clone(), term.label.clone());
        }
    }

    pub fn tests_for(&self, phenotype: &TermId) -> Option<&BTreeSet<TermId>> {
        self.phenotype_tests.get(phenotype)
    }

    pub fn label(&self, term: &TermId) -> Option<&str> {
        self.labels.get(term).map(String::as_str)
    }

    pub fn phenotype_count(&self) -> usize {
        self.phenotype_tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phenotype_tests.is_empty()
    }

    /// Rows dropped while parsing because they were malformed
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Test-to-phenotype view of the whole table
    pub fn invert(&self) -> BTreeMap<TermId, BTreeSet<TermId>> {
        let mut inverted: BTreeMap<TermId, BTreeSet<TermId>> = BTreeMap::new();
        for (phenotype, tests) in &self.phenotype_tests {
            for test in tests {
                inverted
                    .entry(test.clone())
                    .or_default()
                    .insert(phenotype.clone());
            }
        }
        inverted
    }
}

/// Immutable index over the active disease set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationIndex {
    disease_phenotypes: BTreeMap<DiseaseId, BTreeSet<TermId>>,
    disease_tests: BTreeMap<DiseaseId, BTreeSet<TermId>>,
    test_phenotypes: BTreeMap<TermId, BTreeSet<TermId>>,
    phenotypes: Vec<TermId>,
    tests: Vec<TermId>,
    labels: HashMap<TermId, String>,
}

impl AnnotationIndex {
    /// Build the forward and reverse maps in a single pass over every disease annotation
    ///
    /// Phenotypes without an entry in `table` contribute no tests. A disease
    /// listed twice is indexed once.
    pub fn build<'a>(diseases: impl IntoIterator<Item = &'a Disease>, table: &AnnotationTable) -> Self {
        let mut index = Self::default();
        let mut phenotypes = BTreeSet::new();

        for disease in diseases {
            let disease_phenotypes = index
                .disease_phenotypes
                .entry(disease.id.clone())
                .or_default();
            let disease_tests = index.disease_tests.entry(disease.id.clone()).or_default();

            for term in disease.phenotype_terms() {
                disease_phenotypes.insert(term.id.clone());
                phenotypes.insert(term.id.clone());
                if !term.label.is_empty() {
                    index.labels.insert(term.id.clone(), term.label.clone());
                }

                let Some(tests) = table.tests_for(&term.id) else {
                    continue;
                };
                for test in tests {
                    disease_tests.insert(test.clone());
                    index
                        .test_phenotypes
                        .entry(test.clone())
                        .or_default()
                        .insert(term.id.clone());
                    if let Some(label) = table.label(test) {
                        index.labels.insert(test.clone(), label.to_string());
                    }
                }
            }
        }

        index.phenotypes = phenotypes.into_iter().collect();
        index.tests = index.test_phenotypes.keys().cloned().collect();
        index
    }

    pub fn diseases(&self) -> impl Iterator<Item = &DiseaseId> {
        self.disease_phenotypes.keys()
    }

    pub fn phenotypes_of(&self, disease: &DiseaseId) -> Option<&BTreeSet<TermId>> {
        self.disease_phenotypes.get(disease)
    }

    pub fn tests_of(&self, disease: &DiseaseId) -> Option<&BTreeSet<TermId>> {
        self.disease_tests.get(disease)
    }

    /// Phenotype terms that caused `test` to be indexed
    pub fn phenotypes_for_test(&self, test: &TermId) -> Option<&BTreeSet<TermId>> {
        self.test_phenotypes.get(test)
    }

    /// Every phenotype term of the active diseases, sorted and deduplicated
    pub fn phenotypes(&self) -> &[TermId] {
        &self.phenotypes
    }

    /// Every diagnostic test reachable from the active diseases, sorted
    pub fn tests(&self) -> &[TermId] {
        &self.tests
    }

    /// Phenotypes `test` could reveal that the profile does not already record
    ///
    /// Excluded terms are left out as well; a profile cannot list a term as
    /// both present and excluded.
    pub fn discoverable(&self, test: &TermId, profile: &PhenotypeProfile) -> BTreeSet<TermId> {
        self.test_phenotypes
            .get(test)
            .map(|terms| {
                terms
                    .iter()
                    .filter(|t| !profile.mentions(t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn label(&self, term: &TermId) -> Option<&str> {
        self.labels.get(term).map(String::as_str)
    }

    /// The term with whatever label the index has seen for it
    pub fn term(&self, id: &TermId) -> Term {
        Term::new(id.clone(), self.label(id).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> TermId {
        TermId::parse(s).unwrap()
    }

    fn term(s: &str) -> Term {
        Term::new(id(s), format!("label {s}"))
    }

    fn table() -> AnnotationTable {
        let mut table = AnnotationTable::new();
        table.insert(term("HP:1"), term("MAXO:10"));
        table.insert(term("HP:2"), term("MAXO:10"));
        table.insert(term("HP:2"), term("MAXO:20"));
        table.insert(term("HP:9"), term("MAXO:90"));
        table
    }

    fn diseases() -> Vec<Disease> {
        vec![
            Disease::new(id("OMIM:1"), "A")
                .with_annotation(term("HP:1"), None)
                .with_annotation(term("HP:3"), None),
            Disease::new(id("OMIM:2"), "B").with_annotation(term("HP:2"), Some(0.4)),
        ]
    }

    #[test]
    fn test_build_forward_and_reverse_maps() {
        let diseases = diseases();
        let index = AnnotationIndex::build(diseases.iter(), &table());

        assert_eq!(index.phenotypes(), &[id("HP:1"), id("HP:2"), id("HP:3")]);
        assert_eq!(index.tests(), &[id("MAXO:10"), id("MAXO:20")]);
        assert_eq!(
            index.tests_of(&id("OMIM:1")).unwrap(),
            &BTreeSet::from([id("MAXO:10")])
        );
        assert_eq!(
            index.phenotypes_for_test(&id("MAXO:10")).unwrap(),
            &BTreeSet::from([id("HP:1"), id("HP:2")])
        );
        assert!(index.phenotypes_for_test(&id("MAXO:90")).is_none());
        assert_eq!(index.label(&id("MAXO:20")), Some("label MAXO:20"));
    }

    #[test]
    fn test_reverse_map_is_inverse_of_table_restricted_to_active_terms() {
        let diseases = diseases();
        let table = table();
        let index = AnnotationIndex::build(diseases.iter(), &table);
        let active: BTreeSet<_> = index.phenotypes().iter().cloned().collect();

        for (test, phenotypes) in table.invert() {
            let expected: BTreeSet<_> = phenotypes.intersection(&active).cloned().collect();
            let actual = index.phenotypes_for_test(&test).cloned().unwrap_or_default();
            assert_eq!(actual, expected, "mismatch for {test}");
        }
    }

    #[test]
    fn test_every_disease_test_pair_has_a_witness() {
        let diseases = diseases();
        let index = AnnotationIndex::build(diseases.iter(), &table());

        for disease in index.diseases() {
            for test in index.tests_of(disease).unwrap() {
                let witnesses = index.phenotypes_for_test(test).unwrap();
                assert!(index
                    .phenotypes_of(disease)
                    .unwrap()
                    .iter()
                    .any(|p| witnesses.contains(p)));
            }
        }
    }

    #[test]
    fn test_discoverable_excludes_recorded_terms() {
        let diseases = diseases();
        let index = AnnotationIndex::build(diseases.iter(), &table());
        let profile = PhenotypeProfile::new("p", [id("HP:1")], []).unwrap();

        assert_eq!(
            index.discoverable(&id("MAXO:10"), &profile),
            BTreeSet::from([id("HP:2")])
        );
        assert!(index.discoverable(&id("MAXO:404"), &profile).is_empty());

        let excluded = PhenotypeProfile::new("p", [id("HP:1")], [id("HP:2")]).unwrap();
        assert!(index.discoverable(&id("MAXO:20"), &excluded).is_empty());
    }

    #[test]
    fn test_invert_table() {
        let inverted = table().invert();
        assert_eq!(inverted[&id("MAXO:10")], BTreeSet::from([id("HP:1"), id("HP:2")]));
        assert_eq!(inverted.len(), 3);
    }
}
