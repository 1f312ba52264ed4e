//! Service-specific tests
//!
//! Each service has its own test file; shared fixtures live in `common`.


pub mod common {
    use shared::{Term, TermId};
    use std::sync::Arc;

    use crate::core::{Disease, DiseaseCatalog};

    pub fn id(s: &str) -> TermId {
        TermId::parse(s).expect("Valid test term ID")
    }

    pub fn term(s: &str, label: &str) -> Term {
        Term::new(id(s), label)
    }

    /// Three diseases sharing HP:1 with decreasing frequency; only OMIM:B has HP:2
    pub fn catalog() -> Arc<DiseaseCatalog> {
        Arc::new(
            DiseaseCatalog::new(
                vec![
                    Disease::new(id("OMIM:A"), "Alpha syndrome")
                        .with_annotation(term("HP:1", "Seizure"), Some(1.0))
                        .with_annotation(term("HP:3", "Ptosis"), Some(0.9)),
                    Disease::new(id("OMIM:B"), "Beta syndrome")
                        .with_annotation(term("HP:1", "Seizure"), Some(0.5))
                        .with_annotation(term("HP:2", "Renal cyst"), Some(1.0)),
                    Disease::new(id("OMIM:C"), "Gamma syndrome")
                        .with_annotation(term("HP:1", "Seizure"), Some(0.2)),
                ],
                1.0,
            )
            .expect("Valid test catalog"),
        )
    }
}
