//! Test fixtures and data for refiner tests
//!
//! Three diseases share a seizure phenotype with decreasing frequency, so the
//! stub oracle ranks them A > B > C for a patient presenting with seizures.
//! Renal cysts are annotated to B only: revealing them flips the top two.

#![allow(dead_code)]

use refiner::services::parse_annotation_table;
use refiner::{AnnotationTable, Disease, DiseaseCatalog};
use shared::{PhenotypeProfile, Term, TermId};
use std::io::Cursor;
use std::sync::Arc;

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Diseases
    pub const DISEASE_A: &'static str = "OMIM:100100";
    pub const DISEASE_B: &'static str = "OMIM:200200";
    pub const DISEASE_C: &'static str = "OMIM:300300";

    /// Phenotypes
    pub const SEIZURE: &'static str = "HP:0001250";
    pub const RENAL_CYST: &'static str = "HP:0000107";
    pub const PTOSIS: &'static str = "HP:0000508";
    pub const MICROCEPHALY: &'static str = "HP:0000252";

    /// Diagnostic tests
    pub const EEG: &'static str = "MAXO:0000010";
    pub const RENAL_ULTRASOUND: &'static str = "MAXO:0000020";
    pub const EYE_EXAM: &'static str = "MAXO:0000030";
    pub const HEAD_CIRCUMFERENCE: &'static str = "MAXO:0000040";

    pub const PATIENT_ID: &'static str = "case-0042";

    pub fn id(s: &str) -> TermId {
        TermId::parse(s).unwrap()
    }

    pub fn diseases() -> Vec<Disease> {
        vec![
            Disease::new(Self::id(Self::DISEASE_A), "Alpha syndrome")
                .with_annotation(Term::new(Self::id(Self::SEIZURE), "Seizure"), Some(1.0))
                .with_annotation(Term::new(Self::id(Self::PTOSIS), "Ptosis"), Some(0.9)),
            Disease::new(Self::id(Self::DISEASE_B), "Beta syndrome")
                .with_annotation(Term::new(Self::id(Self::SEIZURE), "Seizure"), Some(0.5))
                .with_annotation(Term::new(Self::id(Self::RENAL_CYST), "Renal cyst"), Some(1.0)),
            Disease::new(Self::id(Self::DISEASE_C), "Gamma syndrome")
                .with_annotation(Term::new(Self::id(Self::SEIZURE), "Seizure"), Some(0.2)),
        ]
    }

    pub fn catalog() -> Arc<DiseaseCatalog> {
        Arc::new(DiseaseCatalog::new(Self::diseases(), 1.0).unwrap())
    }

    /// Annotation table in its on-disk form, including a malformed row
    pub fn annotation_tsv() -> String {
        format!(
            "#version: test\n\
             hpo_id\thpo_label\tpredicate_id\tmaxo_id\tmaxo_label\tcreator_id\n\
             {seizure}\tSeizure\tis_observable_through\t{eeg}\tElectroencephalography\tORCID:1\n\
             {cyst}\tRenal cyst\tis_observable_through\t{us}\tRenal ultrasound\tORCID:1\n\
             {ptosis}\tPtosis\tis_observable_through\t{eye}\tOphthalmologic examination\tORCID:1\n\
             {micro}\tMicrocephaly\tis_observable_through\t{head}\tHead circumference measurement\tORCID:1\n\
             broken row\n",
            seizure = Self::SEIZURE,
            eeg = Self::EEG,
            cyst = Self::RENAL_CYST,
            us = Self::RENAL_ULTRASOUND,
            ptosis = Self::PTOSIS,
            eye = Self::EYE_EXAM,
            micro = Self::MICROCEPHALY,
            head = Self::HEAD_CIRCUMFERENCE,
        )
    }

    pub fn annotations() -> Arc<AnnotationTable> {
        Arc::new(parse_annotation_table(Cursor::new(Self::annotation_tsv())).unwrap())
    }

    /// Patient presenting with seizures only
    pub fn profile() -> PhenotypeProfile {
        PhenotypeProfile::new(Self::PATIENT_ID, [Self::id(Self::SEIZURE)], []).unwrap()
    }

    pub fn all_diseases() -> Vec<TermId> {
        vec![
            Self::id(Self::DISEASE_A),
            Self::id(Self::DISEASE_B),
            Self::id(Self::DISEASE_C),
        ]
    }
}
