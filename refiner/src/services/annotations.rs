//! Phenotype-to-test annotation table reader
//!
//! The table is tab-separated UTF-8 with six columns:
//! `phenotype_id, phenotype_label, predicate_id, test_id, test_label, creator_id`.
//! Lines starting with `#` and the `hpo_id` header row are ignored. The
//! predicate and creator columns are not used.

use shared::{stage_debug, stage_warn, Stage, Term, TermId};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::core::AnnotationTable;
use crate::error::{RefinerError, RefinerResult};

const FIELD_COUNT: usize = 6;
const HEADER_PREFIX: &str = "hpo_id";

/// Parse an annotation table; malformed rows are logged, counted and skipped
///
/// Only a failure to read from `reader` is an error.
pub fn parse_annotation_table<R: BufRead>(reader: R) -> std::io::Result<AnnotationTable> {
    let mut table = AnnotationTable::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let trimmed = line.trim_end_matches('\r');
        if trimmed.trim().is_empty() || trimmed.starts_with('#') || trimmed.starts_with(HEADER_PREFIX) {
            continue;
        }

        match parse_row(trimmed) {
            Ok((phenotype, test)) => table.insert(phenotype, test),
            Err(reason) => {
                stage_warn!(Stage::Io, line = line_no, "Skipping annotation row: {}", reason);
                table.record_skipped_row();
            }
        }
    }

    stage_debug!(
        Stage::Io,
        phenotypes = table.phenotype_count(),
        skipped = table.skipped_rows(),
        "Parsed annotation table"
    );
    Ok(table)
}

fn parse_row(line: &str) -> Result<(Term, Term), String> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != FIELD_COUNT {
        return Err(format!("expected {FIELD_COUNT} fields, found {}", fields.len()));
    }
    let phenotype_id = TermId::parse(fields[0]).map_err(|e| e.to_string())?;
    let test_id = TermId::parse(fields[3]).map_err(|e| e.to_string())?;
    Ok((
        Term::new(phenotype_id, fields[1].trim()),
        Term::new(test_id, fields[4].trim()),
    ))
}

/// Read an annotation table from disk
pub fn load_annotation_table(path: &Path) -> RefinerResult<AnnotationTable> {
    let annotation_error = |e: std::io::Error| RefinerError::AnnotationFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let file = File::open(path).map_err(annotation_error)?;
    let table = parse_annotation_table(BufReader::new(file)).map_err(annotation_error)?;

    if table.is_empty() {
        return Err(RefinerError::AnnotationFile {
            path: path.to_path_buf(),
            reason: "no usable annotation rows".to_string(),
        });
    }
    Ok(table)
}
