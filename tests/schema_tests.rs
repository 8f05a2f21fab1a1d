use pipegen::schema::{FormatError, OpKind, Schema, STAGE_DELIMITER};

fn document(stages: &[&str]) -> String {
    let mut doc = String::new();
    doc.push_str(STAGE_DELIMITER);
    doc.push('\n');
    doc.push_str("bit<32> tin;\nbit<32> tout;\n");
    doc.push_str(STAGE_DELIMITER);
    doc.push('\n');
    doc.push_str("bit<32> count;\nbit<32> pred;\n");
    doc.push_str(STAGE_DELIMITER);
    doc.push('\n');
    doc.push_str("[count]\n");
    doc.push_str(STAGE_DELIMITER);
    doc.push('\n');
    for stage in stages {
        doc.push_str(stage);
        doc.push('\n');
        doc.push_str(STAGE_DELIMITER);
        doc.push('\n');
    }
    doc
}

const GROUPBY_STAGE: &str =
    "flowcount\n\nGROUPBY\n[srcip, dstip]\n[count]\n--\ncount = count + 1;";
const FILTER_STAGE: &str = "heavy\n\nFILTER\n--\npred = (count > 100);";

#[test]
fn test_parses_header_blocks() {
    let schema = Schema::parse(&document(&[FILTER_STAGE])).unwrap();
    assert_eq!(schema.common_meta, vec!["bit<32> tin;", "bit<32> tout;"]);
    assert_eq!(schema.query_meta, vec!["bit<32> count;", "bit<32> pred;"]);
}

#[test]
fn test_stage_count_matches_non_blank_segments() {
    let schema = Schema::parse(&document(&[GROUPBY_STAGE, FILTER_STAGE])).unwrap();
    assert_eq!(schema.stages.len(), 2);

    // A trailing blank segment adds nothing.
    let mut doc = document(&[GROUPBY_STAGE]);
    doc.push_str("\n   \n");
    let schema = Schema::parse(&doc).unwrap();
    assert_eq!(schema.stages.len(), 1);
}

#[test]
fn test_groupby_stage_fields() {
    let schema = Schema::parse(&document(&[GROUPBY_STAGE])).unwrap();
    let stage = &schema.stages[0];
    assert_eq!(stage.op, OpKind::GroupBy);
    assert_eq!(stage.name, "flowcount");
    assert_eq!(stage.key_fields, vec!["srcip", "dstip"]);
    assert_eq!(stage.registers, vec!["count"]);
    assert_eq!(stage.code, "count = count + 1;");
}

#[test]
fn test_filter_stage_has_no_lists() {
    let schema = Schema::parse(&document(&[FILTER_STAGE])).unwrap();
    let stage = &schema.stages[0];
    assert_eq!(stage.op, OpKind::Filter);
    assert!(stage.key_fields.is_empty());
    assert!(stage.registers.is_empty());
}

#[test]
fn test_code_is_kept_verbatim_inside() {
    let stage = "multi\n\nPROJECT\n--\nif (tin > 0) {\n    count = tin;\n}";
    let schema = Schema::parse(&document(&[stage])).unwrap();
    assert_eq!(schema.stages[0].code, "if (tin > 0) {\n    count = tin;\n}");
}

#[test]
fn test_blank_list_entries_are_dropped() {
    let stage = "flowcount\n\nGROUPBY\n[srcip, , dstip, ]\n[count, ]\n--\ncount = 1;";
    let schema = Schema::parse(&document(&[stage])).unwrap();
    assert_eq!(schema.stages[0].key_fields, vec!["srcip", "dstip"]);
    assert_eq!(schema.stages[0].registers, vec!["count"]);
}

#[test]
fn test_unrecognized_keyword_parses_as_unknown() {
    let stage = "sorter\n\nSORT\n--\nx = 1;";
    let schema = Schema::parse(&document(&[stage])).unwrap();
    assert_eq!(schema.stages[0].op, OpKind::Unknown);
    assert_eq!(schema.stages[0].name, "sorter");
}

#[test]
fn test_keyword_is_case_sensitive() {
    let stage = "low\n\ngroupby\n[srcip]\n[count]\n--\nx = 1;";
    let schema = Schema::parse(&document(&[stage])).unwrap();
    assert_eq!(schema.stages[0].op, OpKind::Unknown);
}

#[test]
fn test_too_few_segments() {
    let err = Schema::parse("no delimiters at all").unwrap_err();
    assert_eq!(err, FormatError::TooFewSegments(1));
}

#[test]
fn test_stage_without_code_delimiter() {
    let stage = "broken\n\nFILTER\npred = 1;";
    let err = Schema::parse(&document(&[stage])).unwrap_err();
    assert!(matches!(
        err,
        FormatError::BadStageSplit { delimiters: 0, .. }
    ));
}

#[test]
fn test_stage_with_two_code_delimiters() {
    let stage = "broken\n\nFILTER\n--\nx = 1;\n--\ny = 2;";
    let err = Schema::parse(&document(&[stage])).unwrap_err();
    assert!(matches!(
        err,
        FormatError::BadStageSplit { delimiters: 2, .. }
    ));
}

#[test]
fn test_too_many_metadata_lines() {
    let stage = "big\n\nGROUPBY\n[srcip]\n[count]\nextra\n--\nx = 1;";
    let err = Schema::parse(&document(&[stage])).unwrap_err();
    assert!(matches!(err, FormatError::TooManyMetaLines { found: 6, .. }));
}

#[test]
fn test_too_few_metadata_lines() {
    let stage = "tiny\n--\nx = 1;";
    let err = Schema::parse(&document(&[stage])).unwrap_err();
    assert!(matches!(err, FormatError::TooFewMetaLines { found: 1, .. }));
}

#[test]
fn test_second_metadata_line_must_be_blank() {
    let stage = "bad\nFILTER\nextra\n--\nx = 1;";
    let err = Schema::parse(&document(&[stage])).unwrap_err();
    assert!(matches!(err, FormatError::SeparatorNotBlank { .. }));
}

#[test]
fn test_key_list_without_register_list() {
    let stage = "half\n\nGROUPBY\n[srcip]\n--\nx = 1;";
    let err = Schema::parse(&document(&[stage])).unwrap_err();
    assert!(matches!(err, FormatError::MissingRegisterList { .. }));
}

#[test]
fn test_list_must_be_bracketed() {
    let stage = "bare\n\nGROUPBY\nsrcip, dstip\n[count]\n--\nx = 1;";
    let err = Schema::parse(&document(&[stage])).unwrap_err();
    assert!(matches!(err, FormatError::UnbracketedList { .. }));
}

#[test]
fn test_malformed_declaration_line() {
    let doc = document(&[FILTER_STAGE]).replace("bit<32> tout;", "orphan");
    let err = Schema::parse(&doc).unwrap_err();
    assert_eq!(err, FormatError::BadDeclaration("orphan".to_string()));
}

#[test]
fn test_duplicate_stage_names_are_rejected() {
    let err = Schema::parse(&document(&[FILTER_STAGE, FILTER_STAGE])).unwrap_err();
    assert_eq!(err, FormatError::DuplicateStage("heavy".to_string()));
}
