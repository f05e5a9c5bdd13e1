//! Unit tests for the rules file parser.
//!
//! All in-memory except the single `load` test.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use std::fs;

use tempfile::TempDir;

use crate::rules::{ConfigError, Rules, RulesError};

const SAMPLE: &str = r#"
; global options
[global]
FILTERDEV = AUTO sda

[cd]
TYPE = CD
KEYS = @cdplayer

[Music]   ; comment after header
type = file
FILES = mp3 ogg
KEYS = Menu Down "Ok"
LINKPATH = "/video/my music"
"#;

#[test]
fn sections_keep_file_order() {
    let rules = Rules::parse(SAMPLE).unwrap();
    let names: Vec<&str> = rules.sections().map(|s| s.name()).collect();

    assert_eq!(names, vec!["GLOBAL", "CD", "MUSIC"]);
}

#[test]
fn keys_and_sections_are_case_insensitive() {
    let rules = Rules::parse(SAMPLE).unwrap();
    let music = rules.section("music").unwrap();

    assert_eq!(music.values("TYPE").unwrap(), ["file"]);
    assert_eq!(music.values("files").unwrap(), ["mp3", "ogg"]);
}

#[test]
fn quoted_values_keep_spaces() {
    let rules = Rules::parse(SAMPLE).unwrap();
    let music = rules.section("MUSIC").unwrap();

    assert_eq!(music.single_value("LINKPATH").unwrap(), Some("/video/my music"));
    assert_eq!(music.values("KEYS").unwrap(), ["Menu", "Down", "Ok"]);
}

#[test]
fn global_section_is_flagged() {
    let rules = Rules::parse(SAMPLE).unwrap();

    assert!(rules.section("GLOBAL").unwrap().is_global());
    assert!(!rules.section("CD").unwrap().is_global());
}

#[test]
fn repeated_keys_accumulate() {
    let rules = Rules::parse("[A]\nKEYS = x\nKEYS = y z\n").unwrap();

    assert_eq!(rules.section("A").unwrap().values("KEYS").unwrap(), ["x", "y", "z"]);
}

#[test]
fn repeated_section_headers_merge() {
    let rules = Rules::parse("[A]\nKEYS = x\n[B]\nKEYS = b\n[a]\nTYPE = CD\n").unwrap();
    let names: Vec<&str> = rules.sections().map(|s| s.name()).collect();

    assert_eq!(names, vec!["A", "B"]);
    assert_eq!(rules.section("A").unwrap().values("TYPE").unwrap(), ["CD"]);
}

#[test]
fn key_with_empty_value_is_recorded() {
    let rules = Rules::parse("[A]\nKEYS =\n").unwrap();

    assert_eq!(rules.section("A").unwrap().values("KEYS").unwrap().len(), 0);
}

#[test]
fn missing_separator_is_an_error() {
    let err = Rules::parse("[A]\nKEYS x\n").unwrap_err();

    assert!(matches!(err, RulesError::Syntax { line: 2, .. }));
}

#[test]
fn lone_key_is_an_error() {
    let err = Rules::parse("[A]\nKEYS\n").unwrap_err();

    assert!(matches!(err, RulesError::Syntax { line: 2, .. }));
}

#[test]
fn duplicate_separator_is_an_error() {
    let err = Rules::parse("[A]\nKEYS = x = y\n").unwrap_err();

    assert!(matches!(err, RulesError::Syntax { line: 2, .. }));
}

#[test]
fn trailing_garbage_after_section_is_an_error() {
    let err = Rules::parse("[A] junk\n").unwrap_err();

    assert!(matches!(err, RulesError::Syntax { line: 1, .. }));
}

#[test]
fn key_before_any_section_is_an_error() {
    let err = Rules::parse("KEYS = x\n[A]\n").unwrap_err();

    assert!(matches!(err, RulesError::Syntax { line: 1, .. }));
}

#[test]
fn file_without_sections_is_empty() {
    let err = Rules::parse("; nothing here\n\n").unwrap_err();

    assert!(matches!(err, RulesError::Empty));
}

#[test]
fn single_value_rejects_lists() {
    let rules = Rules::parse("[A]\nAUTOMOUNT = yes no\n").unwrap();
    let err = rules.section("A").unwrap().single_value("AUTOMOUNT").unwrap_err();

    assert_eq!(
        err,
        ConfigError::MultipleValues {
            section: "A".to_string(),
            key: "AUTOMOUNT".to_string(),
        }
    );
}

#[test]
fn required_list_rejects_empty() {
    let rules = Rules::parse("[A]\nKEYS =\n").unwrap();
    let err = rules.section("A").unwrap().required_list("KEYS").unwrap_err();

    assert!(matches!(err, ConfigError::EmptyList { .. }));
}

#[test]
fn check_keys_reports_missing_and_unknown() {
    let rules = Rules::parse("[A]\nTYPE = CD\nKEYS = x\nBOGUS = 1\n").unwrap();
    let section = rules.section("A").unwrap();

    let missing = section.check_keys(&["TYPE", "KEYS", "FILES"], &[]).unwrap_err();
    assert!(matches!(missing, ConfigError::MissingKey { ref key, .. } if key == "FILES"));

    let unknown = section.check_keys(&["TYPE", "KEYS"], &[]).unwrap_err();
    assert!(matches!(unknown, ConfigError::UnknownKey { ref key, .. } if key == "BOGUS"));

    assert!(section.check_keys(&["TYPE", "KEYS"], &["BOGUS"]).is_ok());
}

#[test]
fn load_reads_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mediadetect.conf");
    fs::write(&path, SAMPLE).unwrap();

    let rules = Rules::load(&path).unwrap();
    assert_eq!(rules.sections().count(), 3);
}

#[test]
fn load_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = Rules::load(&dir.path().join("absent.conf")).unwrap_err();

    assert!(matches!(err, RulesError::Read { .. }));
}
