//! End-to-end behavior of the patcher on small blueprints: insertion,
//! re-application, literal replacement and I/O failure.

use bp_patcher::{patch, Outcome, PatchRule, ReplaceScope, TargetError, TargetFile};
use std::fs;
use tempfile::TempDir;

#[test]
fn insert_after_anchor_matches_anchor_indentation() {
    let content = "    name: \"x\",\n";
    let outcome = patch(content, &[PatchRule::disable_module("x")]);

    assert_eq!(outcome.content, "    name: \"x\",\n    enabled: false,\n");
    assert_eq!(outcome.results[0].outcome, Outcome::Applied);
}

#[test]
fn fixed_indent_reproduces_four_space_insertion() {
    let content = "name: \"x\",\n";
    let rule = PatchRule::disable_module("x").with_indent("    ");
    let outcome = patch(content, &[rule]);

    assert_eq!(outcome.content, "name: \"x\",\n    enabled: false,\n");
    assert_eq!(outcome.results[0].outcome, Outcome::Applied);
}

#[test]
fn rule_run_twice_is_skipped_the_second_time() {
    let content = "    name: \"x\",\n";
    let rules = [PatchRule::disable_module("x")];

    let first = patch(content, &rules);
    let second = patch(&first.content, &rules);

    assert_eq!(second.content, first.content);
    assert_eq!(second.results[0].outcome, Outcome::AlreadyPresent);
}

#[test]
fn replace_all_occurrences_of_old_reference() {
    let content = "srcs: [\":old_ref\"],\ndata: [\":old_ref\"],\n";
    let rule = PatchRule::replace("\":old_ref\"", "\":empty_file\"", ReplaceScope::All);
    let outcome = patch(content, &[rule]);

    assert_eq!(
        outcome.content,
        "srcs: [\":empty_file\"],\ndata: [\":empty_file\"],\n"
    );
    assert_eq!(outcome.results[0].outcome, Outcome::Applied);
}

#[test]
fn missing_target_is_read_failure_and_creates_nothing() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("Android.bp");

    let err = TargetFile::load(&missing).unwrap_err();

    assert!(matches!(err, TargetError::Read { .. }));
    assert!(err.to_string().contains("Android.bp"));
    assert!(!missing.exists());
}

#[test]
fn missing_anchor_leaves_content_untouched() {
    let content = "cc_library {\n    name: \"libfoo\",\n}\n";
    let outcome = patch(content, &[PatchRule::disable_module("libbar")]);

    assert_eq!(outcome.content, content);
    assert_eq!(outcome.results[0].outcome, Outcome::NotFound);
}

#[test]
fn disjoint_rules_commute() {
    let content = "a {\n    name: \"one\",\n}\nb {\n\tname: \"two\",\n\tsrc: \":old\",\n}\n";
    let disable = PatchRule::disable_module("one");
    let replace = PatchRule::replace("\":old\"", "\":empty_file\"", ReplaceScope::All);

    let forward = patch(content, &[disable.clone(), replace.clone()]);
    let backward = patch(content, &[replace, disable]);

    assert_eq!(forward.content, backward.content);
}

#[test]
fn load_patch_persist_round() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Android.bp");
    fs::write(&path, "genrule {\n    name: \"gen\",\n}\n").unwrap();

    let target = TargetFile::load(&path).unwrap();
    let outcome = patch(target.content(), &[PatchRule::disable_module("gen")]);
    assert!(target.persist(&outcome.content).unwrap());

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "genrule {\n    name: \"gen\",\n    enabled: false,\n}\n"
    );
}
