mod helpers;

use contextvault::config::VaultConfig;
use contextvault::vault::types::{Category, EntryFilter, EntrySource};
use helpers::test_vault;

#[test]
fn learned_entries_start_below_promotion() {
    let vault = test_vault();
    let learned = vault
        .observe(
            "I live in Lisbon and I work as a nurse. What should I cook tonight?",
            "",
        )
        .unwrap();

    assert_eq!(learned.len(), 1);
    let entry = &learned[0];
    assert_eq!(entry.source, EntrySource::Learned);
    assert_eq!(entry.category, Category::Personal);
    assert!(entry.confidence <= vault.config().learning.initial_confidence_ceiling);
    assert!(entry.confidence < vault.config().learning.promotion_threshold);
}

#[test]
fn repeated_statement_is_reinforced_then_promoted() {
    let vault = test_vault();
    let first = vault.observe("I live in Lisbon.", "").unwrap();
    assert_eq!(first.len(), 1);
    let id = first[0].id.clone();

    for _ in 0..2 {
        assert!(vault.observe("I live in Lisbon.", "").unwrap().is_empty());
    }

    let entry = vault.get_entry(&id).unwrap();
    assert!(entry.confidence >= vault.config().learning.promotion_threshold);
    assert!(entry.updated_at >= first[0].updated_at);

    let all = vault.list_entries(&EntryFilter::default()).unwrap();
    assert_eq!(all.len(), 1);
    // create, two reinforcements, one promotion
    assert_eq!(vault.stats().unwrap().audit_log_entries, 4);
}

#[test]
fn response_restatements_are_discounted() {
    let vault = test_vault();
    let learned = vault
        .observe(
            "Any good day hikes nearby?",
            "Since you live in Denver, Mount Falcon is a short drive. Bring water.",
        )
        .unwrap();

    assert_eq!(learned.len(), 1);
    assert!(learned[0].content.starts_with("I live in Denver"));
    assert!(learned[0].confidence < 0.5);
}

#[test]
fn questions_and_hedges_teach_nothing() {
    let vault = test_vault();
    let learned = vault
        .observe("Do I like jazz? Maybe I live in Oslo. I think I enjoy opera.", "")
        .unwrap();
    assert!(learned.is_empty());
    assert_eq!(vault.stats().unwrap().total_entries, 0);
}

#[test]
fn disabled_learning_is_a_no_op() {
    let mut config = VaultConfig::default();
    config.learning.enabled = false;
    let vault = helpers::test_vault_with(config);
    assert!(vault.observe("I live in Lisbon.", "").unwrap().is_empty());
}

#[test]
fn confirming_a_learned_entry_promotes_it() {
    let vault = test_vault();
    let learned = vault.observe("I'm learning Portuguese.", "").unwrap();
    let confirmed = vault.confirm_entry(&learned[0].id).unwrap();
    assert_eq!(confirmed.source, EntrySource::Learned);
    assert!((confirmed.confidence - 1.0).abs() < 1e-9);
}

#[test]
fn manual_entries_default_to_full_confidence() {
    let vault = test_vault();
    let entry = helpers::add(&vault, "I'm building a home weather station");
    assert_eq!(entry.category, Category::Project);
    assert_eq!(entry.source, EntrySource::Manual);
    assert!((entry.confidence - 1.0).abs() < 1e-9);
}
