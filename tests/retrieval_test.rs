mod helpers;

use contextvault::config::VaultConfig;
use contextvault::vault::types::{Category, CategoryScope};
use helpers::{seeded_vault, Seed};

const PREFERENCES: [&str; 20] = [
    "I like jazz",
    "I love sushi",
    "I enjoy long bike rides",
    "I prefer tea over coffee",
    "I like science fiction novels",
    "I love Italian food",
    "I enjoy gardening",
    "I like rainy weather",
    "I prefer window seats",
    "I love board games",
    "I like classical music",
    "I enjoy cooking Thai curries",
    "I like mountain trails",
    "I love dark chocolate",
    "I prefer mornings",
    "I like vintage cars",
    "I enjoy photography",
    "I love the ocean",
    "I like crossword puzzles",
    "I enjoy live theatre",
];

#[test]
fn relevant_fact_beats_a_crowd_of_preferences() {
    let mut seeds: Vec<Seed> = PREFERENCES
        .iter()
        .map(|p| Seed::new(p, Category::Preference))
        .collect();
    seeds.push(Seed::new("I have two cats named Luna and Pixel", Category::Personal));
    let (vault, _) = seeded_vault(VaultConfig::default(), &seeds);

    let retrieval = vault
        .retrieve("What pets do I have?", &CategoryScope::AllowAll)
        .unwrap();

    assert_eq!(
        retrieval.selected[0].entry.content,
        "I have two cats named Luna and Pixel"
    );
    assert!(retrieval.context.text.starts_with("[User context]\nAbout the user:\n- I have two cats"));
}

#[test]
fn fresher_entry_wins_at_equal_relevance() {
    let (vault, entries) = seeded_vault(
        VaultConfig::default(),
        &[
            Seed::new("I like hiking in the Alps", Category::Preference).aged(365),
            Seed::new("I like hiking in the Rockies", Category::Preference),
        ],
    );

    let selected = vault
        .select("hiking trips", &CategoryScope::AllowAll, 10_000)
        .unwrap();
    assert_eq!(selected.len(), 2);
    assert_eq!(selected[0].entry.id, entries[1].id);
    assert!(selected[0].components.recency > selected[1].components.recency);
}

#[test]
fn diversity_penalty_interleaves_categories() {
    let mut config = VaultConfig::default();
    config.retrieval.max_entries = 2;
    let (vault, _) = seeded_vault(
        config,
        &[
            Seed::new("I like coffee", Category::Preference),
            Seed::new("I love coffee", Category::Preference),
            Seed::new("I enjoy coffee", Category::Preference),
            Seed::new("I want to roast coffee", Category::Goal),
        ],
    );

    let selected = vault.select("coffee", &CategoryScope::AllowAll, 10_000).unwrap();
    let categories: Vec<Category> = selected.iter().map(|c| c.entry.category).collect();
    assert_eq!(categories, vec![Category::Preference, Category::Goal]);
}

#[test]
fn rendered_context_respects_budget() {
    let mut config = VaultConfig::default();
    config.retrieval.token_budget = 90;
    let (vault, _) = seeded_vault(
        config,
        &[
            Seed::new("I like coffee", Category::Preference),
            Seed::new("I love coffee", Category::Preference),
            Seed::new("I enjoy coffee", Category::Preference),
            Seed::new("I want to roast coffee", Category::Goal),
        ],
    );

    let retrieval = vault.retrieve("coffee", &CategoryScope::AllowAll).unwrap();
    assert!(!retrieval.context.is_empty());
    assert!(retrieval.context.text.chars().count() <= 90);
    assert!(retrieval.context.included <= retrieval.selected.len());
}

#[test]
fn unrelated_query_selects_nothing() {
    let (vault, _) = seeded_vault(
        VaultConfig::default(),
        &[Seed::new("I like coffee", Category::Preference)],
    );
    let retrieval = vault.retrieve("quantum chromodynamics", &CategoryScope::AllowAll).unwrap();
    assert!(retrieval.selected.is_empty());
    assert!(retrieval.context.is_empty());
}

#[test]
fn empty_vault_retrieves_nothing() {
    let vault = helpers::test_vault();
    let retrieval = vault.retrieve("anything at all", &CategoryScope::AllowAll).unwrap();
    assert!(retrieval.context.is_empty());
}

#[test]
fn scope_limits_categories_in_context() {
    let (vault, _) = seeded_vault(
        VaultConfig::default(),
        &[
            Seed::new("I like coffee", Category::Preference),
            Seed::new("I want to roast coffee", Category::Goal),
        ],
    );
    let goals_only = CategoryScope::Categories([Category::Goal].into_iter().collect());
    let retrieval = vault.retrieve("coffee", &goals_only).unwrap();
    assert_eq!(retrieval.selected.len(), 1);
    assert!(retrieval.context.text.contains("Goals:\n- I want to roast coffee"));
    assert!(!retrieval.context.text.contains("Preferences"));
}

#[test]
fn selection_counts_as_access() {
    let (vault, entries) = seeded_vault(
        VaultConfig::default(),
        &[Seed::new("I like coffee", Category::Preference)],
    );
    vault.retrieve("coffee", &CategoryScope::AllowAll).unwrap();
    vault.retrieve("coffee", &CategoryScope::AllowAll).unwrap();
    let entry = vault.get_entry(&entries[0].id).unwrap();
    assert_eq!(entry.access_count, 2);
    assert!(entry.last_accessed_at.is_some());
}

#[test]
fn scoped_selection_looks_past_denied_categories() {
    let mut seeds: Vec<Seed> = (0..60)
        .map(|_| Seed::new("I like green tea in the morning", Category::Preference))
        .collect();
    seeds.push(Seed::new("My goal is to drink less green tea", Category::Goal));
    let (vault, entries) = seeded_vault(VaultConfig::default(), &seeds);

    let goals_only = CategoryScope::Categories([Category::Goal].into_iter().collect());
    let picked = vault.select("green tea", &goals_only, 2000).unwrap();
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].entry.id, entries[60].id);
}

#[test]
fn only_injected_entries_count_as_accessed() {
    let mut config = VaultConfig::default();
    // room for both entries' text, but only one fits once headings are added
    config.retrieval.token_budget = 80;
    let (vault, _) = seeded_vault(
        config,
        &[
            Seed::new("I like coffee", Category::Preference),
            Seed::new("I want to roast coffee", Category::Goal),
        ],
    );

    let retrieval = vault.retrieve("coffee", &CategoryScope::AllowAll).unwrap();
    assert_eq!(retrieval.selected.len(), 2);
    assert_eq!(retrieval.context.included, 1);

    let injected = vault.get_entry(&retrieval.selected[0].entry.id).unwrap();
    let dropped = vault.get_entry(&retrieval.selected[1].entry.id).unwrap();
    assert_eq!(injected.access_count, 1);
    assert_eq!(dropped.access_count, 0);
}
