//! Pattern tables for extraction, categorization and contradiction detection.
//!
//! Every table is evaluated top to bottom and the first match wins, so the order of
//! the entries below is part of the behavior. The topic table is the exception: every
//! matching topic becomes a tag. All matching runs on lowercased text.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::vault::types::Category;

/// Kind of first-person statement an extraction rule recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    Identity,
    Residence,
    Occupation,
    Preference,
    Goal,
    Skill,
    Project,
    Relationship,
    Possession,
    Event,
}

pub struct ExtractionRule {
    pub statement: Statement,
    /// Confidence assigned to a learned entry, before the ceiling is applied.
    pub base_confidence: f64,
    pattern: Regex,
}

fn rule(statement: Statement, base_confidence: f64, pattern: &str) -> ExtractionRule {
    ExtractionRule {
        statement,
        base_confidence,
        pattern: Regex::new(pattern).expect("valid extraction pattern"),
    }
}

/// Optional discourse lead-in before the statement proper.
const LEAD: &str = r"^(?:(?:also|and|but|so|actually|well|oh|btw),?\s+)?";

static EXTRACTION_RULES: Lazy<Vec<ExtractionRule>> = Lazy::new(|| {
    let p = |body: &str| format!("{LEAD}{body}");
    vec![
        rule(Statement::Identity, 0.55, &p(r"(?:my name is|call me)\s+\S")),
        rule(
            Statement::Residence,
            0.5,
            &p(r"(?:i live in|i'm from|i am from|i'm based in|i am based in|i moved to)\s+\S"),
        ),
        rule(
            Statement::Occupation,
            0.5,
            &p(r"(?:i work (?:at|for|as)|my job is|i'm employed at|i am employed at)\s+\S"),
        ),
        rule(
            Statement::Preference,
            0.5,
            &p(r"(?:i (?:really |absolutely )?(?:like|love|enjoy|prefer|hate|dislike|adore)|i don't like|i do not like|i can't stand|my favou?rite \w+ is)\s+\S"),
        ),
        rule(
            Statement::Goal,
            0.45,
            &p(r"(?:i want to|i'd like to|i hope to|i plan to|i'm planning to|i am planning to|i'm trying to|i am trying to|my goal is)\s+\S"),
        ),
        rule(
            Statement::Skill,
            0.45,
            &p(r"(?:i know how to|i'm good at|i am good at|i'm fluent in|i am fluent in|i'm learning|i am learning|i can speak|i can program)\s+\S"),
        ),
        rule(
            Statement::Project,
            0.45,
            &p(r"(?:i'm working on|i am working on|i'm building|i am building|i'm developing|i am developing|my project is)\s+\S"),
        ),
        rule(
            Statement::Relationship,
            0.5,
            &p(r"my (?:wife|husband|partner|girlfriend|boyfriend|friend|best friend|brother|sister|mother|father|mom|dad|son|daughter|boss|manager|colleague)('s)?\s+\S"),
        ),
        rule(Statement::Possession, 0.5, &p(r"(?:i have|i've got|i own)\s+\S")),
        rule(
            Statement::Event,
            0.4,
            &p(r"(?:i went to|i visited|i graduated|i was born|i got married|i started|i'm going to|i am going to)\s+\S"),
        ),
    ]
});

/// First extraction rule matching a lowercased sentence.
pub fn match_statement(lowered: &str) -> Option<&'static ExtractionRule> {
    EXTRACTION_RULES.iter().find(|r| r.pattern.is_match(lowered))
}

/// A second-person restatement in an assistant reply, rewritten to first person.
///
/// Only sentences that open with a fact about "you" are considered.
pub fn first_person_restatement(sentence: &str) -> Option<String> {
    static OPENING: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)^(?:(?:so|since|as|because),?\s+)?(you're|you are|you've|you|your)\s+(.+)$")
            .expect("valid restatement pattern")
    });
    static YOUR: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)\byour\b").expect("valid pronoun pattern"));

    let caps = OPENING.captures(sentence.trim())?;
    let subject = match caps[1].to_lowercase().as_str() {
        "you're" => "I'm",
        "you are" => "I am",
        "you've" => "I've",
        "you" => "I",
        _ => "My",
    };
    let rest = YOUR.replace_all(&caps[2], "my");
    Some(format!("{subject} {rest}"))
}

static CATEGORY_RULES: Lazy<Vec<(Category, Regex)>> = Lazy::new(|| {
    let table: [(Category, &str); 7] = [
        (
            Category::Preference,
            r"\b(?:like|love|enjoy|prefer|hate|dislike|adore|favou?rite|fan of|can't stand)\b",
        ),
        (
            Category::Goal,
            r"\b(?:want to|goal|hope to|plan to|planning to|trying to|aim to|dream of)\b",
        ),
        (
            Category::Skill,
            r"\b(?:know how to|good at|skilled|proficient|experienced|learning|fluent|expert in|i can)\b",
        ),
        (
            Category::Project,
            r"\b(?:working on|building|developing|project|side project|my app|my startup)\b",
        ),
        (
            Category::Relationship,
            r"\bmy (?:wife|husband|partner|girlfriend|boyfriend|friends?|best friend|brothers?|sisters?|mother|father|mom|dad|sons?|daughters?|kids?|children|boss|manager|colleagues?|family|parents?)\b",
        ),
        (
            Category::Event,
            r"\b(?:went to|visited|graduated|was born|got married|yesterday|tomorrow|last (?:week|month|year)|next (?:week|month|year)|birthday|anniversary)\b",
        ),
        (
            Category::Personal,
            r"\b(?:my name|call me|i live|live in|i'm from|i am from|based in|i work|my job|years old|i have|i've got|i own|i am an?|i'm an?)\b",
        ),
    ];
    table
        .into_iter()
        .map(|(category, pattern)| (category, Regex::new(pattern).expect("valid category pattern")))
        .collect()
});

/// Classify text into a category; `Note` when no rule matches.
pub fn categorize(text: &str) -> Category {
    let lowered = text.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(_, pattern)| pattern.is_match(&lowered))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Note)
}

/// Most tags attached to one entry.
pub const MAX_TAGS: usize = 5;

static TOPIC_RULES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        (
            "programming",
            r"\b(?:python|java|javascript|typescript|golang|rust|c\+\+|kotlin|swift|ruby|php|code|coding|programming|compiler|api|sql|database|react)\b",
        ),
        (
            "work",
            r"\b(?:job|work|works|working|office|career|company|client|manager|boss|colleagues?|meeting|deadline|employer|salary)\b",
        ),
        (
            "family",
            r"\b(?:family|wife|husband|partner|kids?|children|sons?|daughters?|mom|dad|mother|father|parents?|brothers?|sisters?|married)\b",
        ),
        (
            "health",
            r"\b(?:health|fitness|exercise|gym|diet|doctor|allergic|allergy|vegan|vegetarian|sleep|running|yoga)\b",
        ),
        (
            "food",
            r"\b(?:food|cook|cooking|coffee|tea|pizza|sushi|recipes?|restaurants?|bake|baking|chocolate|wine|beer)\b",
        ),
        (
            "music",
            r"\b(?:music|jazz|rock|opera|guitar|piano|violin|cello|drums|songs?|band|concerts?)\b",
        ),
        (
            "pets",
            r"\b(?:pets?|cats?|dogs?|kittens?|puppy|puppies|parrot|hamster)\b",
        ),
        (
            "travel",
            r"\b(?:travel|trip|vacation|holiday|flight|visited|visit|abroad|hiking|camping)\b",
        ),
        (
            "location",
            r"\b(?:live in|living in|based in|moved to|from|city|country|hometown|apartment|house)\b",
        ),
        (
            "technology",
            r"\b(?:computer|laptop|phone|software|app|website|server|cloud|ai|machine learning|linux)\b",
        ),
    ]
    .into_iter()
    .map(|(tag, pattern)| (tag, Regex::new(pattern).expect("valid topic pattern")))
    .collect()
});

/// Topic tags for a piece of text: the first [`MAX_TAGS`] matching topics in table order.
pub fn topic_tags(text: &str) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    TOPIC_RULES
        .iter()
        .filter(|(_, pattern)| pattern.is_match(&lowered))
        .take(MAX_TAGS)
        .map(|(tag, _)| tag.to_string())
        .collect()
}

/// `true` if the text contains a hedging marker.
pub fn is_hedged(text: &str) -> bool {
    static HEDGE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)\b(?:maybe|perhaps|i think|i guess|possibly|might)\b")
            .expect("valid hedge pattern")
    });
    HEDGE.is_match(text)
}

/// Emotional valence of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
}

/// Valence from opposite-keyword pairs, flipped by a negation.
pub fn polarity(text: &str) -> Option<Polarity> {
    static POSITIVE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b(?:like|likes|love|loves|enjoy|enjoys|prefer|prefers|adore|good|great|fan of)\b")
            .expect("valid positive pattern")
    });
    static NEGATIVE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b(?:hate|hates|dislike|dislikes|despise|loathe|bad|terrible|can't stand|cannot stand)\b")
            .expect("valid negative pattern")
    });
    static NEGATION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b(?:not|never|no longer|don't|doesn't|didn't|do not|does not|won't|isn't|aren't)\b")
            .expect("valid negation pattern")
    });

    let lowered = text.to_lowercase();
    let base = if NEGATIVE.is_match(&lowered) {
        Polarity::Negative
    } else if POSITIVE.is_match(&lowered) {
        Polarity::Positive
    } else {
        return None;
    };

    if NEGATION.is_match(&lowered) {
        Some(match base {
            Polarity::Positive => Polarity::Negative,
            Polarity::Negative => Polarity::Positive,
        })
    } else {
        Some(base)
    }
}

/// Single-valued facts: `(slot, value)` pairs such as `("residence", "seattle")`.
pub fn slots(text: &str) -> Vec<(String, String)> {
    static SLOT_RULES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
        [
            ("name", r"\bmy name is ([a-z][a-z' -]*)"),
            ("residence", r"\bi(?: live|'m living| am living) in ([a-z0-9][a-z0-9' ,-]*)"),
            ("origin", r"\bi(?:'m| am) from ([a-z0-9][a-z0-9' ,-]*)"),
            ("employer", r"\bi work (?:at|for) ([a-z0-9][a-z0-9'& ,-]*)"),
            ("occupation", r"\bi work as (?:an? )?([a-z][a-z' -]*)"),
            ("age", r"\bi(?:'m| am) (\d{1,3}) years old\b"),
        ]
        .into_iter()
        .map(|(slot, pattern)| (slot, Regex::new(pattern).expect("valid slot pattern")))
        .collect()
    });
    static FAVORITE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\bmy favou?rite ([a-z]+) is ([a-z0-9][a-z0-9' -]*)")
            .expect("valid favorite pattern")
    });

    let lowered = text.to_lowercase();
    let mut found: Vec<(String, String)> = SLOT_RULES
        .iter()
        .filter_map(|(slot, pattern)| {
            pattern
                .captures(&lowered)
                .map(|c| (slot.to_string(), normalize_value(&c[1])))
        })
        .collect();
    if let Some(c) = FAVORITE.captures(&lowered) {
        found.push((format!("favorite {}", &c[1]), normalize_value(&c[2])));
    }
    found.retain(|(_, value)| !value.is_empty());
    found
}

fn normalize_value(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(|c: char| c == ',' || c == '\'' || c == '-')
        .trim()
        .to_string()
}

/// Two same-topic texts disagree: opposite valence, or different values in a shared slot.
pub fn polarity_mismatch(a: &str, b: &str) -> bool {
    if let (Some(pa), Some(pb)) = (polarity(a), polarity(b)) {
        if pa != pb {
            return true;
        }
    }
    let slots_b = slots(b);
    slots(a).iter().any(|(slot, value)| {
        slots_b
            .iter()
            .any(|(other_slot, other_value)| slot == other_slot && value != other_value)
    })
}
