// Lexicon Tables
// Immutable term and pattern tables shared by the lexical analyzer and feature extractor.
// Every table is plain static data; compiled regexes are built once by their consumers.

use crate::models::{DemographicGroup, Frame};

/// Base demographic categories and the regex that marks each present (matched case-insensitively).
pub const DEMOGRAPHIC_PATTERNS: &[(DemographicGroup, &str)] = &[
    (DemographicGroup::Women, r"\b(wom[ae]n|females?|girls?)\b"),
    (DemographicGroup::Men, r"\b(men|males?|boys?)\b"),
    (DemographicGroup::White, r"\b(white|caucasian)\b"),
    (DemographicGroup::Black, r"\b(black|african[- ]american)\b"),
    (DemographicGroup::Hispanic, r"\b(hispanic|latinx?|latina|latino)\b"),
    (DemographicGroup::Asian, r"\b(asian|asian[- ]american)\b"),
    (DemographicGroup::Indigenous, r"\b(indigenous|native[- ]american)\b"),
    (DemographicGroup::Poc, r"\b(people of color|minority|minorities)\b"),
];

/// Leadership positions scanned for context by the lexical analyzer.
pub const LEADERSHIP_TERMS: &[&str] = &[
    "ceo", "executive", "director", "manager", "leader", "president", "vp", "vice president",
    "board", "c-suite", "leadership", "management", "supervisor", "chief", "head", "chair",
    "partner", "principal",
];

/// Keywords the segmenter anchors leadership segments on.
pub const LEADERSHIP_KEYWORDS: &[&str] = &[
    "CEO", "executive", "director", "president", "leadership", "board", "management",
];

/// Substring indicators per frame used for candidate spotting.
pub const FRAME_INDICATORS: &[(Frame, &[&str])] = &[
    (
        Frame::Underrepresentation,
        &[
            "underrepresented", "lower rates", "less than", "only", "just", "few", "lacking",
            "scarce", "minority", "small percentage", "rarely",
        ],
    ),
    (
        Frame::Overrepresentation,
        &[
            "overrepresented", "dominate", "majority", "most", "predominantly",
            "disproportionately", "overwhelmingly", "comprise", "hold most",
        ],
    ),
    (
        Frame::Obstacles,
        &[
            "barrier", "ceiling", "discrimination", "harder", "challenges", "difficulty",
            "struggle", "bias", "stereotypes", "prejudice", "hurdles", "impediments",
        ],
    ),
    (
        Frame::Successes,
        &[
            "first", "breakthrough", "achievement", "milestone", "appointed", "promoted",
            "advanced", "succeeded", "accomplished", "pioneering", "historic", "landmark",
        ],
    ),
];

/// Category whose hits count double in a frame's weighted total.
pub const STRONG_CATEGORY: &str = "strong";

pub type LexiconCategory = (&'static str, &'static [&'static str]);

/// Weighted frame vocabulary: frame -> category -> whole-word terms.
pub const FRAME_LEXICONS: &[(Frame, &[LexiconCategory])] = &[
    (
        Frame::Underrepresentation,
        &[
            ("strong", &["underrepresented", "lacking", "absence", "scarcity", "dearth"]),
            ("moderate", &["few", "only", "just", "merely", "small number"]),
            ("comparative", &["less than", "fewer than", "below", "under"]),
            ("statistical", &["percent", "percentage", "minority", "fraction"]),
        ],
    ),
    (
        Frame::Overrepresentation,
        &[
            ("strong", &["overrepresented", "dominate", "monopolize", "control"]),
            ("moderate", &["majority", "most", "predominant", "prevailing"]),
            ("comparative", &["more than", "exceed", "surpass", "above"]),
            ("statistical", &["percent", "percentage", "lion's share"]),
        ],
    ),
    (
        Frame::Obstacles,
        &[
            ("structural", &["barrier", "ceiling", "wall", "block", "impediment"]),
            ("discrimination", &["bias", "discrimination", "prejudice", "stereotypes"]),
            ("difficulty", &["struggle", "challenge", "difficulty", "hardship"]),
            ("systemic", &["systemic", "institutional", "structural", "entrenched"]),
        ],
    ),
    (
        Frame::Successes,
        &[
            ("achievement", &["achievement", "accomplishment", "success", "triumph"]),
            ("milestone", &["first", "breakthrough", "milestone", "landmark"]),
            ("advancement", &["promoted", "appointed", "elevated", "advanced"]),
            ("recognition", &["award", "honor", "recognition", "celebrated"]),
        ],
    ),
];

/// Demographic vocabulary for feature counts: category -> group name -> whole-word terms.
pub const DEMOGRAPHIC_TERMS: &[(&str, &[(&str, &[&str])])] = &[
    (
        "gender",
        &[
            ("women", &["women", "woman", "female", "females", "she", "her"]),
            ("men", &["men", "man", "male", "males", "he", "his"]),
        ],
    ),
    (
        "race",
        &[
            ("white", &["white", "caucasian"]),
            ("black", &["black", "african american", "african-american"]),
            ("hispanic", &["hispanic", "latino", "latina", "latinx"]),
            ("asian", &["asian", "asian american", "asian-american"]),
            ("indigenous", &["indigenous", "native american", "native"]),
            ("poc", &["people of color", "minority", "minorities", "diverse"]),
        ],
    ),
    (
        "intersectional",
        &[
            ("women_of_color", &["women of color", "black women", "latina women", "asian women"]),
            ("white_women", &["white women", "caucasian women"]),
            ("white_men", &["white men", "caucasian men"]),
            ("men_of_color", &["men of color", "black men", "latino men", "asian men"]),
        ],
    ),
];

/// Leadership positions used by the context feature window.
pub const LEADERSHIP_POSITIONS: &[&str] = &[
    "ceo", "executive", "director", "manager", "president", "vice president", "vp", "chief",
    "head", "leader",
];

/// Linguistic regex patterns, matched case-insensitively.
pub const LINGUISTIC_PATTERNS: &[(&str, &str)] = &[
    ("passive_voice", r"\b(was|were|been|being|is|are|am)\s+\w+ed\b"),
    ("active_voice", r"\b(holds?|leads?|manages?|directs?|heads?)\b"),
    ("comparison", r"\b(more|less|fewer|greater|higher|lower)\s+than\b"),
    ("statistics", r"\b\d+\.?\d*\s*(?:percent|%|percentage)"),
    ("absolute", r"\b(all|every|none|never|always|only)\b"),
];

pub const PERCENTAGE_PATTERN: &str = r"(?i)(\d+(?:\.\d+)?)\s*(?:percent|%)";
pub const COMPARISON_PATTERN: &str = r"(?i)(\d+(?:\.\d+)?)\s*times\s*(more|less|higher|lower)";

/// Default zero-shot label descriptions, one per frame.
pub const FRAME_DESCRIPTIONS: &[(Frame, &str)] = &[
    (Frame::Underrepresentation, "underrepresentation in leadership positions"),
    (Frame::Overrepresentation, "overrepresentation in leadership positions"),
    (Frame::Obstacles, "barriers and obstacles to leadership"),
    (Frame::Successes, "achievements and successes in leadership"),
];

/// Whole-word, case-insensitive regex source for a literal term.
pub fn whole_word_pattern(term: &str) -> String {
    format!(r"(?i)\b{}\b", regex::escape(term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_every_frame_has_tables() {
        for frame in Frame::ALL {
            assert!(FRAME_INDICATORS.iter().any(|(f, _)| *f == frame));
            assert!(FRAME_LEXICONS.iter().any(|(f, _)| *f == frame));
            assert!(FRAME_DESCRIPTIONS.iter().any(|(f, _)| *f == frame));
        }
    }

    #[test]
    fn test_all_patterns_compile() {
        for (_, p) in DEMOGRAPHIC_PATTERNS {
            assert!(Regex::new(p).is_ok());
        }
        for (_, p) in LINGUISTIC_PATTERNS {
            assert!(Regex::new(p).is_ok());
        }
        assert!(Regex::new(PERCENTAGE_PATTERN).is_ok());
        assert!(Regex::new(COMPARISON_PATTERN).is_ok());
        assert!(Regex::new(&whole_word_pattern("lion's share")).is_ok());
    }
}
