//! Response Parser
//!
//! Turns free-form model replies into typed fields. Every field is
//! extracted by its own ordered list of rules and falls back to a fixed
//! default when none of them match, recording a [`ParseWarning`]. Parsing
//! never fails: a reply with no recognisable structure still yields a
//! complete result carrying the raw text.
//!
//! Scores are found through three rules, tried in order:
//!
//! 1. a labeled line: `Clarity: 8/10`, `2. CLARITY - 8`, `**Clarity** (8/10)`
//! 2. a heading holding only the label, followed by `Score: 8` or `8/10`
//!    within a few lines and before the next heading
//! 3. the label mentioned on a line that also carries an `N/10` fraction
//!
//! Lists are read from blocks under known section headers, one item per
//! line with bullet or number markers stripped.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::agents::prompts::TaskKind;
use crate::models::{Criterion, ParseWarning};

/// Substituted for any score the reply does not state.
pub const DEFAULT_SCORE: u8 = 5;
pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;

/// How many lines below a bare label heading to look for its score.
const HEADING_SCORE_LOOKAHEAD: usize = 4;

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*(?:[-*•+▪◦]|\d{1,2}[.)]|\(\d{1,2}\))[ \t]+(.+)$").expect("list marker regex is valid")
});

static NUMBERING_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}[.)][ \t]*").expect("numbering regex is valid"));

static BOLD_ONLY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*[^*]+\*\*:?$").expect("bold heading regex is valid"));

static SCORE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:score|rating)\b[^0-9\n]{0,12}(\d{1,3}(?:\.\d+)?)\b|\b(\d{1,3}(?:\.\d+)?)[ \t]*(?:/|out of)[ \t]*10\b")
        .expect("score line regex is valid")
});

static OVERALL_SCORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:(?:[-*•>#]+|\d{1,2}[.)])[ \t]*)*\**[ \t]*overall(?:[ \t]+(?:score|rating))?[ \t]*\**[ \t]*[:\-–—=(]?[ \t]*\**[ \t]*(\d{1,2}(?:\.\d+)?)",
    )
    .expect("overall score regex is valid")
});

/// A short Title Case label on its own line, e.g. `Testability` or `**Originality:**`.
static BARE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[ \t]*(?:\d{1,2}[.)][ \t]*)?[*_]*[ \t]*[A-Z][A-Za-z\-]*(?:[ \t]+[A-Z][A-Za-z\-]*){0,3}[ \t]*[*_]*[ \t]*:?[ \t]*[*_]*[ \t]*$",
    )
    .expect("bare label regex is valid")
});

static ALTERNATIVE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[ \t]*(?:#+[ \t]*)?(?:\d{1,2}[.)][ \t]*)?\**[ \t]*(?:(?:alternative[ \t]+)?hypothesis[ \t]*\d+|H\d+)\b|^[ \t]*\d{1,2}[.)][ \t]+",
    )
    .expect("alternative start regex is valid")
});

static ALTERNATIVE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[ \t]*(?:#+[ \t]*)?(?:\d{1,2}[.)][ \t]*)?\**[ \t]*(?:(?:alternative[ \t]+)?hypothesis[ \t]*\d+|H\d+)?[ \t]*\**[ \t]*[:.\-–]?[ \t]*\**[ \t]*",
    )
    .expect("alternative label regex is valid")
});

static CRITERION_EXTRACTORS: LazyLock<Vec<(Criterion, ScoreExtractor)>> = LazyLock::new(|| {
    Criterion::ALL
        .into_iter()
        .map(|criterion| (criterion, ScoreExtractor::new(&[criterion.label()])))
        .collect()
});

static SOURCE_QUALITY_SCORE: LazyLock<ScoreExtractor> = LazyLock::new(|| {
    ScoreExtractor::new(&[
        "overall source quality",
        "overall quality",
        "source quality",
        "quality score",
        "overall rating",
        "overall score",
    ])
});

static DRAFT_QUALITY_SCORE: LazyLock<ScoreExtractor> = LazyLock::new(|| {
    ScoreExtractor::new(&["quality score", "overall quality", "quality assessment", "overall score"])
});

static DRAFT_SUB_SCORES: LazyLock<Vec<(&'static str, ScoreExtractor)>> = LazyLock::new(|| {
    vec![
        ("structure", ScoreExtractor::new(&["structure", "organization"])),
        ("clarity", ScoreExtractor::new(&["clarity", "readability"])),
        ("style", ScoreExtractor::new(&["academic style", "style"])),
        ("argument", ScoreExtractor::new(&["argument strength", "argument"])),
    ]
});

static VERSION_A_SCORE: LazyLock<ScoreExtractor> =
    LazyLock::new(|| ScoreExtractor::new(&["version 1", "version a", "original version"]));

static VERSION_B_SCORE: LazyLock<ScoreExtractor> =
    LazyLock::new(|| ScoreExtractor::new(&["version 2", "version b", "revised version"]));

/// Finds one labeled 1-10 score in a reply.
struct ScoreExtractor {
    inline: Regex,
    heading: Regex,
    mention: Regex,
}

impl ScoreExtractor {
    fn new(labels: &[&str]) -> Self {
        let alternatives = labels
            .iter()
            .map(|label| {
                label
                    .split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"[ \t_-]*")
            })
            .collect::<Vec<_>>()
            .join("|");

        let inline = format!(
            r"(?im)^[ \t]*(?:(?:[-*•>#]+|\d{{1,2}}[.)])[ \t]*)*\**[ \t]*(?:{alternatives})[ \t]*\**[ \t]*[:\-–—=(]?[ \t]*\**[ \t]*(?:(?:overall[ \t]+)?(?:score|rating|quality)[ \t]*\**[ \t]*[:=]?[ \t]*\**[ \t]*)?(\d{{1,3}}(?:\.\d+)?)\b"
        );
        let heading = format!(
            r"(?i)^[ \t]*(?:#+[ \t]*)?(?:\d{{1,2}}[.)][ \t]*)?\**[ \t]*(?:{alternatives})[ \t]*\**[ \t]*:?[ \t]*\**[ \t]*$"
        );
        let mention = format!(
            r"(?i)\b(?:{alternatives})\b[^\n]{{0,80}}?\b(\d{{1,3}}(?:\.\d+)?)[ \t]*(?:/|out of)[ \t]*10\b"
        );

        Self {
            inline: Regex::new(&inline).expect("generated inline score regex is valid"),
            heading: Regex::new(&heading).expect("generated heading regex is valid"),
            mention: Regex::new(&mention).expect("generated mention regex is valid"),
        }
    }

    fn extract(&self, text: &str) -> Option<u32> {
        self.inline_score(text)
            .or_else(|| self.heading_score(text))
            .or_else(|| self.mention_score(text))
    }

    fn inline_score(&self, text: &str) -> Option<u32> {
        self.inline
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| parse_score(m.as_str()))
    }

    /// A bare label heading followed by a score line before the next heading.
    fn heading_score(&self, text: &str) -> Option<u32> {
        let lines: Vec<&str> = text.lines().collect();
        lines.iter().enumerate().find_map(|(idx, line)| {
            if !self.heading.is_match(line) {
                return None;
            }
            lines
                .iter()
                .skip(idx + 1)
                .filter(|l| !l.trim().is_empty())
                .take(HEADING_SCORE_LOOKAHEAD)
                .take_while(|l| !starts_new_block(l))
                .find_map(|l| {
                    SCORE_LINE.captures(l).and_then(|caps| {
                        caps.get(1)
                            .or_else(|| caps.get(2))
                            .and_then(|m| parse_score(m.as_str()))
                    })
                })
        })
    }

    fn mention_score(&self, text: &str) -> Option<u32> {
        self.mention
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| parse_score(m.as_str()))
    }
}

/// Decimal scores round to the nearest integer.
fn parse_score(text: &str) -> Option<u32> {
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u32)
}

/// Ends the search below a heading: another heading or another bare label.
fn starts_new_block(line: &str) -> bool {
    if SCORE_LINE.is_match(line) {
        return false;
    }
    if is_generic_heading(line) {
        return true;
    }
    if CRITERION_EXTRACTORS.iter().any(|(_, extractor)| extractor.heading.is_match(line)) {
        return true;
    }
    let lower = line.to_lowercase();
    BARE_LABEL.is_match(line) && !lower.contains("score") && !lower.contains("rating")
}

/// Clamp an extracted score into range, or substitute the default.
fn resolve_score(found: Option<u32>, field: &str, warnings: &mut Vec<ParseWarning>) -> u8 {
    match found {
        Some(value) if (MIN_SCORE as u32..=MAX_SCORE as u32).contains(&value) => value as u8,
        Some(value) => {
            let clamped = value.clamp(MIN_SCORE as u32, MAX_SCORE as u32) as u8;
            warnings.push(ParseWarning::ScoreOutOfRange {
                field: field.to_string(),
                found: value,
                clamped,
            });
            clamped
        }
        None => {
            warnings.push(ParseWarning::MissingScore {
                field: field.to_string(),
                default: DEFAULT_SCORE,
            });
            DEFAULT_SCORE
        }
    }
}

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean of the scores rounded to one decimal place.
pub fn mean_score<'a>(scores: impl IntoIterator<Item = &'a u8>) -> f64 {
    let (sum, count) = scores
        .into_iter()
        .fold((0u32, 0u32), |(sum, count), s| (sum + *s as u32, count + 1));
    if count == 0 {
        return DEFAULT_SCORE as f64;
    }
    round_to_tenth(sum as f64 / count as f64)
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum SectionKind {
    /// Bullet/numbered items; any heading ends the block.
    List,
    /// Free text; only a known header ends the block.
    Text,
}

struct SectionSpec {
    key: &'static str,
    kind: SectionKind,
    aliases: &'static [&'static str],
}

const OTHER: &str = "other";

struct Section {
    key: Option<&'static str>,
    kind: SectionKind,
    lines: Vec<String>,
}

const LITERATURE_SECTIONS: &[SectionSpec] = &[
    SectionSpec {
        key: "themes",
        kind: SectionKind::List,
        aliases: &["themes", "thematic analysis", "themes identified"],
    },
    SectionSpec {
        key: "gaps",
        kind: SectionKind::List,
        aliases: &["gaps", "gaps in the literature", "identification of research gaps", "gaps identified"],
    },
    SectionSpec {
        key: "recommendations",
        kind: SectionKind::List,
        aliases: &["recommendations", "recommendations for further research", "next steps"],
    },
    SectionSpec {
        key: OTHER,
        kind: SectionKind::List,
        aliases: &[
            "findings",
            "key findings and patterns",
            "patterns",
            "methodological approaches",
            "methodologies",
            "theoretical frameworks",
            "frameworks",
            "areas of consensus and disagreement",
            "consensus and disagreement",
            "implications",
            "summary",
            "introduction",
            "conclusion",
        ],
    },
];

const HYPOTHESIS_SECTIONS: &[SectionSpec] = &[
    SectionSpec {
        key: "recommendations",
        kind: SectionKind::List,
        aliases: &[
            "recommendations",
            "suggested revisions",
            "revisions",
            "suggestions",
            "suggestions for improvement",
            "improvements",
        ],
    },
    SectionSpec {
        key: OTHER,
        kind: SectionKind::List,
        aliases: &[
            "strengths",
            "weaknesses",
            "assessment",
            "overall assessment",
            "overall score",
            "criteria scores",
            "scores",
            "evaluation",
            "justification",
        ],
    },
];

const SOURCE_QUALITY_SECTIONS: &[SectionSpec] = &[
    SectionSpec {
        key: "feedback",
        kind: SectionKind::List,
        aliases: &["feedback", "recommendations", "suggestions"],
    },
    SectionSpec {
        key: OTHER,
        kind: SectionKind::List,
        aliases: &[
            "credibility",
            "source credibility",
            "relevance",
            "recency",
            "publication recency",
            "methodological rigor",
            "citation diversity",
            "diversity",
            "overall source quality",
            "overall quality",
            "quality score",
        ],
    },
];

const DRAFT_SECTIONS: &[SectionSpec] = &[
    SectionSpec {
        key: "polished",
        kind: SectionKind::Text,
        aliases: &[
            "polished text",
            "polished version",
            "polished draft",
            "corrected text",
            "restructured text",
            "clarified text",
            "improved text",
            "revised text",
            "revised version",
            "revised draft",
        ],
    },
    SectionSpec {
        key: "changes",
        kind: SectionKind::List,
        aliases: &[
            "improvements made",
            "improvements",
            "corrections made",
            "corrections",
            "changes made",
            "changes",
        ],
    },
    SectionSpec {
        key: "suggestions",
        kind: SectionKind::List,
        aliases: &["suggestions", "suggestions for further enhancement", "further suggestions", "recommendations"],
    },
    SectionSpec {
        key: "quality",
        kind: SectionKind::List,
        aliases: &["quality score", "quality assessment", "quality", "scores"],
    },
];

const COMPARISON_SECTIONS: &[SectionSpec] = &[
    SectionSpec {
        key: "differences",
        kind: SectionKind::List,
        aliases: &["differences", "key differences"],
    },
    SectionSpec {
        key: "recommendation",
        kind: SectionKind::Text,
        aliases: &["recommendation", "overall recommendation", "verdict"],
    },
    SectionSpec {
        key: OTHER,
        kind: SectionKind::List,
        aliases: &[
            "improvements in version 2",
            "improvements",
            "potential losses",
            "losses",
            "quality comparison",
            "scores",
        ],
    },
];

fn is_bullet_line(trimmed: &str) -> bool {
    ["- ", "• ", "+ ", "* ", "▪ ", "◦ "]
        .iter()
        .any(|marker| trimmed.starts_with(marker))
}

/// Recognise a known section header, returning its key and any text that
/// followed the colon on the same line.
fn match_header(line: &str, specs: &[SectionSpec]) -> Option<(&'static str, SectionKind, Option<String>)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || is_bullet_line(trimmed) {
        return None;
    }

    let text = trimmed.trim_start_matches('#').trim_start();
    let text = NUMBERING_PREFIX.replace(text, "");
    let text = text.trim_start_matches(['*', '_']).trim_start();

    let (head, rest) = match text.find(':') {
        Some(idx) => (&text[..idx], &text[idx + 1..]),
        None => (text, ""),
    };
    let head = head
        .trim()
        .trim_end_matches(['*', '_'])
        .trim()
        .to_lowercase();
    let word_count = head.split_whitespace().count();
    if head.is_empty() || head.contains([',', '.']) || word_count > 6 {
        return None;
    }

    specs.iter().find_map(|spec| {
        let matched = spec.aliases.iter().any(|alias| {
            head == *alias
                || (word_count <= 4
                    && head
                        .strip_suffix(alias)
                        .is_some_and(|prefix| prefix.ends_with(' ')))
        });
        if !matched {
            return None;
        }
        let inline = rest.trim().trim_matches(['*', '_']).trim();
        let inline = (!inline.is_empty()).then(|| inline.to_string());
        Some((spec.key, spec.kind, inline))
    })
}

/// Markdown headings, bold-only lines and all-caps labels.
fn is_generic_heading(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || is_bullet_line(trimmed) {
        return false;
    }
    if trimmed.starts_with('#') || BOLD_ONLY_LINE.is_match(trimmed) {
        return true;
    }
    // `STRUCTURE: 4/10` is a score line, not a heading.
    if SCORE_LINE.is_match(trimmed) {
        return false;
    }
    let text = NUMBERING_PREFIX.replace(trimmed, "");
    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    letters >= 4
        && !text.chars().any(|c| c.is_lowercase())
        && text.split_whitespace().count() <= 6
}

fn split_sections(text: &str, specs: &[SectionSpec]) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section {
        key: None,
        kind: SectionKind::List,
        lines: Vec::new(),
    };

    for line in text.lines() {
        if let Some((key, kind, inline)) = match_header(line, specs) {
            let finished = std::mem::replace(
                &mut current,
                Section {
                    key: Some(key),
                    kind,
                    lines: inline.into_iter().collect(),
                },
            );
            sections.push(finished);
        } else if current.kind == SectionKind::List && is_generic_heading(line) {
            let finished = std::mem::replace(
                &mut current,
                Section {
                    key: None,
                    kind: SectionKind::List,
                    lines: Vec::new(),
                },
            );
            sections.push(finished);
        } else {
            current.lines.push(line.to_string());
        }
    }
    sections.push(current);
    sections
}

fn clean_item(text: &str) -> String {
    text.replace("**", "").replace("__", "").trim().to_string()
}

/// Items of a list block: marked lines when any exist (indented
/// continuation lines are folded into the previous item), otherwise
/// every non-empty line.
fn list_items(lines: &[String]) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    let mut saw_marker = false;

    for line in lines {
        if let Some(caps) = LIST_MARKER.captures(line) {
            saw_marker = true;
            let item = clean_item(caps.get(1).map_or("", |m| m.as_str()));
            if !item.is_empty() {
                items.push(item);
            }
        } else if saw_marker && line.starts_with([' ', '\t']) && !line.trim().is_empty() {
            if let Some(last) = items.last_mut() {
                last.push(' ');
                last.push_str(&clean_item(line));
            }
        }
    }

    if saw_marker {
        return items;
    }
    lines
        .iter()
        .map(|l| clean_item(l))
        .filter(|l| !l.is_empty())
        .collect()
}

fn block_text(lines: &[String]) -> String {
    lines.join("\n").trim().to_string()
}

/// Items of the first section with this key that yields any.
fn section_items(sections: &[Section], key: &str) -> Option<Vec<String>> {
    let mut found = false;
    for section in sections.iter().filter(|s| s.key == Some(key)) {
        found = true;
        let items = list_items(&section.lines);
        if !items.is_empty() {
            return Some(items);
        }
    }
    found.then(Vec::new)
}

fn section_text(sections: &[Section], key: &str) -> Option<String> {
    sections
        .iter()
        .filter(|s| s.key == Some(key))
        .map(|s| block_text(&s.lines))
        .find(|text| !text.is_empty())
}

/// Items for a list field, empty with a warning when the section is absent or empty.
fn required_items(
    sections: &[Section],
    key: &str,
    label: &str,
    warnings: &mut Vec<ParseWarning>,
) -> Vec<String> {
    match section_items(sections, key) {
        Some(items) if !items.is_empty() => items,
        _ => {
            warnings.push(ParseWarning::MissingSection {
                section: label.to_string(),
            });
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Parsed results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReview {
    pub themes: BTreeSet<String>,
    pub gaps: Vec<String>,
    pub recommendations: Vec<String>,
    pub raw_text: String,
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedValidation {
    pub criteria_scores: BTreeMap<Criterion, u8>,
    pub overall_score: f64,
    pub recommendations: Vec<String>,
    pub raw_text: String,
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSourceQuality {
    pub quality_score: u8,
    pub feedback: Vec<String>,
    pub raw_text: String,
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAlternatives {
    pub alternatives: Vec<String>,
    pub raw_text: String,
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDraft {
    /// `None` when the reply had no polished-text section.
    pub polished_text: Option<String>,
    pub changes: Vec<String>,
    pub suggestions: Vec<String>,
    pub quality_score: u8,
    pub raw_text: String,
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedComparison {
    pub version_a_score: u8,
    pub version_b_score: u8,
    pub differences: Vec<String>,
    pub recommendation: String,
    pub raw_text: String,
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResult {
    LiteratureReview(ParsedReview),
    SourceQuality(ParsedSourceQuality),
    HypothesisValidation(ParsedValidation),
    AlternativeHypotheses(ParsedAlternatives),
    DraftPolish(ParsedDraft),
    DraftComparison(ParsedComparison),
}

impl ParsedResult {
    pub fn warnings(&self) -> &[ParseWarning] {
        match self {
            ParsedResult::LiteratureReview(r) => &r.warnings,
            ParsedResult::SourceQuality(r) => &r.warnings,
            ParsedResult::HypothesisValidation(r) => &r.warnings,
            ParsedResult::AlternativeHypotheses(r) => &r.warnings,
            ParsedResult::DraftPolish(r) => &r.warnings,
            ParsedResult::DraftComparison(r) => &r.warnings,
        }
    }

    pub fn raw_text(&self) -> &str {
        match self {
            ParsedResult::LiteratureReview(r) => &r.raw_text,
            ParsedResult::SourceQuality(r) => &r.raw_text,
            ParsedResult::HypothesisValidation(r) => &r.raw_text,
            ParsedResult::AlternativeHypotheses(r) => &r.raw_text,
            ParsedResult::DraftPolish(r) => &r.raw_text,
            ParsedResult::DraftComparison(r) => &r.raw_text,
        }
    }

    pub fn parse_warning(&self) -> bool {
        !self.warnings().is_empty()
    }
}

pub struct ResponseParser;

impl ResponseParser {
    /// Parse a reply for the given task. Never fails.
    pub fn parse(task: TaskKind, raw_text: &str) -> ParsedResult {
        match task {
            TaskKind::LiteratureReview => ParsedResult::LiteratureReview(Self::parse_literature_review(raw_text)),
            TaskKind::SourceQuality => ParsedResult::SourceQuality(Self::parse_source_quality(raw_text)),
            TaskKind::HypothesisValidation => {
                ParsedResult::HypothesisValidation(Self::parse_hypothesis_validation(raw_text))
            }
            TaskKind::AlternativeHypotheses => {
                ParsedResult::AlternativeHypotheses(Self::parse_alternatives(raw_text, usize::MAX))
            }
            TaskKind::DraftPolish => ParsedResult::DraftPolish(Self::parse_draft(raw_text)),
            TaskKind::DraftComparison => ParsedResult::DraftComparison(Self::parse_comparison(raw_text)),
        }
    }

    pub fn parse_literature_review(raw_text: &str) -> ParsedReview {
        let sections = split_sections(raw_text, LITERATURE_SECTIONS);
        let mut warnings = Vec::new();

        let themes = required_items(&sections, "themes", "themes", &mut warnings)
            .into_iter()
            .collect();
        let gaps = required_items(&sections, "gaps", "gaps", &mut warnings);
        let recommendations = required_items(&sections, "recommendations", "recommendations", &mut warnings);

        ParsedReview {
            themes,
            gaps,
            recommendations,
            raw_text: raw_text.to_string(),
            warnings,
        }
    }

    pub fn parse_hypothesis_validation(raw_text: &str) -> ParsedValidation {
        let mut warnings = Vec::new();

        let criteria_scores: BTreeMap<Criterion, u8> = CRITERION_EXTRACTORS
            .iter()
            .map(|(criterion, extractor)| {
                let field = criterion.label().to_lowercase();
                let score = resolve_score(extractor.extract(raw_text), &field, &mut warnings);
                (*criterion, score)
            })
            .collect();

        // The reported overall is only a cross-check; the local mean wins.
        let overall_score = mean_score(criteria_scores.values());
        if let Some(reported) = OVERALL_SCORE
            .captures(raw_text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
        {
            if (reported - overall_score).abs() > 0.05 {
                warnings.push(ParseWarning::InconsistentAggregate {
                    field: "overall score".to_string(),
                    reported,
                    computed: overall_score,
                });
            }
        }

        let sections = split_sections(raw_text, HYPOTHESIS_SECTIONS);
        let recommendations = required_items(&sections, "recommendations", "recommendations", &mut warnings);

        ParsedValidation {
            criteria_scores,
            overall_score,
            recommendations,
            raw_text: raw_text.to_string(),
            warnings,
        }
    }

    pub fn parse_source_quality(raw_text: &str) -> ParsedSourceQuality {
        let mut warnings = Vec::new();
        let quality_score = resolve_score(SOURCE_QUALITY_SCORE.extract(raw_text), "source quality", &mut warnings);
        let sections = split_sections(raw_text, SOURCE_QUALITY_SECTIONS);
        let feedback = required_items(&sections, "feedback", "feedback", &mut warnings);

        ParsedSourceQuality {
            quality_score,
            feedback,
            raw_text: raw_text.to_string(),
            warnings,
        }
    }

    /// Split a reply into at most `limit` alternative hypotheses.
    ///
    /// A new item starts at a numbered line or a `Hypothesis N` label;
    /// following lines are folded into it until the next one starts.
    pub fn parse_alternatives(raw_text: &str, limit: usize) -> ParsedAlternatives {
        let mut alternatives: Vec<String> = Vec::new();
        let mut current: Option<String> = None;

        for line in raw_text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if ALTERNATIVE_START.is_match(line) {
                if let Some(done) = current.take().filter(|c| !c.is_empty()) {
                    alternatives.push(done);
                }
                let body = ALTERNATIVE_LABEL.replace(line, "");
                current = Some(clean_item(&body));
            } else if let Some(text) = current.as_mut() {
                let addition = clean_item(trimmed.trim_start_matches(['-', '*', '•']));
                if !addition.is_empty() {
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(&addition);
                }
            }
        }
        if let Some(done) = current.filter(|c| !c.is_empty()) {
            alternatives.push(done);
        }
        alternatives.truncate(limit);

        let mut warnings = Vec::new();
        if alternatives.is_empty() {
            warnings.push(ParseWarning::MissingSection {
                section: "alternatives".to_string(),
            });
        }

        ParsedAlternatives {
            alternatives,
            raw_text: raw_text.to_string(),
            warnings,
        }
    }

    pub fn parse_draft(raw_text: &str) -> ParsedDraft {
        let sections = split_sections(raw_text, DRAFT_SECTIONS);
        let mut warnings = Vec::new();

        let polished_text = section_text(&sections, "polished");
        if polished_text.is_none() {
            warnings.push(ParseWarning::MissingText {
                section: "polished text".to_string(),
            });
        }
        let changes = required_items(&sections, "changes", "improvements", &mut warnings);
        let suggestions = section_items(&sections, "suggestions").unwrap_or_default();

        // Sub-scores are read from the quality block when there is one so
        // that prose in the polished text cannot masquerade as a score.
        let read_sub_scores = |source: &str| -> Vec<u8> {
            DRAFT_SUB_SCORES
                .iter()
                .filter_map(|(_, extractor)| extractor.extract(source))
                .map(|s| s.clamp(MIN_SCORE as u32, MAX_SCORE as u32) as u8)
                .collect()
        };
        let mut sub_scores = section_text(&sections, "quality")
            .map(|block| read_sub_scores(&block))
            .unwrap_or_default();
        if sub_scores.is_empty() {
            sub_scores = read_sub_scores(raw_text);
        }
        let reported = DRAFT_QUALITY_SCORE.extract(raw_text);

        let quality_score = if sub_scores.is_empty() {
            resolve_score(reported, "quality score", &mut warnings)
        } else {
            let computed = mean_score(sub_scores.iter()).round() as u8;
            if let Some(reported) = reported {
                if reported != computed as u32 {
                    warnings.push(ParseWarning::InconsistentAggregate {
                        field: "quality score".to_string(),
                        reported: reported as f64,
                        computed: computed as f64,
                    });
                }
            }
            computed.clamp(MIN_SCORE, MAX_SCORE)
        };

        ParsedDraft {
            polished_text,
            changes,
            suggestions,
            quality_score,
            raw_text: raw_text.to_string(),
            warnings,
        }
    }

    pub fn parse_comparison(raw_text: &str) -> ParsedComparison {
        let mut warnings = Vec::new();
        let version_a_score = resolve_score(VERSION_A_SCORE.extract(raw_text), "version 1", &mut warnings);
        let version_b_score = resolve_score(VERSION_B_SCORE.extract(raw_text), "version 2", &mut warnings);

        let sections = split_sections(raw_text, COMPARISON_SECTIONS);
        let differences = required_items(&sections, "differences", "differences", &mut warnings);
        let recommendation = section_text(&sections, "recommendation").unwrap_or_else(|| {
            warnings.push(ParseWarning::MissingText {
                section: "recommendation".to_string(),
            });
            String::new()
        });

        ParsedComparison {
            version_a_score,
            version_b_score,
            differences,
            recommendation,
            raw_text: raw_text.to_string(),
            warnings,
        }
    }
}
