//! Splits the model's raw reply into named sections and derives the
//! structural render model the overlay draws from.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

/// Known section headings, declared in render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SectionKey {
    Comparison,
    Approach,
    Solution,
    OptimizedSolution,
    Complexity,
    ShortExplanation,
    Answer,
}

impl SectionKey {
    fn from_heading(heading: &str) -> Option<Self> {
        match heading.to_lowercase().as_str() {
            "comparison" => Some(Self::Comparison),
            "approach" => Some(Self::Approach),
            "solution" => Some(Self::Solution),
            "optimized solution" => Some(Self::OptimizedSolution),
            "complexity" => Some(Self::Complexity),
            "short explanation" => Some(Self::ShortExplanation),
            "answer" => Some(Self::Answer),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Comparison => "Comparison",
            Self::Approach => "Approach",
            Self::Solution => "Solution",
            Self::OptimizedSolution => "Optimized solution",
            Self::Complexity => "Complexity",
            Self::ShortExplanation => "Short explanation",
            Self::Answer => "Answer",
        }
    }
}

const ALL_KEYS: [SectionKey; 7] = [
    SectionKey::Comparison,
    SectionKey::Approach,
    SectionKey::Solution,
    SectionKey::OptimizedSolution,
    SectionKey::Complexity,
    SectionKey::ShortExplanation,
    SectionKey::Answer,
];

// Longer alternatives first so "optimized solution" never matches as
// "solution". Accepts an optional ASCII or fullwidth colon.
static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(optimized solution|short explanation|comparison|approach|solution|complexity|answer)[:：]?",
    )
    .expect("valid regex")
});

/// Strip the markdown emphasis and code-fence markers the model sneaks in.
/// Not cosmetic: the section parser and the render model both operate on
/// plain text.
pub fn strip_markup(raw: &str) -> String {
    raw.replace("**", "")
        .replace('*', "")
        .replace("```", "")
        .replace('`', "")
        .trim()
        .to_string()
}

/// Line-oriented section scan. A line starting with a known heading (case
/// insensitive, optional colon) opens that section; following lines accumulate
/// until the next heading. Text before the first heading is preamble and is
/// dropped. A repeated heading reassigns its buffer: last write wins.
pub fn parse_sections(raw: &str) -> BTreeMap<SectionKey, String> {
    let mut sections = BTreeMap::new();
    let mut current: Option<SectionKey> = None;
    let mut buffer: Vec<String> = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim();
        if let Some(caps) = HEADING.captures(trimmed) {
            if let Some(key) = current {
                sections.insert(key, buffer.join("\n").trim().to_string());
            }
            let heading = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            current = SectionKey::from_heading(heading);
            buffer.clear();
            let rest = trimmed[caps.get(0).map(|m| m.end()).unwrap_or(0)..].trim();
            if !rest.is_empty() {
                buffer.push(rest.to_string());
            }
        } else if current.is_some() {
            // Raw line, not trimmed: solution bodies keep their indentation.
            buffer.push(line.to_string());
        }
    }
    if let Some(key) = current {
        sections.insert(key, buffer.join("\n").trim().to_string());
    }

    sections
}

// ─── Render model ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Block {
    /// Bulleted list (comparison, approach).
    Bullets {
        title: &'static str,
        points: Vec<String>,
    },
    /// Shown when a section the layout expects is absent.
    Placeholder {
        title: &'static str,
        text: &'static str,
    },
    /// Verbatim monospaced body, no reflow.
    Code { title: &'static str, body: String },
    /// Complexity decomposed into a time term and a space term.
    Complexity { time: String, space: String },
    /// Complexity text that resisted decomposition, shown whole.
    ComplexityFallback { body: String },
    /// Preformatted wrapped text (short explanation).
    Preformatted { title: &'static str, body: String },
    /// Emphasized block (the final answer).
    Emphasis { title: &'static str, body: String },
}

const NO_APPROACH: &str = "No approach provided.";
const NO_TIME: &str = "Time complexity not provided.";
const NO_SPACE: &str = "Space complexity not provided.";

/// Derive the ordered render model from parsed sections. A present
/// `Comparison` section suppresses the `Approach` block entirely; an absent
/// `Approach` otherwise still yields an explicit placeholder block.
pub fn render(sections: &BTreeMap<SectionKey, String>) -> Vec<Block> {
    let has_comparison = sections.contains_key(&SectionKey::Comparison);
    let mut blocks = Vec::new();

    for key in ALL_KEYS {
        let body = sections.get(&key);
        match key {
            SectionKey::Comparison => {
                if let Some(body) = body {
                    blocks.push(Block::Bullets {
                        title: key.label(),
                        points: split_bullets(body),
                    });
                }
            }
            SectionKey::Approach => {
                if has_comparison {
                    continue;
                }
                match body {
                    Some(body) => blocks.push(Block::Bullets {
                        title: key.label(),
                        points: split_bullets(body),
                    }),
                    None => blocks.push(Block::Placeholder {
                        title: key.label(),
                        text: NO_APPROACH,
                    }),
                }
            }
            SectionKey::Solution | SectionKey::OptimizedSolution => {
                if let Some(body) = body {
                    blocks.push(Block::Code {
                        title: key.label(),
                        body: body.clone(),
                    });
                }
            }
            SectionKey::Complexity => {
                if let Some(body) = body {
                    let terms = split_complexity(body);
                    if terms.time.is_none() && terms.space.is_none() {
                        blocks.push(Block::ComplexityFallback { body: body.clone() });
                    } else {
                        blocks.push(Block::Complexity {
                            time: terms.time.unwrap_or_else(|| NO_TIME.to_string()),
                            space: terms.space.unwrap_or_else(|| NO_SPACE.to_string()),
                        });
                    }
                }
            }
            SectionKey::ShortExplanation => {
                if let Some(body) = body {
                    blocks.push(Block::Preformatted {
                        title: key.label(),
                        body: body.clone(),
                    });
                }
            }
            SectionKey::Answer => {
                if let Some(body) = body {
                    blocks.push(Block::Emphasis {
                        title: key.label(),
                        body: body.clone(),
                    });
                }
            }
        }
    }

    blocks
}

static BULLET_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:-|\d+\.|•)\s*").expect("valid regex"));

/// Split a section body into bullet points at list markers and newlines.
pub fn split_bullets(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| BULLET_MARKER.replace(line, "").trim().to_string())
        .filter(|point| !point.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplexityTerms {
    pub time: Option<String>,
    pub space: Option<String>,
}

static TIME_TERM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:time\s*complexity|time)\s*[:：]\s*[^\n\r;]+").expect("valid regex")
});
static SPACE_TERM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:space\s*complexity|space)\s*[:：]\s*[^\n\r;]+").expect("valid regex")
});
static TIME_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)time|o\(|big\s*o").expect("valid regex"));
static SPACE_HINT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)space|memory").expect("valid regex"));

/// Decompose a complexity body into a time term and a space term: labeled
/// patterns first, then a keyword heuristic over line/semicolon parts.
pub fn split_complexity(text: &str) -> ComplexityTerms {
    let mut time = TIME_TERM.find(text).map(|m| m.as_str().trim().to_string());
    let mut space = SPACE_TERM.find(text).map(|m| m.as_str().trim().to_string());

    if time.is_none() || space.is_none() {
        let parts: Vec<&str> = text
            .split(['\n', '\r', ';'])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        if time.is_none() {
            time = parts
                .iter()
                .find(|part| TIME_HINT.is_match(part) && !part.to_lowercase().contains("space"))
                .map(|part| part.to_string());
        }
        if space.is_none() {
            space = parts
                .iter()
                .find(|part| SPACE_HINT.is_match(part) && !part.to_lowercase().contains("time"))
                .map(|part| part.to_string());
        }
    }

    ComplexityTerms { time, space }
}
