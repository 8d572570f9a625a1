//! Heuristic fallback extraction: pattern matching over normalized text,
//! used when the extraction service cannot produce a schema-conformant
//! result. Trades precision for guaranteed non-failure. Every field may come
//! back empty, but the call itself always succeeds.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::candidate::{CandidateFields, EducationEntry, ExperienceEntry};

/// Placeholder for "section found, sub-field not parseable", distinct from
/// `None` which means the section itself was not found.
const NOT_SPECIFIED: &str = "Not specified";

const NAME_SCAN_LINES: usize = 10;
const SUMMARY_MAX_CHARS: usize = 300;
const MAX_SKILLS: usize = 25;
const MAX_SECTION_ENTRIES: usize = 8;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9][A-Za-z0-9._%+-]*@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid regex")
});

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+\d{1,2}[\s.-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}").expect("valid regex")
});

static LOCATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z][A-Za-z]+(?: [A-Z][A-Za-z]+)*), ?([A-Z]{2}|[A-Z][A-Za-z]+(?: [A-Z][A-Za-z]+)*)\b")
        .expect("valid regex")
});

static NAME_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Za-z'.-]*(?: [A-Z][A-Za-z'.-]*){1,3}$").expect("valid regex"));

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid regex"));

const SUMMARY_HEADINGS: &[&str] = &["summary", "objective", "profile", "about"];
const SKILL_HEADINGS: &[&str] = &["skills", "technical skills", "technologies", "core competencies"];
const EXPERIENCE_HEADINGS: &[&str] = &["experience", "employment", "work history"];
const EDUCATION_HEADINGS: &[&str] = &["education", "academic background", "qualifications"];

const ROLE_KEYWORDS: &[&str] = &[
    "engineer",
    "developer",
    "manager",
    "analyst",
    "designer",
    "consultant",
    "director",
    "architect",
    "lead",
    "intern",
    "administrator",
    "specialist",
    "scientist",
    "coordinator",
];

const DEGREE_KEYWORDS: &[&str] = &[
    "bachelor",
    "master",
    "phd",
    "ph.d",
    "b.s",
    "m.s",
    "b.a",
    "m.a",
    "mba",
    "b.tech",
    "m.tech",
    "associate",
    "diploma",
];

/// Common skill tokens matched against the text. Single tokens only; matching
/// is done on a lowercase tokenization that preserves `+`, `#` and inner dots
/// so entries like `c++` and `node.js` survive.
const SKILL_VOCAB: &[&str] = &[
    "python",
    "java",
    "javascript",
    "typescript",
    "rust",
    "go",
    "ruby",
    "php",
    "c++",
    "c#",
    "sql",
    "nosql",
    "html",
    "css",
    "react",
    "angular",
    "vue",
    "node.js",
    "django",
    "flask",
    "spring",
    "rails",
    "kotlin",
    "swift",
    "scala",
    "aws",
    "azure",
    "gcp",
    "docker",
    "kubernetes",
    "terraform",
    "jenkins",
    "git",
    "linux",
    "bash",
    "postgresql",
    "mysql",
    "mongodb",
    "redis",
    "kafka",
    "spark",
    "hadoop",
    "tableau",
    "excel",
    "jira",
    "figma",
    "photoshop",
];

/// Derives a minimal candidate record from normalized text. Total: empty
/// input yields a record whose every field is `None` or an empty list.
pub fn fallback_extract(text: &str) -> CandidateFields {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    CandidateFields {
        full_name: find_name(&lines),
        email: EMAIL_RE.find(text).map(|m| m.as_str().to_string()),
        phone: PHONE_RE.find(text).map(|m| m.as_str().to_string()),
        location: LOCATION_RE.find(text).map(|m| m.as_str().to_string()),
        summary: find_summary(&lines),
        skills: find_skills(&lines, text),
        experience: find_experience(&lines),
        education: find_education(&lines),
    }
}

/// First of the leading lines shaped like a capitalized name, skipping
/// document-type labels.
fn find_name(lines: &[&str]) -> Option<String> {
    lines.iter().take(NAME_SCAN_LINES).find_map(|line| {
        let lower = line.to_lowercase();
        if lower.contains("resume") || lower.contains("curriculum") || lower == "cv" {
            return None;
        }
        if line.len() < 3 || line.len() > 60 {
            return None;
        }
        NAME_LINE_RE.is_match(line).then(|| line.to_string())
    })
}

fn find_summary(lines: &[&str]) -> Option<String> {
    let start = lines
        .iter()
        .position(|line| heading_keyword(line, SUMMARY_HEADINGS).is_some())?;

    let keyword = heading_keyword(lines[start], SUMMARY_HEADINGS)?;
    let mut paragraph = strip_heading(lines[start], keyword);

    for line in lines.iter().skip(start + 1) {
        if is_any_heading(line) || paragraph.chars().count() >= SUMMARY_MAX_CHARS {
            break;
        }
        if !paragraph.is_empty() {
            paragraph.push(' ');
        }
        paragraph.push_str(line);
    }

    let bounded: String = paragraph.chars().take(SUMMARY_MAX_CHARS).collect();
    let bounded = bounded.trim().to_string();
    (!bounded.is_empty()).then_some(bounded)
}

fn find_skills(lines: &[&str], whole_text: &str) -> Vec<String> {
    // Prefer the skills section; fall back to the whole document.
    let section_text = section_body(lines, SKILL_HEADINGS).map(|body| body.join("\n"));
    let haystack = section_text.as_deref().unwrap_or(whole_text);

    let mut skills = Vec::new();
    for token in tokenize(haystack) {
        if SKILL_VOCAB.contains(&token.as_str()) {
            let skill = title_case(&token);
            if !skills.contains(&skill) {
                skills.push(skill);
            }
            if skills.len() == MAX_SKILLS {
                break;
            }
        }
    }
    skills
}

fn find_experience(lines: &[&str]) -> Vec<ExperienceEntry> {
    let Some(body) = section_body(lines, EXPERIENCE_HEADINGS) else {
        return Vec::new();
    };

    body.iter()
        .filter(|line| contains_keyword(line, ROLE_KEYWORDS) && line.len() <= 120)
        .take(MAX_SECTION_ENTRIES)
        .map(|line| ExperienceEntry {
            title: Some(line.to_string()),
            company: Some(NOT_SPECIFIED.to_string()),
            duration: Some(NOT_SPECIFIED.to_string()),
            description: Some(NOT_SPECIFIED.to_string()),
        })
        .collect()
}

fn find_education(lines: &[&str]) -> Vec<EducationEntry> {
    let Some(body) = section_body(lines, EDUCATION_HEADINGS) else {
        return Vec::new();
    };

    body.iter()
        .filter(|line| contains_keyword(line, DEGREE_KEYWORDS) && line.len() <= 120)
        .take(MAX_SECTION_ENTRIES)
        .map(|line| EducationEntry {
            degree: Some(line.to_string()),
            institution: Some(NOT_SPECIFIED.to_string()),
            year: YEAR_RE
                .find(line)
                .map(|m| m.as_str().to_string())
                .or_else(|| Some(NOT_SPECIFIED.to_string())),
        })
        .collect()
}

/// Returns the heading keyword if `line` reads as a section heading for one
/// of `keywords` (short line starting with the keyword).
fn heading_keyword<'a>(line: &str, keywords: &[&'a str]) -> Option<&'a str> {
    if line.len() > 40 {
        return None;
    }
    let lower = line.to_lowercase();
    keywords.iter().copied().find(|k| lower.starts_with(k))
}

fn is_any_heading(line: &str) -> bool {
    heading_keyword(line, SUMMARY_HEADINGS).is_some()
        || heading_keyword(line, SKILL_HEADINGS).is_some()
        || heading_keyword(line, EXPERIENCE_HEADINGS).is_some()
        || heading_keyword(line, EDUCATION_HEADINGS).is_some()
}

/// Content of the first section headed by one of `keywords`: the remainder
/// of the heading line plus following lines up to the next heading.
fn section_body(lines: &[&str], keywords: &[&str]) -> Option<Vec<String>> {
    let start = lines
        .iter()
        .position(|line| heading_keyword(line, keywords).is_some())?;

    let keyword = heading_keyword(lines[start], keywords)?;
    let mut body = Vec::new();

    let inline = strip_heading(lines[start], keyword);
    if !inline.is_empty() {
        body.push(inline);
    }

    for line in lines.iter().skip(start + 1) {
        if is_any_heading(line) {
            break;
        }
        body.push(line.to_string());
    }

    Some(body)
}

fn strip_heading(line: &str, keyword: &str) -> String {
    let rest: String = line.chars().skip(keyword.chars().count()).collect();
    rest.trim_start_matches([':', '-', ' ']).trim().to_string()
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '.')))
        .map(|token| token.trim_end_matches('.'))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_keyword(line: &str, keywords: &[&str]) -> bool {
    let lower = line.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

fn title_case(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().to_string() + &chars.as_str().to_lowercase(),
    }
}
