//! Human-readable section references ("Section 9(2)(a)") from citation and section data.
//!
//! Everything here is pure: no I/O, deterministic output for a given input.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Citation, Section};

/// "Section 9(2)", "section 12A (1)(b)".
static SECTION_QUALIFIED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bsection\s+(\d+[A-Za-z]?)((?:\s*\([0-9A-Za-z]+\))+)")
        .unwrap_or_else(|e| unreachable!("invalid section pattern: {e}"))
});

/// "9. Equality" at the start of a breadcrumb.
static NUMBERED_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+[A-Za-z]?)\.\s")
        .unwrap_or_else(|e| unreachable!("invalid numbered prefix pattern: {e}"))
});

/// Level prefixes that carry a section reference inside a structured id.
const SECTION_LEVEL: &str = "sec_";
const SUBSECTION_LEVEL: &str = "subsec_";
const PARAGRAPH_LEVEL: &str = "para_";

/// Format a citation's section reference, or `None` when nothing recognisable is found.
///
/// A backend-computed `legal_reference` always wins. Otherwise `section` is scanned
/// before `section_id`, each through the same ordered cascade.
pub fn format_section_ref(citation: &Citation) -> Option<String> {
    if let Some(reference) = citation.legal_reference.as_deref() {
        return Some(reference.to_string());
    }
    [citation.section.as_deref(), citation.section_id.as_deref()]
        .into_iter()
        .flatten()
        .find_map(parse_reference)
}

fn parse_reference(text: &str) -> Option<String> {
    if let Some(caps) = SECTION_QUALIFIED_RE.captures(text) {
        let qualifiers: String = caps[2].chars().filter(|c| !c.is_whitespace()).collect();
        return Some(format!("Section {}{}", &caps[1], qualifiers));
    }
    if let Some(caps) = NUMBERED_PREFIX_RE.captures(text) {
        return Some(format!("Section {}", &caps[1]));
    }
    parse_structured_id(text)
}

/// The section/subsection/paragraph identifiers encoded in an eId.
#[derive(Debug, Default, PartialEq)]
struct EidLevels<'a> {
    section: Option<&'a str>,
    subsection: Option<&'a str>,
    paragraph: Option<&'a str>,
}

fn eid_levels(eid: &str) -> EidLevels<'_> {
    let mut levels = EidLevels::default();
    for part in eid.split("__") {
        // Check the longer prefix first: "subsec_" also ends in "sec_".
        if let Some(v) = part.strip_prefix(SUBSECTION_LEVEL) {
            levels.subsection = non_empty(v);
        } else if let Some(v) = part.strip_prefix(SECTION_LEVEL) {
            levels.section = non_empty(v);
        } else if let Some(v) = part.strip_prefix(PARAGRAPH_LEVEL) {
            levels.paragraph = non_empty(v);
        }
    }
    levels
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

/// `sec_9__subsec_2__para_a` → `Section 9(2)(a)`. Missing inner levels are omitted.
fn parse_structured_id(id: &str) -> Option<String> {
    let levels = eid_levels(id.trim());
    let section = levels.section?;
    let mut out = format!("Section {section}");
    for level in [levels.subsection, levels.paragraph].into_iter().flatten() {
        out.push('(');
        out.push_str(level);
        out.push(')');
    }
    Some(out)
}

/// Format a reference from fetched section data.
///
/// Preferred over [`format_section_ref`] whenever a section has been fetched.
pub fn format_section_from_data(section: &Section) -> Option<String> {
    if let Some(reference) = section.legal_reference.as_deref() {
        return Some(reference.to_string());
    }
    let number = section.number.as_deref().map(clean_number).filter(|n| !n.is_empty());
    let levels = eid_levels(&section.eid);

    match section.section_type.to_ascii_lowercase().as_str() {
        "section" => number
            .or(levels.section)
            .map(|n| format!("Section {n}")),
        "subsection" => {
            let parent = levels.section?;
            let n = number.or(levels.subsection)?;
            Some(format!("Section {parent}({n})"))
        }
        "paragraph" => {
            let parent = levels.section?;
            let n = number.or(levels.paragraph)?;
            Some(match levels.subsection {
                Some(sub) => format!("Section {parent}({sub})({n})"),
                None => format!("Section {parent}({n})"),
            })
        }
        other if !other.is_empty() => number.map(|n| format!("{} {n}", capitalize(other))),
        _ => None,
    }
}

/// Label for the source panel header: section data, then citation fields, then the title.
pub fn display_label(citation: &Citation, section: Option<&Section>) -> String {
    section
        .and_then(format_section_from_data)
        .or_else(|| format_section_ref(citation))
        .unwrap_or_else(|| citation.title.clone())
}

/// "(2)" → "2", "9." → "9".
fn clean_number(raw: &str) -> &str {
    raw.trim()
        .trim_start_matches('(')
        .trim_end_matches('.')
        .trim_end_matches(')')
        .trim()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
