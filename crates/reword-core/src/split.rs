//! Decomposition of a raw model response into discrete paraphrases.
//!
//! Model output is requested with an explicit sentinel token between
//! versions, but providers do not always comply, so [`split`] tries a
//! ladder of strategies from most to least structured:
//!
//! 1. sentinel token
//! 2. numbered headings (`1:`, `2)`, `**Paraphrased Version 3:**`, ...)
//! 3. blank-line blocks
//! 4. approximate equal-size word chunks (always succeeds)
//!
//! The first rule that produces at least one usable segment wins. A rule
//! that reaches `expected` segments returns exactly that many; a shorter
//! result is returned as-is and the caller pads it to the full count.

use std::sync::OnceLock;

use regex::Regex;

/// Sentinel token the prompt asks the provider to place between versions.
pub const PARAPHRASE_SEPARATOR: &str = "###PARAPHRASE_SEPARATOR###";

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // A line that begins a paraphrase block: optional markdown emphasis,
        // optional "paraphrase(d) (version)" / "version" label, a one- or
        // two-digit number, then :, ), -, or . and whitespace.
        Regex::new(
            r"(?im)^(?:\s*\**\s*(?:paraphrased(?:\s+version)?|paraphrase|version)?\s*)?(\d{1,2})\s*[:)\-.]\s*",
        )
        .expect("heading pattern is valid")
    })
}

fn emphasis_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\**\s*").expect("emphasis pattern is valid"))
}

fn blank_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\r?\n(?:\s*\r?\n)+").expect("blank-line pattern is valid"))
}

/// Split a raw model response into at most `expected` paraphrases.
///
/// Returns between 0 and `expected` trimmed, non-empty segments in their
/// original order, except that the final word-chunking rule always returns
/// exactly `expected` entries (placeholders for chunks it cannot fill).
#[must_use]
pub fn split(raw: &str, expected: usize) -> Vec<String> {
    if expected == 0 {
        return Vec::new();
    }
    let txt = raw.trim();
    if txt.is_empty() {
        return Vec::new();
    }

    // 1) Explicit sentinel. If the token is present this rule is
    // authoritative even when it yields fewer segments than expected.
    if txt.contains(PARAPHRASE_SEPARATOR) {
        let mut parts: Vec<String> = txt
            .split(PARAPHRASE_SEPARATOR)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        parts.truncate(expected);
        return parts;
    }

    // 2) Numbered headings.
    let matches: Vec<_> = heading_re().find_iter(txt).collect();
    if !matches.is_empty() {
        let mut slices = Vec::new();
        for (i, m) in matches.iter().enumerate() {
            let start = m.end();
            let end = matches.get(i + 1).map_or(txt.len(), regex::Match::start);
            let part = emphasis_re().replace(txt[start..end].trim(), "");
            let part = part.trim();
            if !part.is_empty() {
                slices.push(part.to_owned());
            }
        }
        if !slices.is_empty() {
            slices.truncate(expected);
            return slices;
        }
    }

    // 3) Blank-line blocks.
    let mut blocks: Vec<String> = blank_line_re()
        .split(txt)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    if blocks.len() > 1 {
        blocks.truncate(expected);
        return blocks;
    }

    // 4) Approximate chunking over whitespace tokens. The last chunk takes
    // the remainder so every input word lands in some segment.
    let words: Vec<&str> = txt.split_whitespace().collect();
    let per = (words.len() / expected).max(1);
    let mut out = Vec::with_capacity(expected);
    for i in 0..expected {
        let start = (i * per).min(words.len());
        let end = if i + 1 == expected {
            words.len()
        } else {
            ((i + 1) * per).min(words.len())
        };
        let chunk = words[start..end].join(" ");
        if chunk.is_empty() {
            out.push(format!("(paraphrase {})", i + 1));
        } else {
            out.push(chunk);
        }
    }
    out
}

/// Deterministic placeholder used when generation fails or comes up short.
#[must_use]
pub fn fallback_paraphrase(idx: usize) -> String {
    format!("(Fallback paraphrase {idx}) This is a simple rewrite due to an API error.")
}
