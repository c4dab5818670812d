//! Human-readable gallery identifiers derived from free text.
//!
//! A gallery id doubles as its directory name, so it must be
//! filesystem-safe (`[a-z0-9_-]`, bounded length) while staying
//! recognizable: "Зустріч 2024" becomes `zustrich-2024`, not a UUID.
//!
//! Derivation runs in two steps:
//!
//! 1. [`normalize_text`] — NFKD decomposition strips Latin diacritics,
//!    a fixed table romanizes Cyrillic, whitespace turns into dashes,
//!    anything else into underscores, and separator runs collapse.
//! 2. [`generate_id`] — resolves collisions against both the caller's
//!    known-id set and the filesystem, appending `-1`, `-2`, … and
//!    re-trimming the base so the result never exceeds `max_len`.
//!
//! Both steps are pure apart from the filesystem existence probe; the
//! caller's id set is never mutated.

use std::collections::HashSet;
use std::path::Path;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;
use uuid::Uuid;

/// Romanization table for Cyrillic, keyed by lowercase character.
/// Uppercase input is lowered before lookup. The soft sign maps to
/// nothing at all.
const CYRILLIC: &[(char, &str)] = &[
    ('а', "a"),
    ('б', "b"),
    ('в', "v"),
    ('г', "g"),
    ('ґ', "g"),
    ('д', "d"),
    ('е', "e"),
    ('є', "ye"),
    ('ж', "zh"),
    ('з', "z"),
    ('и', "y"),
    ('і', "i"),
    ('ї', "yi"),
    ('й', "y"),
    ('к', "k"),
    ('л', "l"),
    ('м', "m"),
    ('н', "n"),
    ('о', "o"),
    ('п', "p"),
    ('р', "r"),
    ('с', "s"),
    ('т', "t"),
    ('у', "u"),
    ('ф', "f"),
    ('х', "kh"),
    ('ц', "ts"),
    ('ч', "ch"),
    ('ш', "sh"),
    ('щ', "shch"),
    ('ь', ""),
    ('ю', "yu"),
    ('я', "ya"),
];

fn transliterate(ch: char) -> Option<&'static str> {
    let low = ch.to_lowercase().next().unwrap_or(ch);
    CYRILLIC
        .iter()
        .find(|(key, _)| *key == low)
        .map(|(_, out)| *out)
}

/// Normalize free text into `[a-z0-9_-]*`.
///
/// - NFKD-decomposes and drops combining marks, so `é` → `e`
/// - Romanizes Cyrillic via the fixed table
/// - Whitespace → `-`; other unmappable characters → `_`
/// - Lowercases everything
/// - Collapses separator runs to one character (a run containing a dash
///   collapses to `-`, a pure underscore run to `_`) and strips
///   leading/trailing separators
///
/// Returns an empty string when nothing survives (e.g. CJK-only input).
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // (seen any dash, seen any separator) for the pending run
    let mut run: Option<bool> = None;

    for ch in text.trim().nfkd().filter(|c| !is_combining_mark(*c)) {
        let mapped: Mapped = if ch.is_whitespace() {
            Mapped::Separator('-')
        } else if ch.is_ascii_alphanumeric() {
            Mapped::Char(ch.to_ascii_lowercase())
        } else if ch == '-' || ch == '_' {
            Mapped::Separator(ch)
        } else if let Some(tr) = transliterate(ch) {
            Mapped::Str(tr)
        } else {
            Mapped::Separator('_')
        };

        match mapped {
            Mapped::Separator(sep) => {
                run = Some(run.unwrap_or(false) || sep == '-');
            }
            Mapped::Char(c) => {
                flush_run(&mut out, run.take());
                out.push(c);
            }
            Mapped::Str(s) => {
                if !s.is_empty() {
                    flush_run(&mut out, run.take());
                    out.push_str(s);
                }
            }
        }
    }
    // A trailing run is dropped, which strips trailing separators.
    out
}

enum Mapped {
    Char(char),
    Str(&'static str),
    Separator(char),
}

fn flush_run(out: &mut String, run: Option<bool>) {
    if let Some(had_dash) = run
        && !out.is_empty()
    {
        out.push(if had_dash { '-' } else { '_' });
    }
}

/// Random lowercase-hex identifier of exactly `len` characters.
fn random_hex(len: usize) -> String {
    let mut s = String::with_capacity(len);
    while s.len() < len {
        s.push_str(Uuid::new_v4().simple().to_string().as_str());
    }
    s.truncate(len);
    s
}

fn id_taken(candidate: &str, existing_ids: &HashSet<String>, root_dir: &Path) -> bool {
    existing_ids.contains(candidate) || root_dir.join(candidate).exists()
}

/// Derive a unique, filesystem-safe id from `name`.
///
/// The candidate is checked against `existing_ids` and against directory
/// entries under `root_dir`. On collision a `-1`, `-2`, … suffix is
/// appended, trimming the base so base+suffix stays within `max_len`.
/// When the base cannot be trimmed any further, a random hex id takes
/// its place. Each suffix is distinct, so the loop always terminates.
pub fn generate_id(
    name: &str,
    existing_ids: &HashSet<String>,
    root_dir: &Path,
    max_len: usize,
) -> String {
    let mut base = normalize_text(name);
    if base.is_empty() {
        base = format!("gallery-{}", random_hex(8));
    }
    base.truncate(max_len);
    // Truncation may leave a dangling separator
    let base = base.trim_end_matches(['-', '_']).to_string();

    let mut candidate = base.clone();
    let mut counter: u32 = 1;

    while id_taken(&candidate, existing_ids, root_dir) {
        let suffix = format!("-{counter}");
        if suffix.len() >= max_len {
            candidate = random_hex(max_len);
        } else {
            let allowed = max_len - suffix.len();
            let trimmed = base[..base.len().min(allowed)].trim_end_matches(['-', '_']);
            candidate = format!("{trimmed}{suffix}");
        }
        counter += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn ids(entries: &[&str]) -> HashSet<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    // =========================================================================
    // normalize_text
    // =========================================================================

    #[test]
    fn normalize_plain_ascii() {
        assert_eq!(normalize_text("Summer Trip 2024"), "summer-trip-2024");
    }

    #[test]
    fn normalize_strips_latin_diacritics() {
        assert_eq!(normalize_text("Café Noël"), "cafe-noel");
        assert_eq!(normalize_text("München"), "munchen");
    }

    #[test]
    fn normalize_transliterates_cyrillic() {
        assert_eq!(normalize_text("Зустріч 2024"), "zustrich-2024");
        assert_eq!(normalize_text("Щастя"), "shchastya");
        assert_eq!(normalize_text("Хліб"), "khlib");
    }

    #[test]
    fn normalize_decomposes_before_transliterating() {
        // NFKD splits ї into і plus a combining diaeresis, so the base
        // letter is what reaches the table
        assert_eq!(normalize_text("Їжак"), "izhak");
        assert_eq!(normalize_text("Гайок"), "gayok");
    }

    #[test]
    fn normalize_drops_soft_sign() {
        assert_eq!(normalize_text("Львів"), "lviv");
    }

    #[test]
    fn normalize_replaces_unmappable_with_underscore() {
        assert_eq!(normalize_text("a@b"), "a_b");
        // Space + '#' form one mixed run, which prefers the dash
        assert_eq!(normalize_text("day #1"), "day-1");
    }

    #[test]
    fn normalize_collapses_separator_runs() {
        assert_eq!(normalize_text("a---b"), "a-b");
        assert_eq!(normalize_text("a___b"), "a_b");
        // Mixed runs prefer the dash
        assert_eq!(normalize_text("a-_-b"), "a-b");
        assert_eq!(normalize_text("a _ b"), "a-b");
    }

    #[test]
    fn normalize_strips_leading_and_trailing_separators() {
        assert_eq!(normalize_text("--hello--"), "hello");
        assert_eq!(normalize_text("  hello  "), "hello");
        assert_eq!(normalize_text("!!hello!!"), "hello");
    }

    #[test]
    fn normalize_empty_for_unmappable_only_input() {
        assert_eq!(normalize_text("日本語"), "");
        assert_eq!(normalize_text("@#$%"), "");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn normalize_output_charset() {
        for input in ["Ünïcødé!", "Фото з відпустки", "  a b\tc\nd  ", "x™y"] {
            let out = normalize_text(input);
            assert!(
                out.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_'),
                "bad char in {out:?} from {input:?}"
            );
        }
    }

    // =========================================================================
    // generate_id
    // =========================================================================

    #[test]
    fn generate_simple_id() {
        let tmp = TempDir::new().unwrap();
        let id = generate_id("Spring Trip", &HashSet::new(), tmp.path(), 30);
        assert_eq!(id, "spring-trip");
    }

    #[test]
    fn generate_suffixes_on_set_collision() {
        let tmp = TempDir::new().unwrap();
        let existing = ids(&["zustrich-2024"]);
        let id = generate_id("Зустріч 2024", &existing, tmp.path(), 30);
        assert_eq!(id, "zustrich-2024-1");
    }

    #[test]
    fn generate_increments_past_taken_suffixes() {
        let tmp = TempDir::new().unwrap();
        let existing = ids(&["trip", "trip-1", "trip-2"]);
        assert_eq!(generate_id("trip", &existing, tmp.path(), 30), "trip-3");
    }

    #[test]
    fn generate_detects_filesystem_collision() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("spring-trip")).unwrap();
        let id = generate_id("Spring Trip", &HashSet::new(), tmp.path(), 30);
        assert_eq!(id, "spring-trip-1");
    }

    #[test]
    fn generate_respects_max_len_with_suffix() {
        let tmp = TempDir::new().unwrap();
        let existing = ids(&["very-long-gallery"]);
        let id = generate_id("very long gallery name here", &existing, tmp.path(), 17);
        assert!(id.len() <= 17, "{id:?} exceeds max_len");
        assert!(id.ends_with("-1"));
        // Base is re-trimmed, not just chopped mid-separator
        assert!(!id.contains("--"));
    }

    #[test]
    fn generate_falls_back_to_random_for_empty_name() {
        let tmp = TempDir::new().unwrap();
        let id = generate_id("日本語", &HashSet::new(), tmp.path(), 30);
        assert!(id.starts_with("gallery-"), "got {id:?}");
        assert!(id.len() <= 30);
    }

    #[test]
    fn generate_output_is_always_safe_and_fresh() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("caf")).unwrap();
        let existing = ids(&["cafe", "cafe-1"]);

        for input in ["Café", "", "Зустріч 2024", "a b c", "@@@"] {
            let id = generate_id(input, &existing, tmp.path(), 12);
            assert!(!id.is_empty());
            assert!(id.len() <= 12);
            assert!(
                id.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
            );
            assert!(!existing.contains(&id));
            assert!(!tmp.path().join(&id).exists());
        }
    }

    #[test]
    fn generate_tiny_max_len_still_terminates() {
        let tmp = TempDir::new().unwrap();
        let existing = ids(&["a", "b", "c"]);
        let id = generate_id("a", &existing, tmp.path(), 2);
        assert!(id.len() <= 2);
        assert!(!existing.contains(&id));
    }
}
