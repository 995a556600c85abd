//! Transcript normalization.
//!
//! Fixes the recognizer's habitual mistakes before any classification runs:
//! trailing end-trigger phrases are stripped, known homophone errors are
//! repaired on word boundaries, and spoken numbers become digits. All
//! functions here are pure.

use regex::Regex;
use std::sync::OnceLock;

/// Phrases an operator appends to force immediate execution. They carry no
/// meaning for classification and are stripped from the tail.
const END_TRIGGERS: &[&str] = &["execute", "send it", "done", "make it so", "do it now"];

/// Word-for-word homophone repairs. Applied only to whole words so that
/// fixing "own" -> "home" can never touch "down".
const HOMOPHONES: &[(&str, &str)] = &[
    ("ex", "x"),
    ("why", "y"),
    ("zee", "z"),
    ("zed", "z"),
    ("own", "home"),
    ("hone", "home"),
    ("jogged", "jog"),
    ("jogg", "jog"),
    ("axes", "axis"),
    ("won", "one"),
    ("tree", "three"),
    ("ate", "eight"),
    ("fead", "feed"),
    ("steppe", "step"),
    ("prob", "probe"),
    ("spindel", "spindle"),
];

const ONES: &[(&str, u64)] = &[
    ("zero", 0),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
];

const TEENS: &[(&str, u64)] = &[
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("thirteen", 13),
    ("fourteen", 14),
    ("fifteen", 15),
    ("sixteen", 16),
    ("seventeen", 17),
    ("eighteen", 18),
    ("nineteen", 19),
];

const TENS: &[(&str, u64)] = &[
    ("twenty", 20),
    ("thirty", 30),
    ("forty", 40),
    ("fifty", 50),
    ("sixty", 60),
    ("seventy", 70),
    ("eighty", 80),
    ("ninety", 90),
];

fn word_value(word: &str) -> Option<u64> {
    ONES.iter()
        .chain(TEENS.iter())
        .chain(TENS.iter())
        .find(|(w, _)| *w == word)
        .map(|(_, v)| *v)
}

fn built_in(pattern: &str) -> Regex {
    Regex::new(pattern).expect("invalid built-in pattern - this is a bug")
}

/// Normalize a raw transcript: lowercase, strip trailing end triggers,
/// repair homophones, convert spoken numbers to digits.
pub fn normalize(raw: &str) -> String {
    let mut text = raw.trim().to_lowercase();
    text = strip_end_triggers(&text);
    text = repair_homophones(&text);
    text = convert_numbers(&text);
    collapse_whitespace(&text)
}

/// True when a (possibly partial) transcript ends in an end-trigger phrase.
/// The recognizer driver uses this to request early finalization.
pub fn ends_with_trigger(partial: &str) -> bool {
    let text = partial
        .trim()
        .trim_end_matches(['.', '!', '?'])
        .trim_end()
        .to_lowercase();
    END_TRIGGERS.iter().any(|t| {
        text.ends_with(t) && {
            let head = &text[..text.len() - t.len()];
            head.is_empty() || head.ends_with(' ')
        }
    })
}

/// Split a normalized utterance into ordered clauses on "then", "and then"
/// and commas. A bare "and" is not a separator; compound moves like
/// "move left 50 and forward 50" stay one clause.
pub fn split_clauses(text: &str) -> Vec<String> {
    static SEP: OnceLock<Regex> = OnceLock::new();
    let sep = SEP.get_or_init(|| built_in(r"\s*,\s*|\s+and\s+then\s+|\s+then\s+"));
    sep.split(text)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_end_triggers(text: &str) -> String {
    let mut out = text
        .trim()
        .trim_end_matches(['.', '!', '?', ','])
        .trim_end()
        .to_string();
    loop {
        let mut stripped = false;
        for t in END_TRIGGERS {
            if out.len() > t.len() && out.ends_with(t) {
                let boundary = out.len() - t.len();
                // Whole trailing words only, and never a trigger that is
                // the entire utterance.
                if out.as_bytes()[boundary - 1] == b' ' {
                    out = out[..boundary]
                        .trim_end()
                        .trim_end_matches(',')
                        .trim_end()
                        .to_string();
                    stripped = true;
                }
            }
        }
        if !stripped {
            break;
        }
    }
    out
}

fn repair_homophones(text: &str) -> String {
    static WORD: OnceLock<Regex> = OnceLock::new();
    let word = WORD.get_or_init(|| built_in(r"[a-z]+"));
    word.replace_all(text, |caps: &regex::Captures<'_>| {
        let w = &caps[0];
        HOMOPHONES
            .iter()
            .find(|(from, _)| *from == w)
            .map(|(_, to)| (*to).to_string())
            .unwrap_or_else(|| w.to_string())
    })
    .into_owned()
}

/// Spoken-number conversion runs in layers. The tens+ones compound pass must
/// run before the single-word pass so "twenty five" becomes 25, not 20 5;
/// the single-word pass must run before the scale passes so "two thousand
/// and fifty" presents a digit residue and collapses to 2050.
fn convert_numbers(text: &str) -> String {
    let text = convert_tens_ones(text);
    let text = convert_single_words(&text);
    let text = convert_thousands(&text);
    let text = convert_hundreds(&text);
    let text = convert_decimal_marks(&text);
    join_decimals(&text)
}

fn convert_tens_ones(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        built_in(
            r"\b(twenty|thirty|forty|fifty|sixty|seventy|eighty|ninety)[\s-](one|two|three|four|five|six|seven|eight|nine)\b",
        )
    });
    re.replace_all(text, |caps: &regex::Captures<'_>| {
        let tens = word_value(&caps[1]).unwrap_or(0);
        let ones = word_value(&caps[2]).unwrap_or(0);
        (tens + ones).to_string()
    })
    .into_owned()
}

/// "X thousand"/"X hundred" where X is a number word or already digits. A
/// digit residue that immediately follows is absorbed, so after the earlier
/// word passes have run, "one hundred twenty three" collapses to "123".
fn convert_scale(text: &str, re: &Regex, scale: u64) -> String {
    re.replace_all(text, |caps: &regex::Captures<'_>| {
        let base = caps[1]
            .parse::<u64>()
            .ok()
            .or_else(|| word_value(&caps[1]))
            .unwrap_or(0);
        let residue = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0);
        // Absurdly large spoken numbers stay as-is rather than wrapping.
        match base.checked_mul(scale).and_then(|v| v.checked_add(residue)) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        }
    })
    .into_owned()
}

fn convert_thousands(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        built_in(
            r"\b(\d+|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)\s+thousand(?:\s+and)?(?:\s+(\d{1,3}))?\b",
        )
    });
    convert_scale(text, re, 1000)
}

fn convert_hundreds(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        built_in(
            r"\b(\d+|one|two|three|four|five|six|seven|eight|nine)\s+hundred(?:\s+and)?(?:\s+(\d{1,2}))?\b",
        )
    });
    convert_scale(text, re, 100)
}

fn convert_decimal_marks(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        built_in(
            r"\b(?:point|dot)((?:\s+(?:zero|one|two|three|four|five|six|seven|eight|nine|\d+))+)\b",
        )
    });
    re.replace_all(text, |caps: &regex::Captures<'_>| {
        let digits: String = caps[1]
            .split_whitespace()
            .map(|w| {
                w.parse::<u64>()
                    .ok()
                    .or_else(|| word_value(w))
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            })
            .collect();
        format!(" .{digits}")
    })
    .into_owned()
}

fn convert_single_words(text: &str) -> String {
    static WORD: OnceLock<Regex> = OnceLock::new();
    let word = WORD.get_or_init(|| built_in(r"[a-z]+"));
    word.replace_all(text, |caps: &regex::Captures<'_>| {
        let w = &caps[0];
        // "zero" stays a word: it names the zeroing commands far more often
        // than the digit, and the compound passes already consumed it where
        // it meant a digit.
        if w == "zero" {
            return w.to_string();
        }
        word_value(w)
            .map(|v| v.to_string())
            .unwrap_or_else(|| w.to_string())
    })
    .into_owned()
}

fn join_decimals(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| built_in(r"(\d+)\s+\.(\d+)"));
    re.replace_all(text, "$1.$2").into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_collapses() {
        assert_eq!(normalize("  Jog   LEFT "), "jog left");
    }

    #[test]
    fn strips_trailing_end_triggers() {
        assert_eq!(normalize("jog left 5 execute"), "jog left 5");
        assert_eq!(normalize("probe z, send it"), "probe z");
        assert_eq!(normalize("zero all done"), "zero all");
    }

    #[test]
    fn trigger_alone_is_not_stripped() {
        assert_eq!(normalize("done"), "done");
    }

    #[test]
    fn homophone_repair_respects_word_boundaries() {
        assert_eq!(normalize("go own"), "go home");
        // "down" must survive the own->home repair untouched.
        assert_eq!(normalize("move down 5"), "move down 5");
        assert_eq!(normalize("jog ex 10"), "jog x 10");
    }

    #[test]
    fn compound_tens_and_ones() {
        assert_eq!(normalize("twenty five"), "25");
        assert_eq!(normalize("move right ninety nine"), "move right 99");
    }

    #[test]
    fn decimal_marker() {
        assert_eq!(normalize("twenty five point five"), "25.5");
        assert_eq!(normalize("one point two five"), "1.25");
        assert_eq!(normalize("point five"), ".5");
    }

    #[test]
    fn scale_words() {
        assert_eq!(normalize("feed six thousand"), "feed 6000");
        assert_eq!(normalize("five hundred"), "500");
        // Pinned behavior: the scale passes absorb the digit residue left
        // by the earlier word passes.
        assert_eq!(normalize("one hundred twenty three"), "123");
        assert_eq!(normalize("two thousand and fifty"), "2050");
    }

    #[test]
    fn oversized_scale_numbers_pass_through_unchanged() {
        // A base that overflows u64 once scaled must not panic; the text
        // is left for downstream range clamping to reject.
        assert_eq!(
            normalize("feed 18446744073709552 thousand"),
            "feed 18446744073709552 thousand"
        );
    }

    #[test]
    fn single_word_digits_run_last() {
        assert_eq!(normalize("jog up five"), "jog up 5");
        assert_eq!(normalize("tool three"), "tool 3");
    }

    #[test]
    fn splits_on_then_and_comma_but_not_bare_and() {
        let clauses = split_clauses("jog up then probe z then bogus clause");
        assert_eq!(clauses, vec!["jog up", "probe z", "bogus clause"]);

        let clauses = split_clauses("move left 50 and forward 50");
        assert_eq!(clauses, vec!["move left 50 and forward 50"]);

        let clauses = split_clauses("zero x, zero y and then go home");
        assert_eq!(clauses, vec!["zero x", "zero y", "go home"]);
    }

    #[test]
    fn partial_transcript_trigger_detection() {
        assert!(ends_with_trigger("jog left five execute"));
        assert!(ends_with_trigger("probe z send it"));
        assert!(!ends_with_trigger("jog left five"));
    }
}
