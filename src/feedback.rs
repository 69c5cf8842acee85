//! Rule-based answer checking and canned tutor replies.
//!
//! Replies come from fixed tables and are picked by a caller-supplied seed, so the same
//! seed always produces the same reply.

/// How close a learner's answer is to the expected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Exact,
    Close,
    Wrong,
}

impl Verdict {
    pub fn is_correct(self) -> bool {
        !matches!(self, Verdict::Wrong)
    }
}

/// Lowercases, drops punctuation and collapses whitespace.
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Words of three or more letters; shorter ones ("a", "is", "to") are ignored.
fn keywords(normalized: &str) -> impl Iterator<Item = &str> {
    normalized
        .split(' ')
        .filter(|word| word.chars().count() >= 3)
}

/// Compares a typed or transcribed answer with the expected text.
///
/// An answer that says more than expected can still be close, one that says less cannot:
/// a fragment such as "you" for "thank you" is wrong.
pub fn judge_answer(expected: &str, given: &str) -> Verdict {
    let expected = normalize(expected);
    let given = normalize(given);

    if given.is_empty() {
        return Verdict::Wrong;
    }
    if expected == given {
        return Verdict::Exact;
    }

    let given_words: Vec<&str> = given.split(' ').collect();
    let contains_phrase = |haystack: &str, needle: &str| {
        format!(" {haystack} ").contains(&format!(" {needle} "))
    };
    if contains_phrase(given.as_str(), expected.as_str()) {
        return Verdict::Close;
    }

    let mut expected_keywords = keywords(&expected).peekable();
    if expected_keywords.peek().is_some()
        && expected_keywords.all(|word| given_words.contains(&word))
    {
        return Verdict::Close;
    }

    Verdict::Wrong
}

const PRAISE: &[&str] = &[
    "Excellent!",
    "Great job!",
    "Perfect, keep going!",
    "Spot on!",
];

const NUDGE: &[&str] = &[
    "Almost! Check the exact wording.",
    "Close, just a small difference.",
    "Nearly there!",
];

const ENCOURAGE: &[&str] = &[
    "Not quite. Have another look at the answer.",
    "That one is tricky, you will see it again soon.",
    "Keep practising, it will stick.",
];

pub struct FeedbackPhrases;

impl FeedbackPhrases {
    pub fn pick(verdict: Verdict, seed: u64) -> &'static str {
        let table = match verdict {
            Verdict::Exact => PRAISE,
            Verdict::Close => NUDGE,
            Verdict::Wrong => ENCOURAGE,
        };
        table[(seed % table.len() as u64) as usize]
    }
}
