//! Local text generation used whenever the AI service cannot answer.
//!
//! Output depends only on the input: themes are detected by keyword matching
//! and one candidate is picked by a stable FNV-1a hash of the entry.

pub const QUIET_WEEK: &str = "A quiet week, but every moment matters in your journey.";
pub const NO_ENTRY_RECOMMENDATION: &str =
    "Please write something in your journal to get personalized recommendations.";

struct Theme {
    text_words: &'static [&'static str],
    keyword_words: &'static [&'static str],
    comments: &'static [&'static str],
    suggestion: &'static str,
}

const THEMES: &[Theme] = &[
    Theme {
        text_words: &["learn", "study", "growth"],
        keyword_words: &["learn"],
        comments: &[
            "A week of learning something new; you can feel yourself growing.",
            "You planted seeds of knowledge this week, and they will bear fruit.",
            "One more step along the path of learning. Well done.",
        ],
        suggestion: "Teach one thing you learned this week to someone else next week.",
    },
    Theme {
        text_words: &["work", "project", "productive"],
        keyword_words: &["work"],
        comments: &[
            "A week of focused, meaningful work that will pay off.",
            "Step by step toward your goals; that steadiness shows.",
            "Small wins add up to big changes.",
        ],
        suggestion: "Block one distraction-free hour next week for the task that matters most.",
    },
    Theme {
        text_words: &["friend", "family", "love"],
        keyword_words: &["friend", "family"],
        comments: &[
            "Time with the people you love became a warm memory.",
            "The warmth of your relationships made this week special.",
            "Moments shared with others are treasures worth keeping.",
        ],
        suggestion: "Reach out next week to someone you have not talked to in a while.",
    },
    Theme {
        text_words: &["rest", "relax", "recharge"],
        keyword_words: &["rest"],
        comments: &[
            "You paused to look after yourself, and that pause mattered.",
            "Rest is part of growing too.",
            "Taking care of yourself in a busy life is no small thing.",
        ],
        suggestion: "Protect one unhurried evening next week just for yourself.",
    },
    Theme {
        text_words: &["challenge", "difficult", "hard", "struggle"],
        keyword_words: &["challenge"],
        comments: &[
            "You made it through something hard; that strength is real.",
            "Difficult moments are what make you steadier.",
            "You did not give up in front of a challenge, and it shows.",
        ],
        suggestion: "Break next week's hardest task into one small first step and do it on Monday.",
    },
    Theme {
        text_words: &["success", "achieve", "complete", "finish"],
        keyword_words: &["success"],
        comments: &[
            "You reached a goal this week. Enjoy it.",
            "Even small achievements carry real meaning.",
            "Be proud of how far you moved forward.",
        ],
        suggestion: "Celebrate this week's win next week, then pick the next goal.",
    },
    Theme {
        text_words: &["travel", "adventure", "trip"],
        keyword_words: &["travel"],
        comments: &[
            "New places added new colors to your life.",
            "Memories from this trip will stay with you for a long time.",
            "A week of adventure that made your world a little bigger.",
        ],
        suggestion: "Explore one place near home that you have never visited.",
    },
    Theme {
        text_words: &["happy", "joy", "smile", "laugh"],
        keyword_words: &[],
        comments: &[
            "Happy moments made this week shine.",
            "A week full of laughter; the energy comes through.",
            "Small joys filled this week with warmth.",
        ],
        suggestion: "Write down one thing that made you smile each day next week.",
    },
    Theme {
        text_words: &["sad", "difficult", "tough", "hard"],
        keyword_words: &[],
        comments: &[
            "It may have been a heavy week, and those feelings count too.",
            "If things feel hard right now, you are not alone.",
            "Hard moments pass, and better days are waiting.",
        ],
        suggestion: "Plan one gentle, comforting activity for yourself next week.",
    },
];

const REFLECTIVE: &[&str] = &[
    "A week of deep thinking that will make you wiser.",
    "Many thoughts this week; they will turn into answers.",
    "Looking inward like this helps you grow.",
];

const DEFAULT_COMMENTS: &[&str] = &[
    "The experiences of this week are becoming part of your story.",
    "Small moments add up to something meaningful.",
    "The feelings of this week will stay with you.",
    "What you felt this week makes you richer.",
    "Every moment is special, and this week was too.",
];

const DEFAULT_SUGGESTION: &str =
    "Pick one small thing you enjoyed this week and make time for it again next week.";

fn matching_themes<'a>(
    keywords: &'a str,
    text: &'a str,
) -> impl Iterator<Item = &'static Theme> + 'a {
    let lower_text = text.to_lowercase();
    let lower_keywords = keywords.to_lowercase();
    THEMES.iter().filter(move |t| {
        t.text_words.iter().any(|w| lower_text.contains(w))
            || t.keyword_words.iter().any(|w| lower_keywords.contains(w))
    })
}

fn stable_hash(keywords: &str, text: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in keywords.bytes().chain([b'\n']).chain(text.bytes()) {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

fn pick(candidates: &[String], keywords: &str, text: &str) -> String {
    let idx = (stable_hash(keywords, text) % candidates.len() as u64) as usize;
    candidates[idx].clone()
}

/// One-line reflection on a week's entry.
pub fn fallback_comment(keywords: &str, text: &str) -> String {
    let keywords = keywords.trim();
    let text = text.trim();
    if keywords.is_empty() && text.is_empty() {
        return QUIET_WEEK.to_string();
    }

    let mut candidates: Vec<String> = matching_themes(keywords, text)
        .flat_map(|t| t.comments.iter().map(|c| c.to_string()))
        .collect();

    if text.chars().count() > 150 {
        candidates.extend(REFLECTIVE.iter().map(|c| c.to_string()));
    }

    if !keywords.is_empty() && text.is_empty() {
        let first_two = keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .take(2)
            .collect::<Vec<_>>()
            .join(", ");
        candidates.push(format!("A week filled with {first_two}; those moments matter."));
        candidates.push(format!("{first_two} defined this week. Hold on to what it meant."));
    }

    if candidates.is_empty() {
        candidates.extend(DEFAULT_COMMENTS.iter().map(|c| c.to_string()));
    }
    pick(&candidates, keywords, text)
}

/// One concrete suggestion for next week.
pub fn fallback_recommendation(keywords: &str, text: &str) -> String {
    let keywords = keywords.trim();
    let text = text.trim();
    if keywords.is_empty() && text.is_empty() {
        return NO_ENTRY_RECOMMENDATION.to_string();
    }
    let candidates: Vec<String> = matching_themes(keywords, text)
        .map(|t| t.suggestion.to_string())
        .collect();
    if candidates.is_empty() {
        return DEFAULT_SUGGESTION.to_string();
    }
    pick(&candidates, keywords, text)
}
