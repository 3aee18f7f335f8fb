//! Text composition driven by selection events.
//!
//! Letters accumulate as initials; `TEXT` asks for sentence predictions
//! built from those initials, a `PREDICTION_<n>` selection picks one, and
//! the chosen sentence is shown full-screen for a few seconds.

use std::collections::HashSet;

use tracing::{debug, info};

use super::layout::{parse_prediction_id, BACKSPACE, BACK_TO_KEYBOARD, SPACE, TEXT};

/// Predictions shown per request.
pub const PREDICTION_COUNT: usize = 5;

/// How long the chosen sentence stays on screen.
pub const FINAL_SCREEN_MS: u64 = 5000;

// ── Screen ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Keyboard,
    Predictions(Vec<String>),
    Final { text: String, shown_at_ms: u64 },
}

impl Screen {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyboard => "keyboard",
            Self::Predictions(_) => "predictions",
            Self::Final { .. } => "final",
        }
    }
}

/// What a selection did.
#[derive(Debug, Clone, PartialEq)]
pub enum ComposeOutcome {
    Typed(char),
    Deleted,
    /// Caller should fetch predictions and call `show_predictions`.
    PredictionsRequested { initials: Vec<char> },
    /// `TEXT` selected with no letters typed.
    NothingTyped,
    /// Sentence picked; hand it to speech output.
    SentenceChosen(String),
    ReturnedToKeyboard,
    /// Id not meaningful on the current screen.
    Ignored,
}

// ── Composer ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TextComposer {
    pub typed: String,
    pub screen: Screen,
}

impl Default for TextComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextComposer {
    pub fn new() -> Self {
        Self {
            typed: String::new(),
            screen: Screen::Keyboard,
        }
    }

    /// Apply a selected target id at `now_ms`.
    pub fn apply(&mut self, target_id: &str, now_ms: u64) -> ComposeOutcome {
        match (&self.screen, target_id) {
            (Screen::Keyboard, BACKSPACE) => {
                self.typed.pop();
                ComposeOutcome::Deleted
            }
            (Screen::Keyboard, SPACE) => {
                self.typed.push(' ');
                ComposeOutcome::Typed(' ')
            }
            (Screen::Keyboard, TEXT) => {
                let initials = self.initials();
                if initials.is_empty() {
                    debug!("Composer: TEXT selected with nothing typed");
                    ComposeOutcome::NothingTyped
                } else {
                    ComposeOutcome::PredictionsRequested { initials }
                }
            }
            (Screen::Keyboard, key) => match single_letter(key) {
                Some(c) => {
                    self.typed.push(c);
                    ComposeOutcome::Typed(c)
                }
                None => ComposeOutcome::Ignored,
            },
            (Screen::Predictions(_), BACK_TO_KEYBOARD) => {
                self.screen = Screen::Keyboard;
                ComposeOutcome::ReturnedToKeyboard
            }
            (Screen::Predictions(options), id) => {
                let Some(text) = parse_prediction_id(id).and_then(|i| options.get(i)).cloned()
                else {
                    return ComposeOutcome::Ignored;
                };
                info!("Composer: sentence chosen: {}", text);
                self.typed.clear();
                self.screen = Screen::Final {
                    text: text.clone(),
                    shown_at_ms: now_ms,
                };
                ComposeOutcome::SentenceChosen(text)
            }
            (Screen::Final { .. }, _) => ComposeOutcome::Ignored,
        }
    }

    /// Upper-cased A-Z letters of the typed text.
    pub fn initials(&self) -> Vec<char> {
        self.typed
            .chars()
            .map(|c| c.to_ascii_uppercase())
            .filter(|c| c.is_ascii_uppercase())
            .collect()
    }

    /// Switch to the prediction screen.
    pub fn show_predictions(&mut self, predictions: Vec<String>) {
        debug!("Composer: showing {} predictions", predictions.len());
        self.screen = Screen::Predictions(predictions);
    }

    /// Leave the final-sentence screen once it has been up long enough.
    /// Returns true when it switched back to the keyboard.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if let Screen::Final { shown_at_ms, .. } = self.screen {
            if now_ms.saturating_sub(shown_at_ms) >= FINAL_SCREEN_MS {
                self.screen = Screen::Keyboard;
                return true;
            }
        }
        false
    }
}

fn single_letter(key: &str) -> Option<char> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c.to_ascii_uppercase()),
        _ => None,
    }
}

// ── Fallback predictions ────────────────────────────────────

/// Common words per initial, used when no suggestion backend answered.
fn words_for(initial: char) -> &'static [&'static str] {
    match initial.to_ascii_uppercase() {
        'A' => &["a", "and", "at", "all", "any"],
        'B' => &["be", "by", "but", "back", "big"],
        'C' => &["can", "could", "come", "call", "case"],
        'D' => &["do", "did", "down", "day", "does"],
        'E' => &["even", "every", "each", "end", "early"],
        'F' => &["for", "from", "first", "find", "feel"],
        'G' => &["go", "get", "give", "good", "great"],
        'H' => &["he", "her", "his", "how", "here"],
        'I' => &["I", "in", "is", "it", "if"],
        'J' => &["just", "job", "join"],
        'K' => &["know", "keep", "kind"],
        'L' => &["like", "look", "let", "last", "long"],
        'M' => &["me", "my", "more", "make", "most"],
        'N' => &["not", "now", "no", "need", "next"],
        'O' => &["on", "or", "one", "only", "our"],
        'P' => &["put", "people", "part", "place", "point"],
        'Q' => &["quite", "quick", "question"],
        'R' => &["really", "right", "read", "run", "room"],
        'S' => &["so", "she", "see", "some", "say"],
        'T' => &["the", "to", "that", "this", "they"],
        'U' => &["up", "us", "use", "under"],
        'V' => &["very", "view", "value"],
        'W' => &["we", "with", "will", "was", "what"],
        'X' => &["x"],
        'Y' => &["you", "your", "yet"],
        'Z' => &["zero", "zone"],
        _ => &[],
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Up to `need` phrases built word-by-word from `initials`, rotating the
/// word choice per attempt. Phrases already in `seen` (lower-cased) are
/// skipped; new ones are added to it.
pub fn fallback_candidates(
    initials: &[char],
    need: usize,
    seen: &mut HashSet<String>,
) -> Vec<String> {
    let mut out = Vec::with_capacity(need);
    if initials.is_empty() {
        return out;
    }

    let mut offset = 0;
    while out.len() < need && offset < need + 5 {
        let words: Vec<String> = initials
            .iter()
            .enumerate()
            .map(|(idx, c)| {
                let list = words_for(*c);
                if list.is_empty() {
                    c.to_ascii_lowercase().to_string()
                } else {
                    list[(idx + offset) % list.len()].to_string()
                }
            })
            .collect();

        let phrase = match words.split_first() {
            Some((first, rest)) => std::iter::once(capitalize(first))
                .chain(rest.iter().cloned())
                .collect::<Vec<_>>()
                .join(" "),
            None => String::new(),
        };

        if seen.insert(phrase.to_lowercase()) {
            out.push(phrase);
        }
        offset += 1;
    }
    out
}

/// Trim or pad `suggestions` to exactly `PREDICTION_COUNT` where the
/// fallback table allows it.
pub fn complete_predictions(mut suggestions: Vec<String>, initials: &[char]) -> Vec<String> {
    if suggestions.len() < PREDICTION_COUNT {
        let mut seen: HashSet<String> = suggestions.iter().map(|s| s.to_lowercase()).collect();
        let need = PREDICTION_COUNT - suggestions.len();
        suggestions.extend(fallback_candidates(initials, need, &mut seen));
    }
    suggestions.truncate(PREDICTION_COUNT);
    suggestions
}

// ── Tests ───────────────────────────────────────────────────
