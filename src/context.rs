use serde::Serialize;

/// Words shown on each side of the current one.
pub const CONTEXT_RADIUS: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextWord {
    pub index: usize,
    pub text: String,
    pub current: bool,
}

/// Slice of the token sequence around one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextWindow {
    /// First index included.
    pub start: usize,
    /// One past the last index included.
    pub end: usize,
    pub words: Vec<ContextWord>,
}

impl ContextWindow {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn current(&self) -> Option<&ContextWord> {
        self.words.iter().find(|word| word.current)
    }

    /// Joins the window with spaces, passing the current word through `mark`.
    pub fn render(&self, mark: impl Fn(&str) -> String) -> String {
        self.words
            .iter()
            .map(|word| {
                if word.current {
                    mark(&word.text)
                } else {
                    word.text.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Tokens in `[center - radius, center + radius]`, clipped to the sequence.
pub fn context_window(tokens: &[String], center: usize, radius: usize) -> ContextWindow {
    let start = center.saturating_sub(radius);
    let end = tokens.len().min(center.saturating_add(radius).saturating_add(1));
    let start = start.min(end);

    let words = tokens[start..end]
        .iter()
        .enumerate()
        .map(|(offset, text)| ContextWord {
            index: start + offset,
            text: text.clone(),
            current: start + offset == center,
        })
        .collect();

    ContextWindow { start, end, words }
}
