//! Hashtag completion while composing a post.
//!
//! Cursor positions are byte offsets into the composed text.

use serde::{Deserialize, Serialize};

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct TrendingTag {
    pub tag: String,
    pub post_count: u32,
}

impl TrendingTag {
    /// The tag without any leading `#`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.tag.trim_start_matches('#')
    }
}

/// The `#token` immediately before the cursor.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct HashtagQuery<'a> {
    /// Byte offset of the `#`.
    pub start: usize,
    /// The token without its `#`.
    pub query: &'a str,
}

/// Finds the in-progress hashtag ending at `cursor`, if there is one.
///
/// Only the last whitespace-separated token before the cursor is considered,
/// and a lone `#` does not count.
#[must_use]
pub fn active_hashtag(text: &str, cursor: usize) -> Option<HashtagQuery<'_>> {
    let before = text.get(..cursor)?;
    let token = before.rsplit(char::is_whitespace).next()?;

    if token.len() > 1 && token.starts_with('#') {
        Some(HashtagQuery {
            start: cursor - token.len(),
            query: &token[1..],
        })
    } else {
        None
    }
}

/// Trending entries whose name starts with `query`, ignoring case, in list order.
#[must_use]
pub fn suggest<'a>(trending: &'a [TrendingTag], query: &str) -> Vec<&'a TrendingTag> {
    let query = query.to_lowercase();
    trending
        .iter()
        .filter(|tag| tag.name().to_lowercase().starts_with(&query))
        .collect()
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct Completion {
    pub text: String,
    pub cursor: usize,
}

/// Replaces the partial hashtag before the cursor with `#tag `.
///
/// Text outside the partial token is left untouched. Without an active
/// hashtag the text is returned unchanged.
#[must_use]
pub fn complete(text: &str, cursor: usize, tag: &str) -> Completion {
    let Some(active) = active_hashtag(text, cursor) else {
        return Completion {
            text: text.to_owned(),
            cursor,
        };
    };

    let tag = tag.trim_start_matches('#');
    let mut completed = String::with_capacity(text.len() + tag.len() + 2);
    completed.push_str(&text[..active.start]);
    completed.push('#');
    completed.push_str(tag);
    completed.push(' ');
    let new_cursor = completed.len();
    completed.push_str(&text[cursor..]);

    Completion {
        text: completed,
        cursor: new_cursor,
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Key {
    Down,
    Up,
    Enter,
    Tab,
    Escape,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum KeyOutcome {
    /// The key is not meant for the suggestion list.
    Ignored,
    Highlighted(usize),
    Accepted(Completion),
    Dismissed,
}

/// Suggestion list state for a compose box.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct HashtagAutocomplete {
    trending: Vec<TrendingTag>,
    text: String,
    cursor: usize,
    suggestions: Vec<TrendingTag>,
    highlighted: usize,
}

impl HashtagAutocomplete {
    #[must_use]
    pub fn new(trending: Vec<TrendingTag>) -> Self {
        Self {
            trending,
            ..Self::default()
        }
    }

    pub fn set_trending(&mut self, trending: Vec<TrendingTag>) {
        self.trending = trending;
        self.refresh();
    }

    /// Called on every edit or cursor move.
    pub fn on_input(&mut self, text: &str, cursor: usize) {
        text.clone_into(&mut self.text);
        self.cursor = cursor;
        self.refresh();
    }

    #[must_use]
    pub fn suggestions(&self) -> &[TrendingTag] {
        &self.suggestions
    }

    #[must_use]
    pub fn highlighted(&self) -> Option<&TrendingTag> {
        self.suggestions.get(self.highlighted)
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.suggestions.is_empty()
    }

    pub fn on_key(&mut self, key: Key) -> KeyOutcome {
        if !self.is_open() {
            return KeyOutcome::Ignored;
        }

        let len = self.suggestions.len();
        match key {
            Key::Down => {
                self.highlighted = (self.highlighted + 1) % len;
                KeyOutcome::Highlighted(self.highlighted)
            }
            Key::Up => {
                self.highlighted = (self.highlighted + len - 1) % len;
                KeyOutcome::Highlighted(self.highlighted)
            }
            Key::Enter | Key::Tab => {
                let tag = self.suggestions[self.highlighted].name().to_owned();
                KeyOutcome::Accepted(self.accept(&tag))
            }
            Key::Escape => {
                self.close();
                KeyOutcome::Dismissed
            }
        }
    }

    /// Accepts `tag`, e.g. from a click, and closes the list.
    pub fn accept(&mut self, tag: &str) -> Completion {
        let completion = complete(&self.text, self.cursor, tag);
        self.text.clone_from(&completion.text);
        self.cursor = completion.cursor;
        self.close();
        completion
    }

    fn close(&mut self) {
        self.suggestions.clear();
        self.highlighted = 0;
    }

    fn refresh(&mut self) {
        self.suggestions = match active_hashtag(&self.text, self.cursor) {
            Some(active) => suggest(&self.trending, active.query)
                .into_iter()
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        self.highlighted = 0;
    }
}
