//! Timed progression through grouped stories.

use crate::model::{
    Id,
    story::{StoryGroup, StoryMarker},
    user::UserMarker,
};
use std::{
    collections::HashSet,
    time::{Duration, Instant},
};

pub const STORY_DURATION: Duration = Duration::from_millis(5000);
pub const PROGRESS_TICK: Duration = Duration::from_millis(50);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct StoryPosition {
    /// Index into the navigation order, not into the original listing.
    pub author: usize,
    pub story: usize,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum StoryEvent {
    Showing(StoryPosition),
    Closed,
}

/// Authors in viewing order: the viewer first if they have stories, then
/// everyone else in listing order.
#[must_use]
pub fn navigation_order(groups: &[StoryGroup], viewer: Option<Id<UserMarker>>) -> Vec<usize> {
    let own = viewer.and_then(|viewer| groups.iter().position(|g| g.author_id() == viewer));

    own.into_iter()
        .chain((0..groups.len()).filter(|&index| Some(index) != own))
        .filter(|&index| !groups[index].stories.is_empty())
        .collect()
}

#[derive(Clone, Debug)]
pub struct StoryViewer {
    groups: Vec<StoryGroup>,
    order: Vec<usize>,
    position: Option<StoryPosition>,
    shown_at: Instant,
    marked: HashSet<Id<StoryMarker>>,
    pending_marks: Vec<Id<StoryMarker>>,
}

impl StoryViewer {
    /// Opens the viewer on the first story of `start_author`, or on the
    /// first author in navigation order when that author has no stories.
    ///
    /// Returns `None` when there is nothing to show.
    #[must_use]
    pub fn open(
        groups: Vec<StoryGroup>,
        viewer: Option<Id<UserMarker>>,
        start_author: Option<Id<UserMarker>>,
        now: Instant,
    ) -> Option<Self> {
        let order = navigation_order(&groups, viewer);
        let author = start_author
            .and_then(|start| {
                order
                    .iter()
                    .position(|&index| groups[index].author_id() == start)
            })
            .or_else(|| (!order.is_empty()).then_some(0))?;

        let mut viewer = Self {
            groups,
            order,
            position: None,
            shown_at: now,
            marked: HashSet::new(),
            pending_marks: Vec::new(),
        };
        viewer.show(StoryPosition { author, story: 0 }, now);
        Some(viewer)
    }

    #[must_use]
    pub fn position(&self) -> Option<StoryPosition> {
        self.position
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.position.is_none()
    }

    #[must_use]
    pub fn current_group(&self) -> Option<&StoryGroup> {
        self.position
            .map(|position| &self.groups[self.order[position.author]])
    }

    #[must_use]
    pub fn current(&self) -> Option<&crate::model::story::Story> {
        let position = self.position?;
        self.current_group()?.stories.get(position.story)
    }

    /// Elapsed share of the current story in percent, clamped to `[0, 100]`.
    #[must_use]
    pub fn progress(&self, now: Instant) -> f64 {
        if self.is_closed() {
            return 0.0;
        }
        let elapsed = now.saturating_duration_since(self.shown_at);
        (elapsed.as_secs_f64() / STORY_DURATION.as_secs_f64() * 100.0).clamp(0.0, 100.0)
    }

    /// Advances once the current story has been shown for [`STORY_DURATION`].
    ///
    /// Returns the new event if anything changed.
    pub fn tick(&mut self, now: Instant) -> Option<StoryEvent> {
        if self.is_closed() || now.saturating_duration_since(self.shown_at) < STORY_DURATION {
            return None;
        }
        Some(self.next(now))
    }

    /// Skips to the next story, the next author, or closes.
    pub fn next(&mut self, now: Instant) -> StoryEvent {
        let Some(position) = self.position else {
            return StoryEvent::Closed;
        };

        let group_len = self.group_len(position.author);
        let next = if position.story + 1 < group_len {
            Some(StoryPosition {
                story: position.story + 1,
                ..position
            })
        } else if position.author + 1 < self.order.len() {
            Some(StoryPosition {
                author: position.author + 1,
                story: 0,
            })
        } else {
            None
        };

        match next {
            Some(next) => {
                self.show(next, now);
                StoryEvent::Showing(next)
            }
            None => self.close(),
        }
    }

    /// Goes back one story, to the last story of the previous author, or
    /// restarts the first story.
    pub fn previous(&mut self, now: Instant) -> StoryEvent {
        let Some(position) = self.position else {
            return StoryEvent::Closed;
        };

        let previous = if position.story > 0 {
            StoryPosition {
                story: position.story - 1,
                ..position
            }
        } else if position.author > 0 {
            let author = position.author - 1;
            StoryPosition {
                author,
                story: self.group_len(author) - 1,
            }
        } else {
            position
        };

        self.show(previous, now);
        StoryEvent::Showing(previous)
    }

    pub fn close(&mut self) -> StoryEvent {
        self.position = None;
        StoryEvent::Closed
    }

    /// Stories that became visible and were not yet viewed, each reported once.
    pub fn take_view_marks(&mut self) -> Vec<Id<StoryMarker>> {
        std::mem::take(&mut self.pending_marks)
    }

    fn group_len(&self, author: usize) -> usize {
        self.groups[self.order[author]].stories.len()
    }

    fn show(&mut self, position: StoryPosition, now: Instant) {
        self.position = Some(position);
        self.shown_at = now;

        let story = &mut self.groups[self.order[position.author]].stories[position.story];
        if !story.viewed && self.marked.insert(story.id) {
            self.pending_marks.push(story.id);
        }
        story.viewed = true;
    }
}
