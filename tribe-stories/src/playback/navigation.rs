//! Navigation state machine over (group, story) positions
//!
//! Pure functions over a slice of story groups. Empty groups are never a
//! valid position and are stepped over in both directions.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tribe_common::models::StoryGroup;

/// A (group, story) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub group_index: usize,
    pub story_index: usize,
}

impl Position {
    pub fn new(group_index: usize, story_index: usize) -> Self {
        Self {
            group_index,
            story_index,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.group_index, self.story_index)
    }
}

/// Outcome of a navigation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Cursor moved to a new position
    Moved(Position),
    /// Already at the first story overall; nothing changes
    Stayed,
    /// Advanced past the last story of the last group
    Finished,
}

/// Transient playback cursor owned by the viewer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackCursor {
    pub group_index: usize,
    pub story_index: usize,
    /// 0.0-100.0
    pub progress: f64,
    pub playing: bool,
}

impl PlaybackCursor {
    pub fn position(&self) -> Position {
        Position::new(self.group_index, self.story_index)
    }
}

/// Check `0 <= group < groups.len()` and `0 <= story < group.len()`
pub fn validate(groups: &[StoryGroup], at: Position) -> Result<()> {
    let group = groups.get(at.group_index).ok_or_else(|| {
        Error::InvalidCursor(format!(
            "group {} out of range ({} groups)",
            at.group_index,
            groups.len()
        ))
    })?;
    if at.story_index >= group.len() {
        return Err(Error::InvalidCursor(format!(
            "story {} out of range ({} stories in group {})",
            at.story_index,
            group.len(),
            at.group_index
        )));
    }
    Ok(())
}

/// Next story in the group, else first story of the next non-empty group,
/// else `Finished`
pub fn advance(groups: &[StoryGroup], at: Position) -> Step {
    let in_group = groups.get(at.group_index).map_or(0, StoryGroup::len);
    if at.story_index + 1 < in_group {
        return Step::Moved(Position::new(at.group_index, at.story_index + 1));
    }

    groups
        .iter()
        .enumerate()
        .skip(at.group_index + 1)
        .find(|(_, g)| !g.is_empty())
        .map_or(Step::Finished, |(index, _)| Step::Moved(Position::new(index, 0)))
}

/// Previous story in the group, else the **last** story of the previous
/// non-empty group, else `Stayed`
pub fn retreat(groups: &[StoryGroup], at: Position) -> Step {
    if at.story_index > 0 {
        return Step::Moved(Position::new(at.group_index, at.story_index - 1));
    }

    groups[..at.group_index.min(groups.len())]
        .iter()
        .enumerate()
        .rev()
        .find_map(|(index, g)| g.last_index().map(|last| Position::new(index, last)))
        .map_or(Step::Stayed, Step::Moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::test_support::groups_with;

    #[test]
    fn test_validate() {
        let groups = groups_with(&[3, 2, 1]);
        assert!(validate(&groups, Position::new(0, 2)).is_ok());
        assert!(validate(&groups, Position::new(2, 0)).is_ok());
        assert!(matches!(
            validate(&groups, Position::new(3, 0)),
            Err(Error::InvalidCursor(_))
        ));
        assert!(matches!(
            validate(&groups, Position::new(1, 2)),
            Err(Error::InvalidCursor(_))
        ));
        assert!(validate(&[], Position::new(0, 0)).is_err());
    }

    #[test]
    fn test_advance_within_group() {
        let groups = groups_with(&[3, 2]);
        assert_eq!(advance(&groups, Position::new(0, 0)), Step::Moved(Position::new(0, 1)));
    }

    #[test]
    fn test_advance_crosses_group_boundary() {
        let groups = groups_with(&[3, 2]);
        assert_eq!(advance(&groups, Position::new(0, 2)), Step::Moved(Position::new(1, 0)));
    }

    #[test]
    fn test_advance_from_last_story_finishes() {
        let groups = groups_with(&[3, 2]);
        assert_eq!(advance(&groups, Position::new(1, 1)), Step::Finished);
    }

    #[test]
    fn test_retreat_within_group() {
        let groups = groups_with(&[3]);
        assert_eq!(retreat(&groups, Position::new(0, 2)), Step::Moved(Position::new(0, 1)));
    }

    #[test]
    fn test_retreat_lands_on_last_story_of_previous_group() {
        let groups = groups_with(&[3, 2]);
        assert_eq!(retreat(&groups, Position::new(1, 0)), Step::Moved(Position::new(0, 2)));
    }

    #[test]
    fn test_retreat_at_first_story_is_noop() {
        let groups = groups_with(&[3, 2]);
        assert_eq!(retreat(&groups, Position::new(0, 0)), Step::Stayed);
    }

    #[test]
    fn test_empty_groups_are_skipped() {
        let groups = groups_with(&[2, 0, 0, 1]);
        assert_eq!(advance(&groups, Position::new(0, 1)), Step::Moved(Position::new(3, 0)));
        assert_eq!(retreat(&groups, Position::new(3, 0)), Step::Moved(Position::new(0, 1)));

        let leading_empty = groups_with(&[0, 1]);
        assert_eq!(retreat(&leading_empty, Position::new(1, 0)), Step::Stayed);
    }

    #[test]
    fn test_advance_then_retreat_returns_to_origin() {
        let groups = groups_with(&[3, 2, 1]);
        for (g, group) in groups.iter().enumerate() {
            for s in 0..group.len() {
                let origin = Position::new(g, s);
                if let Step::Moved(next) = advance(&groups, origin) {
                    assert_eq!(retreat(&groups, next), Step::Moved(origin), "from {}", origin);
                }
            }
        }
    }

    #[test]
    fn test_walk_forward_and_back_visits_every_story() {
        let groups = groups_with(&[3, 2, 1]);
        let mut at = Position::new(0, 0);
        let mut forward = vec![at];
        while let Step::Moved(next) = advance(&groups, at) {
            forward.push(next);
            at = next;
        }
        assert_eq!(forward.len(), 6);

        let mut backward = vec![at];
        while let Step::Moved(prev) = retreat(&groups, at) {
            backward.push(prev);
            at = prev;
        }
        backward.reverse();
        assert_eq!(forward, backward);
    }
}
