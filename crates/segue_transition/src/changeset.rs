//! Per-animator sprite groupings handed to transition rules

use segue_core::{Result, SegueError};

use crate::config::MotionDefaults;
use crate::sprite::{AnimatorId, Sprite, SpriteId, SpriteKind};

/// Sprite filter; empty fields match anything
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpriteQuery {
    pub kind: Option<SpriteKind>,
    pub role: Option<String>,
    pub id: Option<String>,
}

impl SpriteQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: SpriteKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn matches(&self, sprite: &Sprite) -> bool {
        self.kind.map_or(true, |kind| sprite.kind == kind)
            && self
                .role
                .as_deref()
                .map_or(true, |role| sprite.role() == Some(role))
            && self
                .id
                .as_deref()
                .map_or(true, |id| sprite.identifier.id == id)
    }
}

/// The sprites one animator owns in this render
#[derive(Clone, Debug, Default)]
pub struct Changeset {
    pub animator: Option<AnimatorId>,
    pub inserted: Vec<Sprite>,
    pub removed: Vec<Sprite>,
    pub kept: Vec<Sprite>,
    /// Engine-wide motion defaults
    pub defaults: MotionDefaults,
}

impl Changeset {
    pub fn new(animator: AnimatorId, sprites: impl IntoIterator<Item = Sprite>) -> Self {
        let mut changeset = Self {
            animator: Some(animator),
            ..Self::default()
        };
        for sprite in sprites {
            match sprite.kind {
                SpriteKind::Inserted => changeset.inserted.push(sprite),
                SpriteKind::Removed => changeset.removed.push(sprite),
                SpriteKind::Kept => changeset.kept.push(sprite),
            }
        }
        changeset
    }

    pub fn with_defaults(mut self, defaults: MotionDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Every sprite: inserted, then removed, then kept
    pub fn sprites(&self) -> impl Iterator<Item = &Sprite> {
        self.inserted
            .iter()
            .chain(self.removed.iter())
            .chain(self.kept.iter())
    }

    pub fn sprite_ids(&self) -> Vec<SpriteId> {
        self.sprites().map(|sprite| sprite.id).collect()
    }

    pub fn sprites_for(&self, query: &SpriteQuery) -> Vec<&Sprite> {
        let pool: Box<dyn Iterator<Item = &Sprite> + '_> = match query.kind {
            Some(SpriteKind::Inserted) => Box::new(self.inserted.iter()),
            Some(SpriteKind::Removed) => Box::new(self.removed.iter()),
            Some(SpriteKind::Kept) => Box::new(self.kept.iter()),
            None => Box::new(self.sprites()),
        };
        pool.filter(|sprite| query.matches(sprite)).collect()
    }

    /// The single sprite matching `query`
    pub fn sprite_for(&self, query: &SpriteQuery) -> Result<Option<&Sprite>> {
        let mut found = self.sprites_for(query);
        if found.len() > 1 {
            return Err(SegueError::invalid_state(format!(
                "sprite_for found {} sprites matching {query:?}",
                found.len()
            )));
        }
        Ok(found.pop())
    }

    pub fn has_sprites(&self) -> bool {
        !(self.inserted.is_empty() && self.removed.is_empty() && self.kept.is_empty())
    }

    pub fn len(&self) -> usize {
        self.inserted.len() + self.removed.len() + self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_sprites()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::tests::sprite;

    fn changeset() -> Changeset {
        let mut card = sprite(0, SpriteKind::Inserted);
        card.identifier.id = "card".into();
        card.identifier.role = Some("item".into());
        let mut other = sprite(1, SpriteKind::Kept);
        other.identifier.role = Some("item".into());
        let gone = sprite(2, SpriteKind::Removed);
        Changeset::new(AnimatorId(0), [other, gone, card])
    }

    #[test]
    fn test_grouping() {
        let changeset = changeset();
        assert_eq!(changeset.inserted.len(), 1);
        assert_eq!(changeset.removed.len(), 1);
        assert_eq!(changeset.kept.len(), 1);
        assert_eq!(changeset.sprite_ids(), vec![SpriteId(0), SpriteId(2), SpriteId(1)]);
        assert!(changeset.has_sprites());
        assert!(!Changeset::default().has_sprites());
    }

    #[test]
    fn test_queries() {
        let changeset = changeset();
        assert_eq!(changeset.sprites_for(&SpriteQuery::new()).len(), 3);
        assert_eq!(changeset.sprites_for(&SpriteQuery::new().role("item")).len(), 2);

        let card = changeset
            .sprite_for(&SpriteQuery::new().id("card"))
            .unwrap()
            .unwrap();
        assert_eq!(card.id, SpriteId(0));

        let none = changeset
            .sprite_for(&SpriteQuery::new().kind(SpriteKind::Removed).role("item"))
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_ambiguous_single_query() {
        let changeset = changeset();
        let result = changeset.sprite_for(&SpriteQuery::new().role("item"));
        assert!(matches!(result, Err(SegueError::InvalidState(_))));
    }
}
