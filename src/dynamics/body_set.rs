//! Registry owning all live bodies.

use super::body::Body;

/// Stable handle to a body in a [`BodySet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(u32);

impl BodyId {
    /// Handle from a raw slot index. Only useful for tests and tooling;
    /// real handles come from [`BodySet::add`].
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Owns every live body and hands out [`BodyId`] handles.
///
/// Lifecycle is explicit: bodies exist from [`BodySet::add`] until
/// [`BodySet::remove`] or [`BodySet::clear`]. Indexing with a stale handle
/// panics, like slice indexing with a stale index would.
#[derive(Default)]
pub struct BodySet {
    slots: Vec<Option<Body>>,
}

impl BodySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body, reusing the first free slot.
    pub fn add(&mut self, body: Body) -> BodyId {
        match self.slots.iter_mut().enumerate().find(|(_, s)| s.is_none()) {
            Some((index, slot)) => {
                *slot = Some(body);
                BodyId(index as u32)
            }
            None => {
                self.slots.push(Some(body));
                BodyId((self.slots.len() - 1) as u32)
            }
        }
    }

    /// Remove and return a body. Removing an already-removed body returns
    /// `None`.
    pub fn remove(&mut self, id: BodyId) -> Option<Body> {
        self.slots.get_mut(id.index())?.take()
    }

    /// Remove every body.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }

    pub fn get(&self, id: BodyId) -> Option<&Body> {
        self.slots.get(id.index())?.as_ref()
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.slots.get_mut(id.index())?.as_mut()
    }

    /// Handles of all live bodies, in slot order.
    pub fn ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| BodyId(i as u32))
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|b| (BodyId(i as u32), b)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyId, &mut Body)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|b| (BodyId(i as u32), b)))
    }

    /// Mutable access to two distinct bodies at once, for equal-and-
    /// opposite application.
    ///
    /// # Panics
    /// Panics if the handles are equal or stale.
    pub fn pair_mut(&mut self, a: BodyId, b: BodyId) -> (&mut Body, &mut Body) {
        assert_ne!(a, b, "pair_mut needs two distinct bodies");
        let (low, high, swapped) = if a.index() < b.index() {
            (a.index(), b.index(), false)
        } else {
            (b.index(), a.index(), true)
        };
        let (head, tail) = self.slots.split_at_mut(high);
        let low_body = head[low].as_mut().expect("stale body handle");
        let high_body = tail[0].as_mut().expect("stale body handle");
        if swapped {
            (high_body, low_body)
        } else {
            (low_body, high_body)
        }
    }
}

impl std::ops::Index<BodyId> for BodySet {
    type Output = Body;

    fn index(&self, id: BodyId) -> &Body {
        self.get(id).expect("stale body handle")
    }
}

impl std::ops::IndexMut<BodyId> for BodySet {
    fn index_mut(&mut self, id: BodyId) -> &mut Body {
        self.get_mut(id).expect("stale body handle")
    }
}
