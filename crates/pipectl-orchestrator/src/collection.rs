//! Insertion-ordered collection of live resources.
//!
//! Slots are never reused and removal leaves a tombstone, so a [`Key`] stays
//! valid as a traversal cursor after its item has been removed: `next(key)`
//! still finds the following live item.

/// Position of an item in an [`OrderedCollection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(usize);

impl Key {
    /// Insertion index of this key.
    pub fn index(self) -> usize {
        self.0
    }
}

/// An owning, insertion-ordered arena.
#[derive(Debug)]
pub struct OrderedCollection<T> {
    slots: Vec<Option<T>>,
    live: usize,
}

impl<T> OrderedCollection<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
        }
    }

    /// Append an item at the end and return its key.
    pub fn append(&mut self, item: T) -> Key {
        self.slots.push(Some(item));
        self.live += 1;
        Key(self.slots.len() - 1)
    }

    /// Key of the first live item.
    pub fn first(&self) -> Option<Key> {
        self.next_from(0)
    }

    /// Key of the first live item after `key`. Works whether or not `key`
    /// has been removed.
    pub fn next(&self, key: Key) -> Option<Key> {
        self.next_from(key.0 + 1)
    }

    fn next_from(&self, start: usize) -> Option<Key> {
        self.slots
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, slot)| slot.is_some())
            .map(|(index, _)| Key(index))
    }

    pub fn get(&self, key: Key) -> Option<&T> {
        self.slots.get(key.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        self.slots.get_mut(key.0).and_then(Option::as_mut)
    }

    /// Remove an item. Returns `None` if it was already removed.
    pub fn remove(&mut self, key: Key) -> Option<T> {
        let item = self.slots.get_mut(key.0).and_then(Option::take);
        if item.is_some() {
            self.live -= 1;
        }
        item
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Option::as_ref)
    }
}

impl<T> Default for OrderedCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}
