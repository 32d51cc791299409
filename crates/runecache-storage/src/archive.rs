//! In-memory archive state

use std::collections::BTreeMap;

/// A collection that is set once and never reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState<T> {
    /// Nothing loaded yet
    #[default]
    Unloaded,
    /// Loaded value
    Loaded(T),
}

impl<T> LoadState<T> {
    /// Whether a value has been set
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// The loaded value
    pub const fn get(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::Unloaded => None,
        }
    }

    /// The loaded value, mutably
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::Unloaded => None,
        }
    }

    /// Set the value if nothing is loaded yet.
    ///
    /// Returns the value back when the state was already loaded.
    pub fn set(&mut self, value: T) -> Result<(), T> {
        if self.is_loaded() {
            return Err(value);
        }
        *self = Self::Loaded(value);
        Ok(())
    }
}

/// Decoded groups of one archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    /// Archive id
    pub id: u8,
    /// Decoded groups: group id to file payloads in directory order
    pub groups: BTreeMap<u32, Vec<Vec<u8>>>,
}

impl Archive {
    /// Create an archive with no decoded groups
    pub fn new(id: u8) -> Self {
        Self {
            id,
            groups: BTreeMap::new(),
        }
    }

    /// Files of a decoded group
    pub fn group(&self, id: u32) -> Option<&[Vec<u8>]> {
        self.groups.get(&id).map(Vec::as_slice)
    }

    /// Whether a group has been decoded
    pub fn is_loaded(&self, group: u32) -> bool {
        self.groups.contains_key(&group)
    }

    /// Number of decoded groups
    pub fn loaded_groups(&self) -> usize {
        self.groups.len()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_load_state_sets_once() {
        let mut state = LoadState::default();
        assert!(!state.is_loaded());
        assert_eq!(state.get(), None);

        state.set(1).unwrap();
        assert_eq!(state.get(), Some(&1));
        assert_eq!(state.set(2), Err(2));
        assert_eq!(state.get(), Some(&1));

        *state.get_mut().unwrap() += 1;
        assert_eq!(state, LoadState::Loaded(2));
    }

    #[test]
    fn test_archive_groups() {
        let mut archive = Archive::new(4);
        assert!(!archive.is_loaded(1));

        archive.groups.insert(1, vec![b"a".to_vec(), b"bc".to_vec()]);
        assert!(archive.is_loaded(1));
        assert_eq!(archive.group(1).unwrap()[1], b"bc");
        assert_eq!(archive.loaded_groups(), 1);
    }
}
