//! Active-path tracking for recursive schema walks.

use std::cell::RefCell;
use std::collections::HashSet;
use std::hash::Hash;

use serde_json::Value;

/// Keys of the nodes currently on the active recursion path.
///
/// Membership is scoped: [`ActivePath::enter`] returns a guard that takes the
/// key off the path again when dropped, on every exit path of the caller.
#[derive(Debug)]
pub(crate) struct ActivePath<K: Hash + Eq> {
    keys: RefCell<HashSet<K>>,
}

impl<K: Hash + Eq + Clone> ActivePath<K> {
    pub(crate) fn new() -> Self {
        Self {
            keys: RefCell::new(HashSet::new()),
        }
    }

    /// Put `key` on the path. Returns `None` if it is already there.
    pub(crate) fn enter(&self, key: K) -> Option<PathGuard<'_, K>> {
        if !self.keys.borrow_mut().insert(key.clone()) {
            return None;
        }
        Some(PathGuard { path: self, key })
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.keys.borrow().contains(key)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.keys.borrow().len()
    }
}

/// Removes its key from the [`ActivePath`] when dropped.
#[derive(Debug)]
pub(crate) struct PathGuard<'a, K: Hash + Eq> {
    path: &'a ActivePath<K>,
    key: K,
}

impl<K: Hash + Eq> Drop for PathGuard<'_, K> {
    fn drop(&mut self) {
        self.path.keys.borrow_mut().remove(&self.key);
    }
}

/// Identity of a borrowed node: its address, stable for the borrow.
pub(crate) fn node_id(value: &Value) -> usize {
    value as *const Value as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enter_rejects_key_on_path() {
        let path = ActivePath::new();
        let guard = path.enter(1usize);
        assert!(guard.is_some());
        assert!(path.enter(1usize).is_none());
        assert!(path.contains(&1));
    }

    #[test]
    fn guard_releases_on_drop() {
        let path = ActivePath::new();
        {
            let _outer = path.enter("a".to_string()).unwrap();
            let _inner = path.enter("b".to_string()).unwrap();
            assert_eq!(path.len(), 2);
        }
        assert_eq!(path.len(), 0);
        assert!(path.enter("a".to_string()).is_some());
    }

    #[test]
    fn equal_values_have_distinct_identity() {
        let doc = json!([{ "type": "string" }, { "type": "string" }]);
        let items = doc.as_array().unwrap();
        assert_eq!(items[0], items[1]);
        assert_ne!(node_id(&items[0]), node_id(&items[1]));
        assert_eq!(node_id(&items[0]), node_id(&doc[0]));
    }
}
