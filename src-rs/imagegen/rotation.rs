use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin over a provider's API keys, shared by every request the
/// adapter sends.
pub struct KeyRing {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl KeyRing {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn next_key(&self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed);
        Some(self.keys[idx % self.keys.len()].as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_through_keys() {
        let ring = KeyRing::new(vec!["a".to_string(), "b".to_string()]);
        let seen: Vec<&str> = (0..5).filter_map(|_| ring.next_key()).collect();
        assert_eq!(seen, vec!["a", "b", "a", "b", "a"]);
    }

    #[test]
    fn empty_ring_yields_nothing() {
        let ring = KeyRing::new(Vec::new());
        assert!(ring.is_empty());
        assert_eq!(ring.next_key(), None);
    }
}
