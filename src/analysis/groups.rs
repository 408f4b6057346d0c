use std::collections::HashMap;

/// Accumulates values by string key and yields them in order of each key's first occurrence.
#[derive(Debug, Clone)]
pub(crate) struct Groups<V> {
    index: HashMap<String, usize>,
    entries: Vec<(String, V)>,
}

impl<V> Default for Groups<V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<V> Groups<V> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key`, inserting `V::default()` the first time `key` is seen.
    pub(crate) fn entry(&mut self, key: &str) -> &mut V
    where
        V: Default,
    {
        let ix = match self.index.get(key) {
            Some(ix) => *ix,
            None => {
                let ix = self.entries.len();
                self.index.insert(key.to_string(), ix);
                self.entries.push((key.to_string(), V::default()));
                ix
            }
        };
        &mut self.entries[ix].1
    }

    pub(crate) fn into_entries(self) -> Vec<(String, V)> {
        self.entries
    }
}
