use std::fmt;

/// Handle of a symbol in a [`SymbolTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub(crate) usize);

impl SymbolId {
    /// Position of the symbol in its table
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "symbol#{}", self.0)
    }
}

/// Append-only table of the symbols code fixups can refer to.
///
/// Symbols can be defined through a shared reference from several threads while segments are
/// being built; their addresses are only known after address assignment.
pub struct SymbolTable {
    names: boxcar::Vec<String>,
}

impl SymbolTable {
    /// An empty table
    #[must_use]
    pub fn new() -> Self {
        SymbolTable {
            names: boxcar::Vec::new(),
        }
    }

    /// Adds a symbol and returns its handle. Names don't have to be unique.
    pub fn define(&self, name: &str) -> SymbolId {
        SymbolId(self.names.push(name.to_string()))
    }

    /// Name of `symbol`
    #[must_use]
    pub fn name(&self, symbol: SymbolId) -> Option<&str> {
        self.names.get(symbol.0).map(String::as_str)
    }

    /// Number of defined symbols
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.count()
    }

    /// True if no symbol is defined
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.count() == 0
    }

    /// Iterates over all symbols with their names
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &str)> {
        self.names
            .iter()
            .map(|(index, name)| (SymbolId(index), name.as_str()))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn define_concurrently() {
        let table = Arc::new(SymbolTable::new());
        let handles: Vec<_> = (0..4)
            .map(|thread| {
                let table = table.clone();
                std::thread::spawn(move || {
                    (0..16)
                        .map(|i| table.define(&format!("t{thread}_{i}")))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<SymbolId> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        ids.sort();
        ids.dedup();

        assert_eq!(ids.len(), 64);
        assert_eq!(table.len(), 64);
        for id in ids {
            assert!(table.name(id).unwrap().starts_with('t'));
        }
    }
}
