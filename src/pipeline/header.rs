//! Header name lookup

/// Column names of the header record
#[derive(Debug, Clone)]
pub(crate) struct HeaderIndex {
    names: Vec<String>,
    ignore_case: bool,
}

impl HeaderIndex {
    pub(crate) fn new(names: Vec<String>, ignore_case: bool) -> Self {
        Self { names, ignore_case }
    }

    pub(crate) fn names(&self) -> &[String] {
        &self.names
    }

    fn matches(&self, column: &str, name: &str) -> bool {
        if self.ignore_case {
            column.to_lowercase() == name.to_lowercase()
        } else {
            column == name
        }
    }

    /// Column of the `occurrence`-th (0-based) column called `name`
    pub(crate) fn find(&self, name: &str, occurrence: usize) -> Option<usize> {
        self.names
            .iter()
            .enumerate()
            .filter(|(_, column)| self.matches(column, name))
            .map(|(index, _)| index)
            .nth(occurrence)
    }

    /// Column of the first alias present at `occurrence`
    pub(crate) fn find_any(&self, names: &[String], occurrence: usize) -> Option<usize> {
        names.iter().find_map(|name| self.find(name, occurrence))
    }
}
