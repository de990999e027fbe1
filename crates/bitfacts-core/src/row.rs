//! Typed access to one relational row.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

/// Read a column of the current row as text.
///
/// `None` means SQL NULL or an absent column; encoders treat both the same.
pub trait RowAccessor {
    fn text(&self, column: &str) -> Option<Cow<'_, str>>;
}

impl RowAccessor for BTreeMap<String, String> {
    fn text(&self, column: &str) -> Option<Cow<'_, str>> {
        self.get(column).map(|v| Cow::Borrowed(v.as_str()))
    }
}

impl<S: std::hash::BuildHasher> RowAccessor for HashMap<String, String, S> {
    fn text(&self, column: &str) -> Option<Cow<'_, str>> {
        self.get(column).map(|v| Cow::Borrowed(v.as_str()))
    }
}

impl RowAccessor for BTreeMap<String, Option<String>> {
    fn text(&self, column: &str) -> Option<Cow<'_, str>> {
        self.get(column)?.as_deref().map(Cow::Borrowed)
    }
}

impl<T: RowAccessor + ?Sized> RowAccessor for &T {
    fn text(&self, column: &str) -> Option<Cow<'_, str>> {
        (**self).text(column)
    }
}

/// Build a row from literal pairs (tests, fixtures).
pub fn row_of<const N: usize>(pairs: [(&str, &str); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
