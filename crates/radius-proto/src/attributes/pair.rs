use super::types::AttributeType;

/// A single attribute-value pair keyed by dictionary name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePair {
    pub name: String,
    pub value: String,
}

impl AttributePair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        AttributePair {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Create a pair for a known dictionary attribute
    pub fn typed(attr: AttributeType, value: impl Into<String>) -> Self {
        Self::new(attr.name(), value)
    }

    /// Dictionary names compare case-insensitively
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Ordered list of attribute-value pairs
///
/// Order is preserved because it carries meaning for some attributes
/// (EAP-Message fragments, repeated Filter-Id). Lookups are by name,
/// case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeList {
    pairs: Vec<AttributePair>,
}

impl AttributeList {
    pub fn new() -> Self {
        AttributeList { pairs: Vec::new() }
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push(AttributePair::new(name, value));
    }

    /// First value of the named attribute
    pub fn first(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|pair| pair.is(name))
            .map(|pair| pair.value.as_str())
    }

    /// All values of the named attribute, in order
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |pair| pair.is(name))
            .map(|pair| pair.value.as_str())
    }

    pub fn get(&self, attr: AttributeType) -> Option<&str> {
        self.first(attr.name())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pairs.iter().any(|pair| pair.is(name))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AttributePair> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttributeList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        AttributeList {
            pairs: iter
                .into_iter()
                .map(|(name, value)| AttributePair::new(name, value))
                .collect(),
        }
    }
}

impl FromIterator<AttributePair> for AttributeList {
    fn from_iter<I: IntoIterator<Item = AttributePair>>(iter: I) -> Self {
        AttributeList {
            pairs: iter.into_iter().collect(),
        }
    }
}

impl Extend<AttributePair> for AttributeList {
    fn extend<I: IntoIterator<Item = AttributePair>>(&mut self, iter: I) {
        self.pairs.extend(iter);
    }
}

impl IntoIterator for AttributeList {
    type Item = AttributePair;
    type IntoIter = std::vec::IntoIter<AttributePair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

impl<'a> IntoIterator for &'a AttributeList {
    type Item = &'a AttributePair;
    type IntoIter = std::slice::Iter<'a, AttributePair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}
