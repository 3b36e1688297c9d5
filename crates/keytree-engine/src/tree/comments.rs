/// Ordered comment lines owned by exactly one section.
///
/// Lines are not unique and carry no marker; the marker is added back
/// at serialize time. During a parse, comment lines buffer here until
/// the next entry line claims them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
    lines: Vec<String>,
}

impl Comments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single comment line.
    pub fn append(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    /// Append several comment lines, keeping their order.
    pub fn append_all<I, S>(&mut self, lines: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
        self
    }

    /// Replace the contents wholesale.
    pub fn set<I, S>(&mut self, lines: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clear().append_all(lines)
    }

    pub fn clear(&mut self) -> &mut Self {
        self.lines.clear();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.lines.iter()
    }
}

impl<'a> IntoIterator for &'a Comments {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}
