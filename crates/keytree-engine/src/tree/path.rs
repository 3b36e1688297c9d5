/// Single-use forward cursor over the key segments of a section path.
///
/// Once exhausted it stays exhausted; callers build a fresh cursor per
/// traversal. `has_next` lets tree creation distinguish an intermediate
/// segment from the final one mid-walk.
#[derive(Debug)]
pub struct Path<'a> {
    segments: &'a [&'a str],
    index: usize,
}

impl<'a> Path<'a> {
    pub fn new(segments: &'a [&'a str]) -> Self {
        Self { segments, index: 0 }
    }

    /// Whether any segments remain in front of the cursor.
    pub fn has_next(&self) -> bool {
        self.index < self.segments.len()
    }
}

impl<'a> Iterator for Path<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let segment = self.segments.get(self.index)?;
        self.index += 1;
        Some(segment)
    }
}
