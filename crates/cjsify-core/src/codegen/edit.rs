//! Span edits over the original source text.

/// A single replacement of `start..end`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
}

/// Collects non-overlapping edits and applies them in one pass.
#[derive(Debug)]
pub struct EditBuffer<'a> {
    source: &'a str,
    edits: Vec<Edit>,
}

impl<'a> EditBuffer<'a> {
    /// Buffer over `source`
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            edits: Vec::new(),
        }
    }

    /// Replace `start..end` with `text`
    pub fn replace(&mut self, start: usize, end: usize, text: impl Into<String>) {
        self.edits.push(Edit {
            start,
            end,
            text: text.into(),
        });
    }

    /// Delete `start..end`
    pub fn remove(&mut self, start: usize, end: usize) {
        self.replace(start, end, String::new());
    }

    /// Insert `text` at `at`
    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.replace(at, at, text);
    }

    /// Produce the edited text. An edit overlapping an earlier one is dropped.
    pub fn apply(mut self) -> String {
        self.edits.sort_by_key(|e| (e.start, e.end));
        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for edit in self.edits {
            if edit.start < cursor {
                tracing::debug!(start = edit.start, end = edit.end, "Dropping overlapping edit");
                continue;
            }
            out.push_str(&self.source[cursor..edit.start]);
            out.push_str(&edit.text);
            cursor = edit.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

/// End of a removal starting at a statement that ends at `end`: trailing
/// blanks and blank lines go with it.
pub fn removal_end(source: &str, end: usize) -> usize {
    let bytes = source.as_bytes();
    let mut pos = end;
    let mut cut = end;
    while pos < bytes.len() {
        match bytes[pos] {
            b' ' | b'\t' | b'\r' => pos += 1,
            b'\n' => {
                pos += 1;
                cut = pos;
            }
            _ => return cut,
        }
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_in_offset_order() {
        let src = "export const a = b;";
        let mut buf = EditBuffer::new(src);
        buf.replace(17, 18, "dep.b");
        buf.remove(0, 7);
        buf.insert(19, "\n");
        assert_eq!(buf.apply(), "const a = dep.b;\n");
    }

    #[test]
    fn test_overlap_dropped() {
        let mut buf = EditBuffer::new("abcdef");
        buf.replace(1, 4, "X");
        buf.replace(2, 3, "Y");
        assert_eq!(buf.apply(), "aXef");
    }

    #[test]
    fn test_removal_end() {
        let src = "import a from 'a';  \n\n\nfoo();";
        assert_eq!(&src[removal_end(src, 18)..], "foo();");
        let src = "import a from 'a'; foo();";
        assert_eq!(&src[removal_end(src, 18)..], " foo();");
        let src = "import a from 'a';\n  foo();";
        assert_eq!(&src[removal_end(src, 18)..], "  foo();");
        assert_eq!(removal_end("x;  ", 2), 4);
    }
}
