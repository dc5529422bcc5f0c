//! Indentation-aware line buffer for generated source.

use std::fmt::{self, Write as _};

const INDENT: &str = "    ";

#[derive(Debug, Default)]
pub struct CodeBuilder {
    text: String,
    depth: usize,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one line at the current depth. Empty lines carry no indentation.
    pub fn line(&mut self, text: impl AsRef<str>) -> fmt::Result {
        let text = text.as_ref();
        if text.is_empty() {
            return writeln!(self.text);
        }
        for _ in 0..self.depth {
            self.text.push_str(INDENT);
        }
        writeln!(self.text, "{text}")
    }

    pub fn lines<I, S>(&mut self, lines: I) -> fmt::Result
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        lines.into_iter().try_for_each(|l| self.line(l))
    }

    pub fn blank(&mut self) -> fmt::Result {
        self.line("")
    }

    /// Write `opener` and indent what follows.
    pub fn open(&mut self, opener: &str) -> fmt::Result {
        self.line(opener)?;
        self.depth += 1;
        Ok(())
    }

    /// Outdent and write `closer`.
    pub fn close(&mut self, closer: &str) -> fmt::Result {
        self.depth = self.depth.saturating_sub(1);
        self.line(closer)
    }

    /// Write a label one level out from the current depth, like `public:`.
    pub fn label(&mut self, label: &str) -> fmt::Result {
        let depth = self.depth;
        self.depth = depth.saturating_sub(1);
        let result = self.line(label);
        self.depth = depth;
        result
    }

    pub fn finish(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_indent_nested_blocks() {
        let mut b = CodeBuilder::new();
        b.line("class A").unwrap();
        b.open("{").unwrap();
        b.label("public:").unwrap();
        b.line("int x;").unwrap();
        b.blank().unwrap();
        b.close("};").unwrap();
        assert_eq!(b.finish(), "class A\n{\npublic:\n    int x;\n\n};\n");
    }
}
