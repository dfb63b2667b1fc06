//! Line-oriented source writer that remembers where each scenario landed

use indexmap::IndexMap;
use scaffold_model::LineRange;

/// Builds rendered source one line at a time
#[derive(Debug, Clone)]
pub struct SourceWriter {
    indent_unit: &'static str,
    depth: usize,
    lines: Vec<String>,
    scenarios: IndexMap<String, LineRange>,
    open: Option<(String, usize)>,
}

impl SourceWriter {
    /// Writer indenting with `indent_unit` per level
    #[must_use]
    pub fn new(indent_unit: &'static str) -> Self {
        Self {
            indent_unit,
            depth: 0,
            lines: Vec::new(),
            scenarios: IndexMap::new(),
            open: None,
        }
    }

    /// Append text at the current indentation, one line per `\n`
    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        for part in text.as_ref().split('\n') {
            if part.is_empty() {
                self.lines.push(String::new());
            } else {
                self.lines.push(format!("{}{part}", self.indent_unit.repeat(self.depth)));
            }
        }
        self
    }

    /// Append an empty line
    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    /// Increase indentation
    pub fn indent(&mut self) -> &mut Self {
        self.depth += 1;
        self
    }

    /// Decrease indentation
    pub fn dedent(&mut self) -> &mut Self {
        self.depth = self.depth.saturating_sub(1);
        self
    }

    /// Number of lines written
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Start recording a scenario at the next line
    pub fn begin_scenario(&mut self, name: impl Into<String>) {
        self.end_scenario();
        self.open = Some((name.into(), self.lines.len() + 1));
    }

    /// Close the open scenario at the last written line
    pub fn end_scenario(&mut self) {
        if let Some((name, start)) = self.open.take() {
            let end = self.lines.len().max(start);
            self.scenarios.insert(name, LineRange { start, end });
        }
    }

    /// Rendered text (newline-terminated) and scenario ranges
    #[must_use]
    pub fn finish(mut self) -> (String, IndexMap<String, LineRange>) {
        self.end_scenario();
        while self.lines.last().is_some_and(String::is_empty) {
            self.lines.pop();
        }
        let mut source = self.lines.join("\n");
        source.push('\n');
        (source, self.scenarios)
    }
}
