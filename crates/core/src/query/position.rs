//! Line/column and byte offset conversion over a unit's text.
//!
//! Lines and columns are 0-based; columns count bytes. Every function is
//! total: out-of-range inputs clamp to the end of the text.

use stratum_api::{CompilationUnitHandle, ElementHandle, EngineProject};

pub fn offset_for(text: &str, line: usize, column: usize) -> usize {
    let bytes = text.as_bytes();
    let mut offset = 0;
    for _ in 0..line {
        match bytes[offset..].iter().position(|&b| b == b'\n') {
            Some(i) => offset += i + 1,
            None => return text.len(),
        }
    }
    offset.saturating_add(column).min(text.len())
}

pub fn line_for(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    text.as_bytes()[..offset]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
}

pub fn column_for(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    match text.as_bytes()[..offset].iter().rposition(|&b| b == b'\n') {
        Some(newline) => offset - newline - 1,
        None => offset,
    }
}

/// Element referenced at the position, else the innermost declaration around it.
pub fn element_at(
    project: &dyn EngineProject,
    unit: &CompilationUnitHandle,
    line: usize,
    column: usize,
) -> Option<ElementHandle> {
    let text = project.source(unit)?;
    let offset = offset_for(&text, line, column);
    project
        .code_select(unit, offset, 0)
        .into_iter()
        .next()
        .or_else(|| project.element_containing(unit, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "class A {\n  int x;\n}\n";

    #[test]
    fn test_offset_for_lines_and_columns() {
        assert_eq!(offset_for(TEXT, 0, 0), 0);
        assert_eq!(offset_for(TEXT, 1, 2), 12);
        assert_eq!(&TEXT[offset_for(TEXT, 1, 6)..offset_for(TEXT, 1, 7)], "x");
        assert_eq!(offset_for(TEXT, 2, 0), 19);
    }

    #[test]
    fn test_offset_for_clamps() {
        assert_eq!(offset_for(TEXT, 10, 0), TEXT.len());
        assert_eq!(offset_for(TEXT, 2, 500), TEXT.len());
        assert_eq!(offset_for("", 0, 3), 0);
        assert_eq!(offset_for(TEXT, 0, usize::MAX), TEXT.len());
    }

    #[test]
    fn test_line_and_column_invert_offset() {
        for (line, column) in [(0, 0), (0, 6), (1, 2), (1, 6), (2, 0)] {
            let offset = offset_for(TEXT, line, column);
            assert_eq!(line_for(TEXT, offset), line);
            assert_eq!(column_for(TEXT, offset), column);
        }
    }

    #[test]
    fn test_line_and_column_clamp_offset() {
        assert_eq!(line_for(TEXT, 1_000), 3);
        assert_eq!(column_for(TEXT, 1_000), 0);
        assert_eq!(line_for("", 5), 0);
        assert_eq!(column_for("abc", 99), 3);
    }
}
