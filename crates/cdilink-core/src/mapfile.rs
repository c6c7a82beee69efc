//! Ignition map files
//!
//! Maps travel as plain tab-separated text: one row of the table per
//! line, cells are unsigned decimal advance values. Row structure exists
//! only for the human editing the file; loading flattens the rows in
//! order into the value sequence the protocol streams out.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::protocol::IgnitionMap;

/// Errors raised while loading a map file
#[derive(Error, Debug)]
pub enum MapFileError {
    /// The file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cell did not parse as an advance value
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number in the file
        line: usize,
        /// What was wrong with the cell
        message: String,
    },

    /// The file contained no values at all
    #[error("Map file holds no values")]
    Empty,
}

/// Load an ignition map from a tab-separated file
pub fn load(path: impl AsRef<Path>) -> Result<IgnitionMap, MapFileError> {
    let content = fs::read_to_string(path)?;
    parse(&content)
}

/// Parse tab-separated rows into a map.
///
/// Blank lines and empty cells (doubled or trailing tabs, typical of
/// spreadsheet exports) are skipped. Every other cell must parse as an
/// unsigned 16-bit integer.
pub fn parse(content: &str) -> Result<IgnitionMap, MapFileError> {
    let mut values = Vec::new();

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        for cell in line.split('\t') {
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }

            let value = cell.parse::<u16>().map_err(|_| MapFileError::Parse {
                line: index + 1,
                message: format!("'{cell}' is not an unsigned 16-bit value"),
            })?;
            values.push(value);
        }
    }

    if values.is_empty() {
        return Err(MapFileError::Empty);
    }

    Ok(IgnitionMap::new(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rows_flatten_in_order() {
        let map = parse("100\t200\t300\n400\t500\t600\n").unwrap();
        assert_eq!(map.values(), &[100, 200, 300, 400, 500, 600]);
    }

    #[test]
    fn test_single_row() {
        let map = parse("4730\t6375\t7573").unwrap();
        assert_eq!(map.values(), &[4730, 6375, 7573]);
    }

    #[test]
    fn test_blank_lines_and_trailing_tabs() {
        let map = parse("100\t200\t\n\n300\t400\n").unwrap();
        assert_eq!(map.values(), &[100, 200, 300, 400]);
    }

    #[test]
    fn test_cell_whitespace() {
        let map = parse(" 100 \t 200\r\n").unwrap();
        assert_eq!(map.values(), &[100, 200]);
    }

    #[test]
    fn test_parse_error_line_number() {
        let err = parse("100\t200\n300\tabc\n").unwrap_err();
        match err {
            MapFileError::Parse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("abc"));
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_value_range() {
        assert!(matches!(
            parse("-5\n"),
            Err(MapFileError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            parse("65536\n"),
            Err(MapFileError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse(""), Err(MapFileError::Empty)));
        assert!(matches!(parse("\n\n\t\n"), Err(MapFileError::Empty)));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.tsv");
        fs::write(&path, "10\t20\n30\t40\n").unwrap();

        let map = load(&path).unwrap();
        assert_eq!(map.values(), &[10, 20, 30, 40]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path().join("absent.tsv")).unwrap_err();
        assert!(matches!(err, MapFileError::Io(_)));
    }
}
