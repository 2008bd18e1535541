//! Naive CSV parsing for uploaded lead files
//!
//! Lines are split on commas with no quote awareness: a comma inside a
//! quoted cell still splits the cell. Double quotes are stripped, not
//! interpreted.

use tracing::warn;

use crate::domain::RawRow;

/// A data row together with its 1-based line number in the file
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub line: usize,
    pub row: RawRow,
}

/// Parse CSV text into header-keyed rows
pub fn parse_csv(text: &str) -> Vec<RawRow> {
    parse_csv_lines(text).into_iter().map(|l| l.row).collect()
}

/// Parse CSV text, keeping the source line number of every row.
///
/// The first line is the header. Blank lines are skipped. Input without
/// at least one data line yields an empty result and a warning.
pub fn parse_csv_lines(text: &str) -> Vec<ParsedLine> {
    let mut lines = text.lines().enumerate();

    let headers: Vec<String> = match lines.next() {
        Some((_, header)) if !header.trim().is_empty() => {
            header.split(',').map(clean_cell).collect()
        }
        _ => {
            warn!("{}", missing_header_message(text));
            return Vec::new();
        }
    };

    let parsed: Vec<ParsedLine> = lines
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            let values: Vec<String> = line.split(',').map(clean_cell).collect();
            let row = headers
                .iter()
                .enumerate()
                .map(|(i, header)| {
                    let value = values.get(i).filter(|v| !v.is_empty()).cloned();
                    (header.clone(), value)
                })
                .collect();
            ParsedLine { line: idx + 1, row }
        })
        .collect();

    if parsed.is_empty() {
        warn!(columns = headers.len(), "CSV input has a header but no data rows");
    }

    parsed
}

fn missing_header_message(text: &str) -> String {
    let total = text.lines().count();
    let non_blank = text.lines().filter(|l| !l.trim().is_empty()).count();
    if total == 0 {
        "CSV input is empty".to_string()
    } else {
        format!(
            "CSV line 1 is blank, expected a header ({} lines, {} non-blank ignored)",
            total, non_blank
        )
    }
}

fn clean_cell(cell: &str) -> String {
    cell.trim().replace('"', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_count_and_keys() {
        let text = "a,b,c\n1,2,3\n4,5,6\n7,8,9";
        let rows = parse_csv(text);
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.len(), 3);
        }
        assert_eq!(rows[1]["b"].as_deref(), Some("5"));
    }

    #[test]
    fn test_empty_and_header_only() {
        assert!(parse_csv("").is_empty());
        assert!(parse_csv("header1,header2").is_empty());
        assert!(parse_csv("header1,header2\n").is_empty());
        assert!(parse_csv("header1,header2\n\n   \n").is_empty());
    }

    #[test]
    fn test_leading_blank_line_is_reported() {
        let text = "\ndate_appointment_created,project_name\n2024-05-01,North";
        assert!(parse_csv_lines(text).is_empty());
        assert_eq!(
            missing_header_message(text),
            "CSV line 1 is blank, expected a header (3 lines, 2 non-blank ignored)"
        );
        assert_eq!(missing_header_message(""), "CSV input is empty");
    }

    #[test]
    fn test_short_rows_and_empty_cells_are_none() {
        let rows = parse_csv("name,email,phone\nAnn,,\nBo");
        assert_eq!(rows[0]["name"].as_deref(), Some("Ann"));
        assert_eq!(rows[0]["email"], None);
        assert_eq!(rows[1]["phone"], None);
        assert_eq!(rows[1].len(), 3);
    }

    #[test]
    fn test_trims_and_strips_quotes() {
        let rows = parse_csv("\"lead_name\" , \"status\"\n  \"Dana\" ,  booked ");
        assert_eq!(rows[0]["lead_name"].as_deref(), Some("Dana"));
        assert_eq!(rows[0]["status"].as_deref(), Some("booked"));
    }

    #[test]
    fn test_quoted_commas_still_split() {
        let rows = parse_csv("name,city\n\"Reyes, Dana\",Austin");
        assert_eq!(rows[0]["name"].as_deref(), Some("Reyes"));
        assert_eq!(rows[0]["city"].as_deref(), Some("Dana"));
    }

    #[test]
    fn test_duplicate_headers_keep_last_value() {
        let rows = parse_csv("status,status\nfirst,second");
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0]["status"].as_deref(), Some("second"));
    }

    #[test]
    fn test_crlf_and_line_numbers() {
        let lines = parse_csv_lines("a,b\r\n1,2\r\n\r\n3,4\r\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line, 2);
        assert_eq!(lines[1].line, 4);
        assert_eq!(lines[1].row["b"].as_deref(), Some("4"));
    }

    #[test]
    fn test_parse_is_repeatable() {
        let text = "x,y\n1,2";
        assert_eq!(parse_csv(text), parse_csv(text));
    }
}
