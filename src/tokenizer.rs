use std::collections::BTreeMap;

/// One data line keyed by the original header strings.
pub type RawRow = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Split raw delimited text into a header row and data rows.
///
/// The first non-empty line is the header. A field is either a double-quoted
/// run (embedded delimiters allowed, `""` for a literal quote) or a run of
/// non-delimiter characters. Not RFC-4180; quotes only open a field at its
/// start. Returns `None` when the text contains no header line.
pub fn tokenize(raw: &str, delimiter: char) -> Option<ParsedTable> {
    let mut lines = raw.split('\n').map(|l| l.trim_end_matches('\r'));

    let header_line = lines.find(|l| !l.trim().is_empty())?;
    let headers = split_fields(header_line, delimiter);

    let mut rows = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let values = split_fields(line, delimiter);
        if values.iter().all(|v| v.is_empty()) {
            continue;
        }
        // Missing trailing values become empty strings; extras are dropped.
        let mut row = RawRow::new();
        for (i, header) in headers.iter().enumerate() {
            let value = values.get(i).cloned().unwrap_or_default();
            row.insert(header.clone(), value);
        }
        rows.push(row);
    }

    Some(ParsedTable { headers, rows })
}

fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut value = String::new();
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    value.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                value.push(c);
            }
        } else if c == '"' && at_field_start {
            in_quotes = true;
            at_field_start = false;
        } else if c == delimiter {
            fields.push(std::mem::take(&mut value).trim().to_string());
            at_field_start = true;
        } else {
            value.push(c);
            at_field_start = false;
        }
    }
    fields.push(value.trim().to_string());
    fields
}
