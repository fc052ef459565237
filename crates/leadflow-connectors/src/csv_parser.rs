//! CSV parsing against a `LeadSource`'s `csv_config`.
//!
//! Produces one `BTreeMap<column, value>` per data row; validation and
//! field-mapping against these maps is `leadflow-recipe`'s job, not this
//! module's. This is purely "bytes in, rows out".

use std::collections::BTreeMap;

use leadflow_core::model::CsvConfig;

use crate::error::{ConnectorError, Result};

/// One parsed CSV row, 1-based in the original file.
pub struct ParsedRow {
    pub row_number: i64,
    pub columns: BTreeMap<String, String>,
}

/// Parses `bytes` according to `config`: skips `skip_rows`, splits on
/// `delimiter`, and treats the first remaining row as a header if
/// `has_header` (synthesizing `column_0`, `column_1`, ... otherwise).
pub fn parse_csv(bytes: &[u8], config: &CsvConfig) -> Result<Vec<ParsedRow>> {
    let delimiter = config.delimiter as u8;
    if !config.delimiter.is_ascii() {
        return Err(ConnectorError::MalformedResponse(
            "csv delimiter must be ASCII".to_string(),
        ));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records = reader.records();
    for _ in 0..config.skip_rows {
        if records.next().is_none() {
            return Ok(vec![]);
        }
    }

    let headers: Vec<String> = if config.has_header {
        match records.next() {
            Some(record) => record
                .map_err(|e| ConnectorError::MalformedResponse(e.to_string()))?
                .iter()
                .map(|s| s.to_string())
                .collect(),
            None => return Ok(vec![]),
        }
    } else {
        vec![]
    };

    let mut rows = Vec::new();
    for (offset, record) in records.enumerate() {
        let record = record.map_err(|e| ConnectorError::MalformedResponse(e.to_string()))?;
        let row_number = (config.skip_rows + usize::from(config.has_header) + offset + 1) as i64;

        let mut columns = BTreeMap::new();
        for (idx, value) in record.iter().enumerate() {
            let key = headers
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("column_{idx}"));
            columns.insert(key, value.to_string());
        }
        rows.push(ParsedRow { row_number, columns });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CsvConfig {
        CsvConfig {
            delimiter: ',',
            has_header: true,
            date_format: "%Y-%m-%d".to_string(),
            skip_rows: 0,
        }
    }

    #[test]
    fn parses_header_and_rows() {
        // Physical line 1 is the header, so the first data row is line 2.
        let bytes = b"email,phone\njohn@example.com,5551234567\njane@example.com,5557654321\n";
        let rows = parse_csv(bytes, &config()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[0].columns.get("email").unwrap(), "john@example.com");
        assert_eq!(rows[1].row_number, 3);
    }

    #[test]
    fn skip_rows_offsets_row_numbers() {
        // Physical line 1 is skipped, line 2 is the header, line 3 is data.
        let bytes = b"banner line\nemail\njohn@example.com\n";
        let cfg = CsvConfig {
            skip_rows: 1,
            ..config()
        };
        let rows = parse_csv(bytes, &cfg).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_number, 3);
    }

    #[test]
    fn no_header_synthesizes_column_names() {
        let bytes = b"john@example.com,5551234567\n";
        let cfg = CsvConfig {
            has_header: false,
            ..config()
        };
        let rows = parse_csv(bytes, &cfg).unwrap();
        assert_eq!(rows[0].columns.get("column_0").unwrap(), "john@example.com");
        assert_eq!(rows[0].columns.get("column_1").unwrap(), "5551234567");
    }

    #[test]
    fn custom_delimiter_is_respected() {
        let bytes = b"email;phone\njohn@example.com;5551234567\n";
        let cfg = CsvConfig {
            delimiter: ';',
            ..config()
        };
        let rows = parse_csv(bytes, &cfg).unwrap();
        assert_eq!(rows[0].columns.get("email").unwrap(), "john@example.com");
    }

    #[test]
    fn empty_input_is_no_rows() {
        let rows = parse_csv(b"", &config()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn ragged_rows_are_tolerated() {
        let bytes = b"a,b,c\n1,2\n3,4,5,6\n";
        let rows = parse_csv(bytes, &config()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].columns.get("column_3").unwrap(), "6");
    }
}
