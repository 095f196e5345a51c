use serde::{Deserialize, Deserializer};
use std::io::Read;

/// One directory row with blanks already collapsed to `None`.
#[derive(Debug, Deserialize)]
pub(crate) struct FacilityRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) kind: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) distance_mi: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) capacity_status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) contact_email: Option<String>,
}

/// Parsed row plus its 1-based line in the source (header is line 1).
#[derive(Debug)]
pub(crate) struct NumberedRow {
    pub(crate) line: u64,
    pub(crate) row: FacilityRow,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<NumberedRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: csv::StringRecord = csv_reader
        .headers()?
        .iter()
        .map(normalize_header)
        .collect();

    let mut rows = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map_or(index as u64 + 2, |position| position.line());
        let row: FacilityRow = record.deserialize(Some(&headers))?;
        rows.push(NumberedRow { line, row });
    }

    Ok(rows)
}

fn normalize_header(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_lowercase()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn headers_are_trimmed_and_case_insensitive() {
        let rows = parse_rows(Cursor::new(
            "\u{feff}ID, Name ,KIND,Distance Mi,Capacity Status,Contact Email\nf-1,Sunrise,SNF,2.5,open,intake@example.com\n",
        ))
        .expect("parse");

        let row = &rows[0].row;
        assert_eq!(row.id.as_deref(), Some("f-1"));
        assert_eq!(row.name.as_deref(), Some("Sunrise"));
        assert_eq!(row.distance_mi.as_deref(), Some("2.5"));
        assert_eq!(row.capacity_status.as_deref(), Some("open"));
        assert_eq!(rows[0].line, 2);
    }

    #[test]
    fn blank_cells_become_none() {
        let rows = parse_rows(Cursor::new(
            "id,name,kind,distance_mi,capacity_status,contact_email\nf-2,Care Home, HomeHealth ,,  ,\n",
        ))
        .expect("parse");

        let row = &rows[0].row;
        assert_eq!(row.kind.as_deref(), Some("HomeHealth"));
        assert!(row.distance_mi.is_none());
        assert!(row.capacity_status.is_none());
        assert!(row.contact_email.is_none());
    }
}
