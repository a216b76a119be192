use crate::error::Result;
use crate::structs::{Frame, Value};
use log::debug;
use std::fs::File;
use std::path::Path;

/// Extracts a delimited source file into an in-memory [`Frame`].
///
/// The first CSV record is taken as the header row and becomes the frame's
/// column names. Empty cells load as `Null`; everything else loads as `Text`
/// verbatim — numeric coercion is the transformer's job, not extraction's.
///
/// # Errors
///
/// Returns `PipelineError::Io` if the file cannot be opened and
/// `PipelineError::Csv` if the contents are malformed.
pub fn extract(file_path: &Path) -> Result<Frame> {
    debug!("Extracting data from {}", file_path.display());
    let file = File::open(file_path)?;
    let mut reader = csv::Reader::from_reader(file);
    let frame = extract_from_reader(&mut reader)?;
    debug!(
        "Dataset contains {} rows and {} columns",
        frame.row_count(),
        frame.columns.len()
    );
    Ok(frame)
}

/// Extracts from an existing CSV reader; see [`extract`].
pub fn extract_from_reader<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<Frame> {
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut row = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            let raw = record.get(i).unwrap_or("");
            row.push(if raw.is_empty() {
                Value::Null
            } else {
                Value::Text(raw.to_owned())
            });
        }
        rows.push(row);
    }

    Ok(Frame::new(columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn reader(input: &str) -> csv::Reader<&[u8]> {
        csv::Reader::from_reader(input.as_bytes())
    }

    #[test]
    fn extract_reads_headers_and_rows() {
        let input = "App,Rating\nApp1,4.5\nApp2,4.0\n";
        let frame = extract_from_reader(&mut reader(input)).unwrap();

        assert_eq!(frame.columns, vec!["App", "Rating"]);
        assert_eq!(frame.row_count(), 2);
        assert_eq!(
            frame.rows[0],
            vec![Value::Text("App1".into()), Value::Text("4.5".into())]
        );
    }

    #[test]
    fn extract_turns_empty_cells_into_null() {
        let input = "App,Rating\nApp1,\n";
        let frame = extract_from_reader(&mut reader(input)).unwrap();

        assert_eq!(frame.rows[0][1], Value::Null);
    }

    #[test]
    fn extract_header_only_yields_empty_frame() {
        let input = "App,Rating\n";
        let frame = extract_from_reader(&mut reader(input)).unwrap();

        assert_eq!(frame.columns.len(), 2);
        assert!(frame.is_empty());
    }

    #[test]
    fn extract_missing_file_is_an_error() {
        let err = extract(Path::new("nonexistent.csv")).unwrap_err();
        assert!(matches!(err, crate::error::PipelineError::Io(_)));
    }

    #[test]
    fn extract_from_disk_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "Column1,Column2").unwrap();
        writeln!(file, "1,A").unwrap();
        writeln!(file, "2,B").unwrap();

        let frame = extract(&path).unwrap();
        assert_eq!(frame.columns, vec!["Column1", "Column2"]);
        assert_eq!(frame.row_count(), 2);
    }
}
