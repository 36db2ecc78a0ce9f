// crates/extract/src/csv_codec.rs
use bytes::Bytes;
use common::{CsvOptions, Error, Result, Table};

/// Parse delimited text, taking column names from the first line
pub fn decode(body: &[u8], options: &CsvOptions) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .from_reader(body);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| Error::Parse(format!("Failed to parse CSV headers: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();

    if columns.is_empty() {
        return Err(Error::Parse("CSV body has no header row".to_string()));
    }

    let mut table = Table::new(columns);
    for record in reader.records() {
        let record = record.map_err(|e| Error::Parse(format!("Failed to parse CSV record: {}", e)))?;
        table.push_row(record.iter().map(str::to_string).collect())?;
    }

    Ok(table)
}

pub fn encode(table: &Table, options: &CsvOptions) -> Result<Bytes> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(Vec::new());

    writer
        .write_record(table.columns())
        .map_err(|e| Error::Parse(format!("Failed to write CSV header: {}", e)))?;
    for row in table.rows() {
        writer
            .write_record(row)
            .map_err(|e| Error::Parse(format!("Failed to write CSV record: {}", e)))?;
    }

    let buf = writer
        .into_inner()
        .map_err(|e| Error::Parse(format!("Failed to flush CSV: {}", e)))?;
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    const XETRA: &str = "ISIN,Mnemonic,Date,StartPrice\n\
                         AT0000A0E9W5,SANT,2021-04-15,20.04\n\
                         DE000A0DJ6J9,S92,2021-04-15,41.2\n";

    #[test]
    fn test_decode_header_and_rows() {
        let table = decode(XETRA.as_bytes(), &CsvOptions::default()).unwrap();
        assert_eq!(table.columns(), &["ISIN", "Mnemonic", "Date", "StartPrice"]);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column("Mnemonic"), Some(vec!["SANT", "S92"]));
    }

    #[test]
    fn test_decode_custom_delimiter_and_quotes() {
        let body = "name;note\n\"Doe; Jane\";\"said \"\"hi\"\"\"\n";
        let table = decode(body.as_bytes(), &CsvOptions::new(b';')).unwrap();
        assert_eq!(table.rows()[0], vec!["Doe; Jane", "said \"hi\""]);
    }

    #[test]
    fn test_decode_header_only() {
        let table = decode(b"a,b\n", &CsvOptions::default()).unwrap();
        assert_eq!(table.num_columns(), 2);
        assert!(table.is_empty());
    }

    #[test]
    fn test_decode_empty_body_is_parse_error() {
        assert!(matches!(decode(b"", &CsvOptions::default()), Err(Error::Parse(_))));
    }

    #[test]
    fn test_decode_ragged_rows_is_parse_error() {
        let result = decode(b"a,b\n1,2\n3\n", &CsvOptions::default());
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_decode_invalid_utf8_is_parse_error() {
        let result = decode(b"a,b\n\xff\xfe,1\n", &CsvOptions::default());
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_encode_quotes_delimiters() {
        let mut table = Table::new(vec!["k".into(), "v".into()]);
        table.push_row(vec!["1".into(), "a,b".into()]).unwrap();

        let body = encode(&table, &CsvOptions::default()).unwrap();
        assert_eq!(&body[..], b"k,v\n1,\"a,b\"\n");
        assert_eq!(decode(&body, &CsvOptions::default()).unwrap(), table);
    }
}
