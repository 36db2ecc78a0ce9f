// crates/extract/src/parquet_codec.rs
use arrow_array::{ArrayRef, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use bytes::Bytes;
use common::{Error, Result, Table};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::sync::Arc;

/// Columns are written as nullable UTF-8; no type inference happens here.
pub fn encode(table: &Table) -> Result<Bytes> {
    let schema = Arc::new(Schema::new(
        table
            .columns()
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));

    let arrays: Vec<ArrayRef> = (0..table.num_columns())
        .map(|idx| {
            let values = table.rows().iter().map(|row| Some(row[idx].as_str()));
            Arc::new(StringArray::from_iter(values)) as ArrayRef
        })
        .collect();

    let batch = RecordBatch::try_new(schema.clone(), arrays)
        .map_err(|e| Error::Parse(format!("Failed to build record batch: {}", e)))?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, schema, Some(props))
        .map_err(|e| Error::Parse(format!("Failed to create parquet writer: {}", e)))?;
    writer
        .write(&batch)
        .map_err(|e| Error::Parse(format!("Failed to write parquet batch: {}", e)))?;
    writer
        .close()
        .map_err(|e| Error::Parse(format!("Failed to close parquet writer: {}", e)))?;

    Ok(Bytes::from(buf))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use arrow_array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    /// Read a parquet body back into a table, for assertions
    pub(crate) fn decode(body: Bytes) -> Table {
        let builder = ParquetRecordBatchReaderBuilder::try_new(body).unwrap();
        let columns: Vec<String> = builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        let mut table = Table::new(columns);

        for batch in builder.build().unwrap() {
            let batch = batch.unwrap();
            for row in 0..batch.num_rows() {
                let cells = batch
                    .columns()
                    .iter()
                    .map(|col| {
                        let col = col.as_any().downcast_ref::<StringArray>().unwrap();
                        col.value(row).to_string()
                    })
                    .collect();
                table.push_row(cells).unwrap();
            }
        }
        table
    }

    fn sample() -> Table {
        let mut table = Table::new(vec!["ISIN".into(), "EndPrice".into()]);
        table.push_row(vec!["AT0000A0E9W5".into(), "20.24".into()]).unwrap();
        table.push_row(vec!["DE000A0DJ6J9".into(), "".into()]).unwrap();
        table
    }

    #[test]
    fn test_encode_has_parquet_magic() {
        let body = encode(&sample()).unwrap();
        assert_eq!(&body[..4], b"PAR1");
        assert_eq!(&body[body.len() - 4..], b"PAR1");
    }

    #[test]
    fn test_encode_preserves_schema_and_values() {
        let table = sample();
        let decoded = decode(encode(&table).unwrap());
        assert_eq!(decoded, table);
    }

    #[test]
    fn test_encode_header_only_table() {
        let table = Table::new(vec!["a".into(), "b".into()]);
        let body = encode(&table).unwrap();

        let builder = ParquetRecordBatchReaderBuilder::try_new(body).unwrap();
        assert_eq!(builder.schema().fields().len(), 2);
        assert_eq!(builder.metadata().file_metadata().num_rows(), 0);
        assert!(builder.schema().field(0).is_nullable());
    }
}
