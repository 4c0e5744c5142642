use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

/// Reads a result CSV with every column as nullable strings. Empty cells are
/// null.
pub fn read_csv_table(path: &Path) -> Result<DataFrame> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV header")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading CSV record {}", line + 1))?;
        for (idx, values) in columns.iter_mut().enumerate() {
            let value = record.get(idx).filter(|value| !value.is_empty());
            values.push(value.map(str::to_string));
        }
    }

    let columns: Vec<Column> = headers
        .iter()
        .zip(columns)
        .map(|(name, values)| Series::new(name.as_str().into(), values).into())
        .collect();
    DataFrame::new(columns).context("building input table")
}

/// Writes `df` as CSV, rendering every cell through its string form.
pub fn write_csv_table(df: &DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);

    writer.write_record(df.get_column_names().iter().map(|name| name.as_str()))?;

    let rendered: Vec<StringChunked> = df
        .get_columns()
        .iter()
        .map(|column| {
            column
                .cast(&DataType::String)
                .and_then(|column| column.str().cloned())
        })
        .collect::<PolarsResult<_>>()
        .context("rendering output columns")?;

    for idx in 0..df.height() {
        writer.write_record(
            rendered
                .iter()
                .map(|values| values.get(idx).unwrap_or_default()),
        )?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cells_read_as_null_and_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("input.csv");
        std::fs::write(
            &input,
            "CharacteristicName,ResultMeasureValue,ResultMeasure/MeasureUnitCode\npH,7.1,\nSalinity,,ppt\n",
        )
        .expect("write input");

        let df = read_csv_table(&input).expect("read");
        assert_eq!(df.height(), 2);
        let units = df
            .column("ResultMeasure/MeasureUnitCode")
            .expect("unit column")
            .str()
            .expect("strings");
        assert_eq!(units.get(0), None);
        assert_eq!(units.get(1), Some("ppt"));

        let output = dir.path().join("output.csv");
        write_csv_table(&df, &output).expect("write");
        let written = std::fs::read_to_string(&output).expect("read output");
        assert_eq!(
            written,
            "CharacteristicName,ResultMeasureValue,ResultMeasure/MeasureUnitCode\npH,7.1,\nSalinity,,ppt\n"
        );
    }
}
