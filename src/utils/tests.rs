use crate::utils::{read_table, write_table};
use color_eyre::eyre::{Report, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Deserialize, PartialEq, Serialize)]
struct Row {
    date: String,
    count: u64,
}

#[test]
fn write_then_read_tsv() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested/rows.tsv");
    let rows = vec![
        Row { date: "2021-05-01".to_string(), count: 3 },
        Row { date: "2021-05-08".to_string(), count: 7 },
    ];
    write_table(&rows, &path)?;

    let text = std::fs::read_to_string(&path)?;
    assert_eq!(text, "date\tcount\n2021-05-01\t3\n2021-05-08\t7\n");
    assert_eq!(read_table::<Row, _>(&path)?, rows);
    Ok(())
}

#[test]
fn read_compressed_csv() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("rows.csv.zst");
    let compressed = zstd::stream::encode_all("date,count,extra\n2021-05-01, 3 ,x\n".as_bytes(), 0)?;
    std::fs::File::create(&path)?.write_all(&compressed)?;

    let rows: Vec<Row> = read_table(&path)?;
    assert_eq!(rows, vec![Row { date: "2021-05-01".to_string(), count: 3 }]);
    Ok(())
}

#[test]
fn read_reports_line() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("rows.csv");
    std::fs::write(&path, "date,count\n2021-05-01,3\n2021-05-08,many\n")?;

    let error = read_table::<Row, _>(&path).unwrap_err();
    assert!(error.to_string().contains("line 3"));
    Ok(())
}
