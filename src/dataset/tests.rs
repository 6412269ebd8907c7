use crate::dataset::{toy1, Dataset, DownloadArgs, Name, Source, Sources};
use crate::dataset::{CaseCount, Detection, LineageCount};
use crate::utils::read_table;

use color_eyre::eyre::{Report, Result};
use indoc::indoc;
use std::collections::BTreeMap;

#[test]
fn read_weekly_surveillance_layout() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("weekly_lineages.tsv");
    let text = indoc! {"
        WeekEndDate\tLTLA\tLineage\tCount
        2021-05-08\tE06000001\tB.1.617.2\t4
        2021-05-08\tE06000002\tB.1.617.2\t2
    "};
    std::fs::write(&path, text)?;

    let rows: Vec<LineageCount> = read_table(&path)?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].date.to_string(), "2021-05-08");
    assert_eq!(rows[1].lineage, "B.1.617.2");
    assert_eq!(rows[1].count, 2);
    Ok(())
}

#[test]
fn read_detection_flags() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("regional_detections.csv");
    let text = indoc! {"
        phec_name,sample_date,detected
        London,2021-05-01,TRUE
        London,2021-05-01,false
        North West,2021-05-02,1
        North West,2021-05-02,no
    "};
    std::fs::write(&path, text)?;

    let rows: Vec<Detection> = read_table(&path)?;
    let flags: Vec<_> = rows.iter().map(|row| row.detected).collect();
    assert_eq!(flags, vec![true, false, true, false]);
    assert_eq!(rows[2].region, "North West");

    std::fs::write(&path, "region,date,detected\nLondon,2021-05-01,maybe\n")?;
    assert!(read_table::<Detection, _>(&path).is_err());
    Ok(())
}

#[test]
fn read_government_cases() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cases.csv");
    let text = indoc! {"
        areaCode,areaName,areaType,date,newCasesBySpecimenDate,newCasesBySpecimenDateRollingAverage
        E92000001,England,nation,2021-06-02,5000,4800.4
        E92000001,England,nation,2021-06-01,4500,
    "};
    std::fs::write(&path, text)?;

    let rows: Vec<CaseCount> = read_table(&path)?;
    assert_eq!(rows[0].cases, 5000);
    assert_eq!(rows[0].cases_avg, Some(4800.4));
    assert_eq!(rows[1].cases_avg, None);
    Ok(())
}

#[test]
#[cfg(feature = "download")]
fn download_toy1() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let args = DownloadArgs { name: Name::Toy1, output_dir: dir.path().into(), sources: None };
    let sources = tokio_test::block_on(Dataset::download(&args))?;
    assert!(sources.files.values().all(|file| file.url.is_none() && file.date_created.is_some()));

    let dataset = Dataset::read(&dir.path())?;
    assert_eq!(dataset.sources, sources);
    assert_eq!(dataset.weekly_lineages.len(), toy1::WEEKS as usize * 4);
    assert_eq!(dataset.cases.len(), dataset.daily_sequences.len() / 4);
    assert!(dataset.regional_detections.iter().any(|d| d.detected));
    assert_eq!(dataset.cases[0].cases_avg, None);
    assert!(dataset.cases[6].cases_avg.is_some());
    Ok(())
}

#[test]
#[cfg(feature = "download")]
fn download_missing_url() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("input.json");
    let mut sources = Sources::new(Name::England);
    sources.files = BTreeMap::new();
    sources.write(&path)?;

    let output_dir = dir.path().join("england");
    let args = DownloadArgs { name: Name::England, output_dir, sources: Some(path) };
    let result = tokio_test::block_on(Dataset::download(&args));
    let error = result.unwrap_err().to_string();
    assert!(error.contains(&Source::WeeklyLineages.to_string()));
    Ok(())
}

#[test]
fn read_missing_sources() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    assert!(Dataset::read(&dir.path()).is_err());
    Ok(())
}
