use crate::domain::model::{DayTally, DATE_FORMAT};
use crate::utils::error::Result;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
struct TallyRow {
    date: String,
    morning: u32,
    evening: u32,
}

pub fn write_tally_csv<W: Write>(days: &[DayTally], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for day in days {
        csv_writer.serialize(TallyRow {
            date: day.date.format(DATE_FORMAT).to_string(),
            morning: day.morning,
            evening: day.evening,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn export_tally_csv<P: AsRef<Path>>(days: &[DayTally], path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(&path)?;
    write_tally_csv(days, file)?;
    tracing::debug!("Tally written to {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn days() -> Vec<DayTally> {
        vec![
            DayTally {
                date: NaiveDate::from_ymd_opt(2025, 8, 27).unwrap(),
                morning: 2,
                evening: 0,
            },
            DayTally {
                date: NaiveDate::from_ymd_opt(2025, 8, 28).unwrap(),
                morning: 0,
                evening: 5,
            },
        ]
    }

    #[test]
    fn test_csv_layout() {
        let mut buf = Vec::new();
        write_tally_csv(&days(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "date,morning,evening\n2025-08-27,2,0\n2025-08-28,0,5\n"
        );
    }

    #[test]
    fn test_export_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("reports").join("tally.csv");
        export_tally_csv(&days(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("date,morning,evening"));
    }
}
