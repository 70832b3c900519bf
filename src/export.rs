use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::parser::extract::EventRecord;

const COLUMNS: &[&str] = &[
    "title",
    "description",
    "event_date",
    "location",
    "category",
    "significance",
    "leader",
    "participants",
    "results",
    "source",
];

pub struct ExportPaths {
    pub csv: PathBuf,
    pub json: PathBuf,
}

/// Drop records whose description was already seen, then order
/// chronologically. The sort is stable, so ties keep collection order.
pub fn finalize(events: Vec<EventRecord>) -> Vec<EventRecord> {
    let mut seen = HashSet::new();
    let mut unique: Vec<EventRecord> = events
        .into_iter()
        .filter(|e| seen.insert(e.description.clone()))
        .collect();
    unique.sort_by_key(|e| e.sort_year);
    unique
}

/// `<prefix>_<YYYYmmdd_HHMMSS>` for the given moment.
pub fn file_stem(prefix: &str, at: &DateTime<Local>) -> String {
    format!("{}_{}", prefix, at.format("%Y%m%d_%H%M%S"))
}

/// Write both files into `dir`, which is created if missing.
pub fn write_all(
    events: &[EventRecord],
    dir: &Path,
    prefix: &str,
    at: &DateTime<Local>,
) -> Result<ExportPaths> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let stem = file_stem(prefix, at);
    let paths = ExportPaths {
        csv: dir.join(format!("{stem}.csv")),
        json: dir.join(format!("{stem}.json")),
    };
    write_csv(events, &paths.csv)?;
    write_json(events, &paths.json)?;
    Ok(paths)
}

pub fn write_csv(events: &[EventRecord], path: &Path) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{}", COLUMNS.join(","))?;
    for e in events {
        let fields: [&str; 10] = [
            &e.title,
            &e.description,
            &e.event_date,
            &e.location,
            &e.category,
            e.significance.label(),
            &e.leader,
            &e.participants,
            &e.results,
            &e.source,
        ];
        let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        writeln!(out, "{}", line.join(","))?;
    }
    out.flush()?;
    Ok(())
}

/// Quote only when the value would otherwise break the row.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn write_json(events: &[EventRecord], path: &Path) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    events.serialize(&mut ser)?;
    out.flush()?;
    Ok(())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract::{extract_event, SortYear};
    use crate::parser::lexicon::Lexicon;
    use chrono::TimeZone;

    fn record(fragment: &str, topic: &str) -> EventRecord {
        extract_event(fragment, topic, Lexicon::builtin())
    }

    #[test]
    fn finalize_dedups_then_sorts() {
        let events = vec![
            record("1878 Освобождение", "Княжество_България"),
            record("Без дата", "Княжество_България"),
            record("681 г. Основаване на държавата", "Първа_българска_държава"),
            // same description, different date: first one kept
            record("1879 Освобождение", "Княжество_България"),
            record("146 пр.н.е. Тракийски племена", "История_на_България"),
        ];
        let out = finalize(events);
        let dates: Vec<_> = out.iter().map(|e| e.event_date.as_str()).collect();
        assert_eq!(dates, vec!["146 пр.н.е.", "681 г.", "1878", "Неопределена дата"]);
        assert_eq!(out.last().map(|e| e.sort_year), Some(SortYear::Undated));
    }

    #[test]
    fn finalize_is_stable_for_equal_keys() {
        let out = finalize(vec![
            record("Второ", "А"),
            record("Първо", "А"),
            record("1000 Трето", "А"),
        ]);
        let descs: Vec<_> = out.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(descs, vec!["Трето", "Второ", "Първо"]);
    }

    #[test]
    fn csv_quoting() {
        assert_eq!(csv_field("просто"), "просто");
        assert_eq!(csv_field("България, Византия"), "\"България, Византия\"");
        assert_eq!(csv_field("т.нар. \"Златен век\""), "\"т.нар. \"\"Златен век\"\"\"");
        assert_eq!(csv_field("ред\nдруг"), "\"ред\nдруг\"");
    }

    #[test]
    fn file_names_carry_timestamp() {
        let at = Local.with_ymd_and_hms(2024, 3, 3, 9, 5, 7).unwrap();
        assert_eq!(file_stem("събития", &at), "събития_20240303_090507");
    }

    #[test]
    fn writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let at = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let events = finalize(vec![
            record("681 г. Образуване на България след подписване на договор с Византия.", "Първа_българска_държава"),
            record("Борис I приема християнството като държавна религия.", "Първа_българска_държава"),
        ]);
        let paths = write_all(&events, &dir.path().join("out"), "български_исторически_събития", &at).unwrap();

        let csv = std::fs::read_to_string(&paths.csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "title,description,event_date,location,category,significance,leader,participants,results,source"
        );
        assert!(lines.next().unwrap().contains("\"България, Византия\""));
        assert_eq!(csv.lines().count(), 3);

        let json = std::fs::read_to_string(&paths.json).unwrap();
        assert!(json.contains("\n    {\n        \"title\""));
        assert!(json.contains("Неопределена дата"));
        assert!(!json.contains("sort_year"));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[0]["significance"], "Средна");
        assert!(paths.csv.file_name().unwrap().to_string_lossy().ends_with("_20240102_030405.csv"));
    }

    #[test]
    fn empty_set_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.csv");
        write_csv(&[], &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);
        let jpath = dir.path().join("e.json");
        write_json(&[], &jpath).unwrap();
        assert_eq!(std::fs::read_to_string(&jpath).unwrap(), "[]");
    }
}
