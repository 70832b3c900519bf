use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::parser::extract::EventRecord;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS topics (
            id         INTEGER PRIMARY KEY,
            topic      TEXT UNIQUE NOT NULL,
            lang       TEXT NOT NULL,
            visited    BOOLEAN NOT NULL DEFAULT 0,
            visited_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_topics_visited ON topics(visited);

        CREATE TABLE IF NOT EXISTS page_data (
            id         INTEGER PRIMARY KEY,
            topic_id   INTEGER NOT NULL REFERENCES topics(id),
            topic      TEXT NOT NULL,
            lang       TEXT NOT NULL,
            html       TEXT,
            error      TEXT,
            latency_ms INTEGER,
            fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_page_data_topic ON page_data(topic_id);

        -- Last exported record set, in export order
        CREATE TABLE IF NOT EXISTS events (
            position     INTEGER PRIMARY KEY,
            title        TEXT NOT NULL,
            description  TEXT NOT NULL,
            event_date   TEXT NOT NULL,
            location     TEXT NOT NULL,
            category     TEXT NOT NULL,
            significance TEXT NOT NULL CHECK(significance IN ('Висока','Средна','Ниска')),
            leader       TEXT NOT NULL,
            participants TEXT NOT NULL,
            results      TEXT NOT NULL,
            source       TEXT NOT NULL,
            sort_year    INTEGER,
            sort_kind    TEXT NOT NULL,
            processed_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_events_category ON events(category);
        ",
    )?;
    Ok(())
}

// ── Topic queue ──

pub fn insert_topics(conn: &Connection, topics: &[&str], lang: &str) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare("INSERT OR IGNORE INTO topics (topic, lang) VALUES (?1, ?2)")?;
        for topic in topics {
            count += stmt.execute(rusqlite::params![topic, lang])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub struct TopicRow {
    pub id: i64,
    pub topic: String,
    pub lang: String,
}

pub fn fetch_unvisited(conn: &Connection, limit: Option<usize>) -> Result<Vec<TopicRow>> {
    let sql = match limit {
        Some(n) => format!(
            "SELECT id, topic, lang FROM topics WHERE visited = 0 ORDER BY id LIMIT {}",
            n
        ),
        None => "SELECT id, topic, lang FROM topics WHERE visited = 0 ORDER BY id".to_string(),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(TopicRow {
                id: row.get(0)?,
                topic: row.get(1)?,
                lang: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Put every topic back in the queue.
pub fn reset_visited(conn: &Connection) -> Result<usize> {
    let n = conn.execute(
        "UPDATE topics SET visited = 0, visited_at = NULL WHERE visited = 1",
        [],
    )?;
    Ok(n)
}

// ── Fetching ──

pub struct FetchRow {
    pub topic_id: i64,
    pub topic: String,
    pub lang: String,
    pub html: Option<String>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
}

/// Record one fetch attempt and mark its topic visited.
pub fn save_fetch(conn: &Connection, row: &FetchRow) -> Result<()> {
    let mut insert = conn.prepare_cached(
        "INSERT INTO page_data (topic_id, topic, lang, html, error, latency_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    insert.execute(rusqlite::params![
        row.topic_id, row.topic, row.lang, row.html, row.error, row.latency_ms,
    ])?;
    let mut update = conn.prepare_cached(
        "UPDATE topics SET visited = 1, visited_at = datetime('now') WHERE id = ?1",
    )?;
    update.execute(rusqlite::params![row.topic_id])?;
    Ok(())
}

// ── Processing ──

pub struct FetchedPage {
    pub topic: String,
    pub html: String,
}

/// Markup of every topic whose latest fetch succeeded, in topic order.
///
/// A topic whose most recent attempt failed is skipped even when an older
/// attempt stored markup.
pub fn fetch_pages(conn: &Connection) -> Result<Vec<FetchedPage>> {
    let mut stmt = conn.prepare(
        "SELECT t.topic, pd.html
         FROM topics t
         JOIN page_data pd ON pd.id = (
             SELECT MAX(id) FROM page_data WHERE topic_id = t.id
         )
         WHERE pd.html IS NOT NULL
         ORDER BY t.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(FetchedPage {
                topic: row.get(0)?,
                html: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Replace the stored record set with `events`, keeping their order.
pub fn save_events(conn: &Connection, events: &[EventRecord]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        tx.execute("DELETE FROM events", [])?;
        let mut stmt = tx.prepare(
            "INSERT INTO events
             (position, title, description, event_date, location, category, significance,
              leader, participants, results, source, sort_year, sort_kind)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
        )?;
        for (i, e) in events.iter().enumerate() {
            stmt.execute(rusqlite::params![
                i as i64 + 1,
                e.title,
                e.description,
                e.event_date,
                e.location,
                e.category,
                e.significance.label(),
                e.leader,
                e.participants,
                e.results,
                e.source,
                e.sort_year.year(),
                e.sort_year.kind(),
            ])?;
        }
    }
    tx.commit()?;
    Ok(events.len())
}

// ── Overview ──

pub struct OverviewRow {
    pub event_date: String,
    pub title: String,
    pub category: String,
    pub significance: String,
    pub location: String,
    pub source: String,
}

/// Filters for the overview table. `None` means no restriction.
#[derive(Debug, Default)]
pub struct OverviewFilter<'a> {
    pub category: Option<&'a str>,
    pub significance: Option<&'a str>,
    /// Exact location label.
    pub location: Option<&'a str>,
    /// Inclusive year bounds; undated and unresolved events never match.
    pub from_year: Option<i64>,
    pub to_year: Option<i64>,
    /// Substring of the title or the description.
    pub search: Option<&'a str>,
    pub by_title: bool,
}

pub fn fetch_overview(
    conn: &Connection,
    filter: &OverviewFilter,
    limit: usize,
) -> Result<Vec<OverviewRow>> {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(c) = filter.category {
        conditions.push(format!("category = ?{}", params.len() + 1));
        params.push(Box::new(c.to_string()));
    }
    if let Some(s) = filter.significance {
        conditions.push(format!("significance = ?{}", params.len() + 1));
        params.push(Box::new(s.to_string()));
    }
    if let Some(l) = filter.location {
        conditions.push(format!("location = ?{}", params.len() + 1));
        params.push(Box::new(l.to_string()));
    }
    if let Some(y) = filter.from_year {
        conditions.push(format!("sort_year >= ?{}", params.len() + 1));
        params.push(Box::new(y));
    }
    if let Some(y) = filter.to_year {
        conditions.push(format!("sort_year <= ?{}", params.len() + 1));
        params.push(Box::new(y));
    }
    if let Some(q) = filter.search {
        let n = params.len() + 1;
        conditions.push(format!("(title LIKE ?{n} OR description LIKE ?{n})"));
        params.push(Box::new(format!("%{}%", q)));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let order = if filter.by_title { "title, position" } else { "position" };

    let sql = format!(
        "SELECT event_date, title, category, significance, location, source
         FROM events{}
         ORDER BY {}
         LIMIT {}",
        where_clause, order, limit
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(OverviewRow {
                event_date: row.get(0)?,
                title: row.get(1)?,
                category: row.get(2)?,
                significance: row.get(3)?,
                location: row.get(4)?,
                source: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub topics: usize,
    pub visited: usize,
    pub unvisited: usize,
    pub fetched: usize,
    pub errors: usize,
    pub events: usize,
    pub by_category: Vec<(String, usize)>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let topics: usize = conn.query_row("SELECT COUNT(*) FROM topics", [], |r| r.get(0))?;
    let visited: usize =
        conn.query_row("SELECT COUNT(*) FROM topics WHERE visited = 1", [], |r| r.get(0))?;
    let fetched: usize = conn.query_row(
        "SELECT COUNT(*) FROM page_data WHERE html IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let errors: usize = conn.query_row(
        "SELECT COUNT(*) FROM page_data WHERE error IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let events: usize = conn.query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))?;

    let mut stmt = conn.prepare(
        "SELECT category, COUNT(*) AS n FROM events GROUP BY category ORDER BY n DESC, category",
    )?;
    let by_category = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Stats {
        topics,
        visited,
        unvisited: topics - visited,
        fetched,
        errors,
        events,
        by_category,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract::extract_event;
    use crate::parser::lexicon::Lexicon;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn fetch_row(topic: &TopicRow, html: Option<&str>, error: Option<&str>) -> FetchRow {
        FetchRow {
            topic_id: topic.id,
            topic: topic.topic.clone(),
            lang: topic.lang.clone(),
            html: html.map(String::from),
            error: error.map(String::from),
            latency_ms: Some(12),
        }
    }

    #[test]
    fn topics_are_queued_once() {
        let conn = memory_db();
        assert_eq!(insert_topics(&conn, &["А", "Б"], "bg").unwrap(), 2);
        assert_eq!(insert_topics(&conn, &["Б", "В"], "bg").unwrap(), 1);
        let queued = fetch_unvisited(&conn, None).unwrap();
        let names: Vec<_> = queued.iter().map(|t| t.topic.as_str()).collect();
        assert_eq!(names, vec!["А", "Б", "В"]);
        assert_eq!(fetch_unvisited(&conn, Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn fetch_marks_visited_and_reset_requeues() {
        let conn = memory_db();
        insert_topics(&conn, &["А", "Б"], "bg").unwrap();
        let queued = fetch_unvisited(&conn, None).unwrap();
        save_fetch(&conn, &fetch_row(&queued[0], Some("<p>x</p>"), None)).unwrap();
        save_fetch(&conn, &fetch_row(&queued[1], None, Some("missingtitle"))).unwrap();

        assert!(fetch_unvisited(&conn, None).unwrap().is_empty());
        let s = get_stats(&conn).unwrap();
        assert_eq!((s.topics, s.visited, s.unvisited), (2, 2, 0));
        assert_eq!((s.fetched, s.errors), (1, 1));

        assert_eq!(reset_visited(&conn).unwrap(), 2);
        assert_eq!(fetch_unvisited(&conn, None).unwrap().len(), 2);
    }

    #[test]
    fn pages_use_latest_markup_in_topic_order() {
        let conn = memory_db();
        insert_topics(&conn, &["Първа", "Втора", "Трета"], "bg").unwrap();
        let queued = fetch_unvisited(&conn, None).unwrap();
        save_fetch(&conn, &fetch_row(&queued[1], Some("old"), None)).unwrap();
        save_fetch(&conn, &fetch_row(&queued[0], Some("first"), None)).unwrap();
        save_fetch(&conn, &fetch_row(&queued[1], Some("new"), None)).unwrap();
        save_fetch(&conn, &fetch_row(&queued[1], None, Some("timeout"))).unwrap();
        save_fetch(&conn, &fetch_row(&queued[2], None, Some("missingtitle"))).unwrap();

        let pages = fetch_pages(&conn).unwrap();
        let got: Vec<_> = pages.iter().map(|p| (p.topic.as_str(), p.html.as_str())).collect();
        // Втора's last attempt timed out, so its older markup is not used
        assert_eq!(got, vec![("Първа", "first")]);
    }

    #[test]
    fn refetch_after_failure_restores_page() {
        let conn = memory_db();
        insert_topics(&conn, &["Първа"], "bg").unwrap();
        let queued = fetch_unvisited(&conn, None).unwrap();
        save_fetch(&conn, &fetch_row(&queued[0], None, Some("timeout"))).unwrap();
        assert!(fetch_pages(&conn).unwrap().is_empty());

        save_fetch(&conn, &fetch_row(&queued[0], Some("fresh"), None)).unwrap();
        let pages = fetch_pages(&conn).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].html, "fresh");
    }

    #[test]
    fn events_replace_and_filter() {
        let conn = memory_db();
        let lex = Lexicon::builtin();
        let events = vec![
            extract_event("681 г. Образуване на България", "Първа_българска_държава", lex),
            extract_event("917 Битка при Ахелой", "Първа_българска_държава", lex),
            extract_event("Нещо без дата", "Първа_българска_държава", lex),
        ];
        save_events(&conn, &events).unwrap();
        save_events(&conn, &events).unwrap();

        let all = fetch_overview(&conn, &OverviewFilter::default(), 50).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].event_date, "681 г.");

        let battles = fetch_overview(
            &conn,
            &OverviewFilter {
                category: Some("Война/Битка"),
                ..Default::default()
            },
            50,
        )
        .unwrap();
        assert_eq!(battles.len(), 1);
        assert_eq!(battles[0].event_date, "917");

        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.events, 3);
        assert!(stats.by_category.iter().any(|(c, n)| c == "Война/Битка" && *n == 1));

        let undated_kind: String = conn
            .query_row("SELECT sort_kind FROM events WHERE position = 3", [], |r| r.get(0))
            .unwrap();
        assert_eq!(undated_kind, "undated");
    }

    fn overview_events(conn: &Connection) {
        let lex = Lexicon::builtin();
        let topic = "Първа_българска_държава";
        let events = vec![
            extract_event("681 г. Образуване на България", topic, lex),
            extract_event("917 Битка при Ахелой", topic, lex),
            extract_event("1018 Византия завладява България", topic, lex),
            extract_event("Въстание в Търново", topic, lex),
        ];
        save_events(conn, &events).unwrap();
    }

    fn dates(rows: &[OverviewRow]) -> Vec<&str> {
        rows.iter().map(|r| r.event_date.as_str()).collect()
    }

    #[test]
    fn overview_by_location() {
        let conn = memory_db();
        overview_events(&conn);
        let rows = fetch_overview(
            &conn,
            &OverviewFilter {
                location: Some("Търново"),
                ..Default::default()
            },
            50,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].location, "Търново");
    }

    #[test]
    fn overview_by_year_range_is_inclusive_and_skips_undated() {
        let conn = memory_db();
        overview_events(&conn);
        let filter = OverviewFilter {
            from_year: Some(681),
            to_year: Some(917),
            ..Default::default()
        };
        let rows = fetch_overview(&conn, &filter, 50).unwrap();
        assert_eq!(dates(&rows), vec!["681 г.", "917"]);

        let open_ended = OverviewFilter {
            from_year: Some(900),
            ..Default::default()
        };
        let rows = fetch_overview(&conn, &open_ended, 50).unwrap();
        assert_eq!(dates(&rows), vec!["917", "1018"]);
    }

    #[test]
    fn overview_search_matches_title_or_description() {
        let conn = memory_db();
        overview_events(&conn);
        let filter = OverviewFilter {
            search: Some("Ахелой"),
            ..Default::default()
        };
        let rows = fetch_overview(&conn, &filter, 50).unwrap();
        assert_eq!(dates(&rows), vec!["917"]);

        let filter = OverviewFilter {
            search: Some("Никъде"),
            ..Default::default()
        };
        assert!(fetch_overview(&conn, &filter, 50).unwrap().is_empty());
    }

    #[test]
    fn overview_sorted_by_title() {
        let conn = memory_db();
        overview_events(&conn);
        let filter = OverviewFilter {
            by_title: true,
            ..Default::default()
        };
        let rows = fetch_overview(&conn, &filter, 50).unwrap();
        let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
        let mut sorted = titles.clone();
        sorted.sort_unstable();
        assert_eq!(titles, sorted);
        assert_eq!(rows.len(), 4);
    }
}
