use crate::api::MediaServer;
use crate::messages;
use crate::telegram::{ChatTransport, ReplyMarkup};
use crate::workflow::render::{library_batches, library_line, LIBRARY_BATCH_DELAY};
use crate::workflow::{MediaKind, WorkflowError};
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use serde_json::{json, Value};

/// Library browsing and maintenance commands. These never touch the session
/// cache; each call is a complete request/response exchange.
pub struct LibraryOps<'a, B: MediaServer, C: ChatTransport> {
    backend: &'a B,
    chat: &'a C,
    chat_id: i64,
}

impl<'a, B: MediaServer, C: ChatTransport> LibraryOps<'a, B, C> {
    pub fn new(backend: &'a B, chat: &'a C, chat_id: i64) -> Self {
        Self {
            backend,
            chat,
            chat_id,
        }
    }

    /// Lists the tracked series library, optionally filtered by a
    /// case-insensitive substring. Large listings are paginated for the
    /// transport: batches of at most 50 sorted lines, each batch delayed to
    /// stay under chat rate limits.
    pub fn library_search(&self, query: Option<&str>) -> Result<(), WorkflowError> {
        let result = self.backend.get(MediaKind::Series.list_path(), &[])?;
        let needle = query.map(str::to_lowercase);

        let mut lines = Vec::new();
        for entry in result.as_array().map(Vec::as_slice).unwrap_or_default() {
            let Some(title) = entry.get("title").and_then(Value::as_str) else {
                continue;
            };
            if let Some(needle) = &needle {
                if !title.to_lowercase().contains(needle) {
                    continue;
                }
            }
            let catalog_id = entry.get("tvdbId").and_then(Value::as_i64).unwrap_or(0);
            let year = entry.get("year").and_then(Value::as_i64).filter(|y| *y > 0);
            lines.push(library_line(MediaKind::Series, title, catalog_id, year));
        }

        if lines.is_empty() {
            return Err(WorkflowError::NothingFound(
                query.unwrap_or("the library").to_string(),
            ));
        }

        let mut batches = library_batches(lines);
        if query.is_some() {
            batches[0].insert(0, messages::matching_results());
        }

        let mut first = true;
        for batch in batches {
            if !first {
                std::thread::sleep(LIBRARY_BATCH_DELAY);
            }
            first = false;
            self.chat
                .send(self.chat_id, &batch.join("\n"), ReplyMarkup::None)?;
        }
        Ok(())
    }

    /// Upcoming episodes between now and now + `days`. The window is capped
    /// at a year; `ChronoDuration::days` panics on extreme values.
    pub fn upcoming(&self, days: i64) -> Result<(), WorkflowError> {
        let start = Utc::now();
        let end = start + ChronoDuration::days(days.clamp(1, 365));
        let result = self.backend.get(
            "calendar",
            &[
                ("start", start.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("end", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ],
        )?;

        let episodes = result.as_array().cloned().unwrap_or_default();
        if episodes.is_empty() {
            return Err(WorkflowError::NothingInCalendar);
        }

        let mut lines: Vec<String> = Vec::new();
        let mut last_date: Option<String> = None;
        for episode in &episodes {
            let air_date = episode
                .get("airDate")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            let title = episode
                .get("series")
                .and_then(|s| s.get("title"))
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let done = if episode.get("hasFile").and_then(Value::as_bool) == Some(true) {
                messages::episode_done_marker()
            } else {
                String::new()
            };

            // Blank line between days to break up the listing.
            if let Some(previous) = &last_date {
                if previous != &air_date {
                    lines.push(String::new());
                }
            }
            lines.push(format!("{air_date} - {title}{done}"));
            last_date = Some(air_date);
        }

        self.chat
            .send(self.chat_id, &lines.join("\n"), ReplyMarkup::None)?;
        Ok(())
    }

    pub fn rss_sync(&self) -> Result<(), WorkflowError> {
        self.backend
            .post("command", &json!({ "name": "RssSync" }))?;
        self.chat
            .send(self.chat_id, &messages::rss_executed(), ReplyMarkup::None)?;
        Ok(())
    }

    /// Kicks a search for every wanted episode: fetch the missing page, then
    /// submit one EpisodeSearch for the collected ids. The two calls are a
    /// plain sequential chain.
    pub fn wanted_search(&self) -> Result<(), WorkflowError> {
        let wanted = self.backend.get(
            "wanted/missing",
            &[
                ("page", "1".to_string()),
                ("pageSize", "50".to_string()),
                ("sortKey", "airDateUtc".to_string()),
                ("sortDir", "desc".to_string()),
            ],
        )?;
        let episode_ids: Vec<i64> = wanted
            .get("records")
            .and_then(Value::as_array)
            .map(|records| {
                records
                    .iter()
                    .filter_map(|record| record.get("id").and_then(Value::as_i64))
                    .collect()
            })
            .unwrap_or_default();

        self.backend.post(
            "command",
            &json!({ "name": "EpisodeSearch", "episodeIds": episode_ids }),
        )?;
        self.chat
            .send(self.chat_id, &messages::wanted_executed(), ReplyMarkup::None)?;
        Ok(())
    }

    pub fn refresh(&self) -> Result<(), WorkflowError> {
        self.backend
            .post("command", &json!({ "name": "RefreshSeries" }))?;
        self.chat
            .send(self.chat_id, &messages::refresh_executed(), ReplyMarkup::None)?;
        Ok(())
    }
}
