use crate::messages;
use crate::workflow::{CandidateItem, MediaKind, Season};
use serde_json::Value;
use std::time::Duration;

pub const LIBRARY_BATCH_LINES: usize = 50;
pub const LIBRARY_BATCH_DELAY: Duration = Duration::from_millis(200);

pub fn catalog_url(media: MediaKind, catalog_id: i64) -> String {
    match media {
        MediaKind::Series => format!("http://thetvdb.com/?tab=series&id={catalog_id}"),
        MediaKind::Movie => format!("https://www.themoviedb.org/movie/{catalog_id}"),
    }
}

/// Builds a candidate from one lookup result. Returns `None` when the entry
/// lacks the external catalog id, which makes it unaddable anyway.
pub fn candidate_from_value(media: MediaKind, index: usize, value: &Value) -> Option<CandidateItem> {
    let catalog_id = value.get(media.catalog_id_key())?.as_i64()?;
    let title = value.get("title")?.as_str()?.to_string();
    let year = value
        .get("year")
        .and_then(Value::as_i64)
        .filter(|year| *year > 0);
    let label = match year {
        Some(year) => format!("{title} - {year}"),
        None => title.clone(),
    };
    let poster_url = value
        .get("images")
        .and_then(Value::as_array)
        .and_then(|images| {
            images.iter().find(|image| {
                image.get("coverType").and_then(Value::as_str) == Some("poster")
            })
        })
        .and_then(|image| image.get("url").and_then(Value::as_str))
        .map(str::to_string);
    let seasons = value
        .get("seasons")
        .cloned()
        .and_then(|raw| serde_json::from_value::<Vec<Season>>(raw).ok())
        .unwrap_or_default();

    Some(CandidateItem {
        id: index + 1,
        title,
        plot: value
            .get("overview")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        year,
        catalog_id,
        title_slug: value
            .get("titleSlug")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        poster_url,
        seasons,
        label,
    })
}

/// Message body for a lookup result set: count header, one deep-linked row
/// per candidate, select-from-menu footer.
pub fn lookup_response(media: MediaKind, candidates: &[CandidateItem]) -> String {
    let mut lines = vec![messages::found_items(candidates.len(), media.noun())];
    for candidate in candidates {
        lines.push(format!(
            "➸ [{}]({})",
            candidate.label,
            catalog_url(media, candidate.catalog_id)
        ));
    }
    lines.push(messages::SELECT_FROM_MENU.to_string());
    lines.join("\n")
}

/// Markdown row for one library entry.
pub fn library_line(media: MediaKind, title: &str, catalog_id: i64, year: Option<i64>) -> String {
    let link = format!("[{title}]({})", catalog_url(media, catalog_id));
    match year {
        Some(year) => format!("{link} - _{year}_"),
        None => link,
    }
}

/// Splits a library listing into transport batches: the full list is sorted,
/// chunked to at most 50 lines, and every batch is sorted again on its own.
pub fn library_batches(mut lines: Vec<String>) -> Vec<Vec<String>> {
    lines.sort();
    let mut batches: Vec<Vec<String>> = lines
        .chunks(LIBRARY_BATCH_LINES)
        .map(|chunk| chunk.to_vec())
        .collect();
    for batch in &mut batches {
        batch.sort();
    }
    batches
}

/// Keyboard rows of at most two labels to minimize scrolling.
pub fn two_per_row(labels: &[String]) -> Vec<Vec<String>> {
    labels.chunks(2).map(|chunk| chunk.to_vec()).collect()
}

/// One label per row; used for candidate titles and free-form folder paths.
pub fn one_per_row(labels: &[String]) -> Vec<Vec<String>> {
    labels.iter().map(|label| vec![label.clone()]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lookup_entry() -> Value {
        json!({
            "title": "Twin Peaks",
            "overview": "A town with a secret.",
            "year": 1990,
            "tvdbId": 70533,
            "titleSlug": "twin-peaks",
            "images": [
                { "coverType": "banner", "url": "http://img/banner.jpg" },
                { "coverType": "poster", "url": "http://img/poster.jpg" }
            ],
            "seasons": [
                { "seasonNumber": 0, "monitored": false },
                { "seasonNumber": 1, "monitored": true }
            ]
        })
    }

    #[test]
    fn candidate_captures_poster_and_seasons() {
        let candidate =
            candidate_from_value(MediaKind::Series, 0, &lookup_entry()).expect("candidate");
        assert_eq!(candidate.id, 1);
        assert_eq!(candidate.label, "Twin Peaks - 1990");
        assert_eq!(candidate.poster_url.as_deref(), Some("http://img/poster.jpg"));
        assert_eq!(candidate.seasons.len(), 2);
        assert_eq!(candidate.catalog_id, 70533);
    }

    #[test]
    fn candidate_without_poster_cover_has_none() {
        let mut entry = lookup_entry();
        entry["images"] = json!([{ "coverType": "banner", "url": "http://img/banner.jpg" }]);
        let candidate =
            candidate_from_value(MediaKind::Series, 0, &entry).expect("candidate");
        assert!(candidate.poster_url.is_none());
    }

    #[test]
    fn candidate_without_catalog_id_is_skipped() {
        let mut entry = lookup_entry();
        entry.as_object_mut().expect("object").remove("tvdbId");
        assert!(candidate_from_value(MediaKind::Series, 0, &entry).is_none());
    }

    #[test]
    fn movie_candidates_use_tmdb() {
        let entry = json!({ "title": "Heat", "year": 1995, "tmdbId": 949, "titleSlug": "heat" });
        let candidate = candidate_from_value(MediaKind::Movie, 2, &entry).expect("candidate");
        assert_eq!(candidate.id, 3);
        assert!(catalog_url(MediaKind::Movie, candidate.catalog_id).contains("themoviedb.org"));
    }

    #[test]
    fn library_batches_split_at_fifty_sorted_lines() {
        let lines: Vec<String> = (0..120).map(|i| format!("title {i:03}")).collect();
        let batches = library_batches(lines);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 50);
        assert_eq!(batches[1].len(), 50);
        assert_eq!(batches[2].len(), 20);
        for batch in &batches {
            let mut sorted = batch.clone();
            sorted.sort();
            assert_eq!(&sorted, batch);
        }
        assert_eq!(batches[0][0], "title 000");
        assert_eq!(batches[2][19], "title 119");
    }

    #[test]
    fn keyboard_rows_hold_at_most_two_labels() {
        let labels: Vec<String> = ["future", "all", "none", "latest", "first"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = two_per_row(&labels);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["future", "all"]);
        assert_eq!(rows[2], vec!["first"]);

        let rows = one_per_row(&labels[..2]);
        assert_eq!(rows, vec![vec!["future".to_string()], vec!["all".to_string()]]);
    }

    #[test]
    fn lookup_response_links_each_candidate() {
        let candidate =
            candidate_from_value(MediaKind::Series, 0, &lookup_entry()).expect("candidate");
        let body = lookup_response(MediaKind::Series, std::slice::from_ref(&candidate));
        assert!(body.starts_with("*Found 1 series*"));
        assert!(body.contains("➸ [Twin Peaks - 1990](http://thetvdb.com/?tab=series&id=70533)"));
    }
}
