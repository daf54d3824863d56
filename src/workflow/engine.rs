use crate::acl::UserRecord;
use crate::api::MediaServer;
use crate::cache::{SessionCache, Slot, SlotValue};
use crate::messages;
use crate::telegram::{ChatTransport, ReplyMarkup};
use crate::workflow::render::{
    candidate_from_value, lookup_response, one_per_row, two_per_row,
};
use crate::workflow::{
    AddStep, CandidateItem, FolderChoice, MediaKind, ProfileChoice, Season, WorkflowError,
    WorkflowState,
};
use serde_json::{json, Value};

pub const MONITOR_POLICIES: [&str; 5] = ["future", "all", "none", "latest", "first"];
pub const SERIES_TYPES: [&str; 3] = ["standard", "airs daily", "anime"];

/// Preconfigured quality profile and root folder for movie adds; lets the
/// movie chain skip the profile and folder steps entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieDefaults {
    pub profile_id: i64,
    pub root_folder: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorFlags {
    pub ignore_with_files: Option<bool>,
    pub ignore_without_files: Option<bool>,
}

/// Applies a symbolic monitoring policy to the season list, returning the
/// episode-ignore flags for the creation payload.
pub fn apply_monitor_policy(
    policy: &str,
    seasons: &mut [Season],
) -> Result<MonitorFlags, WorkflowError> {
    match policy {
        "future" => Ok(MonitorFlags {
            ignore_with_files: Some(true),
            ignore_without_files: Some(true),
        }),
        "all" => {
            // Season 0 holds specials and stays unmonitored.
            for season in seasons.iter_mut() {
                season.monitored = season.season_number != 0;
            }
            Ok(MonitorFlags {
                ignore_with_files: Some(false),
                ignore_without_files: Some(false),
            })
        }
        "none" => {
            for season in seasons.iter_mut() {
                season.monitored = false;
            }
            Ok(MonitorFlags::default())
        }
        "latest" => {
            let last = seasons.iter().map(|s| s.season_number).max();
            for season in seasons.iter_mut() {
                season.monitored = Some(season.season_number) == last;
            }
            Ok(MonitorFlags::default())
        }
        "first" => {
            let first = seasons
                .iter()
                .map(|s| s.season_number)
                .filter(|n| *n != 0)
                .min();
            for season in seasons.iter_mut() {
                season.monitored = Some(season.season_number) == first;
            }
            Ok(MonitorFlags::default())
        }
        other => Err(WorkflowError::UnknownPolicy(other.to_string())),
    }
}

/// Guided multi-step add workflow, one instance per incoming message. All
/// state between messages lives in the session cache; the engine itself is
/// stateless across invocations.
pub struct AddWorkflow<'a, B: MediaServer, C: ChatTransport> {
    media: MediaKind,
    backend: &'a B,
    chat: &'a C,
    cache: &'a mut SessionCache,
    user: &'a UserRecord,
    owner: i64,
    max_results: usize,
    movie_defaults: Option<MovieDefaults>,
}

impl<'a, B: MediaServer, C: ChatTransport> AddWorkflow<'a, B, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        media: MediaKind,
        backend: &'a B,
        chat: &'a C,
        cache: &'a mut SessionCache,
        user: &'a UserRecord,
        owner: i64,
        max_results: usize,
        movie_defaults: Option<MovieDefaults>,
    ) -> Self {
        Self {
            media,
            backend,
            chat,
            cache,
            user,
            owner,
            max_results,
            movie_defaults,
        }
    }

    /// Entry point: a fresh search supersedes any workflow already in flight
    /// for this user.
    pub fn start_search(&mut self, term: &str) -> Result<(), WorkflowError> {
        self.cache.clear_user(self.user.id);

        let result = self
            .backend
            .get(self.media.lookup_path(), &[("term", term.to_string())])?;
        let entries = result.as_array().cloned().unwrap_or_default();
        let candidates: Vec<CandidateItem> = entries
            .iter()
            .take(self.max_results)
            .enumerate()
            .filter_map(|(index, entry)| candidate_from_value(self.media, index, entry))
            .collect();
        if candidates.is_empty() {
            return Err(WorkflowError::NothingFound(term.to_string()));
        }

        let body = lookup_response(self.media, &candidates);
        let labels: Vec<String> = candidates.iter().map(|c| c.label.clone()).collect();
        self.cache
            .set(self.user.id, Slot::Candidates, SlotValue::Candidates(candidates));
        self.set_state(AddStep::Confirm);
        self.send(&body, ReplyMarkup::Keyboard(one_per_row(&labels)))
    }

    pub fn handle_reply(&mut self, step: AddStep, text: &str) -> Result<(), WorkflowError> {
        match step {
            AddStep::Confirm => self.confirm_candidate(text),
            AddStep::Verify => self.verify_candidate(text),
            AddStep::Defaults => self.decide_defaults(text),
            AddStep::Profile => self.select_profile(text),
            AddStep::Monitor => self.select_monitor(text),
            AddStep::Kind => self.select_kind(text),
            AddStep::Folder => self.select_folder(text),
            AddStep::SeasonFolder => self.select_season_folder(text),
        }
    }

    fn confirm_candidate(&mut self, reply: &str) -> Result<(), WorkflowError> {
        let candidates = self.candidates()?;
        let candidate = candidates
            .iter()
            .find(|c| c.label == reply)
            .ok_or_else(|| WorkflowError::NoMatch(reply.to_string()))?
            .clone();

        // Idempotency guard right before the point of no return: abort when
        // the backend already tracks this catalog id.
        let existing = self.backend.get(self.media.list_path(), &[])?;
        let already_tracked = existing
            .as_array()
            .map(|items| {
                items.iter().any(|item| {
                    item.get(self.media.catalog_id_key()).and_then(Value::as_i64)
                        == Some(candidate.catalog_id)
                })
            })
            .unwrap_or(false);
        if already_tracked {
            return Err(WorkflowError::AlreadyTracked(candidate.title.clone()));
        }

        self.cache.set(
            self.user.id,
            Slot::SelectedCandidate,
            SlotValue::CandidateId(candidate.id),
        );
        self.prompt_verify(&candidate)
    }

    fn verify_candidate(&mut self, reply: &str) -> Result<(), WorkflowError> {
        let _ = self.selected_candidate()?;
        self.resolve_yes_no(reply)?;
        match (self.media, self.movie_defaults.clone()) {
            (MediaKind::Movie, Some(_)) => self.prompt_defaults(),
            _ => self.prompt_profiles(),
        }
    }

    fn decide_defaults(&mut self, reply: &str) -> Result<(), WorkflowError> {
        let _ = self.selected_candidate()?;
        self.resolve_yes_no(reply)?;
        let defaults = self.movie_defaults.clone().ok_or(WorkflowError::Corrupted)?;
        self.submit_movie(Some(defaults))
    }

    fn select_profile(&mut self, reply: &str) -> Result<(), WorkflowError> {
        let profiles = self.option_profiles()?;
        let profile = profiles
            .iter()
            .find(|p| p.name == reply)
            .ok_or_else(|| WorkflowError::NoMatch(reply.to_string()))?;
        self.cache.set(
            self.user.id,
            Slot::SelectedProfile,
            SlotValue::ProfileId(profile.profile_id),
        );
        match self.media {
            MediaKind::Series => self.prompt_monitors(),
            MediaKind::Movie => self.prompt_folders(),
        }
    }

    fn select_monitor(&mut self, reply: &str) -> Result<(), WorkflowError> {
        let labels = self.option_labels()?;
        let policy = labels
            .iter()
            .find(|label| label.as_str() == reply)
            .ok_or_else(|| WorkflowError::NoMatch(reply.to_string()))?
            .clone();
        self.cache
            .set(self.user.id, Slot::SelectedMonitor, SlotValue::Label(policy));
        self.prompt_kinds()
    }

    fn select_kind(&mut self, reply: &str) -> Result<(), WorkflowError> {
        let labels = self.option_labels()?;
        let kind = labels
            .iter()
            .find(|label| label.as_str() == reply)
            .ok_or_else(|| WorkflowError::NoMatch(reply.to_string()))?
            .clone();
        self.cache
            .set(self.user.id, Slot::SelectedType, SlotValue::Label(kind));
        self.prompt_folders()
    }

    fn select_folder(&mut self, reply: &str) -> Result<(), WorkflowError> {
        let folders = self.option_folders()?;
        let folder = folders
            .iter()
            .find(|f| f.path == reply)
            .ok_or_else(|| WorkflowError::NoMatch(reply.to_string()))?
            .clone();
        self.cache
            .set(self.user.id, Slot::SelectedFolder, SlotValue::Folder(folder));
        match self.media {
            MediaKind::Series => self.prompt_season_folders(),
            MediaKind::Movie => self.submit_movie(None),
        }
    }

    fn select_season_folder(&mut self, reply: &str) -> Result<(), WorkflowError> {
        let answer = self.resolve_yes_no_label(reply)?;
        self.submit_series(answer == messages::YES)
    }

    // --- prompts -----------------------------------------------------------

    fn prompt_verify(&mut self, candidate: &CandidateItem) -> Result<(), WorkflowError> {
        let mut body = match candidate.year {
            Some(year) => format!("*{} ({year})*\n", candidate.title),
            None => format!("*{}*\n", candidate.title),
        };
        if !candidate.plot.is_empty() {
            body.push_str(&format!("{}\n\n", candidate.plot));
        }
        body.push_str(&messages::is_this_correct());
        if let Some(poster) = &candidate.poster_url {
            body.push_str(&format!("\n\n[Poster!]({poster})"));
        }

        self.cache_yes_no_options();
        self.set_state(AddStep::Verify);
        let rows = one_per_row(&[messages::YES.to_string(), messages::NO.to_string()]);
        self.send(&body, ReplyMarkup::Keyboard(rows))
    }

    fn prompt_defaults(&mut self) -> Result<(), WorkflowError> {
        self.cache_yes_no_options();
        self.set_state(AddStep::Defaults);
        let rows = two_per_row(&[messages::YES.to_string(), messages::NO.to_string()]);
        self.send(&messages::use_defaults(), ReplyMarkup::Keyboard(rows))
    }

    fn prompt_profiles(&mut self) -> Result<(), WorkflowError> {
        let result = self.backend.get("profile", &[])?;
        let profiles: Vec<ProfileChoice> = result
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        Some(ProfileChoice {
                            name: entry.get("name")?.as_str()?.to_string(),
                            profile_id: entry.get("id")?.as_i64()?,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        if profiles.is_empty() {
            return Err(WorkflowError::NoProfiles);
        }

        let names: Vec<String> = profiles.iter().map(|p| p.name.clone()).collect();
        let mut lines = vec![messages::found_items(profiles.len(), "profiles")];
        lines.extend(names.iter().map(|name| format!("➸ {name}")));
        lines.push(messages::SELECT_FROM_MENU.to_string());

        self.cache
            .set(self.user.id, Slot::Options, SlotValue::Profiles(profiles));
        self.set_state(AddStep::Profile);
        self.send(&lines.join("\n"), ReplyMarkup::Keyboard(two_per_row(&names)))
    }

    fn prompt_monitors(&mut self) -> Result<(), WorkflowError> {
        let labels: Vec<String> = MONITOR_POLICIES.iter().map(|s| s.to_string()).collect();
        let mut lines = vec![messages::select_monitor_policy()];
        lines.extend(labels.iter().map(|label| format!("➸ {label}")));
        lines.push(messages::SELECT_FROM_MENU.to_string());

        self.cache
            .set(self.user.id, Slot::Options, SlotValue::Labels(labels.clone()));
        self.set_state(AddStep::Monitor);
        self.send(&lines.join("\n"), ReplyMarkup::Keyboard(two_per_row(&labels)))
    }

    fn prompt_kinds(&mut self) -> Result<(), WorkflowError> {
        let labels: Vec<String> = SERIES_TYPES.iter().map(|s| s.to_string()).collect();
        let mut lines = vec![messages::select_series_type()];
        lines.extend(labels.iter().map(|label| format!("➸ {label}")));
        lines.push(messages::SELECT_FROM_MENU.to_string());

        self.cache
            .set(self.user.id, Slot::Options, SlotValue::Labels(labels.clone()));
        self.set_state(AddStep::Kind);
        self.send(&lines.join("\n"), ReplyMarkup::Keyboard(two_per_row(&labels)))
    }

    fn prompt_folders(&mut self) -> Result<(), WorkflowError> {
        let result = self.backend.get("rootfolder", &[])?;
        let folders: Vec<FolderChoice> = result
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        Some(FolderChoice {
                            path: entry.get("path")?.as_str()?.to_string(),
                            folder_id: entry.get("id")?.as_i64()?,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        if folders.is_empty() {
            return Err(WorkflowError::NoFolders);
        }

        let paths: Vec<String> = folders.iter().map(|f| f.path.clone()).collect();
        let mut lines = vec![messages::found_items(folders.len(), "folders")];
        lines.extend(paths.iter().map(|path| format!("➸ {path}")));
        lines.push(messages::SELECT_FROM_MENU.to_string());

        self.cache
            .set(self.user.id, Slot::Options, SlotValue::Folders(folders));
        self.set_state(AddStep::Folder);
        // Folder paths are long; one per row.
        self.send(&lines.join("\n"), ReplyMarkup::Keyboard(one_per_row(&paths)))
    }

    fn prompt_season_folders(&mut self) -> Result<(), WorkflowError> {
        self.cache_yes_no_options();
        self.set_state(AddStep::SeasonFolder);
        let rows = two_per_row(&[messages::YES.to_string(), messages::NO.to_string()]);
        self.send(&messages::use_season_folders(), ReplyMarkup::Keyboard(rows))
    }

    // --- submission --------------------------------------------------------

    fn submit_series(&mut self, season_folder: bool) -> Result<(), WorkflowError> {
        let outcome = self.post_series(season_folder);
        // Guaranteed cleanup: the transaction ends here whatever happened.
        self.cache.clear_user(self.user.id);
        let title = outcome?;
        self.finish_add(&title)
    }

    fn submit_movie(&mut self, defaults: Option<MovieDefaults>) -> Result<(), WorkflowError> {
        let outcome = self.post_movie(defaults);
        self.cache.clear_user(self.user.id);
        let title = outcome?;
        self.finish_add(&title)
    }

    fn post_series(&mut self, season_folder: bool) -> Result<String, WorkflowError> {
        let candidate = self.selected_candidate()?;
        let profile_id = self.selected_profile_id()?;
        let policy = self.selected_label(Slot::SelectedMonitor)?;
        let kind = self.selected_label(Slot::SelectedType)?;
        let folder = self.selected_folder()?;

        let mut seasons = candidate.seasons.clone();
        let flags = apply_monitor_policy(&policy, &mut seasons)?;
        let series_type = if kind == "airs daily" { "daily" } else { kind.as_str() };

        let mut payload = json!({
            "tvdbId": candidate.catalog_id,
            "title": candidate.title,
            "titleSlug": candidate.title_slug,
            "rootFolderPath": folder.path,
            "seasonFolder": season_folder,
            "monitored": true,
            "seriesType": series_type,
            "qualityProfileId": profile_id,
            "images": [],
            "seasons": seasons,
        });
        if let Some(value) = flags.ignore_with_files {
            payload["ignoreEpisodesWithFiles"] = json!(value);
        }
        if let Some(value) = flags.ignore_without_files {
            payload["ignoreEpisodesWithoutFiles"] = json!(value);
        }

        let result = self.backend.post(self.media.add_path(), &payload)?;
        if result.is_null() || result == json!(false) {
            return Err(WorkflowError::AddRejected(candidate.title.clone()));
        }
        Ok(candidate.title)
    }

    fn post_movie(&mut self, defaults: Option<MovieDefaults>) -> Result<String, WorkflowError> {
        let candidate = self.selected_candidate()?;
        let (profile_id, root_folder) = match defaults {
            Some(defaults) => (defaults.profile_id, defaults.root_folder),
            None => (self.selected_profile_id()?, self.selected_folder()?.path),
        };

        let payload = json!({
            "tmdbId": candidate.catalog_id,
            "title": candidate.title,
            "titleSlug": candidate.title_slug,
            "images": [],
            "qualityProfileId": profile_id,
            "rootFolderPath": root_folder,
            "monitored": true,
            "addOptions": { "searchForMovie": true },
        });

        let result = self.backend.post(self.media.add_path(), &payload)?;
        if result.is_null() || result == json!(false) {
            return Err(WorkflowError::AddRejected(candidate.title.clone()));
        }
        Ok(candidate.title)
    }

    fn finish_add(&mut self, title: &str) -> Result<(), WorkflowError> {
        self.send(&messages::added(title), ReplyMarkup::Remove)?;
        if self.owner != 0 && self.user.id != self.owner {
            self.chat.send(
                self.owner,
                &messages::added_by(title, &self.user.display_name()),
                ReplyMarkup::Remove,
            )?;
        }
        Ok(())
    }

    // --- slot access -------------------------------------------------------

    fn candidates(&self) -> Result<Vec<CandidateItem>, WorkflowError> {
        match self.cache.get(self.user.id, Slot::Candidates) {
            Some(SlotValue::Candidates(items)) => Ok(items.clone()),
            _ => Err(WorkflowError::Corrupted),
        }
    }

    fn selected_candidate(&self) -> Result<CandidateItem, WorkflowError> {
        let id = match self.cache.get(self.user.id, Slot::SelectedCandidate) {
            Some(SlotValue::CandidateId(id)) => *id,
            _ => return Err(WorkflowError::Corrupted),
        };
        self.candidates()?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or(WorkflowError::Corrupted)
    }

    fn option_profiles(&self) -> Result<Vec<ProfileChoice>, WorkflowError> {
        match self.cache.get(self.user.id, Slot::Options) {
            Some(SlotValue::Profiles(profiles)) => Ok(profiles.clone()),
            _ => Err(WorkflowError::Corrupted),
        }
    }

    fn option_folders(&self) -> Result<Vec<FolderChoice>, WorkflowError> {
        match self.cache.get(self.user.id, Slot::Options) {
            Some(SlotValue::Folders(folders)) => Ok(folders.clone()),
            _ => Err(WorkflowError::Corrupted),
        }
    }

    fn option_labels(&self) -> Result<Vec<String>, WorkflowError> {
        match self.cache.get(self.user.id, Slot::Options) {
            Some(SlotValue::Labels(labels)) => Ok(labels.clone()),
            _ => Err(WorkflowError::Corrupted),
        }
    }

    fn selected_profile_id(&self) -> Result<i64, WorkflowError> {
        match self.cache.get(self.user.id, Slot::SelectedProfile) {
            Some(SlotValue::ProfileId(id)) => Ok(*id),
            _ => Err(WorkflowError::Corrupted),
        }
    }

    fn selected_label(&self, slot: Slot) -> Result<String, WorkflowError> {
        match self.cache.get(self.user.id, slot) {
            Some(SlotValue::Label(label)) => Ok(label.clone()),
            _ => Err(WorkflowError::Corrupted),
        }
    }

    fn selected_folder(&self) -> Result<FolderChoice, WorkflowError> {
        match self.cache.get(self.user.id, Slot::SelectedFolder) {
            Some(SlotValue::Folder(folder)) => Ok(folder.clone()),
            _ => Err(WorkflowError::Corrupted),
        }
    }

    // --- small helpers -----------------------------------------------------

    fn cache_yes_no_options(&mut self) {
        self.cache.set(
            self.user.id,
            Slot::Options,
            SlotValue::Labels(vec![messages::YES.to_string(), messages::NO.to_string()]),
        );
    }

    /// Resolves a Yes/No reply against the cached labels; "No" aborts the
    /// whole session.
    fn resolve_yes_no(&mut self, reply: &str) -> Result<(), WorkflowError> {
        let answer = self.resolve_yes_no_label(reply)?;
        if answer == messages::NO {
            return Err(WorkflowError::Aborted);
        }
        Ok(())
    }

    fn resolve_yes_no_label(&mut self, reply: &str) -> Result<String, WorkflowError> {
        let labels = self.option_labels()?;
        labels
            .iter()
            .find(|label| label.as_str() == reply)
            .cloned()
            .ok_or_else(|| WorkflowError::NoMatch(reply.to_string()))
    }

    fn set_state(&mut self, step: AddStep) {
        self.cache.set(
            self.user.id,
            Slot::State,
            SlotValue::State(WorkflowState::Add(self.media, step)),
        );
    }

    fn send(&self, text: &str, markup: ReplyMarkup) -> Result<(), WorkflowError> {
        self.chat.send(self.user.id, text, markup)?;
        Ok(())
    }
}
