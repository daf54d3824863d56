use crate::acl::{AccessControl, UserRecord};
use crate::api::MediaServer;
use crate::cache::SessionCache;
use crate::config::Config;
use crate::messages;
use crate::telegram::{ChatTransport, ReplyMarkup, TransportError};
use crate::workflow::engine::MovieDefaults;
use crate::workflow::{
    AddWorkflow, AdminWorkflow, LibraryOps, MediaKind, WorkflowError, WorkflowState,
};
use std::path::Path;

const DEFAULT_UPCOMING_DAYS: i64 = 3;
const MAX_UPCOMING_DAYS: i64 = 365;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Auth(String),
    SeriesSearch(String),
    MovieSearch(String),
    Library(Option<String>),
    Upcoming(i64),
    Rss,
    Wanted,
    Refresh,
    Clear,
    Users,
    Revoke,
    Unrevoke,
}

/// Parses a slash command. Free text and unknown commands return `None`.
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim();
    if !text.starts_with('/') {
        return None;
    }
    let mut parts = text.splitn(2, char::is_whitespace);
    // Group chats suffix commands with the bot name: `/help@arrbot`.
    let name = parts.next()?.split('@').next()?;
    let arg = parts.next().map(str::trim).filter(|v| !v.is_empty());

    match name {
        "/start" => Some(Command::Start),
        "/help" => Some(Command::Help),
        "/auth" => Some(Command::Auth(arg.unwrap_or_default().to_string())),
        "/q" | "/query" => arg.map(|term| Command::SeriesSearch(term.to_string())),
        "/m" | "/movie" => arg.map(|term| Command::MovieSearch(term.to_string())),
        "/library" => Some(Command::Library(arg.map(str::to_string))),
        "/upcoming" => Some(Command::Upcoming(
            arg.and_then(|v| v.parse::<i64>().ok())
                .filter(|days| *days > 0)
                .map(|days| days.min(MAX_UPCOMING_DAYS))
                .unwrap_or(DEFAULT_UPCOMING_DAYS),
        )),
        "/rss" => Some(Command::Rss),
        "/wanted" => Some(Command::Wanted),
        "/refresh" => Some(Command::Refresh),
        "/clear" => Some(Command::Clear),
        "/users" => Some(Command::Users),
        "/revoke" => Some(Command::Revoke),
        "/unrevoke" => Some(Command::Unrevoke),
        _ => None,
    }
}

/// Thin dispatcher: one incoming message in, one workflow operation out.
/// Incoming text is matched against slash commands first, then against the
/// user's cached workflow state.
pub struct Router<'a, B: MediaServer, C: ChatTransport> {
    pub config: &'a Config,
    pub sonarr: &'a B,
    pub radarr: &'a B,
    pub chat: &'a C,
    pub cache: &'a mut SessionCache,
    pub acl: &'a mut AccessControl,
    pub acl_path: &'a Path,
}

impl<'a, B: MediaServer, C: ChatTransport> Router<'a, B, C> {
    pub fn handle_message(
        &mut self,
        user: &UserRecord,
        text: &str,
    ) -> Result<(), TransportError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        if let Some(command) = parse_command(text) {
            return self.handle_command(user, command);
        }
        if text.starts_with('/') {
            return self
                .chat
                .send(user.id, &messages::unknown_command(), ReplyMarkup::None);
        }

        // Free text is only meaningful while a workflow is in progress.
        match self.cache.state(user.id) {
            Some(WorkflowState::Add(media, step)) => {
                if !self.is_authorized(user) {
                    return self.deny(user);
                }
                let result = self.add_workflow(media, user).handle_reply(step, text);
                self.report(user, result)
            }
            Some(WorkflowState::Admin(step)) => {
                if !self.is_owner(user) {
                    return self.deny_admin(user);
                }
                let result = self.admin_workflow(user).handle_reply(step, text);
                self.report(user, result)
            }
            None => Ok(()),
        }
    }

    fn handle_command(
        &mut self,
        user: &UserRecord,
        command: Command,
    ) -> Result<(), TransportError> {
        match command {
            Command::Start => self.chat.send(user.id, &messages::start(), ReplyMarkup::None),
            Command::Help => self.chat.send(user.id, &messages::help(), ReplyMarkup::None),
            Command::Auth(attempt) => {
                let password = self.config.password.clone();
                let result = self.admin_workflow(user).authorize(&attempt, &password);
                self.report(user, result)
            }
            Command::Users | Command::Revoke | Command::Unrevoke if !self.is_owner(user) => {
                self.deny_admin(user)
            }
            Command::Users => {
                let result = self.admin_workflow(user).list_users();
                self.report(user, result)
            }
            Command::Revoke => {
                let result = self.admin_workflow(user).start_revoke();
                self.report(user, result)
            }
            Command::Unrevoke => {
                let result = self.admin_workflow(user).start_unrevoke();
                self.report(user, result)
            }
            _ if !self.is_authorized(user) => self.deny(user),
            Command::SeriesSearch(term) => {
                let result = self
                    .add_workflow(MediaKind::Series, user)
                    .start_search(&term);
                self.report(user, result)
            }
            Command::MovieSearch(term) => {
                let result = self.add_workflow(MediaKind::Movie, user).start_search(&term);
                self.report(user, result)
            }
            Command::Library(query) => {
                let ops = LibraryOps::new(self.sonarr, self.chat, user.id);
                let result = ops.library_search(query.as_deref());
                self.report(user, result)
            }
            Command::Upcoming(days) => {
                let ops = LibraryOps::new(self.sonarr, self.chat, user.id);
                let result = ops.upcoming(days);
                self.report(user, result)
            }
            Command::Rss => {
                let result = LibraryOps::new(self.sonarr, self.chat, user.id).rss_sync();
                self.report(user, result)
            }
            Command::Wanted => {
                let result = LibraryOps::new(self.sonarr, self.chat, user.id).wanted_search();
                self.report(user, result)
            }
            Command::Refresh => {
                let result = LibraryOps::new(self.sonarr, self.chat, user.id).refresh();
                self.report(user, result)
            }
            Command::Clear => {
                self.cache.clear_user(user.id);
                self.chat
                    .send(user.id, &messages::cache_cleared(), ReplyMarkup::Remove)
            }
        }
    }

    fn add_workflow<'b>(
        &'b mut self,
        media: MediaKind,
        user: &'b UserRecord,
    ) -> AddWorkflow<'b, B, C> {
        let backend = match media {
            MediaKind::Series => self.sonarr,
            MediaKind::Movie => self.radarr,
        };
        let movie_defaults = match (
            self.config.radarr.default_profile_id,
            self.config.radarr.default_root_folder.clone(),
        ) {
            (Some(profile_id), Some(root_folder)) => Some(MovieDefaults {
                profile_id,
                root_folder,
            }),
            _ => None,
        };
        AddWorkflow::new(
            media,
            backend,
            self.chat,
            self.cache,
            user,
            self.config.owner,
            self.config.max_results,
            movie_defaults,
        )
    }

    fn admin_workflow<'b>(&'b mut self, user: &'b UserRecord) -> AdminWorkflow<'b, C> {
        AdminWorkflow::new(
            self.chat,
            self.cache,
            self.acl,
            self.acl_path,
            user,
            self.config.owner,
        )
    }

    fn is_authorized(&self, user: &UserRecord) -> bool {
        self.acl.is_allowed(user.id) && !self.acl.is_revoked(user.id)
    }

    fn is_owner(&self, user: &UserRecord) -> bool {
        self.config.owner != 0 && user.id == self.config.owner
    }

    fn deny(&self, user: &UserRecord) -> Result<(), TransportError> {
        let text = if self.acl.is_revoked(user.id) {
            messages::access_revoked()
        } else {
            messages::not_authorized()
        };
        self.chat.send(user.id, &text, ReplyMarkup::Remove)
    }

    fn deny_admin(&self, user: &UserRecord) -> Result<(), TransportError> {
        self.chat
            .send(user.id, &messages::admin_only(), ReplyMarkup::Remove)
    }

    /// Maps a workflow outcome onto the reply path: errors go to the user as
    /// plain text with any keyboard stripped; corrupted or aborted sessions
    /// are cleared in full.
    fn report(
        &mut self,
        user: &UserRecord,
        result: Result<(), WorkflowError>,
    ) -> Result<(), TransportError> {
        match result {
            Ok(()) => Ok(()),
            Err(WorkflowError::Transport(err)) => Err(err),
            Err(err) => {
                if err.clears_session() {
                    self.cache.clear_user(user.id);
                }
                self.chat
                    .send(user.id, &err.user_message(), ReplyMarkup::Remove)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_commands_parse_with_arguments() {
        assert_eq!(
            parse_command("/q twin peaks"),
            Some(Command::SeriesSearch("twin peaks".to_string()))
        );
        assert_eq!(
            parse_command("/movie Heat"),
            Some(Command::MovieSearch("Heat".to_string()))
        );
        assert_eq!(parse_command("/library"), Some(Command::Library(None)));
        assert_eq!(
            parse_command("/library office"),
            Some(Command::Library(Some("office".to_string())))
        );
        assert_eq!(parse_command("/upcoming 7"), Some(Command::Upcoming(7)));
        assert_eq!(parse_command("/upcoming"), Some(Command::Upcoming(3)));
        assert_eq!(parse_command("/upcoming nope"), Some(Command::Upcoming(3)));
    }

    #[test]
    fn upcoming_day_counts_are_capped_at_a_year() {
        assert_eq!(parse_command("/upcoming 366"), Some(Command::Upcoming(365)));
        assert_eq!(
            parse_command("/upcoming 9223372036854775807"),
            Some(Command::Upcoming(365))
        );
        assert_eq!(parse_command("/upcoming -1"), Some(Command::Upcoming(3)));
        assert_eq!(parse_command("/upcoming 0"), Some(Command::Upcoming(3)));
    }

    #[test]
    fn bot_name_suffix_is_stripped() {
        assert_eq!(parse_command("/help@arrbot"), Some(Command::Help));
    }

    #[test]
    fn searches_require_a_term() {
        assert_eq!(parse_command("/q"), None);
        assert_eq!(parse_command("/movie  "), None);
    }

    #[test]
    fn free_text_is_not_a_command() {
        assert_eq!(parse_command("twin peaks"), None);
        assert_eq!(parse_command("/definitely-not-a-command"), None);
    }

    #[test]
    fn auth_keeps_its_password_argument() {
        assert_eq!(
            parse_command("/auth hunter2"),
            Some(Command::Auth("hunter2".to_string()))
        );
        assert_eq!(parse_command("/auth"), Some(Command::Auth(String::new())));
    }
}
