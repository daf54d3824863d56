//! User-facing string catalog. Kept behind one module so a localized lookup
//! can replace it without touching the workflow engine.

pub const YES: &str = "Yes";
pub const NO: &str = "No";
pub const SELECT_FROM_MENU: &str = "\nPlease select from the menu below.";

pub fn went_wrong() -> String {
    "Oh no! Something went wrong, the workflow was cancelled. Please start over.".to_string()
}

pub fn no_match() -> String {
    "That did not match any of the options, please pick one from the menu.".to_string()
}

pub fn aborted() -> String {
    "Aborted, no changes were made.".to_string()
}

pub fn not_authorized() -> String {
    "You are not authorized to use this bot. Use `/auth <password>` to request access.".to_string()
}

pub fn admin_only() -> String {
    "Only the bot owner can use this command.".to_string()
}

pub fn already_authorized() -> String {
    "You are already authorized.".to_string()
}

pub fn access_revoked() -> String {
    "Your access has been revoked; contact the bot owner.".to_string()
}

pub fn bad_password() -> String {
    "Invalid password.".to_string()
}

pub fn welcome(display_name: &str) -> String {
    format!("Welcome *{display_name}*! You now have access. Send /help for the command list.")
}

pub fn user_authorized_notice(display_name: &str) -> String {
    format!("*{display_name}* just authorized with the bot.")
}

pub fn unable_to_locate(query: &str) -> String {
    format!("Unable to locate *{query}*. Please try something else.")
}

pub fn already_tracked(title: &str) -> String {
    format!("*{title}* is already being tracked.")
}

pub fn found_items(count: usize, noun: &str) -> String {
    format!("*Found {count} {noun}*")
}

pub fn is_this_correct() -> String {
    format!("Is this correct?\n➸ {YES}\n➸ {NO}")
}

pub fn use_defaults() -> String {
    format!("Add with the default quality profile and folder?\n➸ {YES}\n➸ {NO}")
}

pub fn select_monitor_policy() -> String {
    "Which seasons should be monitored?".to_string()
}

pub fn select_series_type() -> String {
    "What type of series is this?".to_string()
}

pub fn use_season_folders() -> String {
    "Should episodes be organized into season folders?".to_string()
}

pub fn couldnt_get_profiles() -> String {
    "Could not fetch any quality profiles from the backend.".to_string()
}

pub fn couldnt_get_folders() -> String {
    "Could not fetch any root folders from the backend.".to_string()
}

pub fn couldnt_add(title: &str) -> String {
    format!("Could not add *{title}*, try again later.")
}

pub fn added(title: &str) -> String {
    format!("*{title}* was added, happy watching!")
}

pub fn added_by(title: &str, display_name: &str) -> String {
    format!("*{title}* was added by *{display_name}*.")
}

pub fn matching_results() -> String {
    "*Matching results in the library:*".to_string()
}

pub fn nothing_in_calendar() -> String {
    "Nothing in the calendar for that period.".to_string()
}

pub fn episode_done_marker() -> String {
    " ✅".to_string()
}

pub fn rss_executed() -> String {
    "RSS sync started.".to_string()
}

pub fn wanted_executed() -> String {
    "Search for wanted episodes started.".to_string()
}

pub fn refresh_executed() -> String {
    "Library refresh started.".to_string()
}

pub fn cache_cleared() -> String {
    "All previous commands have been cleared.".to_string()
}

pub fn no_users_in_list(list: &str) -> String {
    format!("There are no users in the {list} list.")
}

pub fn select_user_to_revoke() -> String {
    "Which user should have access revoked?".to_string()
}

pub fn select_user_to_unrevoke() -> String {
    "Which user should have access restored?".to_string()
}

pub fn confirm_revoke(display_name: &str) -> String {
    format!("Revoke access for *{display_name}*?\n➸ {YES}\n➸ {NO}")
}

pub fn confirm_unrevoke(display_name: &str) -> String {
    format!("Restore access for *{display_name}*?\n➸ {YES}\n➸ {NO}")
}

pub fn revoked(display_name: &str) -> String {
    format!("Access for *{display_name}* has been revoked.")
}

pub fn unrevoked(display_name: &str) -> String {
    format!("Access for *{display_name}* has been restored.")
}

pub fn user_list(allowed: &[String], revoked: &[String]) -> String {
    let mut lines = vec!["*Allowed users:*".to_string()];
    if allowed.is_empty() {
        lines.push("_none_".to_string());
    }
    lines.extend(allowed.iter().map(|name| format!("➸ {name}")));
    lines.push("\n*Revoked users:*".to_string());
    if revoked.is_empty() {
        lines.push("_none_".to_string());
    }
    lines.extend(revoked.iter().map(|name| format!("➸ {name}")));
    lines.join("\n")
}

pub fn unknown_command() -> String {
    "Unknown command. Send /help for the command list.".to_string()
}

pub fn help() -> String {
    [
        "*arrbot commands*",
        "`/q <title>` search for a series to add",
        "`/m <title>` search for a movie to add",
        "`/library [title]` list or search the series library",
        "`/upcoming [days]` upcoming episodes (default 3 days)",
        "`/rss` trigger an RSS sync",
        "`/wanted` search for missing episodes",
        "`/refresh` refresh all series",
        "`/clear` forget the current conversation",
        "`/auth <password>` request access",
        "",
        "*Owner commands*",
        "`/users` list allowed and revoked users",
        "`/revoke` revoke a user's access",
        "`/unrevoke` restore a user's access",
    ]
    .join("\n")
}

pub fn start() -> String {
    "Hi! I can add series and movies to your media library. Send /help to see what I can do."
        .to_string()
}

pub fn download_notification(series: &str, season: &str, episodes: &str, quality: &str) -> String {
    format!("Downloaded *{series}* S{season}E{episodes} [{quality}]")
}
