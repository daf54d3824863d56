use arrbot::acl::{AccessControl, UserRecord};
use arrbot::api::{ApiError, MediaServer};
use arrbot::cache::SessionCache;
use arrbot::config::{BackendConfig, Config};
use arrbot::router::Router;
use arrbot::telegram::{ChatTransport, ReplyMarkup, TransportError};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::path::PathBuf;

struct NullBackend;

impl MediaServer for NullBackend {
    fn get(&self, _path: &str, _query: &[(&str, String)]) -> Result<Value, ApiError> {
        Ok(json!([]))
    }

    fn post(&self, _path: &str, _body: &Value) -> Result<Value, ApiError> {
        Ok(json!({}))
    }
}

#[derive(Default)]
struct FakeChat {
    sent: RefCell<Vec<(i64, String, ReplyMarkup)>>,
}

impl FakeChat {
    fn texts_for(&self, chat_id: i64) -> Vec<String> {
        self.sent
            .borrow()
            .iter()
            .filter(|(id, _, _)| *id == chat_id)
            .map(|(_, text, _)| text.clone())
            .collect()
    }
}

impl ChatTransport for FakeChat {
    fn send(&self, chat_id: i64, text: &str, markup: ReplyMarkup) -> Result<(), TransportError> {
        self.sent
            .borrow_mut()
            .push((chat_id, text.to_string(), markup));
        Ok(())
    }
}

const OWNER_ID: i64 = 1;

fn backend_config() -> BackendConfig {
    BackendConfig {
        hostname: "localhost".to_string(),
        api_key: "key".to_string(),
        port: 8989,
        url_base: String::new(),
        ssl: false,
        username: None,
        password: None,
        default_profile_id: None,
        default_root_folder: None,
    }
}

fn test_config() -> Config {
    Config {
        bot_token: "token".to_string(),
        password: "hunter2".to_string(),
        owner: OWNER_ID,
        notify_id: 0,
        max_results: 15,
        sonarr: backend_config(),
        radarr: backend_config(),
    }
}

fn owner() -> UserRecord {
    UserRecord {
        id: OWNER_ID,
        username: Some("admin".to_string()),
        first_name: None,
        last_name: None,
    }
}

fn member(id: i64, username: &str) -> UserRecord {
    UserRecord {
        id,
        username: Some(username.to_string()),
        first_name: None,
        last_name: None,
    }
}

struct Harness {
    config: Config,
    backend: NullBackend,
    chat: FakeChat,
    cache: SessionCache,
    acl: AccessControl,
    acl_path: PathBuf,
    _temp: tempfile::TempDir,
}

impl Harness {
    fn new(acl: AccessControl) -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        Self {
            config: test_config(),
            backend: NullBackend,
            chat: FakeChat::default(),
            cache: SessionCache::default(),
            acl,
            acl_path: temp.path().join("acl.json"),
            _temp: temp,
        }
    }

    fn message(&mut self, user: &UserRecord, text: &str) {
        let mut router = Router {
            config: &self.config,
            sonarr: &self.backend,
            radarr: &self.backend,
            chat: &self.chat,
            cache: &mut self.cache,
            acl: &mut self.acl,
            acl_path: &self.acl_path,
        };
        router.handle_message(user, text).expect("transport ok");
    }

    fn persisted(&self) -> AccessControl {
        AccessControl::load(&self.acl_path).expect("load acl")
    }
}

#[test]
fn correct_password_authorizes_and_persists() {
    let mut h = Harness::new(AccessControl::default());
    let alice = member(100, "alice");
    h.message(&alice, "/auth hunter2");

    assert!(h.acl.is_allowed(100));
    assert!(h.persisted().is_allowed(100));
    let texts = h.chat.texts_for(100);
    assert!(texts.last().expect("reply").contains("Welcome *alice*"));
    // The owner hears about every new authorization.
    let owner_texts = h.chat.texts_for(OWNER_ID);
    assert!(owner_texts.last().expect("notice").contains("*alice* just authorized"));
}

#[test]
fn wrong_password_changes_nothing() {
    let mut h = Harness::new(AccessControl::default());
    let alice = member(100, "alice");
    h.message(&alice, "/auth swordfish");

    assert!(!h.acl.is_allowed(100));
    assert!(!h.acl_path.exists());
    let texts = h.chat.texts_for(100);
    assert!(texts.last().expect("reply").contains("Invalid password"));
}

#[test]
fn second_auth_attempt_is_a_noop() {
    let mut h = Harness::new(AccessControl::default());
    let alice = member(100, "alice");
    h.message(&alice, "/auth hunter2");
    h.message(&alice, "/auth hunter2");

    assert_eq!(h.acl.allowed_users.len(), 1);
    let texts = h.chat.texts_for(100);
    assert!(texts.last().expect("reply").contains("already authorized"));
}

#[test]
fn revoked_user_cannot_reauthorize_with_the_password() {
    let mut acl = AccessControl::default();
    acl.revoked_users.push(member(100, "alice"));
    let mut h = Harness::new(acl);
    h.message(&member(100, "alice"), "/auth hunter2");

    assert!(!h.acl.is_allowed(100));
    let texts = h.chat.texts_for(100);
    assert!(texts.last().expect("reply").contains("revoked"));
}

#[test]
fn revoked_user_is_denied_media_commands() {
    let mut acl = AccessControl::default();
    acl.authorize(member(100, "alice"));
    acl.revoked_users.push(member(100, "alice"));
    let mut h = Harness::new(acl);
    h.message(&member(100, "alice"), "/q twin peaks");

    let texts = h.chat.texts_for(100);
    assert!(texts.last().expect("reply").contains("revoked"));
}

#[test]
fn unauthorized_user_is_pointed_at_auth() {
    let mut h = Harness::new(AccessControl::default());
    h.message(&member(100, "alice"), "/library");

    let texts = h.chat.texts_for(100);
    assert!(texts.last().expect("reply").contains("not authorized"));
}

#[test]
fn admin_commands_reject_everyone_but_the_owner() {
    let mut acl = AccessControl::default();
    acl.authorize(member(100, "alice"));
    let mut h = Harness::new(acl);
    h.message(&member(100, "alice"), "/revoke");

    let texts = h.chat.texts_for(100);
    assert!(texts.last().expect("reply").contains("Only the bot owner"));
}

#[test]
fn revoke_flow_moves_exactly_one_user_and_persists() {
    let mut acl = AccessControl::default();
    acl.authorize(member(100, "alice"));
    acl.authorize(member(101, "bob"));
    let mut h = Harness::new(acl);

    h.message(&owner(), "/revoke");
    h.message(&owner(), "alice");
    h.message(&owner(), "Yes");

    assert_eq!(h.acl.allowed_users.len(), 1);
    assert_eq!(h.acl.allowed_users[0].id, 101);
    assert_eq!(h.acl.revoked_users.len(), 1);
    assert_eq!(h.acl.revoked_users[0].id, 100);

    let persisted = h.persisted();
    assert!(persisted.is_revoked(100));
    assert!(persisted.is_allowed(101));

    assert!(h.cache.state(OWNER_ID).is_none());
    let texts = h.chat.texts_for(OWNER_ID);
    assert!(texts.last().expect("reply").contains("*alice* has been revoked"));
}

#[test]
fn declining_the_revoke_confirmation_mutates_nothing() {
    let mut acl = AccessControl::default();
    acl.authorize(member(100, "alice"));
    let mut h = Harness::new(acl);

    h.message(&owner(), "/revoke");
    h.message(&owner(), "alice");
    h.message(&owner(), "No");

    assert!(h.acl.is_allowed(100));
    assert!(!h.acl.is_revoked(100));
    assert!(!h.acl_path.exists());
    assert!(h.cache.state(OWNER_ID).is_none());
    let texts = h.chat.texts_for(OWNER_ID);
    assert!(texts.last().expect("reply").contains("Aborted"));
}

#[test]
fn unrevoke_flow_restores_access() {
    let mut acl = AccessControl::default();
    acl.revoked_users.push(member(100, "alice"));
    let mut h = Harness::new(acl);

    h.message(&owner(), "/unrevoke");
    h.message(&owner(), "alice");
    h.message(&owner(), "Yes");

    assert!(h.acl.is_allowed(100));
    assert!(!h.acl.is_revoked(100));
    assert!(h.persisted().is_allowed(100));
    let texts = h.chat.texts_for(OWNER_ID);
    assert!(texts.last().expect("reply").contains("*alice* has been restored"));
}

#[test]
fn revoke_with_an_empty_allowed_list_reports_it() {
    let mut h = Harness::new(AccessControl::default());
    h.message(&owner(), "/revoke");

    let texts = h.chat.texts_for(OWNER_ID);
    assert!(texts
        .last()
        .expect("reply")
        .contains("no users in the allowed list"));
    assert!(h.cache.state(OWNER_ID).is_none());
}

#[test]
fn unknown_selection_keeps_the_revoke_prompt_open() {
    let mut acl = AccessControl::default();
    acl.authorize(member(100, "alice"));
    let mut h = Harness::new(acl);

    h.message(&owner(), "/revoke");
    h.message(&owner(), "mallory");

    assert!(h.acl.is_allowed(100));
    assert!(h.cache.state(OWNER_ID).is_some());
    let texts = h.chat.texts_for(OWNER_ID);
    assert!(texts
        .last()
        .expect("reply")
        .contains("did not match any of the options"));
}

#[test]
fn users_command_lists_both_columns() {
    let mut acl = AccessControl::default();
    acl.authorize(member(100, "alice"));
    acl.revoked_users.push(member(101, "bob"));
    let mut h = Harness::new(acl);
    h.message(&owner(), "/users");

    let texts = h.chat.texts_for(OWNER_ID);
    let listing = texts.last().expect("reply");
    assert!(listing.contains("*Allowed users:*"));
    assert!(listing.contains("➸ alice"));
    assert!(listing.contains("*Revoked users:*"));
    assert!(listing.contains("➸ bob"));
}

#[test]
fn display_name_falls_back_from_username_to_names_to_id() {
    let with_username = member(100, "alice");
    assert_eq!(with_username.display_name(), "alice");

    let with_names = UserRecord {
        id: 100,
        username: None,
        first_name: Some("Alice".to_string()),
        last_name: Some("Smith".to_string()),
    };
    assert_eq!(with_names.display_name(), "Alice Smith");

    let bare = UserRecord {
        id: 100,
        username: None,
        first_name: None,
        last_name: None,
    };
    assert_eq!(bare.display_name(), "100");
}
