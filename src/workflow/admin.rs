use crate::acl::{AccessControl, UserRecord};
use crate::cache::{SessionCache, Slot, SlotValue};
use crate::messages;
use crate::telegram::{ChatTransport, ReplyMarkup};
use crate::workflow::render::one_per_row;
use crate::workflow::{AdminStep, WorkflowError, WorkflowState};
use std::path::Path;

/// Owner-only access-list mutations: self-service authorization plus the
/// two-step revoke and unrevoke confirmations. Every mutation is persisted
/// synchronously before the success reply goes out.
pub struct AdminWorkflow<'a, C: ChatTransport> {
    chat: &'a C,
    cache: &'a mut SessionCache,
    acl: &'a mut AccessControl,
    acl_path: &'a Path,
    user: &'a UserRecord,
    owner: i64,
}

impl<'a, C: ChatTransport> AdminWorkflow<'a, C> {
    pub fn new(
        chat: &'a C,
        cache: &'a mut SessionCache,
        acl: &'a mut AccessControl,
        acl_path: &'a Path,
        user: &'a UserRecord,
        owner: i64,
    ) -> Self {
        Self {
            chat,
            cache,
            acl,
            acl_path,
            user,
            owner,
        }
    }

    /// `/auth <password>`. Already-authorized and revoked users are
    /// short-circuited with distinct replies and no state change.
    pub fn authorize(&mut self, attempt: &str, password: &str) -> Result<(), WorkflowError> {
        if self.acl.is_allowed(self.user.id) {
            return self.send(&messages::already_authorized(), ReplyMarkup::None);
        }
        if self.acl.is_revoked(self.user.id) {
            return self.send(&messages::access_revoked(), ReplyMarkup::None);
        }
        if attempt != password {
            return self.send(&messages::bad_password(), ReplyMarkup::None);
        }

        self.acl.authorize(self.user.clone());
        self.acl.save(self.acl_path)?;
        self.send(
            &messages::welcome(&self.user.display_name()),
            ReplyMarkup::None,
        )?;
        if self.owner != 0 && self.user.id != self.owner {
            self.chat.send(
                self.owner,
                &messages::user_authorized_notice(&self.user.display_name()),
                ReplyMarkup::None,
            )?;
        }
        Ok(())
    }

    pub fn list_users(&self) -> Result<(), WorkflowError> {
        let allowed: Vec<String> = self
            .acl
            .allowed_users
            .iter()
            .map(UserRecord::display_name)
            .collect();
        let revoked: Vec<String> = self
            .acl
            .revoked_users
            .iter()
            .map(UserRecord::display_name)
            .collect();
        self.send(&messages::user_list(&allowed, &revoked), ReplyMarkup::None)
    }

    pub fn start_revoke(&mut self) -> Result<(), WorkflowError> {
        let members = self.acl.allowed_users.clone();
        if members.is_empty() {
            return Err(WorkflowError::NoUsersInList("allowed"));
        }
        self.prompt_member_selection(
            members,
            AdminStep::Revoke,
            &messages::select_user_to_revoke(),
        )
    }

    pub fn start_unrevoke(&mut self) -> Result<(), WorkflowError> {
        let members = self.acl.revoked_users.clone();
        if members.is_empty() {
            return Err(WorkflowError::NoUsersInList("revoked"));
        }
        self.prompt_member_selection(
            members,
            AdminStep::Unrevoke,
            &messages::select_user_to_unrevoke(),
        )
    }

    pub fn handle_reply(&mut self, step: AdminStep, text: &str) -> Result<(), WorkflowError> {
        match step {
            AdminStep::Revoke => self.select_member(text, AdminStep::RevokeConfirm),
            AdminStep::Unrevoke => self.select_member(text, AdminStep::UnrevokeConfirm),
            AdminStep::RevokeConfirm => self.confirm(text, AdminStep::RevokeConfirm),
            AdminStep::UnrevokeConfirm => self.confirm(text, AdminStep::UnrevokeConfirm),
        }
    }

    fn prompt_member_selection(
        &mut self,
        members: Vec<UserRecord>,
        step: AdminStep,
        prompt: &str,
    ) -> Result<(), WorkflowError> {
        let names: Vec<String> = members.iter().map(UserRecord::display_name).collect();
        self.cache.set(
            self.user.id,
            Slot::AclCandidates,
            SlotValue::AclUsers(members),
        );
        self.cache.set(
            self.user.id,
            Slot::State,
            SlotValue::State(WorkflowState::Admin(step)),
        );
        self.send(prompt, ReplyMarkup::Keyboard(one_per_row(&names)))
    }

    fn select_member(&mut self, reply: &str, confirm: AdminStep) -> Result<(), WorkflowError> {
        let members = match self.cache.get(self.user.id, Slot::AclCandidates) {
            Some(SlotValue::AclUsers(members)) => members.clone(),
            _ => return Err(WorkflowError::Corrupted),
        };
        let member = members
            .iter()
            .find(|m| m.display_name() == reply)
            .ok_or_else(|| WorkflowError::NoMatch(reply.to_string()))?
            .clone();

        let prompt = match confirm {
            AdminStep::RevokeConfirm => messages::confirm_revoke(&member.display_name()),
            _ => messages::confirm_unrevoke(&member.display_name()),
        };
        self.cache
            .set(self.user.id, Slot::AclSelection, SlotValue::AclUser(member));
        self.cache.set(
            self.user.id,
            Slot::State,
            SlotValue::State(WorkflowState::Admin(confirm)),
        );
        let rows = one_per_row(&[messages::YES.to_string(), messages::NO.to_string()]);
        self.send(&prompt, ReplyMarkup::Keyboard(rows))
    }

    fn confirm(&mut self, reply: &str, step: AdminStep) -> Result<(), WorkflowError> {
        let member = match self.cache.get(self.user.id, Slot::AclSelection) {
            Some(SlotValue::AclUser(member)) => member.clone(),
            _ => return Err(WorkflowError::Corrupted),
        };

        match reply {
            r if r == messages::NO => return Err(WorkflowError::Aborted),
            r if r == messages::YES => {}
            other => return Err(WorkflowError::NoMatch(other.to_string())),
        }

        let name = member.display_name();
        let done = match step {
            AdminStep::RevokeConfirm => {
                self.acl.revoke(&name)?;
                messages::revoked(&name)
            }
            _ => {
                self.acl.unrevoke(&name)?;
                messages::unrevoked(&name)
            }
        };
        // Persist before replying; the file is the source of truth.
        self.acl.save(self.acl_path)?;
        self.cache.clear_user(self.user.id);
        self.send(&done, ReplyMarkup::Remove)
    }

    fn send(&self, text: &str, markup: ReplyMarkup) -> Result<(), WorkflowError> {
        self.chat.send(self.user.id, text, markup)?;
        Ok(())
    }
}
