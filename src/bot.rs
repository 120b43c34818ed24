//! Conversation front door: routes commands and replies to the wizard,
//! the store and the watcher manager

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::db::{SessionStore, StoreError};
use crate::monitor::WatcherManager;
use crate::session::{ConversationId, Form};
use crate::transport::{Outbound, Transport, TransportError};
use crate::wizard::messages::{self, text};
use crate::wizard::{self, CityCatalog, Input, WizardError};

pub struct Bot {
    store: SessionStore,
    cities: Arc<CityCatalog>,
    watchers: Arc<WatcherManager>,
    transport: Arc<dyn Transport>,
}

impl Bot {
    pub fn new(
        store: SessionStore,
        cities: Arc<CityCatalog>,
        watchers: Arc<WatcherManager>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            store,
            cities,
            watchers,
            transport,
        }
    }

    pub fn watchers(&self) -> &Arc<WatcherManager> {
        &self.watchers
    }

    /// Handle `/name args`
    pub async fn on_command(
        &self,
        conversation: ConversationId,
        name: &str,
        args: &str,
    ) -> Result<(), TransportError> {
        debug!(conversation = %conversation, command = name, "Command received");

        let replies = match name {
            "start" => self.start(conversation).await,
            "list" => self.list(conversation).await,
            "status" => self.status(conversation).await,
            "stop" => self.stop(conversation, args).await,
            "cancel" => self.cancel(conversation).await,
            _ => vec![text(messages::HELP)],
        };
        self.reply(conversation, replies).await
    }

    pub async fn on_free_text(
        &self,
        conversation: ConversationId,
        message: &str,
    ) -> Result<(), TransportError> {
        self.on_input(conversation, Input::Text(message.trim().to_string())).await
    }

    pub async fn on_choice_selected(
        &self,
        conversation: ConversationId,
        token: &str,
    ) -> Result<(), TransportError> {
        self.on_input(conversation, Input::Choice(token.to_string())).await
    }

    pub async fn on_date_selected(
        &self,
        conversation: ConversationId,
        date: NaiveDate,
    ) -> Result<(), TransportError> {
        self.on_input(conversation, Input::Date(date)).await
    }

    async fn on_input(
        &self,
        conversation: ConversationId,
        input: Input,
    ) -> Result<(), TransportError> {
        let cities = Arc::clone(&self.cities);
        let applied = self
            .store
            .try_modify(conversation, |session| {
                wizard::apply_input(session, &input, &cities)
            })
            .await;

        match applied {
            Ok(applied) => {
                self.reply(conversation, applied.replies).await?;
                if let Some(form) = applied.completed {
                    self.watch(conversation, form).await;
                }
                Ok(())
            }
            Err(e) => {
                let replies = self.failure(conversation, e);
                self.reply(conversation, replies).await
            }
        }
    }

    async fn start(&self, conversation: ConversationId) -> Vec<Outbound> {
        match self.store.get_or_create(conversation).await {
            Ok(_) => {}
            Err(e @ StoreError::Corrupt { .. }) => {
                warn!(conversation = %conversation, error = %e, "Replacing corrupt session");
                if let Err(e) = self.store.reset(conversation).await {
                    return self.failure(conversation, e.into());
                }
            }
            Err(e) => return self.failure(conversation, e.into()),
        }

        match self.store.try_modify(conversation, wizard::begin).await {
            Ok(replies) => replies,
            Err(e) => self.failure(conversation, e),
        }
    }

    async fn list(&self, conversation: ConversationId) -> Vec<Outbound> {
        let session = match self.store.read(conversation).await {
            Ok(session) => session,
            Err(e) => return self.failure(conversation, e.into()),
        };
        if !session.is_idle() {
            return vec![text(messages::FLOW_IN_PROGRESS)];
        }

        let forms: Vec<&Form> = session.complete_forms().collect();
        if forms.is_empty() {
            return vec![text(messages::NO_FORMS)];
        }

        let mut replies = vec![text(messages::LIST_HEADER)];
        replies.extend(forms.into_iter().map(|f| Outbound::text(messages::describe_form(f))));
        replies
    }

    async fn status(&self, conversation: ConversationId) -> Vec<Outbound> {
        let session = match self.store.read(conversation).await {
            Ok(session) => session,
            Err(e) => return self.failure(conversation, e.into()),
        };
        if !session.is_idle() {
            return vec![text(messages::FLOW_IN_PROGRESS)];
        }
        if session.forms_status.is_empty() {
            return vec![text(messages::NO_STATUS)];
        }

        session
            .forms_status
            .iter()
            .map(|s| Outbound::text(messages::describe_status(s)))
            .collect()
    }

    async fn stop(&self, conversation: ConversationId, args: &str) -> Vec<Outbound> {
        let Ok(form_id) = args.trim().parse::<usize>() else {
            return vec![text(messages::STOP_USAGE)];
        };

        if let Err(e) = self.store.read(conversation).await {
            return self.failure(conversation, e.into());
        }

        match self.watchers.stop(conversation, form_id).await {
            Ok(true) => vec![Outbound::text(messages::stopped(form_id))],
            Ok(false) => vec![Outbound::text(messages::not_watching(form_id))],
            Err(e) => self.failure(conversation, e.into()),
        }
    }

    async fn cancel(&self, conversation: ConversationId) -> Vec<Outbound> {
        match self.store.try_modify(conversation, wizard::cancel).await {
            Ok(()) => vec![text(messages::CANCELLED)],
            Err(WizardError::Idle) => vec![text(messages::NOTHING_TO_CANCEL)],
            Err(e) => self.failure(conversation, e),
        }
    }

    async fn watch(&self, conversation: ConversationId, form: Form) {
        let form_id = form.id;
        match self.watchers.start(conversation, form).await {
            Ok(true) => info!(conversation = %conversation, form_id, "Watching form"),
            Ok(false) => {
                debug!(conversation = %conversation, form_id, "Form saved without watcher")
            }
            Err(e) => {
                warn!(conversation = %conversation, form_id, error = %e, "Failed to start watcher")
            }
        }
    }

    /// Reply for an operation that wrote nothing
    fn failure(&self, conversation: ConversationId, error: WizardError) -> Vec<Outbound> {
        match error {
            WizardError::Rejected(rejection) => rejection.replies,
            WizardError::Idle | WizardError::Store(StoreError::NotFound(_)) => {
                vec![text(messages::HELP)]
            }
            WizardError::Busy => vec![text(messages::FLOW_IN_PROGRESS)],
            e => {
                error!(conversation = %conversation, error = %e, "Conversation failed");
                vec![text(messages::SOMETHING_WRONG)]
            }
        }
    }

    async fn reply(
        &self,
        conversation: ConversationId,
        replies: Vec<Outbound>,
    ) -> Result<(), TransportError> {
        for message in replies {
            self.transport.send(conversation, message).await?;
        }
        Ok(())
    }
}
