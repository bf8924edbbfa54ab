use async_trait::async_trait;
use tracing::debug;

use coop_api::{CoopClient, MessageQuery};

use super::{Backend, FetchedPage, PageCursor, PageRequest};
use crate::command::Command;
use crate::error::CoreError;
use crate::model::LogEntry;
use crate::model::log::cursor_string;

/// Backend over the HTTP API.
pub struct HttpBackend {
    client: CoopClient,
}

impl HttpBackend {
    pub fn new(client: CoopClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn send_command(&self, command: &Command) -> Result<(), CoreError> {
        let time = command.schedule_time().map(|t| t.to_string());
        self.client
            .send_command(command.endpoint().path(), time.as_deref())
            .await?;
        Ok(())
    }

    async fn fetch_messages(&self, request: PageRequest) -> Result<FetchedPage, CoreError> {
        let query = match request.cursor {
            PageCursor::Latest => MessageQuery::latest(request.limit),
            PageCursor::Before(ts) => MessageQuery::before(cursor_string(ts), request.limit),
            PageCursor::After(ts) => MessageQuery::after(cursor_string(ts), request.limit),
        };

        let page = self.client.get_messages(&query).await?;

        let entries = page
            .messages
            .into_iter()
            .filter_map(|raw| match LogEntry::try_from(raw) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(error = %e, "skipping unreadable log entry");
                    None
                }
            })
            .collect();

        Ok(FetchedPage {
            entries,
            has_more: page.has_more,
        })
    }
}
