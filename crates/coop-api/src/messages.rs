// Message log endpoint

use tracing::debug;

use crate::client::CoopClient;
use crate::error::Error;
use crate::models::{MessagePage, MessageQuery};

impl CoopClient {
    /// Fetch one page of the message log.
    ///
    /// `GET {api}/messages?before=<ts>&after=<ts>&limit=<n>`
    ///
    /// A body with `success: false` becomes [`Error::Rejected`].
    pub async fn get_messages(&self, query: &MessageQuery) -> Result<MessagePage, Error> {
        let url = self.api_url("messages")?;
        let pairs = query.to_pairs();
        let page: MessagePage = self.get(url, &pairs).await?;

        if !page.success {
            return Err(Error::Rejected {
                message: page
                    .message
                    .unwrap_or_else(|| "message query was not accepted".into()),
            });
        }

        debug!(
            count = page.messages.len(),
            has_more = page.has_more,
            "fetched message page"
        );
        Ok(page)
    }
}
