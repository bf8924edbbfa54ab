// Door command endpoints
//
// Fire-and-forget POSTs. The backend acknowledges with `{ success }`;
// anything else is an error for the caller to surface.

use tracing::debug;

use crate::client::CoopClient;
use crate::error::Error;
use crate::models::{CommandAck, ScheduleBody};

impl CoopClient {
    /// Open the door now.
    ///
    /// `POST {api}/open`
    pub async fn open_door(&self) -> Result<(), Error> {
        self.send_command("open", None).await
    }

    /// Close the door now.
    ///
    /// `POST {api}/close`
    pub async fn close_door(&self) -> Result<(), Error> {
        self.send_command("close", None).await
    }

    /// Set the daily auto-open time. `time` must already be `HH:MM`.
    ///
    /// `POST {api}/setopentime { "time": "HH:MM" }`
    pub async fn set_open_time(&self, time: &str) -> Result<(), Error> {
        self.send_command("setopentime", Some(time)).await
    }

    /// Set the daily auto-close time. `time` must already be `HH:MM`.
    ///
    /// `POST {api}/setclosetime { "time": "HH:MM" }`
    pub async fn set_close_time(&self, time: &str) -> Result<(), Error> {
        self.send_command("setclosetime", Some(time)).await
    }

    /// Post to a command endpoint by path, with an optional schedule time.
    pub async fn send_command(&self, endpoint: &str, time: Option<&str>) -> Result<(), Error> {
        let url = self.api_url(endpoint)?;
        debug!(endpoint, ?time, "sending door command");

        let body = time.map(|time| ScheduleBody { time });
        let text = self.post(url, body.as_ref()).await?;

        if text.trim().is_empty() {
            return Ok(());
        }

        let ack: CommandAck = Self::decode(&text)?;
        if ack.success {
            Ok(())
        } else {
            Err(Error::Rejected {
                message: ack
                    .message
                    .unwrap_or_else(|| format!("{endpoint} was not accepted")),
            })
        }
    }
}
