//! Parking and waking the request task of a connection.
//!
//! When the head has arrived but the body has not, the task that will run
//! the handler parks on a [`Parked`] handle. The matching
//! [`SuspensionToken`] lives in the connection's state entry until a later
//! receive event completes the body and resumes the task. Dropping the
//! token without resuming tells the parked task the connection went away.

use tokio::sync::oneshot;

use super::RequestError;

#[derive(Debug)]
enum Wake {
    Resume,
    Expire,
}

/// Resumption handle stored with the connection state.
#[derive(Debug)]
pub struct SuspensionToken(oneshot::Sender<Wake>);

/// Waiting side held by the parked request task.
#[derive(Debug)]
pub struct Parked(oneshot::Receiver<Wake>);

/// Create a linked token and parked handle.
pub(crate) fn suspend() -> (SuspensionToken, Parked) {
    let (tx, rx) = oneshot::channel();
    (SuspensionToken(tx), Parked(rx))
}

impl SuspensionToken {
    /// Wake the parked task so it dispatches the request.
    ///
    /// Returns `false` if the parked task no longer exists.
    pub fn resume(self) -> bool { self.0.send(Wake::Resume).is_ok() }

    /// Wake the parked task with an idle timeout.
    pub fn expire(self) -> bool { self.0.send(Wake::Expire).is_ok() }
}

impl Parked {
    /// Wait until the token resumes, expires or is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::TimedOut`] if the token expired and
    /// [`RequestError::Aborted`] if it was dropped.
    pub async fn wait(self) -> Result<(), RequestError> {
        match self.0.await {
            Ok(Wake::Resume) => Ok(()),
            Ok(Wake::Expire) => Err(RequestError::TimedOut),
            Err(_) => Err(RequestError::Aborted),
        }
    }
}
