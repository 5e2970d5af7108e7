//! Bootstrap and registration session state machines.
//!
//! Both variants share the same "open DTLS, register handlers, run, close"
//! scoped operation (see [`with_session`]); what differs is the handler set
//! and the outbound request sequence, expressed in [`bootstrap`] and
//! [`register`] respectively.

pub mod bootstrap;
pub mod register;

use std::future::Future;

use crate::error::Result;
use crate::transport::dtls::DtlsCoapSession;
use crate::transport::{CoapSession, DialOptions};

/// Dial `options`, run `body` against the open session, and close the
/// session on every exit path including an error returned by `body`.
pub async fn with_session<F, Fut, T>(options: DialOptions<'_>, body: F) -> Result<T>
where
    F: FnOnce(&mut dyn CoapSession) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut session = DtlsCoapSession::dial(options).await?;
    let result = body(&mut session).await;
    let close_result = session.close().await;
    match result {
        Ok(value) => close_result.map(|()| value),
        Err(e) => Err(e),
    }
}
