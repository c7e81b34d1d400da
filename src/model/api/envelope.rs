use serde::Serialize;

/// The body of every successful API call: `{"ok": true, ...payload}`.
/// Failures are rendered by [`crate::error::Error`] as `{"ok": false, ...}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    ok: bool,
    #[serde(flatten)]
    payload: T,
}

impl<T> Envelope<T> {
    pub fn ok(payload: T) -> Self {
        Self { ok: true, payload }
    }
}

/// A payload with no fields.
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

impl Envelope<Empty> {
    pub fn empty() -> Self {
        Self::ok(Empty {})
    }
}
