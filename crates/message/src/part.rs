//! Part - a single message within a batch.
//!
//! A part carries an opaque byte body, a lazily parsed JSON view of that
//! body, a metadata map, a sticky error marker and a per-part context used
//! for cancellation. The byte body and the JSON view are kept consistent:
//! writing one invalidates the cached form of the other.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::Error;

#[cfg(test)]
#[path = "part_test.rs"]
mod tests;

/// Per-part context carried alongside the payload.
///
/// Cloning is cheap and copy-on-write: a derived part may swap in its own
/// context without mutating the part it was derived from.
#[derive(Debug, Clone, Default)]
pub struct PartContext {
    cancel: Option<CancellationToken>,
}

impl PartContext {
    /// A context tied to the given cancellation token.
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel: Some(cancel),
        }
    }

    /// Whether the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }

    /// The cancellation token, if one was attached.
    pub fn cancel_token(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }
}

/// One message part.
///
/// Cloning a part is a shallow copy: the body bytes are shared with the
/// original while metadata and the error marker become independently
/// mutable. Use [`Part::deep_copy`] for fully independent content.
#[derive(Debug, Clone, Default)]
pub struct Part {
    body: Bytes,
    structured: Option<Value>,
    metadata: Option<BTreeMap<String, String>>,
    error: Option<Error>,
    context: PartContext,
}

impl Part {
    /// Create a part from raw bytes.
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    /// Create a part whose body is the canonical serialisation of `value`.
    pub fn from_json(value: Value) -> Self {
        let mut part = Self::default();
        part.set_json(value);
        part
    }

    /// The raw body bytes.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replace the body, invalidating any cached structured view.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
        self.structured = None;
    }

    /// The structured JSON view of the body, parsed on first access.
    ///
    /// Trailing whitespace after a document is permitted. A body holding
    /// more than one top-level document is rejected with
    /// [`Error::MultipleDocuments`]; any other malformed input surfaces
    /// [`Error::Parse`].
    pub fn json(&mut self) -> Result<&Value, Error> {
        if self.structured.is_none() {
            let mut stream =
                serde_json::Deserializer::from_slice(&self.body).into_iter::<Value>();
            let value = match stream.next() {
                Some(Ok(v)) => v,
                Some(Err(err)) => return Err(Error::Parse(err.to_string())),
                None => return Err(Error::Parse("message is empty".to_owned())),
            };
            // Anything beyond trailing whitespace is either a second
            // document or junk.
            match stream.next() {
                None => {}
                Some(Ok(_)) => return Err(Error::MultipleDocuments),
                Some(Err(err)) => return Err(Error::Parse(err.to_string())),
            }
            self.structured = Some(value);
        }
        Ok(self.structured.as_ref().expect("structured view populated"))
    }

    /// Replace the body with the canonical serialisation of `value` and
    /// cache `value` as the structured view.
    pub fn set_json(&mut self, value: Value) {
        self.body = Bytes::from(serde_json::to_vec(&value).expect("serialising serde_json::Value"));
        self.structured = Some(value);
    }

    /// Metadata value under `key`.
    pub fn meta_get(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key).map(String::as_str)
    }

    /// Set a metadata key, replacing any previous value.
    pub fn meta_set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
    }

    /// Delete a metadata key if present.
    pub fn meta_delete(&mut self, key: &str) {
        if let Some(meta) = self.metadata.as_mut() {
            meta.remove(key);
        }
    }

    /// Visit every metadata pair, stopping at the first error.
    pub fn meta_iter<E>(
        &self,
        mut f: impl FnMut(&str, &str) -> Result<(), E>,
    ) -> Result<(), E> {
        if let Some(meta) = self.metadata.as_ref() {
            for (k, v) in meta {
                f(k, v)?;
            }
        }
        Ok(())
    }

    /// The sticky error marker, if one is attached.
    #[inline]
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Attach or clear the sticky error marker.
    pub fn set_error(&mut self, err: Option<Error>) {
        self.error = err;
    }

    /// Attach a sticky error built from a plain message.
    pub fn fail(&mut self, msg: impl Into<String>) {
        self.error = Some(Error::Part(msg.into()));
    }

    /// The per-part context.
    #[inline]
    pub fn context(&self) -> &PartContext {
        &self.context
    }

    /// Return this part with `context` attached.
    #[must_use]
    pub fn with_context(mut self, context: PartContext) -> Self {
        self.context = context;
        self
    }

    /// A fully independent copy: body bytes are duplicated rather than
    /// shared.
    pub fn deep_copy(&self) -> Self {
        Self {
            body: Bytes::copy_from_slice(&self.body),
            structured: self.structured.clone(),
            metadata: self.metadata.clone(),
            error: self.error.clone(),
            context: self.context.clone(),
        }
    }
}

impl From<&str> for Part {
    fn from(s: &str) -> Self {
        Self::new(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<Vec<u8>> for Part {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}
