//! Small processors used across combinator tests.

use async_trait::async_trait;

use sluice_message::{Batch, Error};

use crate::Processor;

/// Uppercases every part body.
pub struct Uppercase;

#[async_trait]
impl Processor for Uppercase {
    async fn process(&mut self, mut batch: Batch) -> Result<Vec<Batch>, Error> {
        batch
            .try_for_each_mut(|_, part| {
                let upper = String::from_utf8_lossy(part.body()).to_uppercase();
                part.set_body(upper.into_bytes());
                Ok::<(), Error>(())
            })
            .ok();
        Ok(vec![batch])
    }
}

/// Appends `!` to every part body.
pub struct AppendBang;

#[async_trait]
impl Processor for AppendBang {
    async fn process(&mut self, mut batch: Batch) -> Result<Vec<Batch>, Error> {
        batch
            .try_for_each_mut(|_, part| {
                let mut body = part.body().to_vec();
                body.push(b'!');
                part.set_body(body);
                Ok::<(), Error>(())
            })
            .ok();
        Ok(vec![batch])
    }
}

/// Deletes parts whose body does not contain the needle.
pub struct KeepContaining(pub &'static str);

#[async_trait]
impl Processor for KeepContaining {
    async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, Error> {
        let kept: Batch = batch
            .into_parts()
            .into_iter()
            .filter(|p| String::from_utf8_lossy(p.body()).contains(self.0))
            .collect();
        if kept.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![kept])
    }
}

/// Deletes parts whose body contains the needle.
pub struct DropContaining(pub &'static str);

#[async_trait]
impl Processor for DropContaining {
    async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, Error> {
        let kept: Batch = batch
            .into_parts()
            .into_iter()
            .filter(|p| !String::from_utf8_lossy(p.body()).contains(self.0))
            .collect();
        if kept.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![kept])
    }
}

/// Marks parts whose body contains the needle with a sticky error.
pub struct FailContaining(pub &'static str);

#[async_trait]
impl Processor for FailContaining {
    async fn process(&mut self, mut batch: Batch) -> Result<Vec<Batch>, Error> {
        let needle = self.0;
        batch
            .try_for_each_mut(|_, part| {
                if String::from_utf8_lossy(part.body()).contains(needle) {
                    part.fail("refused");
                }
                Ok::<(), Error>(())
            })
            .ok();
        Ok(vec![batch])
    }
}

/// Filters every part out.
pub struct DropAll;

#[async_trait]
impl Processor for DropAll {
    async fn process(&mut self, _batch: Batch) -> Result<Vec<Batch>, Error> {
        Ok(Vec::new())
    }
}

/// Records, in metadata, whether each part carried an error marker when
/// it arrived.
pub struct RecordsErrorSeen;

#[async_trait]
impl Processor for RecordsErrorSeen {
    async fn process(&mut self, mut batch: Batch) -> Result<Vec<Batch>, Error> {
        batch
            .try_for_each_mut(|_, part| {
                let seen = part.error().is_some().to_string();
                part.meta_set("saw_error", seen);
                Ok::<(), Error>(())
            })
            .ok();
        Ok(vec![batch])
    }
}

/// Part bodies as strings, for assertions.
pub fn bodies(batch: &Batch) -> Vec<String> {
    batch
        .iter()
        .map(|p| String::from_utf8_lossy(p.body()).into_owned())
        .collect()
}
