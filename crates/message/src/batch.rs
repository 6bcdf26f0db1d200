//! Batch - ordered sequence of parts flowing through the fabric as a unit.

use bytes::Bytes;

use crate::{codec, Error, Part};

#[cfg(test)]
#[path = "batch_test.rs"]
mod tests;

/// An ordered sequence of [`Part`]s.
///
/// Iteration order is stable and equal to insertion order. A batch may
/// carry zero parts, which downstream components treat as "filtered out".
///
/// Cloning is shallow in the same sense as [`Part::clone`]: bodies are
/// shared, metadata and error markers become independent.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    parts: Vec<Part>,
}

impl Batch {
    /// An empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// A batch built from raw part bodies. Convenient for tests and
    /// in-process producers.
    pub fn of<I, B>(bodies: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            parts: bodies.into_iter().map(Part::new).collect(),
        }
    }

    /// Number of parts.
    #[inline]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the batch carries no parts.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The part at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    /// Mutable access to the part at `index`.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Part> {
        self.parts.get_mut(index)
    }

    /// Append a part.
    pub fn push(&mut self, part: Part) {
        self.parts.push(part);
    }

    /// Append every part of `other`.
    pub fn append(&mut self, other: Batch) {
        self.parts.extend(other.parts);
    }

    /// Iterate over the parts in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Part> {
        self.parts.iter()
    }

    /// Mutable iteration in insertion order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Part> {
        self.parts.iter_mut()
    }

    /// Visit every part with its index, stopping at and propagating the
    /// first error.
    pub fn try_for_each<E>(
        &self,
        mut f: impl FnMut(usize, &Part) -> Result<(), E>,
    ) -> Result<(), E> {
        for (i, part) in self.parts.iter().enumerate() {
            f(i, part)?;
        }
        Ok(())
    }

    /// Mutable variant of [`Batch::try_for_each`].
    pub fn try_for_each_mut<E>(
        &mut self,
        mut f: impl FnMut(usize, &mut Part) -> Result<(), E>,
    ) -> Result<(), E> {
        for (i, part) in self.parts.iter_mut().enumerate() {
            f(i, part)?;
        }
        Ok(())
    }

    /// A fully independent copy of every part.
    pub fn deep_copy(&self) -> Self {
        Self {
            parts: self.parts.iter().map(Part::deep_copy).collect(),
        }
    }

    /// The raw body of every part, in order.
    pub fn bodies(&self) -> Vec<Bytes> {
        self.parts.iter().map(|p| p.body().clone()).collect()
    }

    /// Serialise into the self-describing wire frame.
    pub fn to_bytes(&self) -> Bytes {
        codec::encode_batch(self)
    }

    /// Deserialise from the self-describing wire frame.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        codec::decode_batch(data)
    }

    /// Consume the batch, yielding its parts.
    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }
}

impl FromIterator<Part> for Batch {
    fn from_iter<I: IntoIterator<Item = Part>>(iter: I) -> Self {
        Self {
            parts: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Batch {
    type Item = Part;
    type IntoIter = std::vec::IntoIter<Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.into_iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Part;
    type IntoIter = std::slice::Iter<'a, Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}
