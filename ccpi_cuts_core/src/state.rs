//! Per-event derived state, cleared whenever the cursor advances.

use crate::error::{Result, SelectError};
use crate::record::{EventRecord, TrackIdx};
use crate::signature::Signatures;

#[derive(Clone, Debug)]
struct Derived {
    generation: u64,
    signatures: Signatures,
    candidates: Vec<TrackIdx>,
}

/// The current event plus whatever was derived from it.
///
/// Every `advance` bumps the generation. Cached values are tagged with the
/// generation they were computed under and are only handed out while it is
/// still current.
#[derive(Clone, Debug)]
pub struct Cursor<R> {
    record: R,
    generation: u64,
    derived: Option<Derived>,
}

impl<R: EventRecord> Cursor<R> {
    pub fn new(mut record: R) -> Self {
        record.on_advance();
        Self {
            record,
            generation: 0,
            derived: None,
        }
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Move onto the next event. Nothing derived from the previous one survives.
    pub fn advance(&mut self, next: R) {
        self.record = next;
        self.record.on_advance();
        self.on_advance();
    }

    #[inline]
    fn on_advance(&mut self) {
        self.generation += 1;
        self.derived = None;
    }

    fn current(&self) -> Result<Option<&Derived>> {
        match &self.derived {
            Some(d) if d.generation != self.generation => Err(SelectError::StaleCache {
                cached: d.generation,
                current: self.generation,
            }),
            d => Ok(d.as_ref()),
        }
    }

    /// Signatures cached for this event, if a classification already ran.
    pub fn signatures(&self) -> Result<Option<&Signatures>> {
        Ok(self.current()?.map(|d| &d.signatures))
    }

    /// Candidate set from the last classification of this event.
    pub fn candidates(&self) -> Result<&[TrackIdx]> {
        Ok(self.current()?.map(|d| d.candidates.as_slice()).unwrap_or(&[]))
    }

    /// Cache results computed under `generation`.
    pub fn store(
        &mut self,
        generation: u64,
        signatures: Signatures,
        candidates: Vec<TrackIdx>,
    ) -> Result<()> {
        if generation != self.generation {
            return Err(SelectError::StaleCache {
                cached: generation,
                current: self.generation,
            });
        }
        self.derived = Some(Derived {
            generation,
            signatures,
            candidates,
        });
        Ok(())
    }
}
