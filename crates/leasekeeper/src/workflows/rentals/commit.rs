use tracing::warn;

use super::error::RentalError;
use super::store::{encode, fetch, patch_fields, EntityStore, Record, StoreError, Stored};

/// Outcome of applying a state transition to a freshly read record.
pub(crate) enum Transition<T> {
    /// The record already reflects the requested state; nothing is written.
    Unchanged,
    /// Commit `fields` of `record` conditioned on the version that was read.
    Apply {
        record: T,
        fields: &'static [&'static str],
    },
}

/// Read, transition, and conditionally write a record, re-reading after a version conflict.
///
/// `transition` runs against every fresh read so validation always sees the latest state. At
/// most `max_attempts` writes are tried (at least one) before the conflict is surfaced.
pub(crate) fn commit_with_retry<T, S, F>(
    store: &S,
    id: &T::Id,
    max_attempts: u32,
    mut transition: F,
) -> Result<Stored<T>, RentalError>
where
    T: Record,
    S: EntityStore + ?Sized,
    F: FnMut(&Stored<T>) -> Result<Transition<T>, RentalError>,
{
    let attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let current: Stored<T> = fetch(store, id)?;
        let (record, fields) = match transition(&current)? {
            Transition::Unchanged => return Ok(current),
            Transition::Apply { record, fields } => (record, fields),
        };

        let patch = patch_fields(&encode(&record)?, fields);
        match store.update(T::COLLECTION, id.as_ref(), patch, Some(current.version)) {
            Ok(version) => {
                return Ok(Stored {
                    id: current.id,
                    version,
                    record,
                })
            }
            Err(conflict @ StoreError::VersionConflict { .. }) => {
                if attempt >= attempts {
                    warn!(
                        collection = %T::COLLECTION,
                        id = %id,
                        attempts,
                        "giving up after repeated version conflicts"
                    );
                    return Err(conflict.into());
                }
                warn!(
                    collection = %T::COLLECTION,
                    id = %id,
                    attempt,
                    "version conflict, re-reading"
                );
                attempt += 1;
            }
            Err(other) => return Err(other.into()),
        }
    }
}
