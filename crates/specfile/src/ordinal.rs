//! Ordinal assignment.

use crate::{
    error::Error,
    export::{Export, ExportFlags},
};

/// Fills in the ordinal of every export that does not carry an explicit one.
///
/// Explicitly requested ordinals are claimed first; requesting the same
/// ordinal twice is an error. Remaining included exports then receive the
/// lowest free ordinal, starting from 1, in source order.
pub(crate) fn assign_ordinals(exports: &mut [Export<'_>]) -> Result<(), Error> {
    let mut used = vec![false; 0x10000];

    for export in exports.iter() {
        if !export.flags.contains(ExportFlags::ORDINAL) {
            continue;
        }

        // The parser guarantees an ordinal value on ORDINAL-flagged records
        if let Some(ordinal) = export.ordinal {
            if used[usize::from(ordinal)] {
                return Err(Error::DuplicateOrdinal(ordinal));
            }

            used[usize::from(ordinal)] = true;
        }
    }

    let mut candidate = 1usize;
    for export in exports.iter_mut() {
        if export.flags.contains(ExportFlags::ORDINAL) || !export.included {
            continue;
        }

        while candidate < used.len() && used[candidate] {
            candidate += 1;
        }

        if candidate == used.len() {
            return Err(Error::OrdinalsExhausted);
        }

        used[candidate] = true;
        export.ordinal = Some(candidate as u16);
    }

    Ok(())
}
