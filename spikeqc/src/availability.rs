use std::path::PathBuf;

use log::warn;
use spikecore::PcFeatureSet;

use crate::error::LoadError;

/// Whether the PC-based metrics can run for this dataset.
#[derive(Clone, Debug)]
pub enum PcAvailability {
    Available(PcFeatureSet),
    /// Not requested.
    Disabled,
    /// Requested, but the feature file was not found.
    Unavailable { path: PathBuf },
}

impl PcAvailability {
    pub fn features(&self) -> Option<&PcFeatureSet> {
        match self {
            PcAvailability::Available(f) => Some(f),
            _ => None,
        }
    }

    /// Effective include flag after resolution.
    pub fn include_pc_metrics(&self) -> bool {
        matches!(self, PcAvailability::Available(_))
    }

    pub fn is_downgraded(&self) -> bool {
        matches!(self, PcAvailability::Unavailable { .. })
    }
}

/// Resolves the PC feature request before any metric is computed.
///
/// `load` is only called when PC metrics are requested. A not-found result
/// downgrades the request with one warning; every other error is returned.
pub fn resolve_pc_features<F>(requested: bool, load: F) -> Result<PcAvailability, LoadError>
where
    F: FnOnce() -> Result<PcFeatureSet, LoadError>,
{
    if !requested {
        return Ok(PcAvailability::Disabled);
    }
    match load() {
        Ok(features) => Ok(PcAvailability::Available(features)),
        Err(LoadError::NotFound { path }) => {
            warn!(
                "PC features not found at {}; continuing without PC-based metrics",
                path.display()
            );
            Ok(PcAvailability::Unavailable { path })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io;

    fn features() -> PcFeatureSet {
        PcFeatureSet::new(vec![0.0; 4], 1, 2, 2, vec![0, 1]).unwrap()
    }

    #[test]
    fn test_available() {
        let a = resolve_pc_features(true, || Ok(features())).unwrap();
        assert!(a.include_pc_metrics());
        assert!(a.features().is_some());
    }

    #[test]
    fn test_not_requested_never_loads() {
        let called = Cell::new(false);
        let a = resolve_pc_features(false, || {
            called.set(true);
            Ok(features())
        })
        .unwrap();
        assert!(!called.get());
        assert!(matches!(a, PcAvailability::Disabled));
        assert!(!a.is_downgraded());
    }

    #[test]
    fn test_not_found_downgrades() {
        let a = resolve_pc_features(true, || Err(LoadError::NotFound { path: PathBuf::from("pc_features.json") }))
            .unwrap();
        assert!(a.is_downgraded());
        assert!(!a.include_pc_metrics());
        assert!(a.features().is_none());
    }

    #[test]
    fn test_other_failures_are_fatal() {
        let r = resolve_pc_features(true, || Err(LoadError::DirectoryMissing { path: PathBuf::from("/gone") }));
        assert!(matches!(r, Err(LoadError::DirectoryMissing { .. })));

        let r = resolve_pc_features(true, || {
            Err(LoadError::Io {
                path: PathBuf::from("pc_features.json"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            })
        });
        assert!(r.is_err());
    }
}
