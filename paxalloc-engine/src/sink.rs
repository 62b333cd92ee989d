use crate::operational::OperationalData;

/// Receives a fresh snapshot after every mutating session call.
///
/// The engine never waits on persistence; implementations should hand the
/// snapshot off and return.
pub trait SnapshotSink: Send {
    fn save(&mut self, snapshot: &OperationalData);
}

impl<F> SnapshotSink for F
where
    F: FnMut(&OperationalData) + Send,
{
    fn save(&mut self, snapshot: &OperationalData) {
        self(snapshot)
    }
}
