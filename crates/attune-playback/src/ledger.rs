use parking_lot::Mutex;

/// Ordered record of chunks that were actually rendered to the speaker.
///
/// Received-but-unplayed is not played: a chunk enters the ledger only
/// after its playback completes, so an interrupted session never reports
/// audio the user did not hear. Entries leave only via `clear`, which the
/// caller invokes after forwarding a batch for transcription.
#[derive(Default)]
pub struct PlayedLedger {
    entries: Mutex<Vec<String>>,
}

impl PlayedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, chunk_data: String) {
        self.entries.lock().push(chunk_data);
    }

    /// Base64 payloads of every chunk played so far, in playback order.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Acknowledge consumption of the current batch.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
