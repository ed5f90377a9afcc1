//! JSON snapshot documents, one directory per network.

mod json;

pub use json::{
    ApyArchiveDocument, ApyDocument, JsonStore, SnapshotDocument, APY_ARCHIVE_FILE, APY_FILE,
    SNAPSHOTS_FILE, SUMMARY_FILE, TICKS_DIR,
};
