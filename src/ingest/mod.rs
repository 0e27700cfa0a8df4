//! Inbox ingestion for hands-off uploads.
//!
//! Watching a directory is the command-line stand-in for the portal's
//! drop zone: any new PDF that lands in the inbox is uploaded once it
//! has finished writing, then polled like any other upload.

pub mod inbox;

// Re-export key types
pub use inbox::{InboxConfig, InboxError, InboxWatcher, PdfFileEvent, WatchHandle};
