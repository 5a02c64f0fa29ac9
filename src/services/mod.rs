//! Service layer separating I/O and progress reporting from editing logic

pub mod io;
pub mod progress;

pub use io::{DecodedImage, ImageIOService, SUPPORTED_EXTENSIONS};
pub use progress::{
    BatchProgress, ConsoleProgressReporter, NoOpProgressReporter, ProgressReporter, ProgressUpdate,
    WatchProgressReporter,
};
