pub mod error;
pub mod models;
pub mod session;
pub mod topics;
pub mod types;

pub use error::Error;
pub use models::ImageClassifier;
pub use session::{Analysis, AnalysisOutcome, Event, Session};
pub use topics::InfoTopic;
pub use types::{PixelBatch, Prediction, TumorClass};

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use crate::{Error, ImageClassifier, PixelBatch, Prediction, Result, TumorClass};
}
