//! Vector format, storage, normalization and recording.

pub mod format;
pub mod normalize;
pub mod recorder;
pub mod store;

pub use format::{Pair, Vector, VectorFile};
pub use normalize::{Normalizer, SubstitutionTable};
pub use recorder::VectorRecorder;
pub use store::VectorStore;
