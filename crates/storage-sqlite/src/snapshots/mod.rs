mod model;
mod repository;

pub use model::{UserDailySnapshotDB, VideoDailySnapshotDB};
pub use repository::SnapshotRepository;
