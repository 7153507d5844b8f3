mod repository;

pub use repository::SyncLockRepository;
