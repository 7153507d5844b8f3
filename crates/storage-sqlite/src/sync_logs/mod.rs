mod repository;

pub use repository::SyncLogRepository;
