mod repository;

pub use repository::PendingStateRepository;
