mod model;
mod repository;

pub use model::StoreAccountDB;
pub use repository::StoreAccountRepository;
