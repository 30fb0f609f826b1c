pub mod archive_repository;
pub mod item_repository;

// Re-export all repositories for convenient access
pub use archive_repository::ArchiveRepository;
pub use item_repository::ItemRepository;
