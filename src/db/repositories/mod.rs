// Repositories Module
// Re-exports all repository implementations

pub mod domain_repository;

pub use domain_repository::DomainRepositoryImpl;
