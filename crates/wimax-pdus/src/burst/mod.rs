pub mod iuc;
pub mod profile_manager;

pub use profile_manager::BurstProfileManager;
