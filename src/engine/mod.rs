pub mod assignment;
pub mod compatibility;
pub mod rating;
pub mod registry;
