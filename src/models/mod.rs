pub mod assignment;
pub mod courier;
pub mod order;
pub mod timestamp;
