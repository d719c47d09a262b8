pub mod advisory;
pub mod feedback;
pub mod mock;
pub mod sink;
