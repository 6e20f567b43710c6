//! Tools, resources, prompts and access policies served over the Model Context Protocol

pub mod mock_db;
pub mod policy;
pub mod prompts;
pub mod resources;
pub mod tools;
pub mod utils;
