pub mod attachments;
pub mod directories;
pub mod files;
pub mod locks;
