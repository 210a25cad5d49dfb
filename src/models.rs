pub mod inbox;
pub mod note;
