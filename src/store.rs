pub mod clock;
pub mod inbox;
pub mod note;
pub mod sweeper;

pub use inbox::InboxRelay;
pub use note::NoteStore;
pub use sweeper::Sweeper;
