pub mod atomic_write;
pub mod replace;

pub use atomic_write::{Options, atomic_read, atomic_write};
pub use replace::{ReplaceOptions, remove_file_if_exists, replace_file};
