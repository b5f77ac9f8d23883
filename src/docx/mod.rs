pub mod anchor;
pub mod assemble;
pub mod comments;
pub mod container;
pub mod extract;
pub mod guard;
pub mod manifest;
pub mod package;
pub mod xml;

#[cfg(test)]
pub(crate) mod testutil;

pub use anchor::{anchor_comment, CommentAuthor};
pub use assemble::finalize;
pub use container::DocumentContainer;
pub use extract::{extract, ExtractedText};
pub use guard::{create_backup, verify_integrity};
