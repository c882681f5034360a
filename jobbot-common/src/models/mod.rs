pub mod jobboard;
pub mod message;

pub use jobboard::{
    JobBoardSnapshot, Post, PostFailure, PostKind, StoredPost, Web3OffenderRecord,
};
pub use message::{ChannelEvent, ChannelMessage};
