pub mod commit;
pub mod meta;

pub use commit::CommitInfo;
pub use meta::StoreMeta;
