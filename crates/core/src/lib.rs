pub mod call_tree;
pub mod error;
pub mod formats;
pub mod frame_table;
pub mod import;

pub use call_tree::{CallTree, CallTreeNode};
pub use error::ImportError;
pub use formats::{FormatTag, detect_format};
pub use frame_table::FrameTable;
pub use import::{
    ImportOptions, import_profile, import_profile_from_slice, import_profile_with_options,
};
