pub mod frame;
pub mod group;
pub mod profile;
pub mod unit;

pub use frame::Frame;
pub use group::{FailedProfile, ProfileGroup};
pub use profile::{Profile, ProfileMetadata, Sample, SourceFormat};
pub use unit::TimeUnit;
