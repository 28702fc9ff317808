mod extract;
mod stager;

pub use extract::extract_native_libraries;
pub use stager::{
    LinkMode, PlatformStager, StagedEntry, StagedLayout, LIBRARIES_DIR, NATIVES_DIR, REPORT_FILE,
};
