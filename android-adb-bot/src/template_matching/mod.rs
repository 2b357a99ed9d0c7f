/// Template matching: from a screenshot to the point an action targets.
///
/// - `capture`: device screenshot → grayscale buffer
/// - `matcher`: normalized cross-correlation above a threshold
/// - `nms`: collapses clusters of neighbouring hits into one box
/// - `selector`: orders boxes and picks one by index
pub mod capture;
pub mod matcher;
pub mod nms;
pub mod selector;
pub mod types;


pub use capture::{CropRect, capture_cropped, capture_gray, capture_rgb, decode_gray};
pub use matcher::TemplateMatcher;
pub use nms::non_max_suppression;
pub use selector::{ordered_points, select};
pub use types::{
    DEFAULT_THRESHOLD, MatchCandidate, MatchPoint, PointRule, RegionOfInterest, SortKey,
};
