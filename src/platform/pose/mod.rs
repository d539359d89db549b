// Pose estimation platform integration
// Provides the landmark provider trait and the bundled providers

pub mod landmark_bridge;

pub use landmark_bridge::{
    parse_landmarks, LandmarkProvider, NullLandmarkProvider, ProviderOptions, ReplayLandmarkProvider,
};
