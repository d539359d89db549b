// External collaborators of the scan engine: camera capture and pose estimation

pub mod capture;
pub mod pose;
