// Data models for capture, landmarks, scan progress, classification and reporting

pub mod capture;
pub mod pose;
pub mod overlay;
pub mod scan;
pub mod classification;
pub mod session;
