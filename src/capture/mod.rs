pub mod source;
pub mod webcam;
