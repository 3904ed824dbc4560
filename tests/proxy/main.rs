mod questions;
mod score;
mod webcam;
