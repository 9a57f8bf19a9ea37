pub mod fft;
pub mod matrix;
pub mod stats;

pub use fft::{fft_shift_along, FftHelper};
pub use matrix::MatrixHelper;
pub use stats::StatsHelper;
