pub mod coefficients;
pub mod dat;
pub mod error;
pub mod polar;
pub mod stl;
pub mod surface;
pub mod tables;
pub mod traits;
