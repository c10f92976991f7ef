pub mod confidence;
pub mod handle;
pub mod inference;
pub mod pixel;
pub mod preprocessor;
pub mod report;
pub mod risk;
pub mod smart_pixel;
pub mod surface;
pub mod utils;
