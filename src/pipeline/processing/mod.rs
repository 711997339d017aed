// Transform stages between extraction and the warehouse write path

pub mod merge;
pub mod normalize;
pub mod payer;
