pub mod candle;
pub mod direction;
pub mod grades;
pub mod timeframe;

pub use candle::{Candle, CandleSeries};
pub use direction::*;
pub use grades::*;
pub use timeframe::Timeframe;
