pub mod candle;
pub mod pattern;
pub mod structure;
pub mod timeframe;

pub use candle::{Candle, TimeframeSeries};
pub use pattern::{PatternEvent, PatternKind, PatternScan, PatternStrength, PriceRange};
pub use structure::{
    KeyLevel, LevelKind, LiquidityZone, PairStructure, StructureSnapshot, TrendDirection,
    VolatilityBucket,
};
pub use timeframe::Timeframe;
