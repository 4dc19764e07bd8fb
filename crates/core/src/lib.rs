pub mod config;
pub mod config_loader;
pub mod errors;
pub mod params;
pub mod side;
pub mod traits;
pub mod types;

pub use config::{AppConfig, PaperVenueConfig, RobotConfig};
pub use config_loader::ConfigLoader;
pub use errors::{ConfigError, InvariantError, RobotError, VenueError};
pub use params::Parameters;
pub use side::Side;
pub use traits::{ControlPlane, Venue};
pub use types::{
    Candle, Indicator, MarketType, Order, OrderBookTicker, OrderExtras, OrderType, Position,
    PositionRecord, ShouldTradeResult, TradingContext,
};
