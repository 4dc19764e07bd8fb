pub mod gate;
pub mod indicator;
pub mod ladder;
pub mod math;
pub mod protection;
pub mod sizing;

pub use gate::should_trade;
pub use indicator::{compute_indicator, MIN_CLOSES};
pub use ladder::{adding_ladder, opening_ladder};
pub use math::fib;
pub use protection::{stop_loss_order, take_profit_order};
pub use sizing::Store;
