pub mod clock;
pub mod dispatcher;
pub mod metrics;
pub mod session;
pub mod ticker;

pub use clock::{Clock, SystemClock};
pub use dispatcher::{PunchDispatcher, PunchState};
pub use metrics::{LiveMetrics, LiveState, format_hms, format_minutes};
pub use ticker::Ticker;
