pub mod gauge;
pub mod status;

pub use gauge::{confidence_gauge, moisture_gauge, render_bar, risk_bar, risk_gauge};
pub use status::{render_load_state, render_nav, render_status_message};
