pub mod entities;
pub mod events;
pub mod ports;
pub mod template;
pub mod value_objects;

pub use entities::*;
pub use events::*;
pub use ports::*;
pub use campaign_errors::{CampaignError, CampaignResult};
pub use template::render_body;
pub use value_objects::*;
