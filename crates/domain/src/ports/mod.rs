pub mod messaging;
pub mod session;

pub use messaging::SendCapability;
pub use session::{PairingEvent, PairingStream, SessionIdentity, SessionNegotiator};
