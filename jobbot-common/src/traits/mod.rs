pub mod platform_traits;
pub mod transport_traits;

pub use platform_traits::{ConnectionStatus, PlatformIntegration};
pub use transport_traits::ChatTransport;
