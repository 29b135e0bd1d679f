pub mod check_api;
pub mod nominatim;
pub mod turnstile;
pub mod upstream;

pub use check_api::CheckApiClient;
pub use nominatim::NominatimClient;
pub use turnstile::TurnstileClient;
pub use upstream::UpstreamClient;
