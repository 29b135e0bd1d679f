pub mod gateway;
pub use gateway::{
    CaptchaVerifier, DenyReason, Gateway, GatewayError, Geocoder, LookupKind, LookupOutcome,
    LookupProvider, LookupRequest, OptOutRequest, ProviderResponse,
};

pub mod gateway_impl;
pub use gateway_impl::ProxyGateway;
