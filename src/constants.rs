pub mod limits {

    /// Lookups allowed per client key per calendar day.
    pub const DAILY_LOOKUP_LIMIT: i32 = 12;
}

pub mod intervals {
    use std::time::Duration;

    /// How long a lookup may stay in the simple loading stage before the UI
    /// switches to the deep-search presentation.
    pub const DEEP_SEARCH_DEADLINE: Duration = Duration::from_secs(7);

    /// Fixed hold after a successful lookup so the map centering animation
    /// finishes before the result sheet opens.
    pub const ZOOM_HOLD: Duration = Duration::from_secs(4);
}

pub mod headers {

    /// Header carrying the Turnstile challenge token.
    pub const CAPTCHA_TOKEN: &str = "cf-turnstile-response";

    /// Trusted proxy-supplied client address.
    pub const CONNECTING_IP: &str = "cf-connecting-ip";

    pub const FORWARDED_FOR: &str = "x-forwarded-for";
}

/// Quota key used when no client address header is present at all.
pub const FALLBACK_CLIENT_KEY: &str = "127.0.0.1";
