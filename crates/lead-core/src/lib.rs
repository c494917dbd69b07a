//! Lead screening: everything between an admitted request and a message
//! ready for delivery.

pub mod antibot;
pub mod body;
pub mod message;
pub mod origin;
pub mod rate_limit;
pub mod sanitize;
pub mod validation;

pub use antibot::{AntiBot, Screening, TOO_FAST_MESSAGE};
pub use body::parse_submission;
pub use message::NotificationMessage;
pub use origin::{parse_origin, OriginGuard, ParsedOrigin};
pub use rate_limit::{
	client_identifier, from_config as rate_limiter_from_config, InMemoryRateLimiter, RateLimiter,
	Unlimited, UNKNOWN_CLIENT,
};
pub use sanitize::sanitize;
pub use validation::{LeadSubmission, LeadValidator};
