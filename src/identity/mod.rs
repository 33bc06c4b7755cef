pub mod fingerprint;
pub mod normalize;
pub mod screen_key;

pub use fingerprint::{Fingerprint, compute_fingerprint};
pub use normalize::{normalize_url, same_domain};
pub use screen_key::{IdentityConfig, ScreenKey, ScreenSignature, identify};
