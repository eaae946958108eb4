//! Bearer-token lifecycle management.
//!
//! Obtains tokens from the identity provider's token endpoint, persists
//! them to a JSON token file, and refreshes them transparently. The rest
//! of the crate only ever sees [`TokenManager::get_valid_token`].

mod manager;
mod token;

pub use manager::{AuthError, Grant, TokenManager, TokenStatus};
pub use token::{RENEWAL_SKEW_MS, Token, TokenFileError, load_token_file, store_token_file};
