//! Outbound HTTP adapters (`reqwest`) for the resolution pipeline ports.

mod places;
mod redirect;

pub use places::GooglePlacesClient;
pub use redirect::ReqwestRedirectClient;

use m2w_core::Error;

/// Map a transport error onto the core taxonomy.
pub(crate) fn map_reqwest(context: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(format!("{context}: {e}"))
    } else if e.is_decode() {
        Error::Decode(format!("{context}: {e}"))
    } else {
        Error::Network(format!("{context}: {e}"))
    }
}
