pub mod identity;

pub use identity::{identify_request, ActiveOrg, CurrentPrincipal, RequestIdentity};
