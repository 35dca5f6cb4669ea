pub mod membership;
pub mod nursery_class;
pub mod organization;
pub mod principal;
pub mod role;
pub mod session;

pub use membership::{AddMemberRequest, Membership, MembershipEntry, MembershipSummary};
pub use nursery_class::{CreateClassRequest, NurseryClass, NurseryClassResponse, UpdateClassRequest};
pub use organization::{
    CreateOrganizationRequest, Organization, OrganizationResponse, SelectOrganizationRequest,
};
pub use principal::{LoginRequest, Principal, PrincipalState, RegisterRequest, SanitizedPrincipal};
pub use role::Role;
pub use session::{Session, SessionInfo};
