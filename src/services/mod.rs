pub mod user_service;
pub mod user_service_impl;
pub use user_service::{NewUser, UserError, UserPatchInput, UserService};
pub use user_service_impl::SeaOrmUserService;

pub mod lead_service;
pub mod lead_service_impl;
pub use lead_service::{LeadError, LeadPatchInput, LeadService, NewLead};
pub use lead_service_impl::SeaOrmLeadService;

pub mod assignment_service;
pub mod assignment_service_impl;
pub use assignment_service::{AssignmentError, AssignmentService};
pub use assignment_service_impl::SeaOrmAssignmentService;

pub mod quote_service;
pub mod quote_service_impl;
pub use quote_service::{NewQuote, QuoteError, QuoteService};
pub use quote_service_impl::SeaOrmQuoteService;

pub mod followup;
pub use followup::{FollowupService, FollowupStats};
