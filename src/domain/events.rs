//! Domain events emitted on the in-process event bus.
//!
//! Services publish these after a mutation commits; listeners (currently
//! the logging subscriber) consume them. Delivery to external clients is
//! out of scope for the core.

use serde::Serialize;

use crate::entities::leads::Estado;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum CrmEvent {
    LeadCreated {
        lead_id: i32,
    },
    LeadAssigned {
        lead_id: i32,
        vendedor: i32,
        assigned_by: i32,
    },
    LeadTransitioned {
        lead_id: i32,
        from: Estado,
        to: Estado,
    },
    LeadDeleted {
        lead_id: i32,
    },
    QuoteAttached {
        lead_id: i32,
        presupuesto_id: i32,
    },
    QuoteDetached {
        lead_id: i32,
    },
    FollowupOverdue {
        lead_id: i32,
        fecha: String,
    },
    UserDeactivated {
        user_id: i32,
    },
}
