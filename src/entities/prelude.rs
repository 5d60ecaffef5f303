pub use super::assignment_log::Entity as AssignmentLog;
pub use super::leads::Entity as Leads;
pub use super::presupuestos::Entity as Presupuestos;
pub use super::users::Entity as Users;
