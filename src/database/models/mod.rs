pub mod lookup;
pub mod organization;
pub mod project;
pub mod ticket;
pub mod user;

pub use lookup::LookupKind;
pub use organization::Organization;
pub use project::{Label, Project, TicketStatus};
pub use ticket::{Epic, Sprint, Ticket, TicketAttachment, TicketComment, TimeLog};
pub use user::{User, UserAuthMethod, UserInfo, AUTH_TYPE_OAUTH, AUTH_TYPE_PASSWORD};
