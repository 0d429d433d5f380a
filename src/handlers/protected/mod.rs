// handlers/protected/mod.rs - Endpoints behind JWT authentication
//
// Every route here is wrapped by `jwt_auth_middleware`, which injects the
// caller as an `AuthUser` extension.

pub mod attachments;
pub mod auth;
pub mod lookups;
pub mod resource;
pub mod users;

use axum::Router;

use crate::database::models::{Epic, Label, Organization, Project, Sprint, Ticket, TicketComment, TicketStatus, TimeLog, User};
use crate::state::AppState;
use resource::resource_routes;

pub use resource::{Resource, Writable};

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .nest("/users", resource_routes::<User>().merge(users::routes()))
        .nest("/organizations", resource_routes::<Organization>())
        .nest("/projects", resource_routes::<Project>())
        .nest("/ticket-statuses", resource_routes::<TicketStatus>())
        .nest("/epics", resource_routes::<Epic>())
        .nest("/tickets", resource_routes::<Ticket>().merge(attachments::ticket_routes()))
        .nest("/comments", resource_routes::<TicketComment>())
        .nest("/time-logs", resource_routes::<TimeLog>())
        .nest("/sprints", resource_routes::<Sprint>())
        .nest("/labels", resource_routes::<Label>())
        .nest("/attachments", attachments::routes())
        .nest("/lookups", lookups::routes())
}
