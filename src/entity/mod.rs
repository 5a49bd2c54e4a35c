//! Database entity models for ticketdesk.
//!
//! These Sea-ORM entities describe the tables created by
//! [`crate::migration::Migrator`]. The session table is not modeled here:
//! its name is configurable, so [`crate::session_store::SeaOrmStore`] builds
//! its statements against the configured table directly.

pub mod ticket;
pub mod ticket_image;
pub mod user;

pub use ticket::Entity as Ticket;
pub use ticket_image::Entity as TicketImage;
pub use user::Entity as User;
