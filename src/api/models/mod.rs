// Models module - contains Flight, User, Ticket, PaymentMethod, CheckIn and enums

pub mod checkin;
pub mod enums;
pub mod flight;
pub mod payment_method;
pub mod ticket;
pub mod user;

pub use checkin::{CheckIn, CheckInRecord};
pub use flight::{Flight, FlightSummary, NewFlight};
pub use payment_method::PaymentMethod;
pub use ticket::{NewTicket, Ticket, TicketRecord, booking_code};
pub use user::{NewUser, User};
// Enums are re-exported individually where needed
pub use enums::{CabinClass, CheckInStatus, FlightStatus, PaymentKind, TicketStatus, UserRole};
