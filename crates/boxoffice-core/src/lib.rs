pub mod error;
pub mod event;
pub mod id;
pub mod object;
pub mod record;
pub mod ticket;
pub mod time;

pub use error::{CoreError, Result};
pub use event::Event;
pub use id::generate_id;
pub use object::{Object, ObjectNotice};
pub use record::{Record, RecordKind};
pub use ticket::Ticket;
pub use time::{now_utc, parse_timestamp};
