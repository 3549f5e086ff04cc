pub mod clock;
pub mod record;
pub mod size;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use record::{ContentLocator, FileRecord, NewFileRecord, RecordId, RecordIdError, UNKNOWN};
pub use size::size_label;
pub use token::{TOKEN_PREFIX, Token, TokenError};
