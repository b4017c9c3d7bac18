mod coaching_sessions;
mod curriculum;
mod utils;

pub use utils::{test_db, test_utils};
