pub mod assessments;
pub mod drills;
pub mod logins;
pub mod notes;
pub mod sessions;
pub mod users;

pub use assessments::*;
pub use drills::*;
pub use logins::*;
pub use notes::*;
pub use sessions::*;
pub use users::*;
