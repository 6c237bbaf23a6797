mod health;
mod transfer;

pub use health::{__path_health_check, __path_root, health_check, root};
pub use transfer::{__path_send_ft, send_ft};
