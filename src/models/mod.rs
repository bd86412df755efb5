pub mod restaurant;
pub mod review;
pub mod favorite;
pub mod user;

pub use restaurant::*;
pub use review::*;
pub use favorite::*;
pub use user::*;
