pub mod password;

pub use password::{generate_one_time_password, hash_password, verify_password, Password, PasswordHashString};
