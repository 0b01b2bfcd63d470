//! Prints an Argon2 hash for the password given as the first argument.
//!
//! Useful for resetting an account's `password_hash` column by hand.

use rolodex_service::auth::password::{hash_password, validate_password_policy};

fn main() {
    let Some(password) = std::env::args().nth(1) else {
        eprintln!("usage: hash_password <password>");
        std::process::exit(2);
    };

    if let Err(err) = validate_password_policy("password", &password) {
        eprintln!("Password rejected: {err}");
        std::process::exit(1);
    }

    match hash_password(&password) {
        Ok(hash) => {
            println!("{hash}");
        }
        Err(err) => {
            eprintln!("Failed to hash password: {err}");
            std::process::exit(1);
        }
    }
}
