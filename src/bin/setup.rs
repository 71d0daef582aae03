//! Prepares a fresh database.
//!
//! This binary creates the tables described by the migrations and, if no account with the given
//! username exists yet, bootstraps the first administrator so the roster can be managed.

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Create the database schema and the first administrator account")]
struct Setup {
    #[arg(long, default_value = "admin")]
    username: String,

    #[arg(long)]
    email: String,

    #[arg(long, env = "TRACKER_ADMIN_PASSWORD", hide_env_values = true)]
    password: String,
}

pub fn main() -> Result<()> {
    env_logger::init();

    let setup = Setup::parse();
    let mut manager = attendance_tracker::create_default_manager()?;

    if manager.find_account(&setup.username)?.is_some() {
        println!("Account `{}` already exists, nothing to do.", setup.username);
        return Ok(());
    }

    let id = manager.create_account(&setup.username, &setup.password, &setup.email, true)?;
    println!("Created administrator `{}` (id {id}).", setup.username);

    Ok(())
}
