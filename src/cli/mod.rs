// Keychain Store — CLI Module
//
// Command-line interface using clap derive macros.
// Subcommands: accounts, get, set, delete.

mod commands;

use clap::{Parser, Subcommand};

use crate::keychain::{Accessibility, ItemClass};

pub use commands::{execute, run};

/// Keychain Store — read and write keychain password items.
#[derive(Parser, Debug)]
#[command(name = "keychain-store")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Accessibility for newly added items (e.g. "when-unlocked",
    /// "after-first-unlock-this-device-only"). Defaults to the keychain's own.
    #[arg(long, global = true, env = "KEYCHAIN_ACCESSIBILITY")]
    pub accessibility: Option<Accessibility>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List accounts (attributes only, never passwords).
    Accounts {
        /// Only list accounts of this service.
        #[arg(long)]
        service: Option<String>,

        /// Item class: "generic" or "internet".
        #[arg(long, default_value_t = ItemClass::GenericPassword)]
        class: ItemClass,

        /// Print the records as JSON.
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Print the password of an item.
    Get {
        #[arg(long)]
        service: String,

        #[arg(long)]
        account: String,

        #[arg(long, default_value_t = ItemClass::GenericPassword)]
        class: ItemClass,
    },

    /// Store a password, replacing the existing one if present.
    Set {
        #[arg(long)]
        service: String,

        #[arg(long)]
        account: String,

        #[arg(long, default_value_t = ItemClass::GenericPassword)]
        class: ItemClass,

        /// Label shown for a newly added item.
        #[arg(long)]
        label: Option<String>,

        /// Description stored with a newly added item.
        #[arg(long)]
        description: Option<String>,

        /// The password. Read as one line from stdin when omitted, which
        /// keeps it out of shell history.
        #[arg(long)]
        password: Option<String>,
    },

    /// Delete an item.
    Delete {
        #[arg(long)]
        service: String,

        #[arg(long)]
        account: String,

        #[arg(long, default_value_t = ItemClass::GenericPassword)]
        class: ItemClass,
    },
}
