// Keychain Store — CLI Command Handlers
//
// Each function handles one CLI subcommand against a `Keychain`. Output goes
// to the given writer so the handlers run the same against the system
// keychain and an in-memory one.

use std::io::{self, BufRead, Write};

use zeroize::Zeroizing;

use crate::error::AppError;
use crate::keychain::{ItemClass, ItemSpec, Keychain, KeychainBackend, KeychainResultExt};

use super::{Cli, Commands};

/// Execute the parsed CLI against the user's keychain.
pub fn execute(cli: Cli) -> Result<(), AppError> {
    let mut keychain = Keychain::system()?;
    keychain.set_accessibility(cli.accessibility);

    let stdin = io::stdin();
    let stdout = io::stdout();
    run(&keychain, cli.command, &mut stdin.lock(), &mut stdout.lock())
}

/// Run one command. `input` is only read by `set` when no password was given.
pub fn run<B: KeychainBackend>(
    keychain: &Keychain<B>,
    command: Commands,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<(), AppError> {
    match command {
        Commands::Accounts { service, class, json } => {
            cmd_accounts(keychain, service.as_deref(), class, json, out)
        }
        Commands::Get { service, account, class } => {
            cmd_get(keychain, &service, &account, class, out)
        }
        Commands::Set {
            service,
            account,
            class,
            label,
            description,
            password,
        } => {
            let mut spec = ItemSpec::new(&service, &account).class(class);
            spec.label = label.as_deref();
            spec.description = description.as_deref();
            cmd_set(keychain, &spec, password.map(Zeroizing::new), input, out)
        }
        Commands::Delete { service, account, class } => {
            cmd_delete(keychain, &service, &account, class, out)
        }
    }
}

// ─── Accounts ────────────────────────────────────────────────────────────────

fn cmd_accounts<B: KeychainBackend>(
    keychain: &Keychain<B>,
    service: Option<&str>,
    class: ItemClass,
    json: bool,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let found = match service {
        Some(service) => keychain.accounts_for_service_of_class(service, class),
        None => keychain.all_accounts_of_class(class),
    };
    let records = found.optional()?.unwrap_or_default();

    if json {
        serde_json::to_writer_pretty(&mut *out, &records)?;
        writeln!(out)?;
        return Ok(());
    }

    if records.is_empty() {
        writeln!(out, "No {} accounts found.", class)?;
        return Ok(());
    }

    writeln!(out, "Keychain accounts ({}):\n", records.len())?;
    for record in &records {
        writeln!(out, "  {}", record)?;
    }
    Ok(())
}

// ─── Get ─────────────────────────────────────────────────────────────────────

fn cmd_get<B: KeychainBackend>(
    keychain: &Keychain<B>,
    service: &str,
    account: &str,
    class: ItemClass,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let password = keychain.password_of_class(service, class, account)?;
    writeln!(out, "{}", password.as_str())?;
    Ok(())
}

// ─── Set ─────────────────────────────────────────────────────────────────────

fn cmd_set<B: KeychainBackend>(
    keychain: &Keychain<B>,
    spec: &ItemSpec<'_>,
    password: Option<Zeroizing<String>>,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let password = match password {
        Some(p) => p,
        None => read_password(input)?,
    };

    keychain.set_item(spec, password.as_bytes())?;
    writeln!(out, "✓ Password stored")?;
    writeln!(out, "  Service: {}", spec.service)?;
    writeln!(out, "  Account: {}", spec.account)?;
    Ok(())
}

/// Read one line, without its line ending.
fn read_password(input: &mut impl BufRead) -> Result<Zeroizing<String>, AppError> {
    let mut line = Zeroizing::new(String::new());
    if input.read_line(&mut line)? == 0 {
        return Err(AppError::Other("no password given on stdin".to_string()));
    }
    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(line)
}

// ─── Delete ──────────────────────────────────────────────────────────────────

fn cmd_delete<B: KeychainBackend>(
    keychain: &Keychain<B>,
    service: &str,
    account: &str,
    class: ItemClass,
    out: &mut impl Write,
) -> Result<(), AppError> {
    keychain.delete_password_of_class(service, class, account)?;
    writeln!(out, "✓ Deleted {} password for {} / {}", class, service, account)?;
    Ok(())
}
