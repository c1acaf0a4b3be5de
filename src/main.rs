use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use chrono::NaiveDate;
use clap::Parser;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use pin_ledger::{
    policy::{DEFAULT_DAILY_LIMIT, DEFAULT_MONTHLY_LIMIT},
    Amount, Clock, Error, JsonFileStore, Ledger, LimitPolicy, Limits, ManualClock,
    SessionController, SystemClock,
};

//==================== Configuration ====================//

/// Terminal kiosk over a PIN-keyed account ledger.
#[derive(Parser, Debug)]
#[command(name = "pin-ledger", version, about, long_about = None)]
struct Cli {
    /// JSON file holding every account
    #[arg(long, env = "PIN_LEDGER_DATA", default_value = "atm_data.json")]
    data_file: PathBuf,

    /// Largest single withdrawal
    #[arg(long, default_value_t = Decimal::from(DEFAULT_DAILY_LIMIT))]
    daily_limit: Decimal,

    /// Largest total withdrawn per calendar month
    #[arg(long, default_value_t = Decimal::from(DEFAULT_MONTHLY_LIMIT))]
    monthly_limit: Decimal,

    /// Malformed PIN entries in a row before the kiosk gives up
    #[arg(long, default_value_t = 3)]
    max_pin_attempts: u32,

    /// Run as if today were this date (YYYY-MM-DD) instead of the system date
    #[arg(long)]
    today: Option<NaiveDate>,
}

//==================== Terminal helpers ====================//

fn prompt(input: &mut impl BufRead, label: &str) -> Option<String> {
    print!("{label}");
    io::stdout().flush().ok();
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

/// `25000` → `25,000`; fractional digits are kept as-is.
fn group_thousands(amount: Amount) -> String {
    let text = amount.normalize().to_string();
    let (sign, text) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int, frac) = match text.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (text, None),
    };
    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match frac {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

fn limits_banner(limits: &Limits) -> String {
    format!(
        "Withdrawal limits: {} per transaction, {} per month",
        group_thousands(limits.daily),
        group_thousands(limits.monthly)
    )
}

fn describe(err: &Error) -> String {
    match err {
        Error::InvalidCredentialFormat => "Invalid PIN. Enter a 4-digit number.".into(),
        Error::NotAuthenticated => "Please log in first.".into(),
        Error::InvalidAmount => "Invalid amount.".into(),
        Error::InsufficientBalance { .. } => "Insufficient balance.".into(),
        Error::ExceedsDailyLimit { limit } => format!(
            "Exceeds daily withdrawal limit of {}.",
            group_thousands(*limit)
        ),
        Error::ExceedsMonthlyLimit { limit, .. } => format!(
            "Exceeds monthly withdrawal limit of {}.",
            group_thousands(*limit)
        ),
        Error::Persistence(e) => format!("Could not save account data ({e}). Nothing was changed."),
    }
}

//==================== Screens ====================//

enum MenuExit {
    Logout,
    Quit,
}

fn login_screen<C: Clock>(
    ctl: &mut SessionController<JsonFileStore, C>,
    input: &mut impl BufRead,
    max_attempts: u32,
) -> bool {
    let mut failures = 0u32;
    loop {
        println!("\n== Enter PIN to Login ==");
        let Some(pin) = prompt(input, "Enter your 4-digit PIN: ") else {
            return false;
        };
        match ctl.login(&pin) {
            Ok(outcome) => {
                if outcome.is_new {
                    println!("New account created!");
                }
                return true;
            }
            Err(err @ Error::InvalidCredentialFormat) => {
                failures += 1;
                eprintln!("error: {}", describe(&err));
                if failures >= max_attempts {
                    eprintln!("error: too many invalid PIN entries");
                    return false;
                }
            }
            Err(err) => eprintln!("error: {}", describe(&err)),
        }
    }
}

fn main_menu<C: Clock>(
    ctl: &mut SessionController<JsonFileStore, C>,
    input: &mut impl BufRead,
) -> MenuExit {
    loop {
        println!("\n== Welcome to the ATM ==");
        println!("{}", limits_banner(ctl.policy().limits()));
        println!("  1) Deposit\n  2) Withdraw\n  3) Check Balance\n  4) Logout\n  5) Exit");
        let Some(choice) = prompt(input, "> ") else {
            return MenuExit::Quit;
        };
        match choice.as_str() {
            "1" => {
                let Some(raw) = prompt(input, "Enter deposit amount: ") else {
                    return MenuExit::Quit;
                };
                match ctl.deposit(&raw) {
                    Ok(_) => println!("Deposit successful!"),
                    Err(err) => eprintln!("error: {}", describe(&err)),
                }
            }
            "2" => {
                let Some(raw) = prompt(input, "Enter withdrawal amount: ") else {
                    return MenuExit::Quit;
                };
                match ctl.withdraw(&raw) {
                    Ok(_) => println!("Withdrawal successful!"),
                    Err(err) => eprintln!("error: {}", describe(&err)),
                }
            }
            "3" => match ctl.check_balance() {
                Ok(balance) => println!("Your current balance is: {}", balance.normalize()),
                Err(err) => eprintln!("error: {}", describe(&err)),
            },
            "4" => {
                ctl.logout();
                return MenuExit::Logout;
            }
            "5" => {
                ctl.logout();
                return MenuExit::Quit;
            }
            other => eprintln!("error: unknown option {other:?}"),
        }
    }
}

fn run<C: Clock>(mut ctl: SessionController<JsonFileStore, C>, max_attempts: u32) {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        if !login_screen(&mut ctl, &mut input, max_attempts) {
            break;
        }
        if let MenuExit::Quit = main_menu(&mut ctl, &mut input) {
            break;
        }
    }
}

//==================== main ====================//

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.max_pin_attempts == 0 {
        eprintln!("error: --max-pin-attempts must be at least 1");
        std::process::exit(2);
    }
    if cli.daily_limit <= Decimal::ZERO || cli.monthly_limit <= Decimal::ZERO {
        eprintln!("error: withdrawal limits must be positive");
        std::process::exit(2);
    }

    let ledger = match Ledger::load(JsonFileStore::new(&cli.data_file)) {
        Ok(ledger) => ledger,
        Err(err) => {
            eprintln!(
                "error: cannot read {}: {err}",
                cli.data_file.display()
            );
            std::process::exit(1);
        }
    };
    let policy = LimitPolicy::new(Limits {
        daily: cli.daily_limit,
        monthly: cli.monthly_limit,
    });

    match cli.today {
        Some(today) => run(
            SessionController::new(ledger, policy, ManualClock::new(today)),
            cli.max_pin_attempts,
        ),
        None => run(
            SessionController::new(ledger, policy, SystemClock),
            cli.max_pin_attempts,
        ),
    }
}
